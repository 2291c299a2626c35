//! nestest-style execution traces.
//!
//! A line describes the instruction at PC *before* it runs, e.g.
//!
//! ```text
//! C000  4C F5 C5  JMP $C5F5                       A:00 X:00 Y:00 P:24 SP:FD CYC:7
//! ```
//!
//! This is the nestest.log layout without the PPU column. Memory is only
//! inspected through [`CpuBus::peek`], so tracing never changes what the
//! program observes.

use crate::bits;
use crate::bus::CpuBus;

use super::opcodes::{self, AddressingMode, Mnemonic, Opcode};
use super::Cpu;

/// Target for `log` when tracing through [`LogSink`].
pub const TRACE_TARGET: &str = "famicore::trace";

/// Receives one formatted line per executed instruction.
pub trait TraceSink {
    fn record(&mut self, line: &str);
}

/// Forwards lines to `log::trace!` on [`TRACE_TARGET`].
#[derive(Debug, Default)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn record(&mut self, line: &str) {
        log::trace!(target: TRACE_TARGET, "{}", line);
    }
}

#[derive(Debug, Default)]
pub struct StdoutSink;

impl TraceSink for StdoutSink {
    fn record(&mut self, line: &str) {
        println!("{}", line);
    }
}

impl TraceSink for Vec<String> {
    fn record(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Formats the instruction at `cpu.pc` together with the register state.
pub fn trace_line<B: CpuBus + ?Sized>(cpu: &Cpu, bus: &B) -> String {
    let pc = cpu.pc;
    let code = bus.peek(pc);

    let (bytes, marker, asm) = match opcodes::lookup(code) {
        Some(opcode) => {
            let bytes = (0..=opcode.mode.operand_len())
                .map(|i| format!("{:02X}", bus.peek(pc.wrapping_add(i))))
                .collect::<Vec<_>>()
                .join(" ");
            let marker = if opcode.official { ' ' } else { '*' };
            (bytes, marker, disassemble(cpu, bus, opcode))
        }
        None => (format!("{:02X}", code), '*', "???".to_string()),
    };

    format!(
        "{:04X}  {:<8} {}{:<32}A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
        pc,
        bytes,
        marker,
        asm,
        cpu.a,
        cpu.x,
        cpu.y,
        cpu.status.bits(),
        cpu.sp,
        cpu.cycles
    )
}

fn disassemble<B: CpuBus + ?Sized>(cpu: &Cpu, bus: &B, opcode: &Opcode) -> String {
    let name = opcode.mnemonic.name();
    let arg_addr = cpu.pc.wrapping_add(1);
    let byte = bus.peek(arg_addr);
    let word = bus.peek16(arg_addr, false);

    let operand = match opcode.mode {
        AddressingMode::Implied => String::new(),
        AddressingMode::Accumulator => "A".to_string(),
        AddressingMode::Immediate => format!("#${:02X}", byte),
        AddressingMode::ZeroPage => format!("${:02X} = {:02X}", byte, bus.peek(byte as u16)),
        AddressingMode::ZeroPageX => {
            let addr = byte.wrapping_add(cpu.x);
            format!("${:02X},X @ {:02X} = {:02X}", byte, addr, bus.peek(addr as u16))
        }
        AddressingMode::ZeroPageY => {
            let addr = byte.wrapping_add(cpu.y);
            format!("${:02X},Y @ {:02X} = {:02X}", byte, addr, bus.peek(addr as u16))
        }
        AddressingMode::Absolute => match opcode.mnemonic {
            Mnemonic::Jmp | Mnemonic::Jsr => format!("${:04X}", word),
            _ => format!("${:04X} = {:02X}", word, bus.peek(word)),
        },
        AddressingMode::AbsoluteX => {
            let addr = word.wrapping_add(cpu.x as u16);
            format!("${:04X},X @ {:04X} = {:02X}", word, addr, bus.peek(addr))
        }
        AddressingMode::AbsoluteY => {
            let addr = word.wrapping_add(cpu.y as u16);
            format!("${:04X},Y @ {:04X} = {:02X}", word, addr, bus.peek(addr))
        }
        AddressingMode::Indirect => format!("(${:04X}) = {:04X}", word, bus.peek16(word, true)),
        AddressingMode::IndirectX => {
            let ptr = byte.wrapping_add(cpu.x);
            let addr = bus.peek16(ptr as u16, true);
            format!(
                "(${:02X},X) @ {:02X} = {:04X} = {:02X}",
                byte,
                ptr,
                addr,
                bus.peek(addr)
            )
        }
        AddressingMode::IndirectY => {
            let base = bus.peek16(byte as u16, true);
            let addr = base.wrapping_add(cpu.y as u16);
            format!(
                "(${:02X}),Y = {:04X} @ {:04X} = {:02X}",
                byte,
                base,
                addr,
                bus.peek(addr)
            )
        }
        AddressingMode::Relative => {
            let next = cpu.pc.wrapping_add(2);
            format!("${:04X}", bits::offset_address(next, byte))
        }
    };

    if operand.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", name, operand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::tests::TestBus;

    fn cpu_at(pc: u16) -> Cpu {
        Cpu {
            pc,
            ..Cpu::new()
        }
    }

    #[test]
    fn absolute_jump_line() {
        let bus = TestBus::with_program(0xC000, &[0x4C, 0xF5, 0xC5]);
        assert_eq!(
            trace_line(&cpu_at(0xC000), &bus),
            "C000  4C F5 C5  JMP $C5F5                       A:00 X:00 Y:00 P:24 SP:FD CYC:7"
        );
    }

    #[test]
    fn memory_operands_show_current_values() {
        let mut bus = TestBus::with_program(0xC5F5, &[0x86, 0x00]);
        bus.mem[0x0000] = 0x00;
        let mut cpu = cpu_at(0xC5F5);
        cpu.cycles = 10;
        assert_eq!(
            trace_line(&cpu, &bus),
            "C5F5  86 00     STX $00 = 00                    A:00 X:00 Y:00 P:24 SP:FD CYC:10"
        );
    }

    #[test]
    fn unofficial_opcodes_are_starred() {
        let mut bus = TestBus::with_program(0xC6BD, &[0x04, 0xA9]);
        bus.mem[0xA9] = 0x00;
        let line = trace_line(&cpu_at(0xC6BD), &bus);
        assert!(line.starts_with("C6BD  04 A9    *NOP $A9 = 00 "));
        assert_eq!(line.find("A:"), Some(48));
    }

    #[test]
    fn indirect_operand_forms() {
        let mut bus = TestBus::with_program(0x8000, &[0xA1, 0x80]);
        bus.mem[0x0080] = 0x00;
        bus.mem[0x0081] = 0x02;
        bus.mem[0x0200] = 0x5A;
        let line = trace_line(&cpu_at(0x8000), &bus);
        assert!(line.contains("LDA ($80,X) @ 80 = 0200 = 5A"));

        let mut bus = TestBus::with_program(0x8000, &[0xB1, 0x89]);
        bus.mem[0x0089] = 0x00;
        bus.mem[0x008A] = 0x03;
        bus.mem[0x0300] = 0x89;
        let line = trace_line(&cpu_at(0x8000), &bus);
        assert!(line.contains("LDA ($89),Y = 0300 @ 0300 = 89"));

        let mut bus = TestBus::with_program(0x8000, &[0x6C, 0xFF, 0x02]);
        bus.mem[0x02FF] = 0x7E;
        bus.mem[0x0200] = 0xDB;
        let line = trace_line(&cpu_at(0x8000), &bus);
        assert!(line.contains("JMP ($02FF) = DB7E"));
    }

    #[test]
    fn branch_and_accumulator_forms() {
        let bus = TestBus::with_program(0xC72A, &[0xB0, 0x01]);
        assert!(trace_line(&cpu_at(0xC72A), &bus).contains("BCS $C72D"));

        let bus = TestBus::with_program(0x8000, &[0x4A]);
        assert!(trace_line(&cpu_at(0x8000), &bus).contains("LSR A "));
    }

    #[test]
    fn tracing_does_not_touch_the_bus() {
        let bus = TestBus::with_program(0x8000, &[0xAD, 0x02, 0x20]);
        trace_line(&cpu_at(0x8000), &bus);
        assert!(bus.reads.is_empty());
    }

    #[test]
    fn vec_sink_collects_lines() {
        let mut sink: Vec<String> = Vec::new();
        sink.record("one");
        sink.record("two");
        assert_eq!(sink, vec!["one".to_string(), "two".to_string()]);
    }
}
