//! MOS 6502 core as found in the NES (no decimal mode).
//!
//! One call to [`Cpu::step`] fetches, decodes and executes a whole
//! instruction and returns the cycles it took. All memory effects go
//! through a [`CpuBus`].

mod addressing;
pub mod opcodes;
pub mod trace;


pub use addressing::Operand;
pub use opcodes::{AddressingMode, Mnemonic, Opcode};

use bitflags::bitflags;

use crate::bits;
use crate::bus::CpuBus;
use crate::error::{Error, Result};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        const CARRY = 0b00000001;
        const ZERO = 0b00000010;
        const INTERRUPT_DISABLE = 0b00000100;
        const DECIMAL = 0b00001000;
        const BREAK = 0b00010000;
        const UNUSED = 0b00100000;
        const OVERFLOW = 0b01000000;
        const NEGATIVE = 0b10000000;
    }
}

pub const STACK_BASE: u16 = 0x0100;
pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Cycles the reset sequence takes before the first instruction.
pub const RESET_CYCLES: u64 = 7;
pub const INTERRUPT_CYCLES: u64 = 7;

const POWER_ON_STATUS: Status = Status::INTERRUPT_DISABLE.union(Status::UNUSED);
const POWER_ON_SP: u8 = 0xFD;

// Only present in the copy pushed to the stack.
const PUSHED_BITS: Status = Status::BREAK.union(Status::UNUSED);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cpu {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub status: Status,
    pub sp: u8,
    pub pc: u16,
    pub cycles: u64,
}

impl Cpu {
    pub fn new() -> Self {
        Cpu {
            a: 0,
            x: 0,
            y: 0,
            status: POWER_ON_STATUS,
            sp: POWER_ON_SP,
            pc: 0,
            cycles: RESET_CYCLES,
        }
    }

    pub fn reset<B: CpuBus + ?Sized>(&mut self, bus: &mut B) -> Result<()> {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.status = POWER_ON_STATUS;
        self.sp = POWER_ON_SP;
        self.cycles = RESET_CYCLES;
        self.pc = bus.get16(RESET_VECTOR, false)?;
        log::info!("Reset CPU, PC set to: 0x{:04X}", self.pc);
        Ok(())
    }

    pub fn flag(&self, flag: Status) -> bool {
        self.status.contains(flag)
    }

    pub fn set_flag(&mut self, flag: Status, on: bool) {
        self.status.set(flag, on);
    }

    /// Executes one instruction and returns the cycles it consumed.
    pub fn step<B: CpuBus + ?Sized>(&mut self, bus: &mut B) -> Result<u64> {
        let addr = self.pc;
        let code = self.fetch(bus)?;
        let opcode = *opcodes::lookup(code).ok_or(Error::UnknownOpcode { opcode: code, addr })?;

        let operand = self.resolve(bus, opcode.mode)?;
        let mut cycles = opcode.cycles as u64;
        if operand.page_crossed && opcode.mnemonic.has_page_penalty() {
            cycles += 1;
        }
        cycles += self.execute(bus, opcode.mnemonic, &operand)?;
        cycles += bus.take_stall_cycles();

        self.cycles += cycles;
        Ok(cycles)
    }

    /// Non-maskable interrupt entry.
    pub fn nmi<B: CpuBus + ?Sized>(&mut self, bus: &mut B) -> Result<()> {
        self.interrupt(bus, NMI_VECTOR)
    }

    /// Maskable interrupt entry; does nothing while I is set.
    pub fn irq<B: CpuBus + ?Sized>(&mut self, bus: &mut B) -> Result<bool> {
        if self.flag(Status::INTERRUPT_DISABLE) {
            return Ok(false);
        }
        self.interrupt(bus, IRQ_VECTOR)?;
        Ok(true)
    }

    fn interrupt<B: CpuBus + ?Sized>(&mut self, bus: &mut B, vector: u16) -> Result<()> {
        self.push16(bus, self.pc)?;
        let pushed = (self.status | Status::UNUSED) - Status::BREAK;
        self.push(bus, pushed.bits())?;
        self.set_flag(Status::INTERRUPT_DISABLE, true);
        self.pc = bus.get16(vector, false)?;
        self.cycles += INTERRUPT_CYCLES;
        Ok(())
    }

    pub fn push<B: CpuBus + ?Sized>(&mut self, bus: &mut B, value: u8) -> Result<()> {
        bus.set(STACK_BASE | self.sp as u16, value)?;
        self.sp = self.sp.wrapping_sub(1);
        Ok(())
    }

    pub fn pop<B: CpuBus + ?Sized>(&mut self, bus: &mut B) -> Result<u8> {
        self.sp = self.sp.wrapping_add(1);
        bus.get(STACK_BASE | self.sp as u16)
    }

    /// High byte first, so the low byte pops first.
    pub fn push16<B: CpuBus + ?Sized>(&mut self, bus: &mut B, value: u16) -> Result<()> {
        self.push(bus, (value >> 8) as u8)?;
        self.push(bus, value as u8)
    }

    pub fn pop16<B: CpuBus + ?Sized>(&mut self, bus: &mut B) -> Result<u16> {
        let lo = self.pop(bus)?;
        let hi = self.pop(bus)?;
        Ok(bits::word(lo, hi))
    }

    // Pulled status keeps the live B and unused bits.
    fn pull_status(&mut self, pulled: u8) {
        let pulled = Status::from_bits_retain(pulled) - PUSHED_BITS;
        self.status = pulled | (self.status & PUSHED_BITS);
    }

    /// Returns extra cycles beyond the base cost (taken branches).
    fn execute<B: CpuBus + ?Sized>(
        &mut self,
        bus: &mut B,
        mnemonic: Mnemonic,
        operand: &Operand,
    ) -> Result<u64> {
        use Mnemonic::*;

        match mnemonic {
            Lda => {
                self.a = self.load(bus, operand)?;
                self.update_nz(self.a);
            }
            Ldx => {
                self.x = self.load(bus, operand)?;
                self.update_nz(self.x);
            }
            Ldy => {
                self.y = self.load(bus, operand)?;
                self.update_nz(self.y);
            }
            Lax => {
                let value = self.load(bus, operand)?;
                self.a = value;
                self.x = value;
                self.update_nz(value);
            }
            Sta => self.store(bus, operand, self.a)?,
            Stx => self.store(bus, operand, self.x)?,
            Sty => self.store(bus, operand, self.y)?,
            Sax => self.store(bus, operand, self.a & self.x)?,

            Tax => {
                self.x = self.a;
                self.update_nz(self.x);
            }
            Tay => {
                self.y = self.a;
                self.update_nz(self.y);
            }
            Tsx => {
                self.x = self.sp;
                self.update_nz(self.x);
            }
            Txa => {
                self.a = self.x;
                self.update_nz(self.a);
            }
            Txs => self.sp = self.x,
            Tya => {
                self.a = self.y;
                self.update_nz(self.a);
            }

            Adc => {
                let value = self.load(bus, operand)?;
                self.adc(value);
            }
            Sbc => {
                let value = self.load(bus, operand)?;
                self.sbc(value);
            }
            And => {
                self.a &= self.load(bus, operand)?;
                self.update_nz(self.a);
            }
            Ora => {
                self.a |= self.load(bus, operand)?;
                self.update_nz(self.a);
            }
            Eor => {
                self.a ^= self.load(bus, operand)?;
                self.update_nz(self.a);
            }
            Cmp => {
                let value = self.load(bus, operand)?;
                self.compare(self.a, value);
            }
            Cpx => {
                let value = self.load(bus, operand)?;
                self.compare(self.x, value);
            }
            Cpy => {
                let value = self.load(bus, operand)?;
                self.compare(self.y, value);
            }
            Bit => {
                let value = self.load(bus, operand)?;
                self.set_flag(Status::ZERO, self.a & value == 0);
                self.set_flag(Status::NEGATIVE, bits::bit(7, value) == 1);
                self.set_flag(Status::OVERFLOW, bits::bit(6, value) == 1);
            }

            Inc => {
                let value = self.modify(bus, operand, |_, v| v.wrapping_add(1))?;
                self.update_nz(value);
            }
            Dec => {
                let value = self.modify(bus, operand, |_, v| v.wrapping_sub(1))?;
                self.update_nz(value);
            }
            Inx => {
                self.x = self.x.wrapping_add(1);
                self.update_nz(self.x);
            }
            Iny => {
                self.y = self.y.wrapping_add(1);
                self.update_nz(self.y);
            }
            Dex => {
                self.x = self.x.wrapping_sub(1);
                self.update_nz(self.x);
            }
            Dey => {
                self.y = self.y.wrapping_sub(1);
                self.update_nz(self.y);
            }

            Asl => {
                let value = self.modify(bus, operand, Cpu::asl)?;
                self.update_nz(value);
            }
            Lsr => {
                let value = self.modify(bus, operand, Cpu::lsr)?;
                self.update_nz(value);
            }
            Rol => {
                let value = self.modify(bus, operand, Cpu::rol)?;
                self.update_nz(value);
            }
            Ror => {
                let value = self.modify(bus, operand, Cpu::ror)?;
                self.update_nz(value);
            }

            // Undocumented read-modify-write pairs.
            Dcp => {
                let value = self.modify(bus, operand, |_, v| v.wrapping_sub(1))?;
                self.compare(self.a, value);
            }
            Isb => {
                let value = self.modify(bus, operand, |_, v| v.wrapping_add(1))?;
                self.sbc(value);
            }
            Slo => {
                let value = self.modify(bus, operand, Cpu::asl)?;
                self.a |= value;
                self.update_nz(self.a);
            }
            Rla => {
                let value = self.modify(bus, operand, Cpu::rol)?;
                self.a &= value;
                self.update_nz(self.a);
            }
            Sre => {
                let value = self.modify(bus, operand, Cpu::lsr)?;
                self.a ^= value;
                self.update_nz(self.a);
            }
            Rra => {
                let value = self.modify(bus, operand, Cpu::ror)?;
                self.adc(value);
            }

            Bcc => return Ok(self.branch(operand, !self.flag(Status::CARRY))),
            Bcs => return Ok(self.branch(operand, self.flag(Status::CARRY))),
            Bne => return Ok(self.branch(operand, !self.flag(Status::ZERO))),
            Beq => return Ok(self.branch(operand, self.flag(Status::ZERO))),
            Bpl => return Ok(self.branch(operand, !self.flag(Status::NEGATIVE))),
            Bmi => return Ok(self.branch(operand, self.flag(Status::NEGATIVE))),
            Bvc => return Ok(self.branch(operand, !self.flag(Status::OVERFLOW))),
            Bvs => return Ok(self.branch(operand, self.flag(Status::OVERFLOW))),

            Jmp => self.pc = self.target(operand),
            Jsr => {
                // Return address minus one: the last byte of the JSR.
                self.push16(bus, self.pc.wrapping_sub(1))?;
                self.pc = self.target(operand);
            }
            Rts => self.pc = self.pop16(bus)?.wrapping_add(1),
            Brk => {
                // Skips the padding byte after BRK.
                self.push16(bus, self.pc.wrapping_add(1))?;
                self.push(bus, (self.status | PUSHED_BITS).bits())?;
                self.set_flag(Status::INTERRUPT_DISABLE, true);
                self.pc = bus.get16(IRQ_VECTOR, false)?;
            }
            Rti => {
                let pulled = self.pop(bus)?;
                self.pull_status(pulled);
                self.pc = self.pop16(bus)?;
            }

            Pha => self.push(bus, self.a)?,
            Php => self.push(bus, (self.status | PUSHED_BITS).bits())?,
            Pla => {
                self.a = self.pop(bus)?;
                self.update_nz(self.a);
            }
            Plp => {
                let pulled = self.pop(bus)?;
                self.pull_status(pulled);
            }

            Clc => self.set_flag(Status::CARRY, false),
            Sec => self.set_flag(Status::CARRY, true),
            Cli => self.set_flag(Status::INTERRUPT_DISABLE, false),
            Sei => self.set_flag(Status::INTERRUPT_DISABLE, true),
            Cld => self.set_flag(Status::DECIMAL, false),
            Sed => self.set_flag(Status::DECIMAL, true),
            Clv => self.set_flag(Status::OVERFLOW, false),

            Nop => {
                // Multi-byte NOPs still perform their read.
                if operand.addr.is_some() {
                    self.load(bus, operand)?;
                }
            }
        }
        Ok(0)
    }

    fn target(&self, operand: &Operand) -> u16 {
        operand.addr.unwrap_or(self.pc)
    }

    /// +1 cycle when taken, +1 more when the target is on another page.
    fn branch(&mut self, operand: &Operand, taken: bool) -> u64 {
        if !taken {
            return 0;
        }
        self.pc = self.target(operand);
        if operand.page_crossed {
            2
        } else {
            1
        }
    }

    /// Read-modify-write on memory or the accumulator. Returns the value
    /// written back.
    fn modify<B, F>(&mut self, bus: &mut B, operand: &Operand, f: F) -> Result<u8>
    where
        B: CpuBus + ?Sized,
        F: FnOnce(&mut Cpu, u8) -> u8,
    {
        let value = self.load(bus, operand)?;
        let result = f(&mut *self, value);
        self.store(bus, operand, result)?;
        Ok(result)
    }

    fn asl(&mut self, value: u8) -> u8 {
        self.set_flag(Status::CARRY, bits::bit(7, value) == 1);
        value << 1
    }

    fn lsr(&mut self, value: u8) -> u8 {
        self.set_flag(Status::CARRY, bits::bit(0, value) == 1);
        value >> 1
    }

    fn rol(&mut self, value: u8) -> u8 {
        let carry_in = self.flag(Status::CARRY) as u8;
        self.set_flag(Status::CARRY, bits::bit(7, value) == 1);
        (value << 1) | carry_in
    }

    fn ror(&mut self, value: u8) -> u8 {
        let carry_in = (self.flag(Status::CARRY) as u8) << 7;
        self.set_flag(Status::CARRY, bits::bit(0, value) == 1);
        (value >> 1) | carry_in
    }

    fn update_nz(&mut self, value: u8) {
        self.set_flag(Status::ZERO, value == 0);
        self.set_flag(Status::NEGATIVE, bits::is_negative(value));
    }

    fn adc(&mut self, value: u8) {
        let sum = self.a as u16 + value as u16 + self.flag(Status::CARRY) as u16;
        let result = sum as u8;

        self.set_flag(Status::CARRY, sum > 0xFF);
        // Both inputs share a sign that the result does not.
        self.set_flag(
            Status::OVERFLOW,
            (self.a ^ result) & (value ^ result) & 0x80 != 0,
        );

        self.a = result;
        self.update_nz(self.a);
    }

    // Carry in acts as "not borrow".
    fn sbc(&mut self, value: u8) {
        self.adc(!value);
    }

    fn compare(&mut self, reg: u8, value: u8) {
        let result = reg.wrapping_sub(value);
        self.set_flag(Status::CARRY, reg >= value);
        self.set_flag(Status::ZERO, reg == value);
        self.set_flag(Status::NEGATIVE, bits::is_negative(result));
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
