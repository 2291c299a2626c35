use crate::bits;
use crate::bus::CpuBus;
use crate::error::Result;

use super::opcodes::AddressingMode;
use super::Cpu;

/// A resolved operand. `addr` is absent for implied, accumulator and
/// immediate operands; `value` then carries the accumulator or the
/// immediate byte. Memory operands are read lazily by the instruction so
/// that stores never touch their target before writing it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Operand {
    pub addr: Option<u16>,
    pub value: u8,
    pub page_crossed: bool,
}

impl Operand {
    fn at(addr: u16) -> Self {
        Operand {
            addr: Some(addr),
            ..Operand::default()
        }
    }

    fn indexed(base: u16, addr: u16) -> Self {
        Operand {
            addr: Some(addr),
            value: 0,
            page_crossed: bits::page_crossed(base, addr),
        }
    }

    fn value(value: u8) -> Self {
        Operand {
            value,
            ..Operand::default()
        }
    }
}

impl Cpu {
    pub(super) fn fetch<B: CpuBus + ?Sized>(&mut self, bus: &mut B) -> Result<u8> {
        let byte = bus.get(self.pc)?;
        self.pc = self.pc.wrapping_add(1);
        Ok(byte)
    }

    pub(super) fn fetch16<B: CpuBus + ?Sized>(&mut self, bus: &mut B) -> Result<u16> {
        let word = bus.get16(self.pc, false)?;
        self.pc = self.pc.wrapping_add(2);
        Ok(word)
    }

    /// Consumes the operand bytes for `mode` and works out where the
    /// instruction's data lives.
    pub(super) fn resolve<B: CpuBus + ?Sized>(
        &mut self,
        bus: &mut B,
        mode: AddressingMode,
    ) -> Result<Operand> {
        let operand = match mode {
            AddressingMode::Implied => Operand::default(),
            AddressingMode::Accumulator => Operand::value(self.a),
            AddressingMode::Immediate => Operand::value(self.fetch(bus)?),
            AddressingMode::ZeroPage => Operand::at(self.fetch(bus)? as u16),
            AddressingMode::ZeroPageX => Operand::at(self.fetch(bus)?.wrapping_add(self.x) as u16),
            AddressingMode::ZeroPageY => Operand::at(self.fetch(bus)?.wrapping_add(self.y) as u16),
            AddressingMode::Absolute => Operand::at(self.fetch16(bus)?),
            AddressingMode::AbsoluteX => {
                let base = self.fetch16(bus)?;
                Operand::indexed(base, base.wrapping_add(self.x as u16))
            }
            AddressingMode::AbsoluteY => {
                let base = self.fetch16(bus)?;
                Operand::indexed(base, base.wrapping_add(self.y as u16))
            }
            AddressingMode::Indirect => {
                let ptr = self.fetch16(bus)?;
                Operand::at(bus.get16(ptr, true)?)
            }
            AddressingMode::IndirectX => {
                let ptr = self.fetch(bus)?.wrapping_add(self.x);
                Operand::at(bus.get16(ptr as u16, true)?)
            }
            AddressingMode::IndirectY => {
                let ptr = self.fetch(bus)?;
                let base = bus.get16(ptr as u16, true)?;
                Operand::indexed(base, base.wrapping_add(self.y as u16))
            }
            AddressingMode::Relative => {
                let offset = self.fetch(bus)?;
                Operand::indexed(self.pc, bits::offset_address(self.pc, offset))
            }
        };
        Ok(operand)
    }

    /// The operand's value: memory for addressed operands, otherwise the
    /// immediate byte or accumulator captured at resolve time.
    pub(super) fn load<B: CpuBus + ?Sized>(&mut self, bus: &mut B, operand: &Operand) -> Result<u8> {
        match operand.addr {
            Some(addr) => bus.get(addr),
            None => Ok(operand.value),
        }
    }

    /// Writes a result back where the operand came from; operands without
    /// an address are the accumulator.
    pub(super) fn store<B: CpuBus + ?Sized>(
        &mut self,
        bus: &mut B,
        operand: &Operand,
        value: u8,
    ) -> Result<()> {
        match operand.addr {
            Some(addr) => bus.set(addr, value),
            None => {
                self.a = value;
                Ok(())
            }
        }
    }
}
