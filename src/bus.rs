use crate::bits;
use crate::cartridge::Mapper;
use crate::error::Result;
use crate::ppu::{Port, Ppu, OAM_SIZE};

pub const RAM_SIZE: usize = 0x800;
pub const IO_SIZE: usize = 0x20;

/// CPU stall for an OAM DMA transfer.
pub const OAM_DMA_CYCLES: u64 = 513;

const OPEN_BUS: u8 = 0xFF;

/// The CPU's view of memory. All effects of an instruction go through here.
pub trait CpuBus {
    fn get(&mut self, addr: u16) -> Result<u8>;

    fn set(&mut self, addr: u16, value: u8) -> Result<()>;

    /// Side-effect-free read for tracing and disassembly.
    fn peek(&self, addr: u16) -> u8;

    /// Little-endian word at `addr`. With `page_wrap` the high byte comes
    /// from the start of the same page when `addr` is `$xxFF`, as the 6502
    /// does for indirect pointers.
    fn get16(&mut self, addr: u16, page_wrap: bool) -> Result<u16> {
        let hi_addr = if page_wrap {
            bits::wrap_in_page(addr)
        } else {
            addr.wrapping_add(1)
        };
        let lo = self.get(addr)?;
        let hi = self.get(hi_addr)?;
        Ok(bits::word(lo, hi))
    }

    fn peek16(&self, addr: u16, page_wrap: bool) -> u16 {
        let hi_addr = if page_wrap {
            bits::wrap_in_page(addr)
        } else {
            addr.wrapping_add(1)
        };
        bits::word(self.peek(addr), self.peek(hi_addr))
    }

    /// Cycles the CPU must idle because of bus activity (DMA) since the
    /// last call.
    fn take_stall_cycles(&mut self) -> u64 {
        0
    }
}

/// APU and I/O registers, `$4000-$401F`. Stored verbatim; no sound or
/// controller behavior hangs off them.
#[derive(Debug, Clone)]
pub struct IoRegisters {
    regs: [u8; IO_SIZE],
}

impl IoRegisters {
    pub fn new() -> Self {
        IoRegisters { regs: [0; IO_SIZE] }
    }

    /// Only the low five address bits select a register.
    pub fn get(&self, addr: u16) -> u8 {
        self.regs[addr as usize % IO_SIZE]
    }

    pub fn set(&mut self, addr: u16, value: u8) {
        self.regs[addr as usize % IO_SIZE] = value;
    }
}

impl Default for IoRegisters {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes CPU addresses to the pieces of the machine. It only borrows
/// them, so it is built for a step and dropped before its owners are.
pub struct Bus<'a> {
    ram: &'a mut [u8; RAM_SIZE],
    ppu: &'a mut Ppu,
    io: &'a mut IoRegisters,
    mapper: &'a mut Mapper,
    stall_cycles: u64,
}

impl<'a> Bus<'a> {
    pub fn new(
        ram: &'a mut [u8; RAM_SIZE],
        ppu: &'a mut Ppu,
        io: &'a mut IoRegisters,
        mapper: &'a mut Mapper,
    ) -> Self {
        Bus {
            ram,
            ppu,
            io,
            mapper,
            stall_cycles: 0,
        }
    }

    fn oam_dma(&mut self, page: u8) -> Result<()> {
        let base = (page as u16) << 8;
        let mut data = [0u8; OAM_SIZE];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = self.get(base | i as u16)?;
        }
        self.ppu.write_oam_dma(&data);
        self.stall_cycles += OAM_DMA_CYCLES;
        log::trace!("OAM DMA from page {:02X}", page);
        Ok(())
    }
}

impl CpuBus for Bus<'_> {
    fn get(&mut self, addr: u16) -> Result<u8> {
        match addr {
            0x0000..=0x1FFF => Ok(self.ram[addr as usize % RAM_SIZE]),
            0x2000..=0x3FFF => self.ppu.read_port(Port::from_cpu_addr(addr)),
            0x4000..=0x401F => Ok(self.io.get(addr)),
            _ => self.mapper.get(addr),
        }
    }

    fn set(&mut self, addr: u16, value: u8) -> Result<()> {
        match addr {
            0x0000..=0x1FFF => {
                self.ram[addr as usize % RAM_SIZE] = value;
                Ok(())
            }
            0x2000..=0x3FFF => self.ppu.write_port(Port::from_cpu_addr(addr), value),
            0x4014 => {
                self.io.set(addr, value);
                self.oam_dma(value)
            }
            0x4000..=0x401F => {
                self.io.set(addr, value);
                Ok(())
            }
            _ => self.mapper.set(addr, value),
        }
    }

    fn peek(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[addr as usize % RAM_SIZE],
            0x2000..=0x3FFF => self.ppu.peek_port(Port::from_cpu_addr(addr)),
            // Traces show the APU/IO window as open bus, as nestest.log does.
            0x4000..=0x401F => OPEN_BUS,
            _ => self.mapper.peek(addr),
        }
    }

    fn take_stall_cycles(&mut self) -> u64 {
        std::mem::take(&mut self.stall_cycles)
    }
}
