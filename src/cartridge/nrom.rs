// NROM (Mapper 0)
// No bank switching: 16 KiB or 32 KiB of PRG-ROM plus an 8 KiB PRG-RAM window.

use crate::error::{Error, Result};

use super::PRG_UNIT;

const PRG_RAM_SIZE: usize = 0x2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NromSize {
    /// 16 KiB, mirrored into both halves of $8000-$FFFF.
    Nrom128,
    /// 32 KiB, mapped continuously.
    Nrom256,
}

#[derive(Debug)]
pub struct Nrom {
    size: NromSize,
    prg_rom: Box<[u8]>,
    prg_ram: Box<[u8; PRG_RAM_SIZE]>,
}

impl Nrom {
    pub fn new(prg_rom: &[u8]) -> Result<Self> {
        let size = match prg_rom.len() {
            len if len == PRG_UNIT => NromSize::Nrom128,
            len if len == 2 * PRG_UNIT => NromSize::Nrom256,
            len => return Err(Error::UnsupportedPrgSize(len)),
        };

        Ok(Nrom {
            size,
            prg_rom: prg_rom.into(),
            prg_ram: Box::new([0; PRG_RAM_SIZE]),
        })
    }

    pub fn size(&self) -> NromSize {
        self.size
    }

    pub fn get(&self, addr: u16) -> Result<u8> {
        match addr {
            0x6000..=0x7FFF => Ok(self.prg_ram[(addr - 0x6000) as usize]),
            0x8000..=0xBFFF => Ok(self.prg_rom[(addr - 0x8000) as usize]),
            0xC000..=0xFFFF => {
                let offset = match self.size {
                    NromSize::Nrom128 => addr - 0xC000,
                    NromSize::Nrom256 => addr - 0x8000,
                };
                Ok(self.prg_rom[offset as usize])
            }
            _ => Err(Error::InvalidRead(addr)),
        }
    }

    pub fn set(&mut self, addr: u16, value: u8) -> Result<()> {
        match addr {
            0x6000..=0x7FFF => {
                self.prg_ram[(addr - 0x6000) as usize] = value;
                Ok(())
            }
            _ => Err(Error::InvalidWrite(addr)),
        }
    }
}
