mod nrom;

pub use nrom::{Nrom, NromSize};

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

pub const HEADER_SIZE: usize = 16;
pub const PRG_UNIT: usize = 0x4000;
pub const CHR_UNIT: usize = 0x2000;
pub const PRG_RAM_UNIT: usize = 0x2000;

const MAGIC: &[u8; 4] = b"NES\x1A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
}

/// A parsed iNES 1.0 image.
#[derive(Debug, Clone)]
pub struct Cartridge {
    pub prg_rom: Vec<u8>,
    pub chr: Vec<u8>,
    /// No CHR-ROM in the image: the board carries writable CHR-RAM instead.
    pub chr_is_ram: bool,
    pub mapper: u8,
    pub mirroring: Mirroring,
    pub battery_backed: bool,
    pub prg_ram_size: usize,
}

impl Cartridge {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let rom_data = fs::read(path)?;
        Self::load_from_bytes(&rom_data)
    }

    pub fn load_from_bytes(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::EmptyRom);
        }
        if data.len() < HEADER_SIZE {
            return Err(Error::TruncatedHeader(data.len()));
        }
        if &data[0..4] != MAGIC {
            return Err(Error::BadMagic);
        }

        let prg_rom_size = data[4] as usize * PRG_UNIT;
        let chr_rom_size = data[5] as usize * CHR_UNIT;
        let flags_6 = data[6];
        let flags_7 = data[7];

        // iNES flags 6 bit 2: a 512-byte trainer sits ahead of PRG ROM.
        if flags_6 & 0x04 != 0 {
            return Err(Error::TrainerUnsupported);
        }
        if flags_7 & 0x0C == 0x08 {
            log::warn!("NES 2.0 header detected, reading it as iNES 1.0");
        }
        if flags_6 & 0x08 != 0 {
            log::warn!("Four-screen VRAM requested but not supported, using header mirroring");
        }

        let mirroring = if flags_6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };
        let mapper = (flags_7 & 0xF0) | (flags_6 >> 4);
        let prg_ram_units = if data[8] == 0 { 1 } else { data[8] as usize };

        let prg_rom_start = HEADER_SIZE;
        let chr_rom_start = prg_rom_start + prg_rom_size;
        let expected = chr_rom_start + chr_rom_size;
        if data.len() < expected {
            return Err(Error::TruncatedRom {
                expected,
                actual: data.len(),
            });
        }

        let chr_is_ram = chr_rom_size == 0;
        let chr = if chr_is_ram {
            vec![0; CHR_UNIT]
        } else {
            data[chr_rom_start..expected].to_vec()
        };

        let cartridge = Cartridge {
            prg_rom: data[prg_rom_start..chr_rom_start].to_vec(),
            chr,
            chr_is_ram,
            mapper,
            mirroring,
            battery_backed: flags_6 & 0x02 != 0,
            prg_ram_size: prg_ram_units * PRG_RAM_UNIT,
        };
        log::info!(
            "Cartridge: mapper {}, PRG-ROM {} KiB, CHR-{} {} KiB, {:?} mirroring",
            cartridge.mapper,
            cartridge.prg_rom.len() / 1024,
            if chr_is_ram { "RAM" } else { "ROM" },
            cartridge.chr.len() / 1024,
            cartridge.mirroring,
        );
        Ok(cartridge)
    }
}

/// Cartridge hardware as seen from the CPU, `$4020-$FFFF`.
#[derive(Debug)]
pub enum Mapper {
    Nrom(Nrom),
}

impl Mapper {
    pub fn from_cartridge(cartridge: &Cartridge) -> Result<Self> {
        match cartridge.mapper {
            0 => Ok(Mapper::Nrom(Nrom::new(&cartridge.prg_rom)?)),
            other => Err(Error::UnsupportedMapper(other)),
        }
    }

    pub fn get(&self, addr: u16) -> Result<u8> {
        match self {
            Mapper::Nrom(nrom) => nrom.get(addr),
        }
    }

    pub fn set(&mut self, addr: u16, value: u8) -> Result<()> {
        match self {
            Mapper::Nrom(nrom) => nrom.set(addr, value),
        }
    }

    /// Like `get` but never fails; unmapped space reads as 0.
    pub fn peek(&self, addr: u16) -> u8 {
        self.get(addr).unwrap_or(0)
    }

    pub fn id(&self) -> u8 {
        match self {
            Mapper::Nrom(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ines(prg_units: u8, chr_units: u8, flags_6: u8, flags_7: u8) -> Vec<u8> {
        let mut rom = vec![b'N', b'E', b'S', 0x1A, prg_units, chr_units, flags_6, flags_7];
        rom.resize(HEADER_SIZE, 0);
        rom.extend((0..prg_units as usize * PRG_UNIT).map(|i| (i % 251) as u8));
        rom.extend(std::iter::repeat(0xCC).take(chr_units as usize * CHR_UNIT));
        rom
    }

    #[test]
    fn parses_nrom_header() {
        let cart = Cartridge::load_from_bytes(&ines(1, 1, 0x01, 0x00)).unwrap();
        assert_eq!(cart.mapper, 0);
        assert_eq!(cart.prg_rom.len(), PRG_UNIT);
        assert_eq!(cart.chr.len(), CHR_UNIT);
        assert!(!cart.chr_is_ram);
        assert_eq!(cart.mirroring, Mirroring::Vertical);
        assert_eq!(cart.prg_ram_size, PRG_RAM_UNIT);
        assert_eq!(cart.prg_rom[3], 3);
    }

    #[test]
    fn mapper_number_combines_both_nibbles() {
        let cart = Cartridge::load_from_bytes(&ines(1, 1, 0x10, 0x40)).unwrap();
        assert_eq!(cart.mapper, 0x41);
        assert!(matches!(
            Mapper::from_cartridge(&cart),
            Err(Error::UnsupportedMapper(0x41))
        ));
    }

    #[test]
    fn trainer_is_flags_6_bit_2() {
        assert!(matches!(
            Cartridge::load_from_bytes(&ines(1, 1, 0x04, 0)),
            Err(Error::TrainerUnsupported)
        ));

        // Bit 5 belongs to the mapper's low nibble.
        let cart = Cartridge::load_from_bytes(&ines(1, 1, 0x20, 0)).unwrap();
        assert_eq!(cart.mapper, 2);
        assert!(matches!(
            Mapper::from_cartridge(&cart),
            Err(Error::UnsupportedMapper(2))
        ));

        let cart = Cartridge::load_from_bytes(&ines(1, 1, 0x00, 0)).unwrap();
        assert_eq!(Mapper::from_cartridge(&cart).unwrap().id(), 0);
    }

    #[test]
    fn missing_chr_rom_means_chr_ram() {
        let cart = Cartridge::load_from_bytes(&ines(2, 0, 0, 0)).unwrap();
        assert!(cart.chr_is_ram);
        assert_eq!(cart.chr.len(), CHR_UNIT);
    }

    #[test]
    fn nes2_header_is_read_as_ines1() {
        let cart = Cartridge::load_from_bytes(&ines(1, 1, 0, 0x08)).unwrap();
        assert_eq!(cart.mapper, 0);
    }

    #[test]
    fn rejects_malformed_images() {
        assert!(matches!(Cartridge::load_from_bytes(&[]), Err(Error::EmptyRom)));
        assert!(matches!(
            Cartridge::load_from_bytes(b"NES\x1A\x01"),
            Err(Error::TruncatedHeader(5))
        ));

        let mut bad_magic = ines(1, 1, 0, 0);
        bad_magic[3] = 0x00;
        assert!(matches!(Cartridge::load_from_bytes(&bad_magic), Err(Error::BadMagic)));

        assert!(matches!(
            Cartridge::load_from_bytes(&ines(1, 1, 0x04, 0)),
            Err(Error::TrainerUnsupported)
        ));

        let mut short = ines(1, 1, 0, 0);
        short.truncate(short.len() - 1);
        match Cartridge::load_from_bytes(&short) {
            Err(Error::TruncatedRom { expected, actual }) => {
                assert_eq!(expected, HEADER_SIZE + PRG_UNIT + CHR_UNIT);
                assert_eq!(actual, expected - 1);
            }
            other => panic!("expected TruncatedRom, got {:?}", other),
        }
    }
}
