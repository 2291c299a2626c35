//! Builds iNES images in memory.

#![allow(dead_code)]

pub const PRG_BANK: usize = 0x4000;

/// NROM-128 image: `program` at $8000 (mirrored at $C000), reset vector
/// pointing at $8000, 8 KiB of CHR-ROM.
pub fn nrom128(program: &[u8]) -> Vec<u8> {
    let mut prg = vec![0xEA; PRG_BANK];
    prg[..program.len()].copy_from_slice(program);
    prg[0x3FFC] = 0x00;
    prg[0x3FFD] = 0x80;
    ines(&prg, &[0; 0x2000], 0x00)
}

pub fn ines(prg: &[u8], chr: &[u8], flags_6: u8) -> Vec<u8> {
    let mut rom = vec![
        b'N',
        b'E',
        b'S',
        0x1A,
        (prg.len() / PRG_BANK) as u8,
        (chr.len() / 0x2000) as u8,
        flags_6,
        0,
    ];
    rom.resize(16, 0);
    rom.extend_from_slice(prg);
    rom.extend_from_slice(chr);
    rom
}
