use thiserror::Error;

/// Everything that can stop the emulator. None of these are recoverable:
/// they unwind to the caller, which is expected to report and exit.
#[derive(Debug, Error)]
pub enum Error {
    #[error("ROM file is empty")]
    EmptyRom,

    #[error("ROM file too small to hold an iNES header ({0} bytes)")]
    TruncatedHeader(usize),

    #[error("Invalid NES header")]
    BadMagic,

    #[error("ROM declares a trainer, which is not supported")]
    TrainerUnsupported,

    #[error("ROM file truncated: header declares {expected} bytes, file has {actual}")]
    TruncatedRom { expected: usize, actual: usize },

    #[error("Unsupported mapper: {0}")]
    UnsupportedMapper(u8),

    #[error("Unsupported PRG-ROM size for NROM: {0} bytes")]
    UnsupportedPrgSize(usize),

    #[error("Invalid read at ${0:04X}")]
    InvalidRead(u16),

    #[error("Invalid write at ${0:04X}")]
    InvalidWrite(u16),

    #[error("PPU address ${0:04X} outside memory map")]
    PpuAddressOutOfRange(u16),

    #[error("PPU access at ${0:04X} outside of CHR")]
    ChrOutOfRange(u16),

    #[error("Unknown opcode ${opcode:02X} at ${addr:04X}")]
    UnknownOpcode { opcode: u8, addr: u16 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
