//! NES CPU core: a 6502 interpreter on the NES address bus, with an NROM
//! cartridge and the PPU's CPU-facing register file.

pub mod bits;
pub mod bus;
pub mod cartridge;
pub mod config;
pub mod cpu;
pub mod error;
pub mod ppu;
pub mod system;

pub use bus::{Bus, CpuBus};
pub use cartridge::{Cartridge, Mapper, Mirroring};
pub use config::{Config, TraceTarget};
pub use cpu::trace::{LogSink, StdoutSink, TraceSink};
pub use cpu::{Cpu, Status};
pub use error::{Error, Result};
pub use ppu::Ppu;
pub use system::Nes;
