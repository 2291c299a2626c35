use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use famicore::{Config, Nes, TraceTarget};

/// Runs an NROM cartridge on the 6502 core.
#[derive(Parser, Debug)]
#[command(name = "famicore")]
#[command(about = "NES CPU interpreter", long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    rom: PathBuf,

    /// Number of instructions to execute
    #[arg(short = 'n', long, default_value = "10000")]
    instructions: u64,

    /// Emit a nestest-style line per instruction
    #[arg(long, value_enum)]
    trace: Option<TraceArg>,

    /// Start at this address (hex) instead of the reset vector
    #[arg(long, value_parser = parse_hex_addr)]
    entry_point: Option<u16>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TraceArg {
    /// Through the logger, target famicore::trace
    Log,
    Stdout,
}

fn parse_hex_addr(s: &str) -> std::result::Result<u16, String> {
    let digits = s.trim_start_matches('$').trim_start_matches("0x");
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid address {:?}: {}", s, e))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = Config {
        trace: match args.trace {
            None => TraceTarget::Off,
            Some(TraceArg::Log) => TraceTarget::Log,
            Some(TraceArg::Stdout) => TraceTarget::Stdout,
        },
        entry_point: args.entry_point,
    };

    log::info!("Loading ROM: {}", args.rom.display());
    let mut nes = Nes::from_file(&args.rom, &config)
        .with_context(|| format!("failed to load {}", args.rom.display()))?;

    let start = Instant::now();
    let result = nes.run(args.instructions);
    let elapsed = start.elapsed();

    let cpu = nes.cpu();
    println!(
        "Executed {} instructions in {:.3?}",
        nes.instructions(),
        elapsed
    );
    println!(
        "A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} PC:{:04X} CYC:{}",
        cpu.a,
        cpu.x,
        cpu.y,
        cpu.status.bits(),
        cpu.sp,
        cpu.pc,
        cpu.cycles
    );

    result.with_context(|| format!("execution stopped after {} instructions", nes.instructions()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_addresses() {
        assert_eq!(parse_hex_addr("C000"), Ok(0xC000));
        assert_eq!(parse_hex_addr("$c000"), Ok(0xC000));
        assert_eq!(parse_hex_addr("0x8000"), Ok(0x8000));
        assert!(parse_hex_addr("10000").is_err());
        assert!(parse_hex_addr("zz").is_err());
    }

    #[test]
    fn args_parse() {
        let args = Args::parse_from(["famicore", "rom.nes", "-n", "5", "--trace", "stdout"]);
        assert_eq!(args.instructions, 5);
        assert!(matches!(args.trace, Some(TraceArg::Stdout)));
        assert_eq!(args.entry_point, None);
    }
}
