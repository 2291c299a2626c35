use std::path::Path;

use crate::bus::{Bus, IoRegisters, RAM_SIZE};
use crate::cartridge::{Cartridge, Mapper};
use crate::config::{Config, TraceTarget};
use crate::cpu::trace::{self, LogSink, StdoutSink, TraceSink};
use crate::cpu::Cpu;
use crate::error::Result;
use crate::ppu::Ppu;

/// The whole machine. Owns every component; a [`Bus`] borrowing them is
/// assembled for each instruction.
pub struct Nes {
    cpu: Cpu,
    cpu_ram: [u8; RAM_SIZE],
    ppu: Ppu,
    io: IoRegisters,
    mapper: Mapper,
    tracer: Option<Box<dyn TraceSink>>,
    entry_point: Option<u16>,
    instructions: u64,
}

impl Nes {
    /// Inserts `cartridge` and runs the reset sequence.
    pub fn new(cartridge: Cartridge, config: &Config) -> Result<Self> {
        let mapper = Mapper::from_cartridge(&cartridge)?;
        let ppu = Ppu::new(cartridge.chr, cartridge.chr_is_ram, cartridge.mirroring);

        let tracer: Option<Box<dyn TraceSink>> = match config.trace {
            TraceTarget::Off => None,
            TraceTarget::Log => Some(Box::new(LogSink)),
            TraceTarget::Stdout => Some(Box::new(StdoutSink)),
        };

        let mut nes = Nes {
            cpu: Cpu::new(),
            cpu_ram: [0; RAM_SIZE],
            ppu,
            io: IoRegisters::new(),
            mapper,
            tracer,
            entry_point: config.entry_point,
            instructions: 0,
        };
        nes.reset()?;
        Ok(nes)
    }

    pub fn from_file<P: AsRef<Path>>(path: P, config: &Config) -> Result<Self> {
        let cartridge = Cartridge::load_from_file(path)?;
        Nes::new(cartridge, config)
    }

    /// Resets the CPU and PPU. RAM, OAM and cartridge RAM keep their contents.
    pub fn reset(&mut self) -> Result<()> {
        self.ppu.reset();
        self.instructions = 0;
        let entry_point = self.entry_point;

        let (cpu, mut bus) = self.split();
        cpu.reset(&mut bus)?;
        if let Some(pc) = entry_point {
            log::info!("Overriding entry point: 0x{:04X}", pc);
            cpu.pc = pc;
        }
        Ok(())
    }

    /// Executes one instruction, returning the cycles it took.
    pub fn step(&mut self) -> Result<u64> {
        let traced = self.tracer.is_some();
        let (cpu, mut bus) = self.split();
        let line = if traced {
            Some(trace::trace_line(cpu, &bus))
        } else {
            None
        };
        let result = cpu.step(&mut bus);

        // Recorded even on failure: it names the instruction that stopped us.
        if let (Some(line), Some(tracer)) = (line, self.tracer.as_mut()) {
            tracer.record(&line);
        }
        let cycles = result?;
        self.instructions += 1;
        Ok(cycles)
    }

    /// Executes one instruction and also hands back its trace line.
    pub fn trace_step(&mut self) -> Result<(String, u64)> {
        let (cpu, mut bus) = self.split();
        let line = trace::trace_line(cpu, &bus);
        let result = cpu.step(&mut bus);

        if let Some(tracer) = self.tracer.as_mut() {
            tracer.record(&line);
        }
        let cycles = result?;
        self.instructions += 1;
        Ok((line, cycles))
    }

    /// Executes `count` instructions and returns the cycles they took.
    /// Stops at the first error.
    pub fn run(&mut self, count: u64) -> Result<u64> {
        let mut cycles = 0;
        for _ in 0..count {
            cycles += self.step()?;
        }
        Ok(cycles)
    }

    /// Delivers a non-maskable interrupt, as the PPU does on vblank.
    pub fn nmi(&mut self) -> Result<()> {
        let (cpu, mut bus) = self.split();
        cpu.nmi(&mut bus)
    }

    pub fn set_tracer(&mut self, tracer: Option<Box<dyn TraceSink>>) {
        self.tracer = tracer;
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn ppu_mut(&mut self) -> &mut Ppu {
        &mut self.ppu
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// The CPU's view of memory, for inspecting or poking the machine
    /// between steps.
    pub fn bus(&mut self) -> Bus<'_> {
        self.split().1
    }

    /// Instructions executed since the last reset.
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    fn split(&mut self) -> (&mut Cpu, Bus<'_>) {
        let bus = Bus::new(
            &mut self.cpu_ram,
            &mut self.ppu,
            &mut self.io,
            &mut self.mapper,
        );
        (&mut self.cpu, bus)
    }
}
