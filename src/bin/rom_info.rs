use anyhow::{Context, Result};
use famicore::cartridge::{Cartridge, Mapper};
use famicore::cpu::{IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <rom_file>", args[0]);
        std::process::exit(1);
    }

    let rom_path = &args[1];
    println!("Loading ROM: {}", rom_path);

    let cartridge =
        Cartridge::load_from_file(rom_path).with_context(|| format!("failed to load {}", rom_path))?;

    println!("\n=== ROM Information ===");
    println!("Mapper: {}", cartridge.mapper);
    println!("Mirroring: {:?}", cartridge.mirroring);
    println!(
        "PRG ROM size: {} bytes ({} KB)",
        cartridge.prg_rom.len(),
        cartridge.prg_rom.len() / 1024
    );
    println!(
        "CHR {} size: {} bytes ({} KB)",
        if cartridge.chr_is_ram { "RAM" } else { "ROM" },
        cartridge.chr.len(),
        cartridge.chr.len() / 1024
    );
    println!("PRG RAM size: {} bytes", cartridge.prg_ram_size);
    println!("Battery: {}", cartridge.battery_backed);

    let mapper = Mapper::from_cartridge(&cartridge).context("mapper not supported")?;

    let vector = |addr: u16| u16::from_le_bytes([mapper.peek(addr), mapper.peek(addr + 1)]);
    println!("\n=== Vectors ===");
    println!("NMI:   ${:04X}", vector(NMI_VECTOR));
    println!("RESET: ${:04X}", vector(RESET_VECTOR));
    println!("IRQ:   ${:04X}", vector(IRQ_VECTOR));

    let reset = vector(RESET_VECTOR);
    println!("\n=== First 16 bytes at reset ===");
    for i in 0..16u16 {
        if i % 8 == 0 && i > 0 {
            println!();
        }
        print!("{:02X} ", mapper.peek(reset.wrapping_add(i)));
    }
    println!();

    Ok(())
}
