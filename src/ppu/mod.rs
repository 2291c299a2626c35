use bitflags::bitflags;

use crate::bits;
use crate::cartridge::Mirroring;
use crate::error::{Error, Result};

pub const OAM_SIZE: usize = 256;
pub const NAMETABLE_SIZE: usize = 0x800;
pub const PALETTE_SIZE: usize = 32;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PpuCtrl: u8 {
        const NAMETABLE_ADDR = 0b00000011;
        const VRAM_INCREMENT = 0b00000100;
        const SPRITE_PATTERN = 0b00001000;
        const BG_PATTERN = 0b00010000;
        const SPRITE_SIZE = 0b00100000;
        const MASTER_SLAVE = 0b01000000;
        const NMI_ENABLE = 0b10000000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PpuMask: u8 {
        const GRAYSCALE = 0b00000001;
        const SHOW_BG_LEFT = 0b00000010;
        const SHOW_SPRITES_LEFT = 0b00000100;
        const SHOW_BG = 0b00001000;
        const SHOW_SPRITES = 0b00010000;
        const EMPHASIZE_RED = 0b00100000;
        const EMPHASIZE_GREEN = 0b01000000;
        const EMPHASIZE_BLUE = 0b10000000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PpuStatus: u8 {
        const SPRITE_OVERFLOW = 0b00100000;
        const SPRITE_ZERO_HIT = 0b01000000;
        const VBLANK_STARTED = 0b10000000;
    }
}

/// PPUCTRL broken out into the values the rest of the PPU consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    pub base_nametable_addr: u16,
    /// 1 (across) or 32 (down).
    pub vram_increment: u16,
    pub sprite_pattern_addr: u16,
    pub bg_pattern_addr: u16,
    pub tall_sprites: bool,
    pub master: bool,
    pub generate_nmi: bool,
}

impl From<PpuCtrl> for Control {
    fn from(ctrl: PpuCtrl) -> Self {
        Control {
            base_nametable_addr: 0x2000 + 0x400 * (ctrl & PpuCtrl::NAMETABLE_ADDR).bits() as u16,
            vram_increment: if ctrl.contains(PpuCtrl::VRAM_INCREMENT) { 32 } else { 1 },
            sprite_pattern_addr: if ctrl.contains(PpuCtrl::SPRITE_PATTERN) { 0x1000 } else { 0 },
            bg_pattern_addr: if ctrl.contains(PpuCtrl::BG_PATTERN) { 0x1000 } else { 0 },
            tall_sprites: ctrl.contains(PpuCtrl::SPRITE_SIZE),
            master: ctrl.contains(PpuCtrl::MASTER_SLAVE),
            generate_nmi: ctrl.contains(PpuCtrl::NMI_ENABLE),
        }
    }
}

impl Default for Control {
    fn default() -> Self {
        Control::from(PpuCtrl::empty())
    }
}

/// The eight CPU-visible PPU registers, `$2000-$2007` mirrored through `$3FFF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    Ctrl,
    Mask,
    Status,
    OamAddr,
    OamData,
    Scroll,
    Addr,
    Data,
}

impl Port {
    pub fn from_cpu_addr(addr: u16) -> Self {
        match addr & 0x0007 {
            0 => Port::Ctrl,
            1 => Port::Mask,
            2 => Port::Status,
            3 => Port::OamAddr,
            4 => Port::OamData,
            5 => Port::Scroll,
            6 => Port::Addr,
            _ => Port::Data,
        }
    }
}

pub struct Ppu {
    ctrl: PpuCtrl,
    control: Control,
    mask: PpuMask,
    status: PpuStatus,
    oam_addr: u8,
    oam: [u8; OAM_SIZE],
    nametable_ram: [u8; NAMETABLE_SIZE],
    palette_ram: [u8; PALETTE_SIZE],
    chr: Vec<u8>,
    chr_is_ram: bool,
    mirroring: Mirroring,

    scroll_x: u8,
    scroll_y: u8,
    vram_addr: u16,
    // Write toggles: true while the next write is the first of the pair.
    next_scroll_is_x: bool,
    next_addr_is_high: bool,

    /// Last value driven onto the PPU's data bus by any port access.
    latch: u8,
}

impl Ppu {
    pub fn new(chr: Vec<u8>, chr_is_ram: bool, mirroring: Mirroring) -> Self {
        log::debug!(
            "Created PPU with {} byte CHR-{}",
            chr.len(),
            if chr_is_ram { "RAM" } else { "ROM" }
        );
        Ppu {
            ctrl: PpuCtrl::empty(),
            control: Control::default(),
            mask: PpuMask::empty(),
            status: PpuStatus::empty(),
            oam_addr: 0,
            oam: [0; OAM_SIZE],
            nametable_ram: [0; NAMETABLE_SIZE],
            palette_ram: [0; PALETTE_SIZE],
            chr,
            chr_is_ram,
            mirroring,
            scroll_x: 0,
            scroll_y: 0,
            vram_addr: 0,
            next_scroll_is_x: true,
            next_addr_is_high: true,
            latch: 0,
        }
    }

    pub fn reset(&mut self) {
        self.ctrl = PpuCtrl::empty();
        self.control = Control::default();
        self.mask = PpuMask::empty();
        self.status = PpuStatus::empty();
        self.oam_addr = 0;
        self.scroll_x = 0;
        self.scroll_y = 0;
        self.vram_addr = 0;
        self.next_scroll_is_x = true;
        self.next_addr_is_high = true;
        self.latch = 0;
    }

    pub fn read_port(&mut self, port: Port) -> Result<u8> {
        let value = match port {
            Port::Status => self.read_status(),
            Port::OamData => self.oam[self.oam_addr as usize],
            Port::Data => self.read_data()?,
            // Write-only: the open bus answers.
            Port::Ctrl | Port::Mask | Port::OamAddr | Port::Scroll | Port::Addr => {
                log::trace!("Read of write-only PPU port {:?}, returning latch", port);
                self.latch
            }
        };
        self.latch = value;
        Ok(value)
    }

    pub fn write_port(&mut self, port: Port, value: u8) -> Result<()> {
        self.latch = value;
        match port {
            Port::Ctrl => self.write_ctrl(value),
            Port::Mask => self.mask = PpuMask::from_bits_retain(value),
            Port::Status => log::debug!("Write of {:02X} to read-only PPUSTATUS ignored", value),
            Port::OamAddr => self.oam_addr = value,
            Port::OamData => self.write_oam_data(value),
            Port::Scroll => self.write_scroll(value),
            Port::Addr => self.write_addr(value),
            Port::Data => self.write_data(value)?,
        }
        Ok(())
    }

    /// What a read of `port` would return, without any of the side effects.
    pub fn peek_port(&self, port: Port) -> u8 {
        match port {
            Port::Status => self.status_with_latch(),
            Port::OamData => self.oam[self.oam_addr as usize],
            Port::Data => self.get_mmap(self.vram_addr & 0x3FFF).unwrap_or(self.latch),
            _ => self.latch,
        }
    }

    // Bits 0-4 are not driven by PPUSTATUS and read back as the latch.
    fn status_with_latch(&self) -> u8 {
        (0..=4).fold(self.status.bits(), |value, pos| {
            bits::set_bit(pos, value, bits::bit(pos, self.latch) == 1)
        })
    }

    fn read_status(&mut self) -> u8 {
        let result = self.status_with_latch();
        self.status.remove(PpuStatus::VBLANK_STARTED);
        result
    }

    fn write_ctrl(&mut self, value: u8) {
        self.ctrl = PpuCtrl::from_bits_retain(value);
        self.control = Control::from(self.ctrl);
    }

    fn write_oam_data(&mut self, value: u8) {
        self.oam[self.oam_addr as usize] = value;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }

    fn write_scroll(&mut self, value: u8) {
        if self.next_scroll_is_x {
            self.scroll_x = value;
        } else {
            self.scroll_y = value;
        }
        self.next_scroll_is_x = !self.next_scroll_is_x;
    }

    fn write_addr(&mut self, value: u8) {
        if self.next_addr_is_high {
            self.vram_addr = (self.vram_addr & 0x00FF) | ((value as u16) << 8);
        } else {
            self.vram_addr = (self.vram_addr & 0xFF00) | value as u16;
        }
        self.next_addr_is_high = !self.next_addr_is_high;
    }

    fn read_data(&mut self) -> Result<u8> {
        let value = self.get_mmap(self.vram_addr & 0x3FFF)?;
        self.increment_vram_addr();
        Ok(value)
    }

    fn write_data(&mut self, value: u8) -> Result<()> {
        self.set_mmap(self.vram_addr & 0x3FFF, value)?;
        self.increment_vram_addr();
        Ok(())
    }

    fn increment_vram_addr(&mut self) {
        self.vram_addr = self.vram_addr.wrapping_add(self.control.vram_increment) & 0x3FFF;
    }

    /// Reads the PPU's own `$0000-$3FFF` address space.
    pub fn get_mmap(&self, addr: u16) -> Result<u8> {
        match addr {
            0x0000..=0x1FFF => self
                .chr
                .get(addr as usize)
                .copied()
                .ok_or(Error::ChrOutOfRange(addr)),
            0x2000..=0x3EFF => Ok(self.nametable_ram[self.nametable_index(addr)]),
            0x3F00..=0x3FFF => Ok(self.palette_ram[palette_index(addr)]),
            _ => Err(Error::PpuAddressOutOfRange(addr)),
        }
    }

    pub fn set_mmap(&mut self, addr: u16, value: u8) -> Result<()> {
        match addr {
            0x0000..=0x1FFF => {
                if addr as usize >= self.chr.len() {
                    return Err(Error::ChrOutOfRange(addr));
                }
                if self.chr_is_ram {
                    self.chr[addr as usize] = value;
                } else {
                    log::warn!("Attempting to write to CHR-ROM at {:04X}", addr);
                }
            }
            0x2000..=0x3EFF => {
                let index = self.nametable_index(addr);
                self.nametable_ram[index] = value;
            }
            0x3F00..=0x3FFF => self.palette_ram[palette_index(addr)] = value,
            _ => return Err(Error::PpuAddressOutOfRange(addr)),
        }
        Ok(())
    }

    // $3000-$3EFF repeats $2000-$2EFF; the four logical tables fold into
    // 2 KiB according to the cartridge wiring.
    fn nametable_index(&self, addr: u16) -> usize {
        let addr = if addr >= 0x3000 { addr - 0x1000 } else { addr };
        let offset = (addr - 0x2000) as usize;
        let table = offset / 0x400;
        let physical = match self.mirroring {
            Mirroring::Vertical => table & 1,
            Mirroring::Horizontal => table >> 1,
        };
        physical * 0x400 + (offset & 0x3FF)
    }

    /// Copies a full page into OAM starting at OAMADDR.
    pub fn write_oam_dma(&mut self, data: &[u8; OAM_SIZE]) {
        for (i, byte) in data.iter().enumerate() {
            self.oam[(self.oam_addr as usize + i) & 0xFF] = *byte;
        }
    }

    /// Driven by the frame timing logic, which lives outside this crate.
    pub fn set_vblank(&mut self, on: bool) {
        self.status.set(PpuStatus::VBLANK_STARTED, on);
    }

    pub fn ctrl(&self) -> PpuCtrl {
        self.ctrl
    }

    pub fn control(&self) -> Control {
        self.control
    }

    pub fn mask(&self) -> PpuMask {
        self.mask
    }

    pub fn status(&self) -> PpuStatus {
        self.status
    }

    pub fn latch(&self) -> u8 {
        self.latch
    }

    pub fn oam_addr(&self) -> u8 {
        self.oam_addr
    }

    pub fn oam(&self) -> &[u8; OAM_SIZE] {
        &self.oam
    }

    pub fn scroll(&self) -> (u8, u8) {
        (self.scroll_x, self.scroll_y)
    }

    pub fn vram_addr(&self) -> u16 {
        self.vram_addr
    }
}

// $3F20-$3FFF repeat the 32 entries; sprite entry 0 of each palette
// aliases the matching background entry.
fn palette_index(addr: u16) -> usize {
    let index = (addr & 0x1F) as usize;
    if index >= 0x10 && index % 4 == 0 {
        index - 0x10
    } else {
        index
    }
}
