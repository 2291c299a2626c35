//! Bit and byte helpers shared by the CPU, bus and PPU.

/// Returns bit `pos` of `value` as 0 or 1.
pub fn bit(pos: u8, value: u8) -> u8 {
    (value >> pos) & 1
}

/// Returns `value` with bit `pos` forced to `on`.
pub fn set_bit(pos: u8, value: u8, on: bool) -> u8 {
    if on {
        value | (1 << pos)
    } else {
        value & !(1 << pos)
    }
}

/// Bit 7 set, i.e. negative when read as a signed byte.
pub fn is_negative(value: u8) -> bool {
    bit(7, value) == 1
}

pub fn page_crossed(a: u16, b: u16) -> bool {
    (a & 0xFF00) != (b & 0xFF00)
}

/// Applies a signed 8-bit branch offset to `pc`.
pub fn offset_address(pc: u16, offset: u8) -> u16 {
    pc.wrapping_add(offset as i8 as u16)
}

pub fn word(lo: u8, hi: u8) -> u16 {
    ((hi as u16) << 8) | lo as u16
}

/// Address of the high byte of a pointer at `addr` when the fetch may not
/// leave the page: `$xxFF` wraps to `$xx00`.
pub fn wrap_in_page(addr: u16) -> u16 {
    (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF)
}
