//! Game Boy cartridge header: layout, checksum and the type/size tables.

use std::fmt;

use bitflags::bitflags;
use rnt_errors::{ChecksumKind, RntError, RntResult};
use tracing::debug;

/// Bytes read from the start of the cartridge to get the header.
pub const HEADER_READ_LEN: usize = 0x200;

const TITLE_OFFSET: usize = 0x134;
const TITLE_LEN: usize = 16;
const TYPE_OFFSET: usize = 0x147;
const ROM_SIZE_OFFSET: usize = 0x148;
const RAM_SIZE_OFFSET: usize = 0x149;
const DESTINATION_OFFSET: usize = 0x14A;
const CHECKSUM_OFFSET: usize = 0x14D;

/// RAM of an MBC2 cartridge: 512 four-bit cells.
pub const MBC2_RAM_SIZE: usize = 0x200;

pub const CART_TYPE_POCKET_CAMERA: u8 = 0xFC;
pub const CART_TYPE_BANDAI_TAMA5: u8 = 0xFD;

bitflags! {
    /// Controller and extras of a cartridge type byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CartFlags: u32 {
        const MBC1 = 0x0001;
        const MBC2 = 0x0002;
        const MMM01 = 0x0004;
        const MBC3 = 0x0008;
        const MBC4 = 0x0010;
        const MBC5 = 0x0020;
        const HUC1 = 0x0040;
        const HUC3 = 0x0080;
        const JAPANESE = 0x0100;
        const RUMBLE = 0x1000;
        const TIMER = 0x2000;
        const BATTERY = 0x4000;
        const RAM = 0x8000;

        /// Bits naming the bank controller
        const MBC_MASK = 0x00FF;
    }
}

/// Flags for a header type byte; unknown types have none.
pub fn cart_type_flags(cart_type: u8) -> CartFlags {
    type F = CartFlags;
    match cart_type {
        0x01 => F::MBC1,
        0x02 => F::MBC1 | F::RAM,
        0x03 => F::MBC1 | F::RAM | F::BATTERY,
        0x05 => F::MBC2,
        0x06 => F::MBC2 | F::BATTERY,
        0x08 => F::RAM,
        0x09 => F::RAM | F::BATTERY,
        0x0B => F::MMM01,
        0x0C => F::MMM01 | F::RAM,
        0x0D => F::MMM01 | F::RAM | F::BATTERY,
        0x0F => F::MBC3 | F::TIMER | F::BATTERY,
        0x10 => F::MBC3 | F::TIMER | F::RAM | F::BATTERY,
        0x11 => F::MBC3,
        0x12 => F::MBC3 | F::RAM,
        0x13 => F::MBC3 | F::RAM | F::BATTERY,
        0x15 => F::MBC4,
        0x16 => F::MBC4 | F::RAM,
        0x17 => F::MBC4 | F::RAM | F::BATTERY,
        0x19 => F::MBC5,
        0x1A => F::MBC5 | F::RAM,
        0x1B => F::MBC5 | F::RAM | F::BATTERY,
        0x1C => F::MBC5 | F::RUMBLE,
        0x1D => F::MBC5 | F::RUMBLE | F::RAM,
        0x1E => F::MBC5 | F::RUMBLE | F::RAM | F::BATTERY,
        0xFE => F::HUC3,
        0xFF => F::HUC1 | F::RAM | F::BATTERY,
        _ => F::empty(),
    }
}

/// ROM size for a header size code, `None` for unknown codes.
pub fn rom_size_from_code(code: u8) -> Option<usize> {
    const BANK: usize = 0x4000;
    match code {
        0x00..=0x07 => Some(0x8000 << code),
        0x52 => Some(72 * BANK),
        0x53 => Some(80 * BANK),
        0x54 => Some(96 * BANK),
        _ => None,
    }
}

/// Largest RAM a header size code can declare.
pub const MAX_CART_RAM_SIZE: usize = 0x20000;

/// RAM size for a header size code; unknown codes count as no RAM.
pub fn ram_size_from_code(code: u8) -> usize {
    match code {
        0x01 => 0x800,
        0x02 => 0x2000,
        0x03 => 0x8000,
        0x04 => MAX_CART_RAM_SIZE,
        0x05 => 0x10000,
        _ => 0,
    }
}

/// Display name such as `MBC5+RUMBLE+RAM+BATTERY`.
pub fn cart_type_name(cart_type: u8) -> String {
    match cart_type {
        CART_TYPE_POCKET_CAMERA => return "POCKET CAMERA".to_string(),
        CART_TYPE_BANDAI_TAMA5 => return "BANDAI TAMA5".to_string(),
        _ => {}
    }
    let flags = cart_type_flags(cart_type);
    let controller = match flags & CartFlags::MBC_MASK {
        f if f == CartFlags::MBC1 => "MBC1",
        f if f == CartFlags::MBC2 => "MBC2",
        f if f == CartFlags::MMM01 => "MMM01",
        f if f == CartFlags::MBC3 => "MBC3",
        f if f == CartFlags::MBC4 => "MBC4",
        f if f == CartFlags::MBC5 => "MBC5",
        f if f == CartFlags::HUC1 => "HUC1",
        f if f == CartFlags::HUC3 => "HUC3",
        _ => "ROM",
    };
    let mut name = controller.to_string();
    for (flag, suffix) in [
        (CartFlags::RUMBLE, "+RUMBLE"),
        (CartFlags::TIMER, "+TIMER"),
        (CartFlags::RAM, "+RAM"),
        (CartFlags::BATTERY, "+BATTERY"),
    ] {
        if flags.contains(flag) {
            name.push_str(suffix);
        }
    }
    name
}

/// Bank controller families the translator knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mbc {
    /// No controller, a single 32 KiB ROM
    None,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc5,
    /// Any other controller (MMM01, MBC4, HuC1, HuC3...)
    Other,
}

/// Header fields of a cartridge, validated by checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeInfo {
    pub title: String,
    /// Raw type byte at 0x147
    pub cart_type: u8,
    pub flags: CartFlags,
    pub rom_size: usize,
    pub ram_size: usize,
}

impl CartridgeInfo {
    /// Parse a header read from cartridge address 0.
    ///
    /// Fails with [`ChecksumKind::CartridgeHeader`] when the checksum byte
    /// does not match.
    pub fn parse(header: &[u8]) -> RntResult<Self> {
        let checked = header.get(TITLE_OFFSET..CHECKSUM_OFFSET).ok_or_else(|| {
            RntError::bad_param(format!("cartridge header of {} bytes is too short", header.len()))
        })?;
        let expected = header_checksum(checked);
        let stored = byte_at(header, CHECKSUM_OFFSET)?;
        if expected != stored {
            debug!("header checksum {expected:#04x}, cartridge says {stored:#04x}");
            return Err(RntError::BadChecksum(ChecksumKind::CartridgeHeader));
        }

        let cart_type = byte_at(header, TYPE_OFFSET)?;
        let mut flags = cart_type_flags(cart_type);
        if byte_at(header, DESTINATION_OFFSET)? == 0 {
            flags |= CartFlags::JAPANESE;
        }

        let rom_code = byte_at(header, ROM_SIZE_OFFSET)?;
        let rom_size = rom_size_from_code(rom_code)
            .ok_or_else(|| RntError::unsupported(format!("ROM size code {rom_code:#04x}")))?;

        let ram_size = if flags.contains(CartFlags::MBC2)
            && flags.intersects(CartFlags::RAM | CartFlags::BATTERY)
        {
            MBC2_RAM_SIZE
        } else {
            ram_size_from_code(byte_at(header, RAM_SIZE_OFFSET)?)
        };

        let title_bytes = header
            .get(TITLE_OFFSET..TITLE_OFFSET + TITLE_LEN)
            .unwrap_or_default();
        let title_end = title_bytes.iter().position(|&b| b == 0).unwrap_or(title_bytes.len());
        let title = title_bytes
            .get(..title_end)
            .unwrap_or_default()
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { char::from(b) } else { '.' })
            .collect();

        Ok(Self {
            title,
            cart_type,
            flags,
            rom_size,
            ram_size,
        })
    }

    pub fn mbc(&self) -> Mbc {
        match self.flags & CartFlags::MBC_MASK {
            f if f.is_empty() => Mbc::None,
            f if f == CartFlags::MBC1 => Mbc::Mbc1,
            f if f == CartFlags::MBC2 => Mbc::Mbc2,
            f if f == CartFlags::MBC3 => Mbc::Mbc3,
            f if f == CartFlags::MBC5 => Mbc::Mbc5,
            _ => Mbc::Other,
        }
    }

    pub fn is_japanese(&self) -> bool {
        self.flags.contains(CartFlags::JAPANESE)
    }

    pub fn type_name(&self) -> String {
        cart_type_name(self.cart_type)
    }
}

impl fmt::Display for CartridgeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Title: {}", self.title)?;
        writeln!(f, "Cartridge type: {}", self.type_name())?;
        writeln!(f, "ROM size: {} bytes ({} kB)", self.rom_size, self.rom_size / 1024)?;
        writeln!(f, "RAM size: {} bytes ({} kB)", self.ram_size, self.ram_size / 1024)?;
        write!(
            f,
            "{}",
            if self.is_japanese() { "Japanese" } else { "Non-japanese" }
        )
    }
}

/// Header checksum over 0x134..=0x14C.
pub fn header_checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |chk, &b| chk.wrapping_sub(b).wrapping_sub(1))
}

fn byte_at(header: &[u8], offset: usize) -> RntResult<u8> {
    header
        .get(offset)
        .copied()
        .ok_or_else(|| RntError::bad_param(format!("cartridge header has no byte {offset:#x}")))
}
