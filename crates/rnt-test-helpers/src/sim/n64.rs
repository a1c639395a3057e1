//! N64 controller and its accessory port.

use super::gbcart::GbCartridge;

pub const PAK_SIZE: usize = 0x8000;
pub const PAK_BLOCK: usize = 32;

const SI_GET_CAPS: u8 = 0x00;
const SI_POLL: u8 = 0x01;
const SI_PAK_READ: u8 = 0x02;
const SI_PAK_WRITE: u8 = 0x03;
const SI_RESET: u8 = 0xFF;

const XPAK_POWER: u16 = 0x8000;
const XPAK_WINDOW: u16 = 0xA000;
const XPAK_ACCESS: u16 = 0xB000;
const XPAK_CART: u16 = 0xC000;
const XPAK_POWER_ON: u8 = 0x84;
const XPAK_POWER_OFF: u8 = 0xFE;

/// What is plugged into the controller.
#[derive(Debug, Clone, Default)]
pub enum Accessory {
    #[default]
    None,
    ControllerPak(Vec<u8>),
    TransferPak(TransferPak),
}

impl Accessory {
    /// A blank 32 KiB Controller Pak.
    pub fn controller_pak() -> Self {
        Self::ControllerPak(vec![0; PAK_SIZE])
    }

    pub fn transfer_pak(cart: Option<GbCartridge>) -> Self {
        Self::TransferPak(TransferPak::new(cart))
    }
}

/// Transfer Pak relaying accessory-port blocks to a Game Boy cartridge.
#[derive(Debug, Clone, Default)]
pub struct TransferPak {
    pub powered: bool,
    pub access_enabled: bool,
    pub window: u8,
    pub cart: Option<GbCartridge>,
}

impl TransferPak {
    pub fn new(cart: Option<GbCartridge>) -> Self {
        Self {
            cart,
            ..Self::default()
        }
    }

    fn cart_addr(&self, pak_addr: u16, i: usize) -> u16 {
        let offset = usize::from(pak_addr - XPAK_CART) + i;
        (usize::from(self.window) * 0x4000 + offset) as u16
    }

    fn cart_active(&self) -> bool {
        self.powered && self.access_enabled
    }
}

/// Cartridge-side traffic seen through the Transfer Pak.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartTraffic {
    /// `(gb_address, first_byte)` of each 32-byte cartridge write
    pub writes: Vec<(u16, u8)>,
    /// Address of each 32-byte cartridge read
    pub reads: Vec<u16>,
    /// Values written to the window selector
    pub window_selects: Vec<u8>,
}

/// Address checksum of the accessory protocol.
pub fn address_crc(addr: u16) -> u16 {
    const XOR_TABLE: [u16; 16] = [
        0x00, 0x00, 0x00, 0x00, 0x00, 0x15, 0x1F, 0x0B, 0x16, 0x19, 0x07, 0x0E, 0x1C, 0x0D, 0x1A,
        0x01,
    ];
    let addr = addr & !0x1F;
    let mut crc = 0;
    for (bit, entry) in XOR_TABLE.iter().enumerate() {
        if addr & (1 << bit) != 0 {
            crc ^= entry;
        }
    }
    addr | (crc & 0x1F)
}

/// Data checksum of the accessory protocol.
pub fn data_crc(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for i in 0..=data.len() {
        for bit in (0..8).rev() {
            let xor_tap = if crc & 0x80 != 0 { 0x85 } else { 0x00 };
            crc <<= 1;
            if let Some(byte) = data.get(i)
                && byte & (1 << bit) != 0
            {
                crc |= 1;
            }
            crc ^= xor_tap;
        }
    }
    crc
}

/// One controller on an SI channel.
#[derive(Debug, Clone, Default)]
pub struct N64Controller {
    pub accessory: Accessory,
    pub corrupt_data_crc: bool,
    pub traffic: CartTraffic,
}

impl N64Controller {
    /// Answer an SI command, `None` when the controller stays silent.
    pub fn command(&mut self, tx: &[u8]) -> Option<Vec<u8>> {
        match tx {
            [SI_GET_CAPS] | [SI_RESET] => {
                let status = if matches!(self.accessory, Accessory::None) {
                    0x02
                } else {
                    0x01
                };
                Some(vec![0x05, 0x00, status])
            }
            [SI_POLL] => Some(vec![0x00, 0x00, 0x00, 0x00]),
            [SI_PAK_READ, hi, lo] => {
                let addr = u16::from_be_bytes([*hi, *lo]);
                if address_crc(addr) != addr {
                    return None;
                }
                let addr = addr & !0x1F;
                let mut reply = self.read_block(addr);
                let mut crc = data_crc(&reply);
                if self.corrupt_data_crc || matches!(self.accessory, Accessory::None) {
                    crc ^= 0xFF;
                }
                reply.push(crc);
                Some(reply)
            }
            [SI_PAK_WRITE, hi, lo, data @ ..] if data.len() == PAK_BLOCK => {
                let addr = u16::from_be_bytes([*hi, *lo]);
                if address_crc(addr) != addr {
                    return None;
                }
                self.write_block(addr & !0x1F, data);
                let mut crc = data_crc(data);
                if self.corrupt_data_crc || matches!(self.accessory, Accessory::None) {
                    crc ^= 0xFF;
                }
                Some(vec![crc])
            }
            _ => None,
        }
    }

    fn read_block(&mut self, addr: u16) -> Vec<u8> {
        let start = usize::from(addr);
        match &mut self.accessory {
            Accessory::None => vec![0; PAK_BLOCK],
            Accessory::ControllerPak(mem) => {
                let start = start % PAK_SIZE;
                mem[start..start + PAK_BLOCK].to_vec()
            }
            Accessory::TransferPak(xpak) => match addr {
                XPAK_POWER..=0x8FFF => {
                    let v = if xpak.powered { XPAK_POWER_ON } else { 0x00 };
                    vec![v; PAK_BLOCK]
                }
                XPAK_WINDOW..=0xAFFF => vec![xpak.window; PAK_BLOCK],
                XPAK_ACCESS..=0xBFFF => {
                    let v = match (xpak.access_enabled, xpak.cart.is_some()) {
                        (true, true) => 0x89,
                        (true, false) => 0x80,
                        (false, _) => 0x00,
                    };
                    vec![v; PAK_BLOCK]
                }
                XPAK_CART..=0xFFFF if xpak.cart_active() => {
                    let gb = xpak.cart_addr(addr, 0);
                    self.traffic.reads.push(gb);
                    match &xpak.cart {
                        Some(cart) => (0..PAK_BLOCK)
                            .map(|i| cart.read(xpak.cart_addr(addr, i)))
                            .collect(),
                        None => vec![0xFF; PAK_BLOCK],
                    }
                }
                _ => vec![0x00; PAK_BLOCK],
            },
        }
    }

    fn write_block(&mut self, addr: u16, data: &[u8]) {
        let start = usize::from(addr);
        let first = data.first().copied().unwrap_or(0);
        match &mut self.accessory {
            Accessory::None => {}
            Accessory::ControllerPak(mem) => {
                let start = start % PAK_SIZE;
                mem[start..start + PAK_BLOCK].copy_from_slice(data);
            }
            Accessory::TransferPak(xpak) => match addr {
                XPAK_POWER..=0x8FFF => match first {
                    XPAK_POWER_ON => xpak.powered = true,
                    XPAK_POWER_OFF => {
                        xpak.powered = false;
                        xpak.access_enabled = false;
                    }
                    _ => {}
                },
                XPAK_WINDOW..=0xAFFF if xpak.powered => {
                    xpak.window = first;
                    self.traffic.window_selects.push(first);
                }
                XPAK_ACCESS..=0xBFFF if xpak.powered => xpak.access_enabled = first & 0x01 != 0,
                XPAK_CART..=0xFFFF if xpak.cart_active() => {
                    let gb = xpak.cart_addr(addr, 0);
                    self.traffic.writes.push((gb, first));
                    let addrs: Vec<u16> = (0..PAK_BLOCK).map(|i| xpak.cart_addr(addr, i)).collect();
                    if let Some(cart) = xpak.cart.as_mut() {
                        for (gb_addr, &value) in addrs.into_iter().zip(data) {
                            cart.write(gb_addr, value);
                        }
                    }
                }
                _ => {}
            },
        }
    }
}
