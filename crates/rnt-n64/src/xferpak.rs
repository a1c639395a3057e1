//! Transfer Pak session: Game Boy cartridge bus over accessory blocks.
//!
//! The pak maps a 16 KiB window of the cartridge address space at
//! 0xC000-0xFFFF of the accessory address space. The window number is set
//! at 0xA000, cartridge access is switched at 0xB000 and the pak is powered
//! through 0x8000. Every register write repeats its value over a full
//! 32-byte block.

use rnt_adapter::DeviceHandle;
use rnt_errors::{RntError, RntResult};
use tracing::{debug, info, warn};

use crate::crc::PAK_BLOCK_SIZE;
use crate::gbcart::{CartridgeInfo, HEADER_READ_LEN};
use crate::mempak::{read_accessory_block, write_accessory_block};

const POWER_REG: u16 = 0x8000;
const WINDOW_REG: u16 = 0xA000;
const ACCESS_REG: u16 = 0xB000;
const CART_WINDOW: u16 = 0xC000;

const POWER_OFF: u8 = 0xFE;
const POWER_ON: u8 = 0x84;
const ACCESS_ON: u8 = 0x01;
const ACCESS_OFF: u8 = 0x00;

/// Size of the cartridge window seen through the pak.
pub const WINDOW_SIZE: usize = 0x4000;
/// Size of the Game Boy address space.
pub const CART_ADDRESS_SPACE: usize = 0x10000;

/// Open Transfer Pak with cartridge access enabled.
///
/// Dropping the session disables cartridge access; [`CartridgeSession::close`]
/// does the same and reports whether it worked.
#[derive(Debug)]
pub struct CartridgeSession<'a> {
    handle: &'a mut DeviceHandle,
    channel: u8,
    /// Last window written to the selector, `None` until the first select.
    cur_bank: Option<u8>,
    enabled: bool,
}

impl<'a> CartridgeSession<'a> {
    /// Detect the pak on `channel`, test it and enable cartridge access.
    pub fn open(handle: &'a mut DeviceHandle, channel: u8) -> RntResult<Self> {
        match handle.n64_get_caps(channel) {
            Ok(caps) if caps.accessory_present() => {}
            Ok(_) => {
                debug!("channel {channel}: no accessory");
                return Err(RntError::NoDeviceDetected);
            }
            Err(RntError::Protocol(e)) => {
                debug!("channel {channel}: no usable caps reply: {e}");
                return Err(RntError::NoDeviceDetected);
            }
            Err(e) => return Err(e),
        }

        let mut session = Self {
            handle,
            channel,
            cur_bank: None,
            enabled: false,
        };
        session.test_presence()?;
        session.set_access(true)?;
        info!("transfer pak enabled on channel {channel}");
        Ok(session)
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Window currently selected on the pak, if known.
    pub fn current_window(&self) -> Option<u8> {
        self.cur_bank
    }

    /// Disable cartridge access and end the session.
    pub fn close(mut self) -> RntResult<()> {
        self.enabled = false;
        self.fill_register(ACCESS_REG, ACCESS_OFF)
    }

    fn fill_register(&mut self, reg: u16, value: u8) -> RntResult<()> {
        write_accessory_block(self.handle, self.channel, reg, &[value; PAK_BLOCK_SIZE])
    }

    fn read_register(&mut self, reg: u16) -> RntResult<u8> {
        let block = read_accessory_block(self.handle, self.channel, reg)?;
        Ok(block[0])
    }

    /// Power the pak off, check it reads back 0, power it on and check it
    /// reads back the power-on value twice.
    fn test_presence(&mut self) -> RntResult<()> {
        self.fill_register(POWER_REG, POWER_OFF)?;
        let off = self.read_register(POWER_REG)?;
        if off != 0x00 {
            debug!("power register reads {off:#04x} while off");
            return Err(RntError::NoDeviceDetected);
        }

        self.fill_register(POWER_REG, POWER_ON)?;
        for _ in 0..2 {
            let on = self.read_register(POWER_REG)?;
            if on != POWER_ON {
                debug!("power register reads {on:#04x} while on");
                return Err(RntError::NoDeviceDetected);
            }
        }
        Ok(())
    }

    fn set_access(&mut self, enable: bool) -> RntResult<()> {
        let value = if enable { ACCESS_ON } else { ACCESS_OFF };
        self.fill_register(ACCESS_REG, value)?;
        self.enabled = enable;
        Ok(())
    }

    fn select_window(&mut self, window: u8) -> RntResult<()> {
        if self.cur_bank == Some(window) {
            return Ok(());
        }
        self.fill_register(WINDOW_REG, window)?;
        self.cur_bank = Some(window);
        Ok(())
    }

    /// Map a cartridge address to its window number and pak address.
    fn locate(&self, gb_addr: usize) -> RntResult<(u8, u16)> {
        let window = u8::try_from(gb_addr / WINDOW_SIZE)
            .map_err(|e| RntError::bad_param(format!("cartridge address {gb_addr:#x}: {e}")))?;
        let offset = u16::try_from(gb_addr % WINDOW_SIZE)
            .map_err(|e| RntError::bad_param(format!("cartridge address {gb_addr:#x}: {e}")))?;
        Ok((window, CART_WINDOW | offset))
    }

    fn check_range(start: u16, len: usize) -> RntResult<()> {
        if len % PAK_BLOCK_SIZE != 0 || usize::from(start) % PAK_BLOCK_SIZE != 0 {
            return Err(RntError::bad_param(format!(
                "cartridge access {start:#06x}+{len:#x} is not in whole 32-byte blocks"
            )));
        }
        if usize::from(start) + len > CART_ADDRESS_SPACE {
            return Err(RntError::bad_param(format!(
                "cartridge access {start:#06x}+{len:#x} runs past 0xFFFF"
            )));
        }
        Ok(())
    }

    /// Read `dst.len()` bytes of cartridge space starting at `start`.
    pub fn read_cart(&mut self, start: u16, dst: &mut [u8]) -> RntResult<()> {
        Self::check_range(start, dst.len())?;
        for (i, chunk) in dst.chunks_exact_mut(PAK_BLOCK_SIZE).enumerate() {
            let (window, pak_addr) = self.locate(usize::from(start) + i * PAK_BLOCK_SIZE)?;
            self.select_window(window)?;
            let block = read_accessory_block(self.handle, self.channel, pak_addr)?;
            chunk.copy_from_slice(&block);
        }
        Ok(())
    }

    /// Write `data` to cartridge space starting at `start`.
    pub fn write_cart(&mut self, start: u16, data: &[u8]) -> RntResult<()> {
        Self::check_range(start, data.len())?;
        for (i, chunk) in data.chunks_exact(PAK_BLOCK_SIZE).enumerate() {
            let (window, pak_addr) = self.locate(usize::from(start) + i * PAK_BLOCK_SIZE)?;
            self.select_window(window)?;
            let block: [u8; PAK_BLOCK_SIZE] = chunk
                .try_into()
                .map_err(|e| RntError::bad_param(format!("cartridge write chunk: {e}")))?;
            write_accessory_block(self.handle, self.channel, pak_addr, &block)?;
        }
        Ok(())
    }

    /// Write one value over a 32-byte block of cartridge space, as MBC
    /// register writes do.
    pub fn write_cart_register(&mut self, addr: u16, value: u8) -> RntResult<()> {
        self.write_cart(addr, &[value; PAK_BLOCK_SIZE])
    }

    /// Read and validate the cartridge header.
    pub fn read_info(&mut self) -> RntResult<CartridgeInfo> {
        let mut header = [0u8; HEADER_READ_LEN];
        self.read_cart(0, &mut header)?;
        let info = CartridgeInfo::parse(&header)?;
        info!(
            "cartridge '{}' ({}), ROM {} KiB, RAM {} KiB",
            info.title,
            info.type_name(),
            info.rom_size / 1024,
            info.ram_size / 1024
        );
        Ok(info)
    }
}

impl Drop for CartridgeSession<'_> {
    fn drop(&mut self) {
        if self.enabled
            && let Err(e) = self.set_access(false)
        {
            warn!("could not disable transfer pak on channel {}: {e}", self.channel);
        }
    }
}
