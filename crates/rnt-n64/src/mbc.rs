//! Memory bank controller sequences and whole ROM/RAM transfers.
//!
//! Bank registers are written through [`CartridgeSession::write_cart_register`].
//! Transfer loops remember the last bank they selected and only select
//! again when the next 16 KiB ROM bank or 8 KiB RAM bank differs.

use std::ops::Range;

use rnt_adapter::{ContinueOrCancel, ProgressSink};
use rnt_errors::{RntError, RntResult};
use tracing::{debug, info, warn};

use crate::gbcart::{CART_TYPE_POCKET_CAMERA, CartFlags, CartridgeInfo, Mbc};
use crate::xferpak::CartridgeSession;

pub const ROM_BANK_SIZE: usize = 0x4000;
pub const RAM_BANK_SIZE: usize = 0x2000;
const ROM_ONLY_SIZE: usize = 0x8000;

const ROM_BANK0_ADDR: u16 = 0x0000;
const ROM_BANKN_ADDR: u16 = 0x4000;
const RAM_ADDR: u16 = 0xA000;

const RAM_ENABLE_REG: u16 = 0x0000;
const ROM_BANK_REG: u16 = 0x2000;
const MBC2_ROM_BANK_REG: u16 = 0x2100;
const MBC5_ROM_BANK_HIGH_REG: u16 = 0x3000;
/// RAM bank number, or bits 5-6 of the ROM bank on MBC1
const BANK_HIGH_REG: u16 = 0x4000;
const MBC1_MODE_REG: u16 = 0x6000;

const RAM_ENABLE: u8 = 0x0A;
const RAM_DISABLE: u8 = 0x00;
const MBC1_MODE_SIMPLE: u8 = 0x00;
/// RAM banking, and the upper ROM bank bits applied to 0x0000-0x3FFF
const MBC1_MODE_ADVANCED: u8 = 0x01;
/// MBC1 banks that are multiples of this never appear at 0x4000.
const MBC1_LOW_BANKS: usize = 0x20;

/// Progress is polled every this many cartridge bytes.
const PROGRESS_STEP: u16 = 0x200;

/// Counts cartridge bytes moved and polls the sink at each step.
struct ByteProgress<'p> {
    sink: &'p mut dyn ProgressSink,
    done: usize,
}

impl<'p> ByteProgress<'p> {
    fn new(sink: &'p mut dyn ProgressSink) -> Self {
        Self { sink, done: 0 }
    }

    fn poll(&mut self) -> RntResult<()> {
        match self.sink.advance(self.done) {
            ContinueOrCancel::Continue => Ok(()),
            ContinueOrCancel::Cancel => {
                info!("cartridge transfer cancelled after {} bytes", self.done);
                Err(RntError::UserCancelled)
            }
        }
    }
}

/// How a cartridge exposes its RAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RamLayout {
    /// MBC2: 512 four-bit cells at 0xA000
    Linear,
    /// 8 KiB banks selected at 0x4000
    Banked { mbc1: bool },
}

fn ram_layout(info: &CartridgeInfo) -> RntResult<RamLayout> {
    if info.ram_size == 0 {
        return Err(RntError::NoCartridgeRam);
    }
    let layout = match info.mbc() {
        Mbc::Mbc2 => RamLayout::Linear,
        Mbc::Mbc1 => RamLayout::Banked { mbc1: true },
        Mbc::Mbc3 | Mbc::Mbc5 => RamLayout::Banked { mbc1: false },
        _ if info.cart_type == CART_TYPE_POCKET_CAMERA => {
            RamLayout::Banked { mbc1: false }
        }
        _ => {
            return Err(RntError::unsupported(format!(
                "RAM of {} cartridges",
                info.type_name()
            )));
        }
    };
    if layout != RamLayout::Linear && info.ram_size % RAM_BANK_SIZE != 0 {
        return Err(RntError::bad_param(format!(
            "RAM size {:#x} is not a multiple of 8 KiB",
            info.ram_size
        )));
    }
    Ok(layout)
}

fn alloc_buffer(size: usize) -> RntResult<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(size).map_err(|e| {
        debug!("allocating {size} bytes: {e}");
        RntError::OutOfMemory { requested: size }
    })?;
    buf.resize(size, 0);
    Ok(buf)
}

/// Compare RAM read back after a write. MBC2 cells are four bits wide, so
/// only the low nibble counts there.
pub fn verify_ram_contents(mbc: Mbc, expected: &[u8], actual: &[u8]) -> RntResult<()> {
    let mask = if mbc == Mbc::Mbc2 { 0x0F } else { 0xFF };
    if let Some(offset) = expected
        .iter()
        .zip(actual)
        .position(|(&want, &got)| want & mask != got & mask)
    {
        return Err(RntError::VerifyMismatch { offset });
    }
    if expected.len() != actual.len() {
        return Err(RntError::VerifyMismatch {
            offset: expected.len().min(actual.len()),
        });
    }
    Ok(())
}

impl CartridgeSession<'_> {
    fn read_chunked(&mut self, start: u16, dst: &mut [u8], progress: &mut ByteProgress<'_>) -> RntResult<()> {
        let mut addr = start;
        for chunk in dst.chunks_mut(usize::from(PROGRESS_STEP)) {
            progress.poll()?;
            self.read_cart(addr, chunk)?;
            progress.done += chunk.len();
            addr = addr.wrapping_add(PROGRESS_STEP);
        }
        Ok(())
    }

    fn write_chunked(&mut self, start: u16, data: &[u8], progress: &mut ByteProgress<'_>) -> RntResult<()> {
        let mut addr = start;
        for chunk in data.chunks(usize::from(PROGRESS_STEP)) {
            progress.poll()?;
            self.write_cart(addr, chunk)?;
            progress.done += chunk.len();
            addr = addr.wrapping_add(PROGRESS_STEP);
        }
        Ok(())
    }

    /// Issue the bank-select sequence mapping ROM `bank` at 0x4000.
    pub fn select_rom_bank(&mut self, mbc: Mbc, bank: usize) -> RntResult<()> {
        let bank16 = u16::try_from(bank)
            .map_err(|e| RntError::bad_param(format!("ROM bank {bank}: {e}")))?;
        let [lo, hi] = bank16.to_le_bytes();
        debug!("selecting {mbc:?} ROM bank {bank}");
        match mbc {
            Mbc::Mbc5 => {
                self.write_cart_register(ROM_BANK_REG, lo)?;
                self.write_cart_register(MBC5_ROM_BANK_HIGH_REG, hi)
            }
            Mbc::Mbc3 => self.write_cart_register(ROM_BANK_REG, lo),
            Mbc::Mbc2 => {
                self.write_cart_register(MBC1_MODE_REG, MBC1_MODE_SIMPLE)?;
                self.write_cart_register(MBC2_ROM_BANK_REG, lo & 0x0F)
            }
            Mbc::Mbc1 if bank % MBC1_LOW_BANKS == 0 => Err(RntError::unsupported(format!(
                "MBC1 ROM bank {bank:#04x} is only mapped at 0x0000"
            ))),
            Mbc::Mbc1 => {
                self.write_cart_register(MBC1_MODE_REG, MBC1_MODE_SIMPLE)?;
                self.write_cart_register(ROM_BANK_REG, lo & 0x1F)?;
                self.write_cart_register(BANK_HIGH_REG, lo >> 5)
            }
            // A plain 32 KiB ROM has bank 1 wired at 0x4000.
            Mbc::None if bank == 1 => Ok(()),
            Mbc::None | Mbc::Other => Err(RntError::unsupported(format!(
                "ROM bank {bank} on a {mbc:?} cartridge"
            ))),
        }
    }

    /// Read MBC1 bank 0x20, 0x40 or 0x60 through the 0x0000 window, then
    /// return to simple banking mode.
    fn read_mbc1_low_window(
        &mut self,
        bank: usize,
        dst: &mut [u8],
        progress: &mut ByteProgress<'_>,
    ) -> RntResult<()> {
        let high = u8::try_from(bank / MBC1_LOW_BANKS)
            .map_err(|e| RntError::bad_param(format!("ROM bank {bank}: {e}")))?;
        debug!("reading MBC1 ROM bank {bank:#04x} at 0x0000");
        self.write_cart_register(MBC1_MODE_REG, MBC1_MODE_ADVANCED)?;
        let result = self
            .write_cart_register(BANK_HIGH_REG, high)
            .and_then(|()| self.read_chunked(ROM_BANK0_ADDR, dst, progress));
        let restore = self.write_cart_register(MBC1_MODE_REG, MBC1_MODE_SIMPLE);
        result.and(restore)
    }

    fn select_ram_bank(&mut self, bank: usize) -> RntResult<()> {
        let bank = u8::try_from(bank)
            .map_err(|e| RntError::bad_param(format!("RAM bank {bank}: {e}")))?;
        self.write_cart_register(BANK_HIGH_REG, bank)
    }

    /// Read the 16 KiB ROM banks in `banks`, in order.
    ///
    /// Bank 0 is read at its fixed address, except on MBC5 which can map
    /// every bank at 0x4000. MBC1 banks 0x20, 0x40 and 0x60 are read at
    /// 0x0000 in advanced banking mode.
    pub fn read_rom_banks(
        &mut self,
        info: &CartridgeInfo,
        banks: Range<usize>,
        progress: &mut dyn ProgressSink,
    ) -> RntResult<Vec<u8>> {
        let mbc = info.mbc();
        let mut out = alloc_buffer(banks.len() * ROM_BANK_SIZE)?;
        let mut progress = ByteProgress::new(progress);
        let mut cur_bank = None;

        for (bank, dst) in banks.zip(out.chunks_exact_mut(ROM_BANK_SIZE)) {
            if bank == 0 && mbc != Mbc::Mbc5 {
                self.read_chunked(ROM_BANK0_ADDR, dst, &mut progress)?;
                continue;
            }
            if mbc == Mbc::Mbc1 && bank % MBC1_LOW_BANKS == 0 {
                self.read_mbc1_low_window(bank, dst, &mut progress)?;
                cur_bank = None;
                continue;
            }
            if cur_bank != Some(bank) {
                self.select_rom_bank(mbc, bank)?;
                cur_bank = Some(bank);
            }
            self.read_chunked(ROM_BANKN_ADDR, dst, &mut progress)?;
        }
        Ok(out)
    }

    /// Read the whole ROM declared by the header.
    pub fn read_rom(&mut self, progress: &mut dyn ProgressSink) -> RntResult<(CartridgeInfo, Vec<u8>)> {
        let info = self.read_info()?;
        match info.mbc() {
            Mbc::None if info.rom_size != ROM_ONLY_SIZE => {
                return Err(RntError::unsupported(format!(
                    "{} byte ROM without a bank controller",
                    info.rom_size
                )));
            }
            Mbc::Other => {
                return Err(RntError::unsupported(format!("{} cartridges", info.type_name())));
            }
            _ => {}
        }
        let banks = info.rom_size / ROM_BANK_SIZE;
        info!("reading {} ROM banks", banks);
        let rom = self.read_rom_banks(&info, 0..banks, progress)?;
        Ok((info, rom))
    }

    /// Enable RAM, run `f`, disable RAM again whatever `f` returned.
    fn with_ram<T>(
        &mut self,
        layout: RamLayout,
        f: impl FnOnce(&mut Self) -> RntResult<T>,
    ) -> RntResult<T> {
        self.write_cart_register(RAM_ENABLE_REG, RAM_ENABLE)?;
        let result = if layout == (RamLayout::Banked { mbc1: true }) {
            let result = self
                .write_cart_register(MBC1_MODE_REG, MBC1_MODE_ADVANCED)
                .and_then(|()| f(self));
            let restore = self.write_cart_register(MBC1_MODE_REG, MBC1_MODE_SIMPLE);
            result.and_then(|v| restore.map(|()| v))
        } else {
            f(self)
        };
        let disable = self.write_cart_register(RAM_ENABLE_REG, RAM_DISABLE);
        result.and_then(|v| disable.map(|()| v))
    }

    fn read_ram_contents(
        &mut self,
        layout: RamLayout,
        dst: &mut [u8],
        progress: &mut ByteProgress<'_>,
    ) -> RntResult<()> {
        if layout == RamLayout::Linear {
            return self.read_chunked(RAM_ADDR, dst, progress);
        }
        let mut cur_bank = None;
        for (bank, chunk) in dst.chunks_exact_mut(RAM_BANK_SIZE).enumerate() {
            if cur_bank != Some(bank) {
                self.select_ram_bank(bank)?;
                cur_bank = Some(bank);
            }
            self.read_chunked(RAM_ADDR, chunk, progress)?;
        }
        Ok(())
    }

    fn write_ram_contents(
        &mut self,
        layout: RamLayout,
        data: &[u8],
        progress: &mut ByteProgress<'_>,
    ) -> RntResult<()> {
        if layout == RamLayout::Linear {
            return self.write_chunked(RAM_ADDR, data, progress);
        }
        let mut cur_bank = None;
        for (bank, chunk) in data.chunks_exact(RAM_BANK_SIZE).enumerate() {
            if cur_bank != Some(bank) {
                self.select_ram_bank(bank)?;
                cur_bank = Some(bank);
            }
            self.write_chunked(RAM_ADDR, chunk, progress)?;
        }
        Ok(())
    }

    /// Read the cartridge RAM.
    pub fn read_ram(&mut self, progress: &mut dyn ProgressSink) -> RntResult<(CartridgeInfo, Vec<u8>)> {
        let info = self.read_info()?;
        let layout = ram_layout(&info)?;
        let mut ram = alloc_buffer(info.ram_size)?;
        let mut progress = ByteProgress::new(progress);
        self.with_ram(layout, |s| s.read_ram_contents(layout, &mut ram, &mut progress))?;
        Ok((info, ram))
    }

    /// Write `data` to the cartridge RAM, optionally reading it back.
    ///
    /// `data` must be exactly the RAM size from the header. When verifying,
    /// progress continues past the RAM size through the read-back.
    pub fn write_ram(
        &mut self,
        data: &[u8],
        verify: bool,
        progress: &mut dyn ProgressSink,
    ) -> RntResult<CartridgeInfo> {
        let info = self.read_info()?;
        let layout = ram_layout(&info)?;
        if data.len() != info.ram_size {
            return Err(RntError::bad_param(format!(
                "{} bytes given for {} bytes of cartridge RAM",
                data.len(),
                info.ram_size
            )));
        }
        if !info.flags.contains(CartFlags::BATTERY) {
            warn!("cartridge has no battery, written RAM will not persist");
        }

        let mut progress = ByteProgress::new(progress);
        self.with_ram(layout, |s| s.write_ram_contents(layout, data, &mut progress))?;
        info!("wrote {} bytes of cartridge RAM", data.len());

        if verify {
            let mut readback = alloc_buffer(data.len())?;
            self.with_ram(layout, |s| {
                s.read_ram_contents(layout, &mut readback, &mut progress)
            })?;
            verify_ram_contents(info.mbc(), data, &readback)?;
            debug!("RAM verified");
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbcart::MBC2_RAM_SIZE;

    #[test]
    fn test_nibble_verify_for_mbc2() {
        let written = [0xAB, 0x12, 0xFF];
        let read = [0xFB, 0xF2, 0xFF];
        assert!(verify_ram_contents(Mbc::Mbc2, &written, &read).is_ok());
        assert_eq!(
            verify_ram_contents(Mbc::Mbc5, &written, &read),
            Err(RntError::VerifyMismatch { offset: 0 })
        );
    }

    #[test]
    fn test_verify_reports_first_mismatch() {
        let written = [0x00, 0x11, 0x22, 0x33];
        let read = [0x00, 0x11, 0x20, 0x30];
        assert_eq!(
            verify_ram_contents(Mbc::Mbc3, &written, &read),
            Err(RntError::VerifyMismatch { offset: 2 })
        );
        assert_eq!(
            verify_ram_contents(Mbc::Mbc2, &[0x01, 0x02], &[0xF1, 0xF3]),
            Err(RntError::VerifyMismatch { offset: 1 })
        );
    }

    #[test]
    fn test_verify_length_mismatch() {
        assert_eq!(
            verify_ram_contents(Mbc::Mbc1, &[1, 2, 3], &[1, 2]),
            Err(RntError::VerifyMismatch { offset: 2 })
        );
    }

    fn info(cart_type: u8, ram_size: usize) -> CartridgeInfo {
        CartridgeInfo {
            title: "TEST".into(),
            cart_type,
            flags: crate::gbcart::cart_type_flags(cart_type),
            rom_size: 0x8000,
            ram_size,
        }
    }

    #[test]
    fn test_ram_layouts() {
        assert_eq!(ram_layout(&info(0x1B, 0x8000)), Ok(RamLayout::Banked { mbc1: false }));
        assert_eq!(ram_layout(&info(0x03, 0x2000)), Ok(RamLayout::Banked { mbc1: true }));
        assert_eq!(ram_layout(&info(0x06, MBC2_RAM_SIZE)), Ok(RamLayout::Linear));
        assert_eq!(ram_layout(&info(0xFC, 0x20000)), Ok(RamLayout::Banked { mbc1: false }));
        assert_eq!(ram_layout(&info(0x19, 0)), Err(RntError::NoCartridgeRam));
        assert!(matches!(ram_layout(&info(0x13, 0x800)), Err(RntError::BadParam(_))));
        assert!(matches!(ram_layout(&info(0xFF, 0x2000)), Err(RntError::Unsupported(_))));
    }
}
