//! Controller Pak block protocol.
//!
//! The pak is 32 KiB addressed as 1024 blocks of 32 bytes. Each block access
//! is a single raw SI command carrying the checksummed address; the pak
//! answers reads with the data followed by its CRC-8 and acknowledges writes
//! with the CRC-8 of what it received.

use rnt_adapter::{
    ContinueOrCancel, DeviceHandle, N64_EXPANSION_READ, N64_EXPANSION_WRITE, ProgressSink,
};
use rnt_errors::{ChecksumKind, RntError, RntResult};
use tracing::{debug, info};

use crate::crc::{PAK_BLOCK_SIZE, pak_address_crc, pak_data_crc};
use crate::image::ControllerPakImage;

/// Size of a Controller Pak in bytes.
pub const MEMPAK_SIZE: usize = 0x8000;
/// Number of blocks in a Controller Pak.
pub const MEMPAK_BLOCK_COUNT: usize = MEMPAK_SIZE / PAK_BLOCK_SIZE;

/// Seed used by the stress test when none is given.
pub const DEFAULT_LFSR_SEED: u16 = 0xACE1;
const LFSR_TAPS: u16 = 0xB400;

/// One 32-byte accessory block.
pub type PakBlock = [u8; PAK_BLOCK_SIZE];

/// Read one block of the accessory on `channel`.
///
/// Shared with the Transfer Pak, which uses the same block protocol over a
/// different address map.
pub(crate) fn read_accessory_block(
    handle: &mut DeviceHandle,
    channel: u8,
    addr: u16,
) -> RntResult<PakBlock> {
    let [hi, lo] = pak_address_crc(addr).to_be_bytes();
    let rx = handle.raw_si_command(channel, &[N64_EXPANSION_READ, hi, lo], PAK_BLOCK_SIZE + 1)?;
    let Some((&crc, data)) = rx.split_last() else {
        return Err(RntError::io(format!("no reply reading accessory block {addr:#06x}")));
    };
    let block: PakBlock = data.try_into().map_err(|e| {
        RntError::io(format!(
            "accessory block {addr:#06x} returned {} bytes: {e}",
            rx.len()
        ))
    })?;
    if pak_data_crc(&block) != crc {
        debug!("data CRC mismatch reading {addr:#06x}");
        return Err(RntError::BadChecksum(ChecksumKind::PakData));
    }
    Ok(block)
}

/// Write one block of the accessory on `channel`.
pub(crate) fn write_accessory_block(
    handle: &mut DeviceHandle,
    channel: u8,
    addr: u16,
    data: &PakBlock,
) -> RntResult<()> {
    let [hi, lo] = pak_address_crc(addr).to_be_bytes();
    let mut tx = Vec::with_capacity(3 + PAK_BLOCK_SIZE);
    tx.extend_from_slice(&[N64_EXPANSION_WRITE, hi, lo]);
    tx.extend_from_slice(data);

    let rx = handle.raw_si_command(channel, &tx, 1)?;
    let Some(&crc) = rx.first() else {
        return Err(RntError::io(format!("no reply writing accessory block {addr:#06x}")));
    };
    if crc != pak_data_crc(data) {
        debug!("data CRC mismatch writing {addr:#06x}");
        return Err(RntError::BadChecksum(ChecksumKind::PakData));
    }
    Ok(())
}

fn check_block_addr(addr: u16) -> RntResult<()> {
    if usize::from(addr) % PAK_BLOCK_SIZE != 0 {
        return Err(RntError::bad_param(format!(
            "block address {addr:#06x} is not 32-byte aligned"
        )));
    }
    Ok(())
}

/// Addresses of every pak block, ascending.
fn block_addresses() -> impl Iterator<Item = u16> {
    (0..MEMPAK_SIZE)
        .step_by(PAK_BLOCK_SIZE)
        .filter_map(|addr| u16::try_from(addr).ok())
}

fn poll(progress: &mut dyn ProgressSink, current: usize) -> RntResult<()> {
    match progress.advance(current) {
        ContinueOrCancel::Continue => Ok(()),
        ContinueOrCancel::Cancel => {
            info!("transfer cancelled at {current:#06x}");
            Err(RntError::UserCancelled)
        }
    }
}

/// Galois LFSR producing the stress test pattern.
#[derive(Debug, Clone, Copy)]
struct Lfsr(u16);

impl Lfsr {
    fn clock(&mut self) {
        let lsb = self.0 & 1;
        self.0 >>= 1;
        if lsb != 0 {
            self.0 ^= LFSR_TAPS;
        }
    }

    /// Next block: sixteen little-endian words, clocking once per word.
    fn next_block(&mut self) -> PakBlock {
        let mut block = [0u8; PAK_BLOCK_SIZE];
        for word in block.chunks_exact_mut(2) {
            word.copy_from_slice(&self.0.to_le_bytes());
            self.clock();
        }
        block
    }
}

/// Controller Pak plugged into the N64 controller on one channel.
///
/// Borrows the device handle for its lifetime so no other request can
/// interleave with a transfer.
#[derive(Debug)]
pub struct ControllerPak<'a> {
    handle: &'a mut DeviceHandle,
    channel: u8,
}

impl<'a> ControllerPak<'a> {
    /// Wrap `channel` without probing it.
    pub fn new(handle: &'a mut DeviceHandle, channel: u8) -> Self {
        Self { handle, channel }
    }

    /// Probe the controller on `channel` and fail with
    /// [`RntError::NoDeviceDetected`] when nothing is plugged into it.
    pub fn detect(handle: &'a mut DeviceHandle, channel: u8) -> RntResult<Self> {
        let caps = handle.n64_get_caps(channel)?;
        if !caps.accessory_present() {
            debug!("channel {channel}: controller {:04x} has no accessory", caps.device_id());
            return Err(RntError::NoDeviceDetected);
        }
        Ok(Self::new(handle, channel))
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Read the 32 bytes at `addr`, which must be block aligned.
    pub fn read_block(&mut self, addr: u16) -> RntResult<PakBlock> {
        check_block_addr(addr)?;
        read_accessory_block(self.handle, self.channel, addr)
    }

    /// Write 32 bytes at `addr`, which must be block aligned.
    pub fn write_block(&mut self, addr: u16, data: &PakBlock) -> RntResult<()> {
        check_block_addr(addr)?;
        write_accessory_block(self.handle, self.channel, addr, data)
    }

    /// Read every block into `image`, ascending.
    ///
    /// `progress` receives the address of each block before it is read. On
    /// cancellation or error the blocks already read stay in `image` and the
    /// rest are left untouched.
    pub fn download(
        &mut self,
        image: &mut ControllerPakImage,
        progress: &mut dyn ProgressSink,
    ) -> RntResult<()> {
        info!("reading controller pak on channel {}", self.channel);
        for addr in block_addresses() {
            poll(progress, usize::from(addr))?;
            let block = self.read_block(addr)?;
            image.set_block(addr, &block)?;
        }
        Ok(())
    }

    /// Write every block of `image`, ascending.
    pub fn upload(
        &mut self,
        image: &ControllerPakImage,
        progress: &mut dyn ProgressSink,
    ) -> RntResult<()> {
        info!("writing controller pak on channel {}", self.channel);
        for addr in block_addresses() {
            poll(progress, usize::from(addr))?;
            self.write_block(addr, &image.block(addr)?)?;
        }
        Ok(())
    }

    /// Overwrite the pak with `pattern` and read it back.
    ///
    /// Progress runs to twice the pak size: the write pass, then the verify
    /// pass.
    pub fn fill(&mut self, pattern: u8, progress: &mut dyn ProgressSink) -> RntResult<()> {
        info!("filling controller pak with {pattern:#04x}");
        let block = [pattern; PAK_BLOCK_SIZE];
        self.write_then_verify(|| block, progress)
    }

    /// Overwrite the pak with pseudo-random data seeded by `seed` and read it
    /// back.
    pub fn stress_test(&mut self, seed: u16, progress: &mut dyn ProgressSink) -> RntResult<()> {
        info!("stress testing controller pak, seed {seed:#06x}");
        let mut lfsr = Lfsr(seed);
        let mut verify_lfsr = lfsr;
        for addr in block_addresses() {
            poll(progress, usize::from(addr))?;
            self.write_block(addr, &lfsr.next_block())?;
        }
        self.verify_pass(|| verify_lfsr.next_block(), progress)
    }

    fn write_then_verify(
        &mut self,
        mut pattern: impl FnMut() -> PakBlock,
        progress: &mut dyn ProgressSink,
    ) -> RntResult<()> {
        for addr in block_addresses() {
            poll(progress, usize::from(addr))?;
            self.write_block(addr, &pattern())?;
        }
        self.verify_pass(pattern, progress)
    }

    fn verify_pass(
        &mut self,
        mut expected: impl FnMut() -> PakBlock,
        progress: &mut dyn ProgressSink,
    ) -> RntResult<()> {
        for addr in block_addresses() {
            poll(progress, MEMPAK_SIZE + usize::from(addr))?;
            let want = expected();
            let got = self.read_block(addr)?;
            if let Some(pos) = want.iter().zip(&got).position(|(a, b)| a != b) {
                debug!("expected {want:02x?}, read back {got:02x?}");
                return Err(RntError::VerifyMismatch {
                    offset: usize::from(addr) + pos,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lfsr_sequence() {
        let mut lfsr = Lfsr(DEFAULT_LFSR_SEED);
        let block = lfsr.next_block();
        assert_eq!(&block[..2], &[0xE1, 0xAC]);
        // 0xACE1 has its low bit set: shift then apply the taps.
        assert_eq!(u16::from_le_bytes([block[2], block[3]]), (0xACE1 >> 1) ^ LFSR_TAPS);
    }

    #[test]
    fn test_lfsr_blocks_differ() {
        let mut lfsr = Lfsr(DEFAULT_LFSR_SEED);
        assert_ne!(lfsr.next_block(), lfsr.next_block());
    }

    #[test]
    fn test_block_addresses_cover_pak() {
        let addrs: Vec<u16> = block_addresses().collect();
        assert_eq!(addrs.len(), MEMPAK_BLOCK_COUNT);
        assert_eq!(addrs.first(), Some(&0x0000));
        assert_eq!(addrs.last(), Some(&0x7FE0));
    }

    #[test]
    fn test_unaligned_address_rejected() {
        assert!(matches!(check_block_addr(0x0010), Err(RntError::BadParam(_))));
        assert!(check_block_addr(0x7FE0).is_ok());
    }
}
