//! Memory card sector protocol.
//!
//! A sector transaction is longer than one adapter exchange, so it is
//! clocked as a fixed series of chunks. Every chunk but the last keeps the
//! card selected, and the first asks for the longer delay before the
//! command acknowledge.
//!
//! ```text
//! read   out: 81 52 00 00 MSB LSB 00...
//!        in:  -- FL 5A 5D 00 00 5C 5D MSB LSB data[128] CHK 'G'
//! write  out: 81 57 00 00 MSB LSB data[128] CHK 00 00 00
//!        in:  -- FL 5A 5D 00 ... 00 5C 5D STATUS
//! ```
//!
//! CHK is the XOR of MSB, LSB and the data bytes.

use rnt_adapter::{DeviceHandle, ProgressSink};
use rnt_errors::{ChecksumKind, RntError, RntResult};
use rnt_hid_common::ReportParser;
use tracing::{debug, info, warn};

use crate::exchange::{PsxFlags, psx_exchange};
use crate::image::MemoryCardImage;

pub const SECTOR_SIZE: usize = 128;
pub const SECTOR_COUNT: u16 = 1024;

/// One 128-byte sector.
pub type Sector = [u8; SECTOR_SIZE];

const ADDR_MEMCARD: u8 = 0x81;
const CMD_READ: u8 = 0x52;
const CMD_WRITE: u8 = 0x57;

const CARD_ID: [u8; 2] = [0x5A, 0x5D];
const COMMAND_ACK: [u8; 2] = [0x5C, 0x5D];

const STATUS_GOOD: u8 = b'G';
const STATUS_BAD_CHECKSUM: u8 = b'N';
const STATUS_BAD_SECTOR: u8 = 0xFF;

/// Exchange sizes of a 140-byte read transaction.
const READ_CHUNKS: [u8; 3] = [60, 60, 20];
/// Exchange sizes of a 138-byte write transaction.
const WRITE_CHUNKS: [u8; 3] = [56, 56, 26];

/// Bytes between the card ID and the write acknowledge.
const WRITE_ACK_GAP: usize = 131;

fn xor_all(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, &b| acc ^ b)
}

/// Outcome of a write from its final status byte.
fn write_status(sector: u16, status: u8) -> RntResult<()> {
    match status {
        STATUS_GOOD => Ok(()),
        STATUS_BAD_CHECKSUM => Err(RntError::BadChecksum(ChecksumKind::CardWriteStatus)),
        STATUS_BAD_SECTOR => Err(RntError::InvalidSector(sector)),
        other => Err(RntError::Unknown(format!(
            "write of sector {sector} ended with status {other:#04x}"
        ))),
    }
}

/// Memory card in PSX port `channel`.
#[derive(Debug)]
pub struct MemoryCard<'a> {
    handle: &'a mut DeviceHandle,
    channel: u8,
}

impl<'a> MemoryCard<'a> {
    pub fn new(handle: &'a mut DeviceHandle, channel: u8) -> Self {
        Self { handle, channel }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Clock one transaction as the exchanges listed in `chunks`.
    ///
    /// `tx` is spread over the chunks in order and zeros are sent once it
    /// runs out. Each chunk must come back complete.
    fn transaction(&mut self, tx: &[u8], chunks: &[u8]) -> RntResult<Vec<u8>> {
        let total: usize = chunks.iter().map(|&len| usize::from(len)).sum();
        let mut rx = Vec::with_capacity(total);
        let mut offset = 0;

        for (i, &len) in chunks.iter().enumerate() {
            let mut flags = PsxFlags::empty();
            if i == 0 {
                flags |= PsxFlags::LATE_8TH;
            }
            if i + 1 < chunks.len() {
                flags |= PsxFlags::NO_DESELECT;
            }

            let end = (offset + usize::from(len)).min(tx.len());
            let part = tx.get(offset.min(end)..end).unwrap_or_default();
            let got = psx_exchange(self.handle, self.channel, flags, part, len)?;
            if got.len() != usize::from(len) {
                return Err(RntError::io(format!(
                    "memory card chunk {i}: expected {len} bytes, received {}",
                    got.len()
                )));
            }
            rx.extend_from_slice(&got);
            offset += usize::from(len);
        }
        Ok(rx)
    }

    /// Read sector `n`.
    pub fn read_sector(&mut self, n: u16) -> RntResult<Sector> {
        let [hi, lo] = n.to_be_bytes();
        let request = [ADDR_MEMCARD, CMD_READ, 0x00, 0x00, hi, lo];
        let reply = self.transaction(&request, &READ_CHUNKS)?;

        let mut parser = ReportParser::new(&reply);
        parser.skip(2)?;
        if parser.read_array::<2>()? != CARD_ID {
            return Err(RntError::NoCardDetected);
        }
        parser.skip(2)?;
        if parser.read_array::<2>()? != COMMAND_ACK {
            return Err(RntError::NoCommandAck);
        }
        let checked = parser.rest();
        let mut parser = ReportParser::new(checked);
        let confirmed = parser.read_u16_be()?;
        if confirmed != n {
            debug!("asked for sector {n}, card answered {confirmed}");
            return Err(RntError::InvalidSector(n));
        }
        let data: Sector = parser.read_array()?;
        let _chk = parser.read_u8()?;
        let status = parser.read_u8()?;

        // Sector number, data and checksum byte XOR to zero.
        let covered = checked.get(..2 + SECTOR_SIZE + 1).unwrap_or_default();
        if xor_all(covered) != 0 {
            debug!("XOR checksum mismatch in sector {n}");
            return Err(RntError::BadChecksum(ChecksumKind::SectorXor));
        }
        if status != STATUS_GOOD {
            return Err(RntError::Unknown(format!(
                "read of sector {n} ended with {status:#04x}"
            )));
        }
        Ok(data)
    }

    /// Write sector `n`.
    pub fn write_sector(&mut self, n: u16, data: &Sector) -> RntResult<()> {
        let [hi, lo] = n.to_be_bytes();
        let mut request = Vec::with_capacity(WRITE_CHUNKS.iter().map(|&c| usize::from(c)).sum());
        request.extend_from_slice(&[ADDR_MEMCARD, CMD_WRITE, 0x00, 0x00, hi, lo]);
        request.extend_from_slice(data);
        request.push(hi ^ lo ^ xor_all(data));
        request.extend_from_slice(&[0x00; 3]);
        let reply = self.transaction(&request, &WRITE_CHUNKS)?;

        let mut parser = ReportParser::new(&reply);
        parser.skip(2)?;
        if parser.read_array::<2>()? != CARD_ID {
            return Err(RntError::NoCardDetected);
        }
        parser.skip(WRITE_ACK_GAP)?;
        if parser.read_array::<2>()? != COMMAND_ACK {
            return Err(RntError::NoCommandAck);
        }
        write_status(n, parser.read_u8()?)
    }

    /// Read every sector into `image`, in order.
    ///
    /// `progress` sees the byte offset of each sector before it is read.
    /// Sectors before a cancellation or failure are already in `image`.
    pub fn download(
        &mut self,
        image: &mut MemoryCardImage,
        progress: &mut dyn ProgressSink,
    ) -> RntResult<()> {
        for n in 0..SECTOR_COUNT {
            if progress.advance(usize::from(n) * SECTOR_SIZE).is_cancel() {
                info!("memory card read cancelled at sector {n}");
                return Err(RntError::UserCancelled);
            }
            let sector = self.read_sector(n)?;
            image.set_sector(n, &sector)?;
        }
        info!("read memory card on port {}", self.channel);
        Ok(())
    }

    /// Write every sector of `image`, in order.
    ///
    /// A cancel request only stops the upload once
    /// [`ProgressSink::confirm_cancel_write`] agrees, since it leaves the
    /// card partly rewritten.
    pub fn upload(
        &mut self,
        image: &MemoryCardImage,
        progress: &mut dyn ProgressSink,
    ) -> RntResult<()> {
        for n in 0..SECTOR_COUNT {
            if progress.advance(usize::from(n) * SECTOR_SIZE).is_cancel() {
                if progress.confirm_cancel_write() {
                    warn!("memory card write cancelled at sector {n}, card is partly written");
                    return Err(RntError::UserCancelled);
                }
                debug!("cancel at sector {n} not confirmed, continuing");
            }
            let sector = image.sector(n)?;
            self.write_sector(n, &sector)?;
        }
        info!("wrote memory card on port {}", self.channel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_totals() {
        let sum = |chunks: &[u8]| chunks.iter().map(|&c| usize::from(c)).sum::<usize>();
        assert_eq!(sum(&READ_CHUNKS), 140);
        assert_eq!(sum(&WRITE_CHUNKS), 138);
    }

    #[test]
    fn test_chunks_fit_a_report() {
        const REPORT: usize = 63;
        // replies carry opcode and length ahead of the data
        assert!(READ_CHUNKS.iter().chain(&WRITE_CHUNKS).all(|&c| 2 + usize::from(c) <= REPORT));
        // requests carry a 4-byte header ahead of the transmitted bytes
        assert!(WRITE_CHUNKS.iter().all(|&c| 4 + usize::from(c) <= REPORT));
        assert_eq!(4 + usize::from(WRITE_CHUNKS[0]), 60);
    }

    #[test]
    fn test_write_ack_position() {
        // card ID ends at 4, acknowledge sits at 135..137, status at 137
        assert_eq!(4 + WRITE_ACK_GAP, 135);
    }

    #[test]
    fn test_write_status_mapping() {
        assert_eq!(write_status(3, b'G'), Ok(()));
        assert_eq!(
            write_status(3, b'N'),
            Err(RntError::BadChecksum(ChecksumKind::CardWriteStatus))
        );
        assert_eq!(write_status(3, 0xFF), Err(RntError::InvalidSector(3)));
        assert!(matches!(write_status(3, 0x00), Err(RntError::Unknown(_))));
    }
}
