//! Raw PSX port exchange.

use bitflags::bitflags;
use rnt_adapter::{DeviceHandle, rq};
use rnt_errors::{RntError, RntResult};
use rnt_hid_common::ReportParser;
use tracing::{trace, warn};

bitflags! {
    /// Per-exchange flags, sent in the high nibble of the channel byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PsxFlags: u8 {
        /// Allow extra time before the 8th byte, where memory cards
        /// acknowledge the command.
        const LATE_8TH = 0x01;
        /// Keep the device selected after the last byte so the next
        /// exchange continues the same transaction.
        const NO_DESELECT = 0x02;
    }
}

const MAX_CHANNEL: u8 = 0x0F;
const HEADER_LEN: usize = 4;

/// Clock `max(tx.len(), max_rx)` bytes on PSX port `channel`, sending `tx`
/// then zeros, and return at most `max_rx` received bytes.
pub fn psx_exchange(
    handle: &mut DeviceHandle,
    channel: u8,
    flags: PsxFlags,
    tx: &[u8],
    max_rx: u8,
) -> RntResult<Vec<u8>> {
    if channel > MAX_CHANNEL {
        return Err(RntError::bad_param(format!("PSX channel {channel}")));
    }
    let tx_len = u8::try_from(tx.len())
        .map_err(|e| RntError::bad_param(format!("PSX exchange of {} bytes: {e}", tx.len())))?;

    let mut cmd = Vec::with_capacity(HEADER_LEN + tx.len());
    cmd.extend_from_slice(&[rq::PSX_RAW, channel | (flags.bits() << 4), tx_len, max_rx]);
    cmd.extend_from_slice(tx);

    let reply = handle.exchange(&cmd)?;
    let mut parser = ReportParser::new(&reply);
    parser.expect_u8(rq::PSX_RAW, "PSX reply opcode")?;
    let mut rx_len = parser.read_u8()?;
    if rx_len > max_rx {
        warn!("PSX reply of {rx_len} bytes truncated to {max_rx}");
        rx_len = max_rx;
    }
    let rx = parser.read_bytes(usize::from(rx_len))?.to_vec();
    trace!("psx[{channel}] {:02x?} -> {:02x?}", tx, rx);
    Ok(rx)
}
