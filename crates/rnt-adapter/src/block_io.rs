//! Batched SI transactions.
//!
//! Request frame (63 bytes, 0xFF padded):
//!
//! ```text
//! 0x81, { channel, tx_len, rx_len, tx[tx_len] } ...
//! ```
//!
//! The firmware stops at the end of the frame or at a channel byte of 0xFF.
//! The reply echoes the opcode followed by `{ rx_len, rx[rx_len & 0x3F] }`
//! per operation, with the two high bits of `rx_len` flagging a timeout or a
//! partial read.

use rnt_errors::{RntError, RntResult};
use rnt_hid_common::{ReportBuilder, ReportParser};
use tracing::{debug, trace};

use crate::device::DeviceHandle;
use crate::features::Features;
use crate::requests::rq;

/// Size of a block IO frame in both directions.
pub const BLOCK_IO_FRAME_SIZE: usize = 63;
/// Length bits of the tx/rx length bytes.
pub const BIO_RXTX_MASK: u8 = 0x3F;
pub const BIO_RX_LEN_TIMEDOUT: u8 = 0x80;
pub const BIO_RX_LEN_PARTIAL: u8 = 0x40;
/// Channel value that ends the request on the firmware side.
pub const BIO_END_CHANNEL: u8 = 0xFF;

/// Result classification of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockIoStatus {
    Complete,
    Partial,
    TimedOut,
}

/// One SI transaction in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockIoOp {
    pub channel: u8,
    pub tx: Vec<u8>,
    /// Expected reply length.
    pub rx_max: u8,
    rx_len: u8,
    rx: Vec<u8>,
}

impl BlockIoOp {
    pub fn new(channel: u8, tx: impl Into<Vec<u8>>, rx_max: u8) -> Self {
        Self {
            channel,
            tx: tx.into(),
            rx_max,
            rx_len: rx_max,
            rx: Vec::new(),
        }
    }

    /// Length byte as reported, flags included.
    pub fn rx_len_raw(&self) -> u8 {
        self.rx_len
    }

    pub fn status(&self) -> BlockIoStatus {
        if self.rx_len & BIO_RX_LEN_TIMEDOUT != 0 {
            BlockIoStatus::TimedOut
        } else if self.rx_len & BIO_RX_LEN_PARTIAL != 0 {
            BlockIoStatus::Partial
        } else {
            BlockIoStatus::Complete
        }
    }

    /// Bytes received; empty when the operation timed out.
    pub fn received(&self) -> &[u8] {
        if self.status() == BlockIoStatus::TimedOut {
            return &[];
        }
        let n = usize::from(self.rx_len & BIO_RXTX_MASK);
        self.rx.get(..n).unwrap_or(&self.rx)
    }

    /// `(status, data)` pair, identical whichever path executed the batch.
    pub fn outcome(&self) -> (BlockIoStatus, Vec<u8>) {
        (self.status(), self.received().to_vec())
    }

    fn mark_timed_out(&mut self) {
        self.rx_len = (self.rx_len & BIO_RXTX_MASK) | BIO_RX_LEN_TIMEDOUT;
        self.rx.clear();
    }

    fn validate(&self) -> RntResult<()> {
        if self.channel == BIO_END_CHANNEL {
            return Err(RntError::bad_param("channel 0xFF is reserved"));
        }
        if self.tx.len() > usize::from(BIO_RXTX_MASK) || self.rx_max > BIO_RXTX_MASK {
            return Err(RntError::bad_param(format!(
                "block IO lengths tx={} rx={} exceed {}",
                self.tx.len(),
                self.rx_max,
                BIO_RXTX_MASK
            )));
        }
        Ok(())
    }
}

/// Pack `ops` into one request frame.
pub fn encode_block_io(ops: &[BlockIoOp]) -> RntResult<Vec<u8>> {
    let mut frame = ReportBuilder::with_padding(BLOCK_IO_FRAME_SIZE, 0xFF);
    frame.write_u8(rq::BLOCK_IO)?;
    for (i, op) in ops.iter().enumerate() {
        op.validate()?;
        let needed = 3 + op.tx.len();
        if frame.remaining() < needed {
            return Err(RntError::protocol(format!(
                "block IO op {i} needs {needed} bytes, {} left in frame",
                frame.remaining()
            )));
        }
        let tx_len = u8::try_from(op.tx.len())
            .map_err(|e| RntError::bad_param(format!("block IO op {i}: {e}")))?;
        frame
            .write_u8(op.channel)?
            .write_u8(tx_len)?
            .write_u8(op.rx_max)?
            .write_bytes(&op.tx)?;
    }
    Ok(frame.into_padded())
}

/// Write a reply frame's results into `ops`.
pub fn decode_block_io(reply: &[u8], ops: &mut [BlockIoOp]) -> RntResult<()> {
    if reply.len() != BLOCK_IO_FRAME_SIZE {
        return Err(RntError::protocol(format!(
            "block IO reply of {} bytes",
            reply.len()
        )));
    }
    let mut parser = ReportParser::new(reply);
    parser.expect_u8(rq::BLOCK_IO, "block IO reply opcode")?;
    for op in ops.iter_mut() {
        let rx_len = parser.read_u8()?;
        let data = parser.read_bytes(usize::from(rx_len & BIO_RXTX_MASK))?;
        op.rx_len = rx_len;
        op.rx = data.to_vec();
    }
    Ok(())
}

impl DeviceHandle {
    /// Run `ops` as one batch.
    ///
    /// Adapters without [`Features::BLOCK_IO`] execute each operation as a
    /// raw SI command; a failed or short command marks that operation timed
    /// out instead of failing the batch.
    pub fn block_io(&mut self, ops: &mut [BlockIoOp]) -> RntResult<()> {
        if self.is_legacy() {
            return Err(RntError::LegacyDevice);
        }
        for op in ops.iter() {
            op.validate()?;
        }
        if self.has(Features::BLOCK_IO) {
            let frame = encode_block_io(ops)?;
            let reply = self.exchange(&frame)?;
            decode_block_io(&reply, ops)?;
            trace!("Block IO batch of {} ops done", ops.len());
        } else {
            self.block_io_compat(ops);
        }
        Ok(())
    }

    fn block_io_compat(&mut self, ops: &mut [BlockIoOp]) {
        for op in ops.iter_mut() {
            let expected = usize::from(op.rx_max);
            match self.raw_si_exchange(op.channel, &op.tx) {
                Ok(rx) if !rx.is_empty() && rx.len() == expected => {
                    op.rx_len = op.rx_max;
                    op.rx = rx;
                }
                Ok(rx) => {
                    debug!(
                        "Channel {} answered {} of {} bytes",
                        op.channel,
                        rx.len(),
                        expected
                    );
                    op.mark_timed_out();
                }
                Err(e) => {
                    debug!("Channel {} SI command failed: {}", op.channel, e);
                    op.mark_timed_out();
                }
            }
        }
    }
}
