//! I2C transaction batches for Wiimote extension adapters.

use rnt_errors::{RntError, RntResult};
use rnt_hid_common::{ReportBuilder, ReportParser};
use tracing::debug;

use crate::device::DeviceHandle;
use crate::requests::rq;

pub const I2C_FRAME_SIZE: usize = 63;
/// Address of every Wiimote extension.
pub const EXTENSION_ADDR: u8 = 0x52;
/// Result byte of a transaction that has not run.
pub const I2C_RESULT_PENDING: u8 = 0xFF;
/// Number of 7-bit addresses.
pub const I2C_ADDRESSES: u8 = 0x80;
/// Register holding the 6-byte extension identifier.
pub const EXTENSION_ID_REG: u8 = 0xFA;

/// Known extension identifiers (last two ID bytes).
pub mod extension_ids {
    pub const NUNCHUK: u16 = 0x0000;
    pub const CLASSIC: u16 = 0x0001;
    pub const CLASSIC_PRO: u16 = 0x0101;
    pub const GH_GUITAR: u16 = 0x0003;
    pub const DJ_HERO: u16 = 0x0303;
    pub const UDRAW: u16 = 0xFF12;
    pub const DRAWSOME: u16 = 0xFF13;
}

pub fn extension_name(id: u16) -> &'static str {
    match id {
        extension_ids::NUNCHUK => "Nunchuk",
        extension_ids::CLASSIC => "Classic controller",
        extension_ids::CLASSIC_PRO => "Classic controller pro",
        extension_ids::GH_GUITAR => "Guitar",
        extension_ids::DJ_HERO => "DJ Hero turntable",
        extension_ids::UDRAW => "uDraw tablet",
        extension_ids::DRAWSOME => "Drawsome tablet",
        _ => "Unknown extension",
    }
}

/// One write-then-read on the I2C bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cTransaction {
    pub channel: u8,
    pub addr: u8,
    pub write: Vec<u8>,
    pub read_len: u8,
    /// `0` on success, [`I2C_RESULT_PENDING`] until executed.
    pub result: u8,
    pub read: Vec<u8>,
}

impl I2cTransaction {
    pub fn new(channel: u8, addr: u8, write: impl Into<Vec<u8>>, read_len: u8) -> Self {
        Self {
            channel,
            addr,
            write: write.into(),
            read_len,
            result: I2C_RESULT_PENDING,
            read: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.result == 0
    }
}

pub fn encode_i2c(txns: &[I2cTransaction]) -> RntResult<Vec<u8>> {
    let mut frame = ReportBuilder::new(I2C_FRAME_SIZE);
    frame.write_u8(rq::I2C_TRANSACTIONS)?;
    for (i, txn) in txns.iter().enumerate() {
        let needed = 4 + txn.write.len();
        if frame.remaining() < needed {
            return Err(RntError::protocol(format!(
                "I2C transaction {i} needs {needed} bytes, {} left in frame",
                frame.remaining()
            )));
        }
        let write_len = u8::try_from(txn.write.len())
            .map_err(|e| RntError::bad_param(format!("I2C transaction {i}: {e}")))?;
        frame
            .write_u8(txn.channel)?
            .write_u8(txn.addr)?
            .write_u8(write_len)?
            .write_u8(txn.read_len)?
            .write_bytes(&txn.write)?;
    }
    Ok(frame.into_padded())
}

pub fn decode_i2c(reply: &[u8], txns: &mut [I2cTransaction]) -> RntResult<()> {
    if reply.len() != I2C_FRAME_SIZE {
        return Err(RntError::protocol(format!(
            "I2C reply of {} bytes",
            reply.len()
        )));
    }
    let mut parser = ReportParser::new(reply);
    parser.expect_u8(rq::I2C_TRANSACTIONS, "I2C reply opcode")?;
    for txn in txns.iter_mut() {
        txn.result = parser.read_u8()?;
        txn.read.clear();
        if txn.result != 0 {
            continue;
        }
        let len = parser.read_u8()?;
        if len > txn.read_len {
            return Err(RntError::protocol(format!(
                "I2C read of {len} bytes, {} requested",
                txn.read_len
            )));
        }
        txn.read = parser.read_bytes(usize::from(len))?.to_vec();
    }
    Ok(())
}

impl DeviceHandle {
    /// Execute `txns` in one exchange.
    pub fn i2c_transactions(&mut self, txns: &mut [I2cTransaction]) -> RntResult<()> {
        for txn in txns.iter_mut() {
            txn.result = I2C_RESULT_PENDING;
            txn.read.clear();
        }
        let frame = encode_i2c(txns)?;
        let reply = self.exchange(&frame)?;
        decode_i2c(&reply, txns)
    }

    /// Addresses answering a one-byte read on `channel`.
    pub fn i2c_detect(&mut self, channel: u8) -> RntResult<Vec<u8>> {
        let mut found = Vec::new();
        for addr in 0..I2C_ADDRESSES {
            let mut txn = [I2cTransaction::new(channel, addr, Vec::new(), 1)];
            self.i2c_transactions(&mut txn)?;
            if txn.iter().all(I2cTransaction::succeeded) {
                found.push(addr);
            }
        }
        debug!("I2C devices on channel {}: {:02x?}", channel, found);
        Ok(found)
    }

    /// Read `len` registers starting at `reg`.
    pub fn i2c_read_registers(&mut self, channel: u8, addr: u8, reg: u8, len: u8) -> RntResult<Vec<u8>> {
        let mut txn = [I2cTransaction::new(channel, addr, vec![reg], len)];
        self.i2c_transactions(&mut txn)?;
        let [txn] = txn;
        if !txn.succeeded() {
            return Err(RntError::NoDeviceDetected);
        }
        Ok(txn.read)
    }

    /// Write `data` to consecutive registers starting at `reg`.
    pub fn i2c_write_registers(&mut self, channel: u8, addr: u8, reg: u8, data: &[u8]) -> RntResult<()> {
        let mut write = Vec::with_capacity(1 + data.len());
        write.push(reg);
        write.extend_from_slice(data);
        let mut txn = [I2cTransaction::new(channel, addr, write, 0)];
        self.i2c_transactions(&mut txn)?;
        if txn.iter().all(I2cTransaction::succeeded) {
            Ok(())
        } else {
            Err(RntError::NoDeviceDetected)
        }
    }

    /// Switch the extension on `channel` to unencrypted reports.
    pub fn disable_extension_encryption(&mut self, channel: u8) -> RntResult<()> {
        let mut txns = [
            I2cTransaction::new(channel, EXTENSION_ADDR, vec![0xF0, 0x55], 0),
            I2cTransaction::new(channel, EXTENSION_ADDR, vec![0xFB, 0x00], 0),
        ];
        self.i2c_transactions(&mut txns)?;
        if txns.iter().all(I2cTransaction::succeeded) {
            Ok(())
        } else {
            Err(RntError::NoDeviceDetected)
        }
    }

    /// Identifier of the extension on `channel` (last two ID bytes).
    pub fn extension_id(&mut self, channel: u8) -> RntResult<u16> {
        let id = self.i2c_read_registers(channel, EXTENSION_ADDR, EXTENSION_ID_REG, 6)?;
        match id.as_slice() {
            [.., hi, lo] if id.len() == 6 => Ok(u16::from_be_bytes([*hi, *lo])),
            _ => Err(RntError::protocol(format!("extension ID of {} bytes", id.len()))),
        }
    }

    /// Read the extension's whole 256-byte register space.
    pub fn dump_extension_memory(&mut self, channel: u8) -> RntResult<Vec<u8>> {
        let mut memory = Vec::with_capacity(256);
        for reg in (0..=0xF0u8).step_by(0x10) {
            let chunk = self.i2c_read_registers(channel, EXTENSION_ADDR, reg, 0x10)?;
            if chunk.len() != 0x10 {
                return Err(RntError::protocol(format!(
                    "short register read at {reg:#04x}"
                )));
            }
            memory.extend_from_slice(&chunk);
        }
        Ok(memory)
    }
}
