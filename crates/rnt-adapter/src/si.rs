//! Raw SI bus commands (GameCube/N64 controller bus).

use rnt_errors::{RntError, RntResult};
use rnt_hid_common::ReportParser;
use tracing::warn;

use crate::device::DeviceHandle;
use crate::requests::rq;

/// SI command: identify the device and report its status.
pub const N64_GET_CAPS: u8 = 0x00;
/// SI command: read a 32-byte accessory block.
pub const N64_EXPANSION_READ: u8 = 0x02;
/// SI command: write a 32-byte accessory block.
pub const N64_EXPANSION_WRITE: u8 = 0x03;

/// Reply to [`N64_GET_CAPS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct N64Caps {
    pub raw: [u8; 3],
}

impl N64Caps {
    /// Device identifier, `0x0500` for a standard controller.
    pub fn device_id(&self) -> u16 {
        u16::from_be_bytes([self.raw[0], self.raw[1]])
    }

    /// Something is plugged into the controller's accessory port.
    pub fn accessory_present(&self) -> bool {
        self.raw[2] & 0x01 != 0
    }
}

impl DeviceHandle {
    /// Send `tx` on `channel` and return at most `max_rx` reply bytes.
    pub fn raw_si_command(&mut self, channel: u8, tx: &[u8], max_rx: usize) -> RntResult<Vec<u8>> {
        let mut rx = self.raw_si_exchange(channel, tx)?;
        if rx.len() > max_rx {
            warn!("SI reply of {} bytes truncated to {}", rx.len(), max_rx);
            rx.truncate(max_rx);
        }
        Ok(rx)
    }

    /// Send `tx` on `channel` and return the whole reply.
    pub(crate) fn raw_si_exchange(&mut self, channel: u8, tx: &[u8]) -> RntResult<Vec<u8>> {
        let tx_len = u8::try_from(tx.len())
            .map_err(|e| RntError::bad_param(format!("SI command of {} bytes: {e}", tx.len())))?;
        let mut cmd = Vec::with_capacity(3 + tx.len());
        cmd.extend_from_slice(&[rq::RAW_SI_COMMAND, channel, tx_len]);
        cmd.extend_from_slice(tx);

        let reply = self.exchange(&cmd)?;
        let mut parser = ReportParser::new(&reply);
        parser.expect_u8(rq::RAW_SI_COMMAND, "raw SI reply opcode")?;
        parser.skip(1)?;
        let rx_len = usize::from(parser.read_u8()?);
        Ok(parser.read_bytes(rx_len)?.to_vec())
    }

    /// Identify the N64 device on `channel`.
    pub fn n64_get_caps(&mut self, channel: u8) -> RntResult<N64Caps> {
        let rx = self.raw_si_command(channel, &[N64_GET_CAPS], 3)?;
        let raw: [u8; 3] = rx
            .as_slice()
            .try_into()
            .map_err(|e| RntError::protocol(format!("get caps returned {} bytes: {e}", rx.len())))?;
        Ok(N64Caps { raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterConfig;
    use crate::device::AdapterInfo;
    use crate::ids::{OUR_VENDOR_ID, product_ids};
    use rnt_hid_common::HidDeviceInfo;
    use rnt_hid_common::mock::MockTransport;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn open(mock: &MockTransport) -> Result<DeviceHandle, Box<dyn std::error::Error>> {
        let hid = HidDeviceInfo::new(OUR_VENDOR_ID, product_ids::GCN64_V3_4, "mock".into())
            .with_interface(1);
        let info = AdapterInfo::from_hid(hid).ok_or("not in registry")?;
        mock.queue_reply(b"\x043.4.0\0".to_vec());
        let config = AdapterConfig {
            exchange_timeout_ms: 20,
            ..AdapterConfig::default()
        };
        Ok(DeviceHandle::open(info, Some(Box::new(mock.clone())), config)?)
    }

    #[test]
    fn test_command_framing() -> TestResult {
        let mock = MockTransport::new();
        let mut handle = open(&mock)?;
        mock.queue_reply(vec![rq::RAW_SI_COMMAND, 1, 2, 0xAB, 0xCD]);
        let rx = handle.raw_si_command(1, &[0x02, 0x80, 0x01], 32)?;
        assert_eq!(rx, vec![0xAB, 0xCD]);
        let sent = mock.sent();
        let last = sent.last().ok_or("nothing sent")?;
        assert_eq!(&last[..6], &[rq::RAW_SI_COMMAND, 1, 3, 0x02, 0x80, 0x01]);
        Ok(())
    }

    #[test]
    fn test_overlong_rx_len_is_protocol_error() -> TestResult {
        let mock = MockTransport::new();
        let mut handle = open(&mock)?;
        mock.queue_reply(vec![rq::RAW_SI_COMMAND, 0, 5, 0xAB]);
        assert!(matches!(
            handle.raw_si_command(0, &[0x00], 3),
            Err(RntError::Protocol(_))
        ));
        Ok(())
    }

    #[test]
    fn test_wrong_opcode_is_protocol_error() -> TestResult {
        let mock = MockTransport::new();
        let mut handle = open(&mock)?;
        mock.queue_reply(vec![rq::BLOCK_IO, 0, 0]);
        assert!(matches!(
            handle.raw_si_command(0, &[0x00], 3),
            Err(RntError::Protocol(_))
        ));
        Ok(())
    }

    #[test]
    fn test_reply_truncated_to_max_rx() -> TestResult {
        let mock = MockTransport::new();
        let mut handle = open(&mock)?;
        mock.queue_reply(vec![rq::RAW_SI_COMMAND, 0, 3, 1, 2, 3]);
        assert_eq!(handle.raw_si_command(0, &[0x00], 2)?, vec![1, 2]);
        Ok(())
    }

    #[test]
    fn test_n64_caps_accessory_bit() -> TestResult {
        let mock = MockTransport::new();
        let mut handle = open(&mock)?;
        mock.queue_reply(vec![rq::RAW_SI_COMMAND, 0, 3, 0x05, 0x00, 0x01]);
        let caps = handle.n64_get_caps(0)?;
        assert_eq!(caps.device_id(), 0x0500);
        assert!(caps.accessory_present());

        mock.queue_reply(vec![rq::RAW_SI_COMMAND, 0, 3, 0x05, 0x00, 0x02]);
        assert!(!handle.n64_get_caps(0)?.accessory_present());

        mock.queue_reply(vec![rq::RAW_SI_COMMAND, 0, 0]);
        assert!(matches!(handle.n64_get_caps(0), Err(RntError::Protocol(_))));
        Ok(())
    }
}
