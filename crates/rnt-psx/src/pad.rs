//! PlayStation controller commands.

use rnt_adapter::DeviceHandle;
use rnt_errors::{RntError, RntResult};
use tracing::debug;

use crate::exchange::{PsxFlags, psx_exchange};

/// Controller IDs as returned in bytes 1-2 of a poll.
pub mod pad_id {
    pub const NEGCON: u16 = 0x5A23;
    pub const DIGITAL: u16 = 0x5A41;
    pub const ANALOG_RED: u16 = 0x5A73;
    pub const CONFIG: u16 = 0x5AF3;
}

const ADDR_PAD: u8 = 0x01;
const CMD_POLL: u8 = 0x42;
const CMD_CONFIG_MODE: u8 = 0x43;
const CMD_ANALOG_MODE: u8 = 0x44;
const CMD_RUMBLE_MAP: u8 = 0x4D;

const ANSWER_LEN: u8 = 9;

pub fn controller_id_name(id: u16) -> &'static str {
    match id {
        pad_id::NEGCON => "Negcon",
        pad_id::DIGITAL => "Digital pad",
        pad_id::ANALOG_RED => "Analog pad (red)",
        pad_id::CONFIG => "Config mode",
        _ => "(unknown)",
    }
}

/// Reply to a status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadStatus {
    pub id: u16,
    /// Everything after the ID: buttons, then axes on analog pads.
    pub data: Vec<u8>,
}

impl PadStatus {
    pub fn name(&self) -> &'static str {
        controller_id_name(self.id)
    }
}

/// Controller in PSX port `channel`.
#[derive(Debug)]
pub struct PsxController<'a> {
    handle: &'a mut DeviceHandle,
    channel: u8,
}

impl<'a> PsxController<'a> {
    pub fn new(handle: &'a mut DeviceHandle, channel: u8) -> Self {
        Self { handle, channel }
    }

    fn command(&mut self, tx: &[u8]) -> RntResult<Vec<u8>> {
        let rx = psx_exchange(self.handle, self.channel, PsxFlags::empty(), tx, ANSWER_LEN)?;
        if rx.is_empty() {
            return Err(RntError::io(format!("no answer on PSX port {}", self.channel)));
        }
        Ok(rx)
    }

    /// Poll buttons and axes. `extra` fills bytes 3 and 4 of the command,
    /// which drive the motors once rumble is unlocked.
    pub fn poll_status(&mut self, [extra1, extra2]: [u8; 2]) -> RntResult<PadStatus> {
        let rx = self.command(&[ADDR_PAD, CMD_POLL, 0x00, extra1, extra2])?;
        let Some((&[_, lo, hi], data)) = rx.split_first_chunk::<3>() else {
            return Err(RntError::protocol(format!(
                "poll answer of {} bytes has no controller ID",
                rx.len()
            )));
        };
        Ok(PadStatus {
            id: u16::from_le_bytes([lo, hi]),
            data: data.to_vec(),
        })
    }

    /// Enter or leave configuration mode and report whether the pad is in
    /// it afterwards, judging by the ID it polls with.
    pub fn enter_configuration_mode(&mut self, enter: bool) -> RntResult<bool> {
        let cmd = [ADDR_PAD, CMD_CONFIG_MODE, 0x00, u8::from(enter), 0, 0, 0, 0, 0];
        self.command(&cmd)?;
        let status = self.poll_status([0, 0])?;
        let in_config = status.id == pad_id::CONFIG;
        debug!("port {}: configuration mode {}", self.channel, in_config);
        Ok(in_config)
    }

    /// Switch analog mode (and its LED). Only honoured in configuration
    /// mode.
    pub fn enable_analog(&mut self, enable: bool) -> RntResult<()> {
        self.command(&[ADDR_PAD, CMD_ANALOG_MODE, 0x00, u8::from(enable), 0x02])?;
        Ok(())
    }

    /// Map the motors to poll bytes 3 and 4. Only honoured in configuration
    /// mode.
    pub fn unlock_rumble(&mut self) -> RntResult<()> {
        self.command(&[
            ADDR_PAD,
            CMD_RUMBLE_MAP,
            0x00,
            0x00,
            0x01,
            0xFF,
            0xFF,
            0xFF,
            0xFF,
        ])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_names() {
        assert_eq!(controller_id_name(0x5A41), "Digital pad");
        assert_eq!(controller_id_name(0x5AF3), "Config mode");
        assert_eq!(controller_id_name(0xFFFF), "(unknown)");
    }
}
