//! Adapter management requests.

use std::ops::{Deref, DerefMut};

use rnt_errors::{RntError, RntResult};
use tracing::{debug, info, warn};

use crate::compat;
use crate::device::{DeviceHandle, reply_string};
use crate::features::{Features, feature_for_cfg_param};
use crate::requests::{cfg_param, rq};

impl DeviceHandle {
    /// Stop or resume the firmware's own controller polling.
    pub fn suspend_polling(&mut self, suspend: bool) -> RntResult<()> {
        self.exchange(&[rq::SUSPEND_POLLING, u8::from(suspend)])?;
        Ok(())
    }

    /// Write a configuration parameter.
    ///
    /// Parameters tied to a feature the adapter lacks are refused without
    /// touching the bus.
    pub fn set_config(&mut self, param: u8, value: &[u8]) -> RntResult<()> {
        if let Some(needed) = feature_for_cfg_param(param)
            && !self.has(needed)
        {
            return Err(RntError::unsupported(format!(
                "configuration parameter {param:#04x} ({needed:?})"
            )));
        }
        let mut cmd = Vec::with_capacity(2 + value.len());
        cmd.push(rq::SET_CONFIG_PARAM);
        cmd.push(param);
        cmd.extend_from_slice(value);
        self.exchange(&cmd)?;
        debug!("Set config {:#04x} = {:02x?}", param, value);
        Ok(())
    }

    /// Read a configuration parameter value.
    pub fn get_config(&mut self, param: u8) -> RntResult<Vec<u8>> {
        let reply = self.exchange(&[rq::GET_CONFIG_PARAM, param])?;
        match reply.get(2..) {
            Some(value) => Ok(value.to_vec()),
            None => Err(RntError::protocol(format!(
                "short reply reading parameter {param:#04x}"
            ))),
        }
    }

    /// Firmware signature, used to match firmware update files.
    pub fn get_signature(&mut self) -> RntResult<String> {
        let reply = self.exchange(&[rq::GET_SIGNATURE])?;
        let hid = &self.info().hid;
        Ok(compat::correct_signature(
            hid.vendor_id,
            hid.product_id,
            reply_string(&reply),
        ))
    }

    /// Type code of the controller on `channel`; see [`crate::controller_name`].
    pub fn get_controller_type(&mut self, channel: u8) -> RntResult<u8> {
        let reply = self.exchange(&[rq::GET_CONTROLLER_TYPE, channel])?;
        reply
            .get(2)
            .copied()
            .ok_or_else(|| RntError::protocol("short controller type reply"))
    }

    pub fn set_vibration(&mut self, channel: u8, on: bool) -> RntResult<()> {
        self.exchange(&[rq::SET_VIBRATION, channel, u8::from(on)])?;
        Ok(())
    }

    /// Ask the firmware to restart into its bootloader. The adapter
    /// disconnects, so no reply is awaited.
    pub fn jump_to_bootloader(&mut self) -> RntResult<()> {
        info!("Requesting bootloader on {}", self.info());
        self.send_only(&[rq::JUMP_TO_BOOTLOADER])
    }

    /// Restart the firmware. No reply is awaited.
    pub fn reset_firmware(&mut self) -> RntResult<()> {
        info!("Resetting {}", self.info());
        self.send_only(&[rq::RESET_FIRMWARE])
    }

    /// Set poll interval `index` (0..=3) in milliseconds.
    pub fn set_poll_interval(&mut self, index: usize, interval_ms: u8) -> RntResult<()> {
        let param = cfg_param::POLL_INTERVALS
            .get(index)
            .copied()
            .ok_or_else(|| RntError::bad_param(format!("poll interval index {index}")))?;
        let min = self.info().caps().min_poll_interval;
        if interval_ms < min.max(1) {
            return Err(RntError::bad_param(format!(
                "poll interval {interval_ms}ms below minimum {}ms",
                min.max(1)
            )));
        }
        self.set_config(param, &[interval_ms])
    }

    /// Switch the adapter mode (see [`crate::requests::mode`]).
    ///
    /// Dynamic firmware refuses modes it did not list.
    pub fn set_mode(&mut self, mode: u8) -> RntResult<()> {
        if let Some(supported) = self.generation().supported()
            && !supported.supports_mode(mode)
        {
            return Err(RntError::unsupported(format!("mode {mode:#04x}")));
        }
        self.set_config(cfg_param::MODE, &[mode])
    }

    /// Suspend polling until the returned guard is dropped.
    ///
    /// Does nothing on adapters without [`Features::SUSPEND_POLLING`] or when
    /// disabled in the configuration.
    pub fn suspend_guard(&mut self) -> RntResult<SuspendGuard<'_>> {
        let active =
            self.config().suspend_polling_for_bulk && self.has(Features::SUSPEND_POLLING);
        if active {
            self.suspend_polling(true)?;
            debug!("Polling suspended");
        }
        Ok(SuspendGuard {
            handle: self,
            active,
        })
    }
}

/// Keeps firmware polling suspended for the guard's lifetime.
#[derive(Debug)]
pub struct SuspendGuard<'a> {
    handle: &'a mut DeviceHandle,
    active: bool,
}

impl SuspendGuard<'_> {
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Deref for SuspendGuard<'_> {
    type Target = DeviceHandle;

    fn deref(&self) -> &DeviceHandle {
        self.handle
    }
}

impl DerefMut for SuspendGuard<'_> {
    fn deref_mut(&mut self) -> &mut DeviceHandle {
        self.handle
    }
}

impl Drop for SuspendGuard<'_> {
    fn drop(&mut self) {
        if self.active {
            match self.handle.suspend_polling(false) {
                Ok(()) => debug!("Polling resumed"),
                Err(e) => warn!("Could not resume polling: {}", e),
            }
        }
    }
}
