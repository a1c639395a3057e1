//! Feature-report transport seam and its hidapi backend.

use std::ffi::CString;

use hidapi::{HidApi, HidDevice};
use tracing::debug;

use crate::{HidCommonError, HidCommonResult, HidDeviceInfo};

/// Report ID used by every adapter (they declare a single report).
pub const REPORT_ID: u8 = 0x00;

/// Raw access to HID feature reports.
///
/// Buffers passed in both directions start with the report ID byte.
/// Implementations are used by one thread at a time; the protocol layer
/// never issues overlapping requests.
pub trait FeatureTransport: Send {
    /// Send `data` (report ID first) as a feature report.
    fn send_feature_report(&mut self, data: &[u8]) -> HidCommonResult<()>;

    /// Read a feature report into `buf`, whose first byte holds the report ID
    /// on entry. Returns the number of bytes written including the report ID;
    /// `0` means the device has nothing to report yet.
    fn get_feature_report(&mut self, buf: &mut [u8]) -> HidCommonResult<usize>;
}

impl<T: FeatureTransport + ?Sized> FeatureTransport for Box<T> {
    fn send_feature_report(&mut self, data: &[u8]) -> HidCommonResult<()> {
        (**self).send_feature_report(data)
    }

    fn get_feature_report(&mut self, buf: &mut [u8]) -> HidCommonResult<usize> {
        (**self).get_feature_report(buf)
    }
}

/// [`FeatureTransport`] over an opened hidapi device.
pub struct HidApiTransport {
    device: HidDevice,
    path: String,
}

impl HidApiTransport {
    /// Open the device at `path` (as reported by enumeration).
    pub fn open(api: &HidApi, path: &str) -> HidCommonResult<Self> {
        let c_path =
            CString::new(path).map_err(|e| HidCommonError::OpenError(format!("{path}: {e}")))?;
        let device = api
            .open_path(&c_path)
            .map_err(|e| HidCommonError::OpenError(format!("{path}: {e}")))?;
        debug!("Opened HID path {}", path);
        Ok(Self {
            device,
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl FeatureTransport for HidApiTransport {
    fn send_feature_report(&mut self, data: &[u8]) -> HidCommonResult<()> {
        self.device
            .send_feature_report(data)
            .map_err(|e| HidCommonError::WriteError(e.to_string()))
    }

    fn get_feature_report(&mut self, buf: &mut [u8]) -> HidCommonResult<usize> {
        self.device
            .get_feature_report(buf)
            .map_err(|e| HidCommonError::ReadError(e.to_string()))
    }
}

/// List every HID interface whose vendor ID is in `vendor_ids`.
pub fn enumerate_vendors(api: &HidApi, vendor_ids: &[u16]) -> Vec<HidDeviceInfo> {
    api.device_list()
        .filter(|dev| vendor_ids.contains(&dev.vendor_id()))
        .map(HidDeviceInfo::from_hidapi)
        .collect()
}
