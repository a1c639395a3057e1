//! Enumeration records for HID interfaces

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidDeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    /// USB interface number, `-1` when the platform does not report one.
    pub interface_number: i32,
    /// bcdDevice; adapters encode their firmware major.minor here.
    pub release_number: u16,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product_name: Option<String>,
    pub path: String,
}

impl HidDeviceInfo {
    pub fn new(vendor_id: u16, product_id: u16, path: String) -> Self {
        Self {
            vendor_id,
            product_id,
            interface_number: -1,
            release_number: 0,
            serial_number: None,
            manufacturer: None,
            product_name: None,
            path,
        }
    }

    pub fn from_hidapi(dev: &hidapi::DeviceInfo) -> Self {
        Self {
            vendor_id: dev.vendor_id(),
            product_id: dev.product_id(),
            interface_number: dev.interface_number(),
            release_number: dev.release_number(),
            serial_number: dev.serial_number().map(str::to_string),
            manufacturer: dev.manufacturer_string().map(str::to_string),
            product_name: dev.product_string().map(str::to_string),
            path: dev.path().to_string_lossy().into_owned(),
        }
    }

    pub fn with_interface(mut self, interface_number: i32) -> Self {
        self.interface_number = interface_number;
        self
    }

    pub fn with_release(mut self, release_number: u16) -> Self {
        self.release_number = release_number;
        self
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    pub fn with_product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }

    /// Release number split as (major, minor), one byte each.
    pub fn release_version(&self) -> (u8, u8) {
        let [major, minor] = self.release_number.to_be_bytes();
        (major, minor)
    }

    pub fn display_name(&self) -> String {
        self.product_name
            .clone()
            .or_else(|| self.manufacturer.clone())
            .unwrap_or_else(|| format!("{:04x}:{:04x}", self.vendor_id, self.product_id))
    }
}

impl Default for HidDeviceInfo {
    fn default() -> Self {
        Self::new(0, 0, String::new())
    }
}
