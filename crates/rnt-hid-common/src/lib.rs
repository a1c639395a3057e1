//! Common HID plumbing for raphnet adapter protocol implementations
//!
//! Adapters are driven exclusively through HID feature reports (report ID 0).
//! This crate provides the [`FeatureTransport`] seam the protocol crates are
//! written against, a hidapi-backed implementation, enumeration records and
//! bounds-checked cursors for building and walking report payloads.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod device_info;
pub mod mock;
pub mod report_parser;
pub mod transport;

pub use device_info::*;
pub use report_parser::*;
pub use transport::*;

use rnt_errors::RntError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HidCommonError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open device: {0}")]
    OpenError(String),

    #[error("Failed to read from device: {0}")]
    ReadError(String),

    #[error("Failed to write to device: {0}")]
    WriteError(String),

    #[error("Invalid report format: {0}")]
    InvalidReport(String),

    #[error("Report overflow: {needed} bytes needed, {capacity} available")]
    Overflow { needed: usize, capacity: usize },

    #[error("Device disconnected")]
    Disconnected,

    #[error("HID API error: {0}")]
    Api(#[from] hidapi::HidError),
}

pub type HidCommonResult<T> = Result<T, HidCommonError>;

impl From<HidCommonError> for RntError {
    fn from(err: HidCommonError) -> Self {
        match err {
            HidCommonError::InvalidReport(msg) => RntError::Protocol(msg),
            HidCommonError::Overflow { .. } => RntError::Protocol(err.to_string()),
            HidCommonError::DeviceNotFound(msg) => RntError::DeviceNotFound(msg),
            other => RntError::Io(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        let err = HidCommonError::DeviceNotFound("test".to_string());
        assert_eq!(format!("{}", err), "Device not found: test");

        let err = HidCommonError::Disconnected;
        assert_eq!(format!("{}", err), "Device disconnected");
    }

    #[test]
    fn test_conversion_into_protocol_errors() {
        let err: RntError = HidCommonError::InvalidReport("short".to_string()).into();
        assert_eq!(err, RntError::Protocol("short".to_string()));

        let err: RntError = HidCommonError::WriteError("stall".to_string()).into();
        assert!(matches!(err, RntError::Io(_)));
    }
}
