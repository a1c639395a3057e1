//! Error classification shared by every adapter crate.

use core::fmt;

/// Broad origin of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// The HID transport failed or did not answer in time
    Transport = 0,
    /// The adapter answered with something malformed
    Protocol = 1,
    /// An accessory, cartridge or card is missing or misbehaving
    Device = 2,
    /// Stored data failed an integrity check
    Integrity = 3,
    /// The request itself was invalid or not supported
    Caller = 4,
    /// The operation was stopped on request
    Cancelled = 5,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Transport => write!(f, "Transport"),
            ErrorCategory::Protocol => write!(f, "Protocol"),
            ErrorCategory::Device => write!(f, "Device"),
            ErrorCategory::Integrity => write!(f, "Integrity"),
            ErrorCategory::Caller => write!(f, "Caller"),
            ErrorCategory::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorSeverity {
    /// Informational, no action required
    Info = 0,
    /// Warning, may require attention
    Warning = 1,
    /// Error, operation failed
    Error = 2,
    /// Critical, device-side data may be inconsistent
    Critical = 3,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
