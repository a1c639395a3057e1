//! The protocol error enum.

use core::fmt;

use crate::common::{ErrorCategory, ErrorSeverity};

/// Which integrity check rejected the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumKind {
    /// CRC-8 trailing a Controller Pak block
    PakData,
    /// Game Boy cartridge header checksum (0x14D)
    CartridgeHeader,
    /// XOR over a memory card sector reply
    SectorXor,
    /// Memory card rejected the checksum of a written sector
    CardWriteStatus,
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumKind::PakData => write!(f, "pak data CRC"),
            ChecksumKind::CartridgeHeader => write!(f, "cartridge header checksum"),
            ChecksumKind::SectorXor => write!(f, "sector XOR checksum"),
            ChecksumKind::CardWriteStatus => write!(f, "card write checksum status"),
        }
    }
}

/// Errors surfaced by every adapter operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RntError {
    /// Sending or receiving a feature report failed
    #[error("I/O error: {0}")]
    Io(String),

    /// No reply arrived within the exchange window
    #[error("No reply after {timeout_ms}ms")]
    Timeout {
        /// Exchange window in milliseconds
        timeout_ms: u64,
    },

    /// The reply had an unexpected shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Accessory or cartridge absent or not answering as expected
    #[error("No device detected")]
    NoDeviceDetected,

    /// Memory card ID marker missing from the reply
    #[error("No memory card detected")]
    NoCardDetected,

    /// Memory card did not acknowledge the command
    #[error("Memory card did not acknowledge the command")]
    NoCommandAck,

    /// Memory card echoed or rejected a sector number
    #[error("Invalid sector {0}")]
    InvalidSector(u16),

    /// An integrity check failed
    #[error("Bad checksum: {0}")]
    BadChecksum(ChecksumKind),

    /// Cartridge type or adapter feature not handled
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The progress sink asked to stop
    #[error("Cancelled by user")]
    UserCancelled,

    /// A whole-memory buffer could not be allocated
    #[error("Out of memory allocating {requested} bytes")]
    OutOfMemory {
        /// Requested buffer size
        requested: usize,
    },

    /// Caller-supplied size, alignment or value is invalid
    #[error("Bad parameter: {0}")]
    BadParam(String),

    /// Memory card returned an unrecognised status
    #[error("Unknown status: {0}")]
    Unknown(String),

    /// RAM operation requested on a cartridge without RAM
    #[error("Cartridge has no RAM")]
    NoCartridgeRam,

    /// Read-back after a write differs from what was written
    #[error("Verify mismatch at offset {offset:#x}")]
    VerifyMismatch {
        /// First differing byte offset
        offset: usize,
    },

    /// The adapter has no data interface
    #[error("Adapter has no management interface")]
    LegacyDevice,

    /// No adapter matched the requested filter
    #[error("No adapter found: {0}")]
    DeviceNotFound(String),
}

impl RntError {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            RntError::Io(_) | RntError::Timeout { .. } => ErrorCategory::Transport,
            RntError::Protocol(_) | RntError::Unknown(_) | RntError::NoCommandAck => {
                ErrorCategory::Protocol
            }
            RntError::NoDeviceDetected
            | RntError::NoCardDetected
            | RntError::LegacyDevice
            | RntError::DeviceNotFound(_)
            | RntError::NoCartridgeRam => ErrorCategory::Device,
            RntError::BadChecksum(_)
            | RntError::InvalidSector(_)
            | RntError::VerifyMismatch { .. } => ErrorCategory::Integrity,
            RntError::Unsupported(_) | RntError::BadParam(_) | RntError::OutOfMemory { .. } => {
                ErrorCategory::Caller
            }
            RntError::UserCancelled => ErrorCategory::Cancelled,
        }
    }

    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RntError::UserCancelled => ErrorSeverity::Info,
            RntError::Timeout { .. } | RntError::Unsupported(_) | RntError::NoCartridgeRam => {
                ErrorSeverity::Warning
            }
            RntError::VerifyMismatch { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Check if re-running the whole operation might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RntError::Io(_)
                | RntError::Timeout { .. }
                | RntError::Protocol(_)
                | RntError::BadChecksum(ChecksumKind::PakData | ChecksumKind::SectorXor)
                | RntError::NoCommandAck
        )
    }

    /// Check if the error is a user abort rather than a failure.
    pub fn is_user_cancel(&self) -> bool {
        matches!(self, RntError::UserCancelled)
    }

    /// Create an I/O error.
    pub fn io(msg: impl Into<String>) -> Self {
        RntError::Io(msg.into())
    }

    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        RntError::Protocol(msg.into())
    }

    /// Create an unsupported error.
    pub fn unsupported(what: impl Into<String>) -> Self {
        RntError::Unsupported(what.into())
    }

    /// Create a bad parameter error.
    pub fn bad_param(msg: impl Into<String>) -> Self {
        RntError::BadParam(msg.into())
    }
}

impl From<std::io::Error> for RntError {
    fn from(e: std::io::Error) -> Self {
        RntError::Io(e.to_string())
    }
}

impl From<std::collections::TryReserveError> for RntError {
    fn from(_: std::collections::TryReserveError) -> Self {
        RntError::OutOfMemory { requested: 0 }
    }
}
