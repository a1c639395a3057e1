//! Error types for rntctl

use rnt_errors::RntError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Not supported by this adapter: {0}")]
    NotSupported(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Process exit code for a failed command.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    if let Some(cli) = error.downcast_ref::<CliError>() {
        return match cli {
            CliError::InvalidArgument(_)
            | CliError::InvalidConfiguration(_)
            | CliError::JsonError(_) => 4,
            CliError::NotSupported(_) => 5,
            CliError::Cancelled => 130,
            CliError::IoError(_) => 1,
        };
    }
    match error.downcast_ref::<RntError>() {
        Some(RntError::DeviceNotFound(_)) => 2,
        Some(RntError::NoDeviceDetected | RntError::NoCardDetected | RntError::NoCartridgeRam) => 3,
        Some(RntError::BadParam(_)) => 4,
        Some(RntError::Unsupported(_) | RntError::LegacyDevice) => 5,
        Some(RntError::UserCancelled) => 130,
        _ => 1,
    }
}
