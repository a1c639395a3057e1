//! Error types for the raphnet adapter protocol stack.
//!
//! Every layer (transport, batched I/O, Controller Pak, Transfer Pak and the
//! memory card protocol) reports failures through [`RntError`]. The variants
//! are deliberately flat so callers can match on the exact outcome: absence
//! of an accessory, corruption, protocol desync or a user abort all look
//! different.
//!
//! # Example
//!
//! ```
//! use rnt_errors::prelude::*;
//!
//! fn check_alignment(addr: u16) -> RntResult<u16> {
//!     if addr % 32 != 0 {
//!         return Err(RntError::bad_param(format!("address {addr:#06x} is not block aligned")));
//!     }
//!     Ok(addr)
//! }
//!
//! assert!(check_alignment(0x0020).is_ok());
//! assert_eq!(check_alignment(0x0021).map_err(|e| e.category()), Err(ErrorCategory::Caller));
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod common;
pub mod prelude;
pub mod protocol;

pub use common::{ErrorCategory, ErrorSeverity};
pub use protocol::{ChecksumKind, RntError};

/// A specialized `Result` type for adapter operations.
pub type RntResult<T> = std::result::Result<T, RntError>;
