//! Shared test utilities for the raphnet tools workspace.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with good error messages and `#[track_caller]`
//! - [`sim`] - A software adapter speaking the management protocol, with
//!   simulated N64 accessories, PlayStation memory cards and I2C devices
//! - [`prelude`] - Convenience re-exports
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! rnt-test-helpers = { workspace = true }
//! ```
//!
//! ```rust,ignore
//! use rnt_test_helpers::prelude::*;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::unwrap_used, clippy::panic, reason = "test support code")]

pub mod must;
pub mod prelude;
pub mod sim;

pub use must::*;
pub use sim::{
    Accessory, GbCartridge, I2cDevice, Mbc, MemoryCard, PsxPad, SimulatedAdapter, TransferPak,
};
