//! Raphnet adapter management protocol: transport exchange, capability
//! model, configuration requests and batched bus I/O.
//!
//! Every request is a HID feature report whose first payload byte is the
//! opcode. A [`DeviceHandle`] owns the connection, performs one exchange at
//! a time and knows what the firmware behind it supports.

#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod block_io;
pub mod commands;
pub mod compat;
pub mod config;
pub mod device;
pub mod features;
pub mod i2c;
pub mod ids;
pub mod progress;
pub mod registry;
pub mod requests;
pub mod si;

// Flat re-exports so callers can use `rnt_adapter::Foo`.
pub use block_io::{
    BIO_RX_LEN_PARTIAL, BIO_RX_LEN_TIMEDOUT, BIO_RXTX_MASK, BLOCK_IO_FRAME_SIZE, BlockIoOp,
    BlockIoStatus, decode_block_io, encode_block_io,
};
pub use commands::SuspendGuard;
pub use config::AdapterConfig;
pub use device::{
    AdapterFilter, AdapterInfo, DeviceGeneration, DeviceHandle, filter_adapters, list_adapters,
};
pub use features::{Features, SupportedSets, derive_features};
pub use i2c::{EXTENSION_ADDR, I2cTransaction, extension_name};
pub use ids::{ALL_VENDOR_IDS, OUR_VENDOR_ID, product_ids};
pub use progress::{CancelAt, ContinueOrCancel, NoProgress, ProgressSink};
pub use registry::{AdapterCaps, REGISTRY, RegistryEntry, lookup};
pub use requests::{cfg_param, cfg_param_name, controller_name, ctl_type, mode, parse_cfg_param, rq};
pub use si::{N64Caps, N64_EXPANSION_READ, N64_EXPANSION_WRITE, N64_GET_CAPS};

pub use rnt_errors::{RntError, RntResult};
