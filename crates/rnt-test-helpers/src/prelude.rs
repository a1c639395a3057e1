//! Convenience re-exports for common test utilities.

pub use crate::must::{must, must_some, must_with};
pub use crate::sim::{
    Accessory, GbCartridge, I2cDevice, Mbc, MemoryCard, PsxPad, SimulatedAdapter, TransferPak,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
