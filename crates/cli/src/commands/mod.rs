//! Command implementations for rntctl

pub mod device;
pub mod i2c;
pub mod mempak;
pub mod psx;
pub mod xfer;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Subcommand;
use dialoguer::Confirm;
use hidapi::HidApi;
use rnt_adapter::{AdapterConfig, AdapterFilter, DeviceHandle};
use tracing::info;

use crate::error::CliError;

/// Everything a command needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct Context {
    pub json: bool,
    pub assume_yes: bool,
    pub filter: AdapterFilter,
    pub config: AdapterConfig,
}

impl Context {
    pub fn hid_api(&self) -> Result<HidApi> {
        HidApi::new().context("initialising hidapi")
    }

    /// Open the first adapter matching the selection flags.
    pub fn open(&self) -> Result<DeviceHandle> {
        let api = self.hid_api()?;
        let handle = DeviceHandle::open_first(&api, &self.filter, self.config.clone())
            .with_context(|| format!("opening {}", self.filter))?;
        info!("Using {}", handle.info());
        Ok(handle)
    }

    /// Ask before a destructive operation unless `--yes` was given.
    pub fn confirm(&self, prompt: &str) -> Result<()> {
        if self.assume_yes {
            return Ok(());
        }
        let accepted = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .context("reading confirmation (use --yes to skip)")?;
        if accepted {
            Ok(())
        } else {
            Err(CliError::Cancelled.into())
        }
    }
}

/// `1234`, `0x1234` or `1234h` style hex, as USB IDs are usually written.
pub fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let t = s.trim();
    let digits = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .or_else(|| t.strip_suffix('h'))
        .unwrap_or(t);
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value '{s}': {e}"))
}

/// Decimal, or hex with a `0x` prefix.
pub fn parse_byte(s: &str) -> Result<u8, String> {
    let t = s.trim();
    let parsed = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => t.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid byte '{s}': {e}"))
}

/// Hex bytes, with or without separators: `01 02`, `01,02` or `0102`.
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    let digits: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != ':')
        .collect();
    if digits.is_empty() || digits.len() % 2 != 0 {
        return Err(format!("'{s}' is not a whole number of hex bytes"));
    }
    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|p| u8::from_str_radix(p, 16).ok())
                .ok_or_else(|| format!("invalid hex byte in '{s}'"))
        })
        .collect()
}

/// Command bytes given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

pub fn parse_hex_arg(s: &str) -> Result<HexBytes, String> {
    parse_hex_bytes(s).map(HexBytes)
}

#[derive(Subcommand, Debug)]
pub enum MempakCommands {
    /// Read the whole Controller Pak to a file (.mpk raw, .n64 with header)
    Dump {
        #[arg(short, long, default_value_t = 0)]
        channel: u8,
        output: PathBuf,
    },

    /// Write a pak image file to the Controller Pak
    Write {
        #[arg(short, long, default_value_t = 0)]
        channel: u8,
        input: PathBuf,
    },

    /// Fill the pak with one byte value and verify it
    Fill {
        #[arg(short, long, default_value_t = 0)]
        channel: u8,
        /// Byte to write, decimal or 0x-prefixed hex
        #[arg(long, default_value = "0", value_parser = parse_byte)]
        pattern: u8,
    },

    /// Write pseudo-random data and verify it
    Stress {
        #[arg(short, long, default_value_t = 0)]
        channel: u8,
        /// LFSR seed in hex
        #[arg(long, default_value = "ace1", value_parser = parse_hex_u16)]
        seed: u16,
    },
}

#[derive(Subcommand, Debug)]
pub enum XferCommands {
    /// Show the cartridge header
    Info {
        #[arg(short, long, default_value_t = 0)]
        channel: u8,
    },

    /// Dump the cartridge ROM to a file
    DumpRom {
        #[arg(short, long, default_value_t = 0)]
        channel: u8,
        output: PathBuf,
    },

    /// Dump the cartridge RAM to a file
    DumpRam {
        #[arg(short, long, default_value_t = 0)]
        channel: u8,
        output: PathBuf,
    },

    /// Write a save file (raw or gzip) to the cartridge RAM
    WriteRam {
        #[arg(short, long, default_value_t = 0)]
        channel: u8,
        input: PathBuf,
        /// Skip reading the RAM back after writing
        #[arg(long)]
        no_verify: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum PsxCommands {
    /// Read the whole memory card to a raw 128 KiB image
    Dump {
        #[arg(short, long, default_value_t = 0)]
        channel: u8,
        output: PathBuf,
    },

    /// Write a raw 128 KiB image to the memory card
    Write {
        #[arg(short, long, default_value_t = 0)]
        channel: u8,
        input: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum I2cCommands {
    /// List the addresses that answer on a channel
    Detect {
        #[arg(short, long, default_value_t = 0)]
        channel: u8,
    },

    /// Identify the Wii extension and dump its register space
    Dump {
        #[arg(short, long, default_value_t = 0)]
        channel: u8,
        /// Also save the 256 bytes to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u16_forms() {
        assert_eq!(parse_hex_u16("289b"), Ok(0x289B));
        assert_eq!(parse_hex_u16("0x1740"), Ok(0x1740));
        assert_eq!(parse_hex_u16("0032h"), Ok(0x0032));
        assert!(parse_hex_u16("xyz").is_err());
    }

    #[test]
    fn test_parse_byte_forms() {
        assert_eq!(parse_byte("255"), Ok(255));
        assert_eq!(parse_byte("0xA5"), Ok(0xA5));
        assert!(parse_byte("256").is_err());
    }

    #[test]
    fn test_parse_hex_bytes_separators() {
        assert_eq!(parse_hex_bytes("01"), Ok(vec![0x01]));
        assert_eq!(parse_hex_bytes("02 80 01"), Ok(vec![0x02, 0x80, 0x01]));
        assert_eq!(parse_hex_bytes("0280,01"), Ok(vec![0x02, 0x80, 0x01]));
        assert!(parse_hex_bytes("028").is_err());
        assert!(parse_hex_bytes("").is_err());
        assert!(parse_hex_bytes("zz").is_err());
    }
}
