//! rntctl - raphnet adapter command-line tool
//!
//! Lists and configures raphnet USB adapters and moves data to and from the
//! accessories behind them: N64 Controller Paks, Game Boy cartridges in a
//! Transfer Pak and PlayStation memory cards.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod config;
mod error;
mod output;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use rnt_adapter::AdapterFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{
    Context, HexBytes, I2cCommands, MempakCommands, PsxCommands, XferCommands, parse_hex_arg,
    parse_hex_u16,
};

#[derive(Parser, Debug)]
#[command(name = "rntctl")]
#[command(about = "Configure raphnet USB adapters and transfer accessory data")]
#[command(version)]
#[command(long_about = "
rntctl talks to raphnet USB adapters through their HID management interface.
It reads and changes adapter settings, and dumps or restores N64 Controller
Paks, Game Boy cartridges in an N64 Transfer Pak and PlayStation memory cards.

Use --json for machine-readable output. Progress is drawn on stderr.
")]
struct Cli {
    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Adapter configuration file (JSON)
    #[arg(long, global = true, env = "RNT_CONFIG")]
    config: Option<PathBuf>,

    /// Only use adapters with this USB vendor ID (hex)
    #[arg(long, global = true, value_parser = parse_hex_u16)]
    vid: Option<u16>,

    /// Only use adapters with this USB product ID (hex)
    #[arg(long, global = true, value_parser = parse_hex_u16)]
    pid: Option<u16>,

    /// Only use the adapter with this serial number
    #[arg(long, global = true)]
    serial: Option<String>,

    /// Only use the adapter at this HID path
    #[arg(long, global = true)]
    path: Option<String>,

    /// Do not ask before overwriting accessories
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List connected adapters
    List,

    /// Show firmware version, capabilities and channel count
    Info,

    /// Write a configuration parameter
    SetConfig {
        /// Parameter name (e.g. invert_trig) or number
        param: String,
        /// Value bytes, decimal or 0x-prefixed hex
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Read a configuration parameter
    GetConfig {
        /// Parameter name (e.g. poll_interval0) or number
        param: String,
    },

    /// Report the controller type plugged into a channel
    ControllerType {
        #[arg(short, long, default_value_t = 0)]
        channel: u8,
    },

    /// Switch a controller's rumble motor
    #[command(group(ArgGroup::new("state").required(true).args(["on", "off"])))]
    Vibrate {
        #[arg(short, long, default_value_t = 0)]
        channel: u8,
        #[arg(long)]
        on: bool,
        #[arg(long)]
        off: bool,
    },

    /// Restart the adapter into its bootloader
    Bootloader,

    /// Restart the adapter firmware
    Reset,

    /// Send a raw N64/GameCube command and print the reply
    RawSi {
        #[arg(short, long, default_value_t = 0)]
        channel: u8,
        /// Command bytes in hex, e.g. "01" or "02 80 01"
        #[arg(value_parser = parse_hex_arg)]
        bytes: HexBytes,
        /// Longest reply to keep
        #[arg(long, default_value_t = 64)]
        max_rx: usize,
    },

    /// N64 Controller Pak transfers
    #[command(subcommand)]
    Mempak(MempakCommands),

    /// Game Boy cartridge access through an N64 Transfer Pak
    #[command(subcommand)]
    Xfer(XferCommands),

    /// PlayStation memory card transfers
    #[command(subcommand)]
    Psx(PsxCommands),

    /// I2C bus access on Wii extension adapters
    #[command(subcommand)]
    I2c(I2cCommands),
}

impl Cli {
    fn filter(&self) -> AdapterFilter {
        AdapterFilter {
            vendor_id: self.vid,
            product_id: self.pid,
            serial: self.serial.clone(),
            path: self.path.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }
            ExitCode::from(error::exit_code(&e))
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let ctx = Context {
        json: cli.json,
        assume_yes: cli.yes,
        filter: cli.filter(),
        config: config::load_config(cli.config.as_deref())?,
    };
    execute_command(&cli.command, &ctx)
}

fn execute_command(command: &Commands, ctx: &Context) -> Result<()> {
    match command {
        Commands::List => commands::device::list(ctx),
        Commands::Info => commands::device::info(ctx),
        Commands::SetConfig { param, values } => commands::device::set_config(ctx, param, values),
        Commands::GetConfig { param } => commands::device::get_config(ctx, param),
        Commands::ControllerType { channel } => commands::device::controller_type(ctx, *channel),
        Commands::Vibrate { channel, on, off } => {
            commands::device::vibrate(ctx, *channel, *on && !*off)
        }
        Commands::Bootloader => commands::device::bootloader(ctx),
        Commands::Reset => commands::device::reset(ctx),
        Commands::RawSi {
            channel,
            bytes,
            max_rx,
        } => commands::device::raw_si(ctx, *channel, &bytes.0, *max_rx),
        Commands::Mempak(cmd) => commands::mempak::execute(cmd, ctx),
        Commands::Xfer(cmd) => commands::xfer::execute(cmd, ctx),
        Commands::Psx(cmd) => commands::psx::execute(cmd, ctx),
        Commands::I2c(cmd) => commands::i2c::execute(cmd, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    // --- Global flag parsing ---

    #[test]
    fn parse_list_defaults() -> TestResult {
        let cli = Cli::try_parse_from(["rntctl", "list"])?;
        assert!(!cli.json);
        assert!(!cli.yes);
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.filter(), AdapterFilter::default());
        assert!(matches!(cli.command, Commands::List));
        Ok(())
    }

    #[test]
    fn parse_verbose_levels() -> TestResult {
        let cli1 = Cli::try_parse_from(["rntctl", "-v", "info"])?;
        assert_eq!(cli1.verbose, 1);
        let cli3 = Cli::try_parse_from(["rntctl", "-vvv", "info"])?;
        assert_eq!(cli3.verbose, 3);
        Ok(())
    }

    #[test]
    fn parse_selection_flags_build_filter() -> TestResult {
        let cli = Cli::try_parse_from([
            "rntctl", "--vid", "289b", "--pid", "0x0032", "--serial", "A1", "info",
        ])?;
        let filter = cli.filter();
        assert_eq!(filter.vendor_id, Some(0x289B));
        assert_eq!(filter.product_id, Some(0x0032));
        assert_eq!(filter.serial.as_deref(), Some("A1"));
        assert_eq!(filter.path, None);
        Ok(())
    }

    #[test]
    fn parse_global_flags_after_subcommand() -> TestResult {
        let cli = Cli::try_parse_from(["rntctl", "list", "--json", "--pid", "1740"])?;
        assert!(cli.json);
        assert_eq!(cli.pid, Some(0x1740));
        Ok(())
    }

    #[test]
    fn parse_bad_vid_is_rejected() {
        assert!(Cli::try_parse_from(["rntctl", "--vid", "nope", "list"]).is_err());
    }

    // --- Adapter commands ---

    #[test]
    fn parse_set_config_values() -> TestResult {
        let cli = Cli::try_parse_from(["rntctl", "set-config", "invert_trig", "1"])?;
        match cli.command {
            Commands::SetConfig { param, values } => {
                assert_eq!(param, "invert_trig");
                assert_eq!(values, vec!["1".to_string()]);
            }
            other => return Err(format!("unexpected command {other:?}").into()),
        }
        assert!(Cli::try_parse_from(["rntctl", "set-config", "invert_trig"]).is_err());
        Ok(())
    }

    #[test]
    fn parse_vibrate_requires_a_state() -> TestResult {
        let cli = Cli::try_parse_from(["rntctl", "vibrate", "--channel", "1", "--on"])?;
        assert!(matches!(
            cli.command,
            Commands::Vibrate {
                channel: 1,
                on: true,
                off: false
            }
        ));
        assert!(Cli::try_parse_from(["rntctl", "vibrate"]).is_err());
        assert!(Cli::try_parse_from(["rntctl", "vibrate", "--on", "--off"]).is_err());
        Ok(())
    }

    #[test]
    fn parse_raw_si_bytes() -> TestResult {
        let cli = Cli::try_parse_from(["rntctl", "raw-si", "-c", "2", "02 80 01"])?;
        match cli.command {
            Commands::RawSi {
                channel,
                bytes,
                max_rx,
            } => {
                assert_eq!(channel, 2);
                assert_eq!(bytes, HexBytes(vec![0x02, 0x80, 0x01]));
                assert_eq!(max_rx, 64);
            }
            other => return Err(format!("unexpected command {other:?}").into()),
        }
        assert!(Cli::try_parse_from(["rntctl", "raw-si", "0g"]).is_err());
        Ok(())
    }

    // --- Accessory commands ---

    #[test]
    fn parse_mempak_commands() -> TestResult {
        let cli = Cli::try_parse_from(["rntctl", "mempak", "dump", "pak.mpk"])?;
        match cli.command {
            Commands::Mempak(MempakCommands::Dump { channel, output }) => {
                assert_eq!(channel, 0);
                assert_eq!(output, PathBuf::from("pak.mpk"));
            }
            other => return Err(format!("unexpected command {other:?}").into()),
        }

        let cli = Cli::try_parse_from(["rntctl", "mempak", "fill", "--pattern", "0xAA"])?;
        assert!(matches!(
            cli.command,
            Commands::Mempak(MempakCommands::Fill { pattern: 0xAA, .. })
        ));

        let cli = Cli::try_parse_from(["rntctl", "mempak", "stress"])?;
        assert!(matches!(
            cli.command,
            Commands::Mempak(MempakCommands::Stress { seed: 0xACE1, .. })
        ));
        Ok(())
    }

    #[test]
    fn parse_xfer_write_ram_no_verify() -> TestResult {
        let cli = Cli::try_parse_from([
            "rntctl", "-y", "xfer", "write-ram", "-c", "1", "save.sav.gz", "--no-verify",
        ])?;
        assert!(cli.yes);
        match cli.command {
            Commands::Xfer(XferCommands::WriteRam {
                channel,
                input,
                no_verify,
            }) => {
                assert_eq!(channel, 1);
                assert_eq!(input, PathBuf::from("save.sav.gz"));
                assert!(no_verify);
            }
            other => return Err(format!("unexpected command {other:?}").into()),
        }
        Ok(())
    }

    #[test]
    fn parse_psx_and_i2c_commands() -> TestResult {
        let cli = Cli::try_parse_from(["rntctl", "psx", "write", "--channel", "1", "card.mcr"])?;
        assert!(matches!(
            cli.command,
            Commands::Psx(PsxCommands::Write { channel: 1, .. })
        ));

        let cli = Cli::try_parse_from(["rntctl", "i2c", "dump", "-o", "ext.bin"])?;
        match cli.command {
            Commands::I2c(I2cCommands::Dump { channel, output }) => {
                assert_eq!(channel, 0);
                assert_eq!(output, Some(PathBuf::from("ext.bin")));
            }
            other => return Err(format!("unexpected command {other:?}").into()),
        }
        Ok(())
    }

    #[test]
    fn parse_unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["rntctl", "flash"]).is_err());
        assert!(Cli::try_parse_from(["rntctl", "xfer", "dump-rom"]).is_err());
    }
}
