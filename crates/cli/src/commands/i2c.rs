//! I2C bus commands for Wii extension adapters.

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};
use rnt_adapter::extension_name;
use serde_json::json;

use crate::commands::{Context, I2cCommands};
use crate::output;

pub fn execute(cmd: &I2cCommands, ctx: &Context) -> Result<()> {
    match cmd {
        I2cCommands::Detect { channel } => detect(ctx, *channel),
        I2cCommands::Dump { channel, output } => dump(ctx, *channel, output.as_deref()),
    }
}

fn detect(ctx: &Context, channel: u8) -> Result<()> {
    let mut handle = ctx.open()?;
    let found = handle.i2c_detect(channel)?;
    if ctx.json {
        output::print_json(json!({ "channel": channel, "addresses": found }));
    } else if found.is_empty() {
        println!("No I2C devices on channel {channel}");
    } else {
        let list: Vec<String> = found.iter().map(|a| format!("{a:#04x}")).collect();
        println!("Channel {channel}: {}", list.join(", "));
    }
    Ok(())
}

fn dump(ctx: &Context, channel: u8, path: Option<&Path>) -> Result<()> {
    let mut handle = ctx.open()?;
    handle.disable_extension_encryption(channel)?;
    let id = handle.extension_id(channel)?;
    let memory = handle.dump_extension_memory(channel)?;

    if let Some(path) = path {
        fs::write(path, &memory).with_context(|| format!("writing {}", path.display()))?;
    }
    if ctx.json {
        output::print_json(json!({
            "channel": channel,
            "id": id,
            "name": extension_name(id),
            "memory": memory,
        }));
    } else {
        println!("Extension {id:#06x}: {}", extension_name(id));
        println!("{}", output::hex_dump(&memory));
    }
    Ok(())
}
