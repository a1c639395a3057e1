//! Transfer Pak cartridge commands.

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};
use rnt_n64::{CartridgeInfo, CartridgeSession, load_save_file};
use serde_json::{Value, json};

use crate::commands::{Context, XferCommands};
use crate::output;
use crate::progress::BarProgress;

pub fn execute(cmd: &XferCommands, ctx: &Context) -> Result<()> {
    match cmd {
        XferCommands::Info { channel } => info(ctx, *channel),
        XferCommands::DumpRom { channel, output } => dump_rom(ctx, *channel, output),
        XferCommands::DumpRam { channel, output } => dump_ram(ctx, *channel, output),
        XferCommands::WriteRam {
            channel,
            input,
            no_verify,
        } => write_ram(ctx, *channel, input, !*no_verify),
    }
}

fn cart_json(info: &CartridgeInfo) -> Value {
    json!({
        "title": info.title,
        "type": info.cart_type,
        "type_name": info.type_name(),
        "rom_size": info.rom_size,
        "ram_size": info.ram_size,
        "japanese": info.is_japanese(),
    })
}

fn info(ctx: &Context, channel: u8) -> Result<()> {
    let mut handle = ctx.open()?;
    let mut guard = handle.suspend_guard()?;
    let mut session = CartridgeSession::open(&mut guard, channel)?;
    let info = session.read_info()?;
    session.close()?;

    if ctx.json {
        output::print_json(json!({ "cartridge": cart_json(&info) }));
    } else {
        println!("{info}");
    }
    Ok(())
}

fn save(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data).with_context(|| format!("writing {}", path.display()))
}

fn dump_rom(ctx: &Context, channel: u8, path: &Path) -> Result<()> {
    let mut handle = ctx.open()?;
    let mut guard = handle.suspend_guard()?;
    let mut session = CartridgeSession::open(&mut guard, channel)?;

    let header = session.read_info()?;
    let mut bar = BarProgress::new(header.rom_size, "Reading ROM", ctx.json)?;
    let (info, rom) = session.read_rom(&mut bar)?;
    bar.finish();
    session.close()?;

    save(path, &rom)?;
    output::print_success(
        &format!("{} ROM ({} bytes) saved to {}", info.title, rom.len(), path.display()),
        ctx.json,
    );
    Ok(())
}

fn dump_ram(ctx: &Context, channel: u8, path: &Path) -> Result<()> {
    let mut handle = ctx.open()?;
    let mut guard = handle.suspend_guard()?;
    let mut session = CartridgeSession::open(&mut guard, channel)?;

    let header = session.read_info()?;
    let mut bar = BarProgress::new(header.ram_size, "Reading RAM", ctx.json)?;
    let (info, ram) = session.read_ram(&mut bar)?;
    bar.finish();
    session.close()?;

    save(path, &ram)?;
    output::print_success(
        &format!("{} RAM ({} bytes) saved to {}", info.title, ram.len(), path.display()),
        ctx.json,
    );
    Ok(())
}

fn write_ram(ctx: &Context, channel: u8, path: &Path, verify_requested: bool) -> Result<()> {
    let data =
        load_save_file(path).with_context(|| format!("loading save file {}", path.display()))?;
    let verify = verify_requested && ctx.config.verify_ram_writes;

    let mut handle = ctx.open()?;
    ctx.confirm(&format!(
        "Overwrite the cartridge RAM on channel {channel} with {}?",
        path.display()
    ))?;

    let mut guard = handle.suspend_guard()?;
    let mut session = CartridgeSession::open(&mut guard, channel)?;
    let passes = if verify { 2 } else { 1 };
    let mut bar = BarProgress::new(passes * data.len(), "Writing RAM", ctx.json)?;
    let info = session.write_ram(&data, verify, &mut bar)?;
    bar.finish();
    session.close()?;

    if !verify {
        output::print_warning("RAM written without read-back verification", ctx.json);
    }
    output::print_success(
        &format!("{} RAM written from {}", info.title, path.display()),
        ctx.json,
    );
    Ok(())
}
