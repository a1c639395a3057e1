//! Controller Pak transfers.

use std::path::Path;

use anyhow::{Context as _, Result};
use rnt_n64::{ControllerPak, ControllerPakImage, MEMPAK_SIZE};
use serde_json::json;

use crate::commands::{Context, MempakCommands};
use crate::output;
use crate::progress::BarProgress;

pub fn execute(cmd: &MempakCommands, ctx: &Context) -> Result<()> {
    match cmd {
        MempakCommands::Dump { channel, output } => dump(ctx, *channel, output),
        MempakCommands::Write { channel, input } => write(ctx, *channel, input),
        MempakCommands::Fill { channel, pattern } => fill(ctx, *channel, *pattern),
        MempakCommands::Stress { channel, seed } => stress(ctx, *channel, *seed),
    }
}

fn dump(ctx: &Context, channel: u8, path: &Path) -> Result<()> {
    let mut handle = ctx.open()?;
    let mut guard = handle.suspend_guard()?;
    let mut pak = ControllerPak::detect(&mut guard, channel)?;

    let mut image = ControllerPakImage::default();
    let mut bar = BarProgress::new(MEMPAK_SIZE, "Reading pak", ctx.json)?;
    pak.download(&mut image, &mut bar)?;
    bar.finish();

    image
        .save(path)
        .with_context(|| format!("saving pak image to {}", path.display()))?;
    output::print_success(&format!("Controller Pak saved to {}", path.display()), ctx.json);
    Ok(())
}

fn write(ctx: &Context, channel: u8, path: &Path) -> Result<()> {
    let image = ControllerPakImage::load(path)
        .with_context(|| format!("loading pak image {}", path.display()))?;
    let mut handle = ctx.open()?;
    ctx.confirm(&format!(
        "Overwrite the Controller Pak on channel {channel} with {}?",
        path.display()
    ))?;

    let mut guard = handle.suspend_guard()?;
    let mut pak = ControllerPak::detect(&mut guard, channel)?;
    let mut bar = BarProgress::new(MEMPAK_SIZE, "Writing pak", ctx.json)?;
    pak.upload(&image, &mut bar)?;
    bar.finish();

    output::print_success(&format!("Controller Pak written from {}", path.display()), ctx.json);
    Ok(())
}

fn fill(ctx: &Context, channel: u8, pattern: u8) -> Result<()> {
    let mut handle = ctx.open()?;
    ctx.confirm(&format!("Erase the Controller Pak on channel {channel}?"))?;

    let mut guard = handle.suspend_guard()?;
    let mut pak = ControllerPak::detect(&mut guard, channel)?;
    let mut bar = BarProgress::new(2 * MEMPAK_SIZE, "Filling pak", ctx.json)?;
    pak.fill(pattern, &mut bar)?;
    bar.finish();

    output::print_success(&format!("Controller Pak filled with {pattern:#04x}"), ctx.json);
    Ok(())
}

fn stress(ctx: &Context, channel: u8, seed: u16) -> Result<()> {
    let mut handle = ctx.open()?;
    ctx.confirm(&format!(
        "The stress test erases the Controller Pak on channel {channel}. Continue?"
    ))?;

    let mut guard = handle.suspend_guard()?;
    let mut pak = ControllerPak::detect(&mut guard, channel)?;
    let mut bar = BarProgress::new(2 * MEMPAK_SIZE, "Stress test", ctx.json)?;
    pak.stress_test(seed, &mut bar)?;
    bar.finish();

    if ctx.json {
        output::print_json(json!({ "channel": channel, "seed": seed, "passed": true }));
    } else {
        output::print_success("Stress test passed", false);
    }
    Ok(())
}
