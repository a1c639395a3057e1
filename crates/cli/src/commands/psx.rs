//! PlayStation memory card commands.

use std::path::Path;

use anyhow::{Context as _, Result};
use rnt_psx::{CARD_SIZE, MemoryCard, MemoryCardImage};

use crate::commands::{Context, PsxCommands};
use crate::output;
use crate::progress::BarProgress;

pub fn execute(cmd: &PsxCommands, ctx: &Context) -> Result<()> {
    match cmd {
        PsxCommands::Dump { channel, output } => dump(ctx, *channel, output),
        PsxCommands::Write { channel, input } => write(ctx, *channel, input),
    }
}

fn dump(ctx: &Context, channel: u8, path: &Path) -> Result<()> {
    let mut handle = ctx.open()?;
    let mut guard = handle.suspend_guard()?;

    let mut image = MemoryCardImage::default();
    let mut bar = BarProgress::new(CARD_SIZE, "Reading card", ctx.json)?;
    MemoryCard::new(&mut guard, channel).download(&mut image, &mut bar)?;
    bar.finish();

    image
        .save(path)
        .with_context(|| format!("saving card image to {}", path.display()))?;
    output::print_success(&format!("Memory card saved to {}", path.display()), ctx.json);
    Ok(())
}

fn write(ctx: &Context, channel: u8, path: &Path) -> Result<()> {
    let image = MemoryCardImage::load(path)
        .with_context(|| format!("loading card image {}", path.display()))?;
    let mut handle = ctx.open()?;
    ctx.confirm(&format!(
        "Overwrite the memory card in port {channel} with {}?",
        path.display()
    ))?;

    let mut guard = handle.suspend_guard()?;
    let mut bar = BarProgress::new(CARD_SIZE, "Writing card", ctx.json)?;
    MemoryCard::new(&mut guard, channel).upload(&image, &mut bar)?;
    bar.finish();

    output::print_success(&format!("Memory card written from {}", path.display()), ctx.json);
    Ok(())
}
