//! Adapter-level commands: discovery, configuration and raw requests.

use anyhow::{Context as _, Result};
use colored::*;
use rnt_adapter::{cfg_param_name, controller_name, list_adapters, parse_cfg_param};
use serde_json::json;

use crate::commands::{Context, parse_byte};
use crate::error::CliError;
use crate::output;

pub fn list(ctx: &Context) -> Result<()> {
    let api = ctx.hid_api()?;
    let adapters: Vec<_> = list_adapters(&api)
        .into_iter()
        .filter(|info| ctx.filter.matches(info))
        .collect();
    output::print_adapter_list(&adapters, ctx.json);
    Ok(())
}

pub fn info(ctx: &Context) -> Result<()> {
    let mut handle = ctx.open()?;
    let signature = if handle.is_legacy() {
        None
    } else {
        handle.get_signature().ok()
    };
    let caps = handle.info().caps();
    let features = handle.features();
    let version = handle.version().map(str::to_owned);

    if ctx.json {
        let mut doc = output::adapter_json(handle.info());
        if let Some(map) = doc.as_object_mut() {
            map.insert("firmware".into(), json!(version));
            map.insert("signature".into(), json!(signature));
            map.insert("channels".into(), json!(caps.channels()));
            map.insert("report_size".into(), json!(handle.report_size()));
            map.insert("features".into(), json!(format!("{features:?}")));
        }
        output::print_json(doc);
        return Ok(());
    }

    println!("{}", handle.info().to_string().bold());
    println!("  Firmware:    {}", version.as_deref().unwrap_or("unknown"));
    if let Some(signature) = &signature {
        println!("  Signature:   {signature}");
    }
    println!("  Channels:    {}", caps.channels());
    println!("  Report size: {} bytes", handle.report_size());
    println!("  Features:    {features:?}");
    Ok(())
}

fn resolve_param(token: &str) -> Result<u8, CliError> {
    parse_cfg_param(token)
        .ok_or_else(|| CliError::InvalidArgument(format!("unknown configuration parameter '{token}'")))
}

fn param_label(param: u8) -> String {
    match cfg_param_name(param) {
        Some(name) => format!("{name} ({param:#04x})"),
        None => format!("{param:#04x}"),
    }
}

pub fn set_config(ctx: &Context, param: &str, values: &[String]) -> Result<()> {
    let param = resolve_param(param)?;
    let value = values
        .iter()
        .map(|v| parse_byte(v))
        .collect::<Result<Vec<u8>, String>>()
        .map_err(CliError::InvalidArgument)?;
    let mut handle = ctx.open()?;
    handle.set_config(param, &value)?;
    output::print_success(
        &format!("{} set to {}", param_label(param), output::hex_string(&value)),
        ctx.json,
    );
    Ok(())
}

pub fn get_config(ctx: &Context, param: &str) -> Result<()> {
    let param = resolve_param(param)?;
    let mut handle = ctx.open()?;
    let value = handle.get_config(param)?;
    if ctx.json {
        output::print_json(json!({
            "param": param,
            "name": cfg_param_name(param),
            "value": value,
        }));
    } else {
        println!("{}: {}", param_label(param), output::hex_string(&value));
    }
    Ok(())
}

pub fn controller_type(ctx: &Context, channel: u8) -> Result<()> {
    let mut handle = ctx.open()?;
    let code = handle.get_controller_type(channel)?;
    if ctx.json {
        output::print_json(json!({
            "channel": channel,
            "type": code,
            "name": controller_name(code),
        }));
    } else {
        println!("Channel {channel}: {} ({code})", controller_name(code));
    }
    Ok(())
}

pub fn vibrate(ctx: &Context, channel: u8, on: bool) -> Result<()> {
    let mut handle = ctx.open()?;
    handle.set_vibration(channel, on)?;
    let state = if on { "on" } else { "off" };
    output::print_success(&format!("Vibration {state} on channel {channel}"), ctx.json);
    Ok(())
}

pub fn bootloader(ctx: &Context) -> Result<()> {
    let mut handle = ctx.open()?;
    ctx.confirm("Restart the adapter into its bootloader?")?;
    handle.jump_to_bootloader()?;
    output::print_success("Adapter restarting into bootloader", ctx.json);
    Ok(())
}

pub fn reset(ctx: &Context) -> Result<()> {
    let mut handle = ctx.open()?;
    handle.reset_firmware()?;
    output::print_success("Adapter firmware reset", ctx.json);
    Ok(())
}

pub fn raw_si(ctx: &Context, channel: u8, tx: &[u8], max_rx: usize) -> Result<()> {
    let mut handle = ctx.open()?;
    let rx = handle
        .raw_si_command(channel, tx, max_rx)
        .with_context(|| format!("SI command {} on channel {channel}", output::hex_string(tx)))?;
    if ctx.json {
        output::print_json(json!({ "channel": channel, "tx": tx, "rx": rx }));
    } else {
        println!("{} byte(s): {}", rx.len(), output::hex_string(&rx));
    }
    Ok(())
}
