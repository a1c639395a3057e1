//! Output formatting for CLI responses

use anyhow::Error;
use colored::*;
use rnt_adapter::AdapterInfo;
use serde_json::{Value, json};

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": format!("{error:#}"),
        }
    });
    match serde_json::to_string_pretty(&error_json) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format error as JSON: {e}"),
    }
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

/// Print `value` as a success document.
pub fn print_json(mut value: Value) {
    if let Some(map) = value.as_object_mut() {
        map.insert("success".into(), Value::Bool(true));
    }
    match serde_json::to_string_pretty(&value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format output as JSON: {e}"),
    }
}

pub fn print_success(message: &str, json: bool) {
    if json {
        print_json(json!({ "message": message }));
    } else {
        println!("{} {}", "✓".green(), message);
    }
}

pub fn print_warning(message: &str, json: bool) {
    if !json {
        eprintln!("{} {}", "!".yellow(), message);
    }
}

pub fn adapter_json(info: &AdapterInfo) -> Value {
    let (major, minor) = info.release_version();
    json!({
        "name": info.name(),
        "vendor_id": format!("{:04x}", info.hid.vendor_id),
        "product_id": format!("{:04x}", info.hid.product_id),
        "interface": info.hid.interface_number,
        "serial": info.hid.serial_number,
        "path": info.hid.path,
        "release": format!("{major}.{minor}"),
        "legacy": info.is_legacy(),
    })
}

pub fn print_adapter_list(adapters: &[AdapterInfo], json: bool) {
    if json {
        let list: Vec<Value> = adapters.iter().map(adapter_json).collect();
        print_json(json!({ "adapters": list }));
        return;
    }
    if adapters.is_empty() {
        println!("{}", "No adapters found".yellow());
        return;
    }
    println!("{}", "Connected adapters:".bold());
    for info in adapters {
        println!("  {} {}", "●".green(), info);
        println!("    {}", info.hid.path.dimmed());
    }
}

/// Sixteen bytes per line, offset first.
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .chunks(16)
        .enumerate()
        .map(|(row, chunk)| {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            format!("{:04x}: {}", row * 16, hex.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_dump_rows() {
        let bytes: Vec<u8> = (0..20).collect();
        let dump = hex_dump(&bytes);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0000: 00 01 02"));
        assert_eq!(lines[1], "0010: 10 11 12 13");
    }

    #[test]
    fn test_hex_string() {
        assert_eq!(hex_string(&[0x00, 0xAB, 0x1F]), "00 ab 1f");
        assert_eq!(hex_string(&[]), "");
    }
}
