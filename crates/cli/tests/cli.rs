//! Integration tests for the rntctl binary.
//!
//! Only paths that fail before any adapter is opened are exercised here;
//! device behaviour is covered by the library crates against the simulator.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn rntctl() -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("rntctl")?;
    cmd.env_remove("RNT_CONFIG").env_remove("RUST_LOG");
    Ok(cmd)
}

#[test]
fn help_lists_accessory_commands() -> TestResult {
    rntctl()?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("mempak"))
        .stdout(predicate::str::contains("xfer"))
        .stdout(predicate::str::contains("psx"));
    Ok(())
}

#[test]
fn version_flag_prints_version() -> TestResult {
    rntctl()?
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn usage_errors_exit_with_clap_code() -> TestResult {
    rntctl()?.args(["raw-si", "zz"]).assert().code(2);
    rntctl()?.args(["vibrate", "--on", "--off"]).assert().code(2);
    Ok(())
}

#[test]
fn missing_config_file_fails_before_opening() -> TestResult {
    let dir = TempDir::new()?;
    rntctl()?
        .arg("--config")
        .arg(dir.path().join("absent.json"))
        .arg("info")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("reading configuration"));
    Ok(())
}

#[test]
fn malformed_config_is_a_configuration_error() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("bad.json");
    fs::write(&path, "{ \"exchange_timeout_ms\": \"soon\" }")?;

    let output = rntctl()?
        .arg("--json")
        .arg("--config")
        .arg(&path)
        .arg("list")
        .output()?;
    assert_eq!(output.status.code(), Some(4));

    let doc: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(doc["success"], Value::Bool(false));
    let message = doc["error"]["message"].as_str().unwrap_or_default();
    assert!(message.contains("Invalid configuration"), "{message}");
    Ok(())
}
