//! Adapter configuration from `--config` and the environment.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rnt_adapter::AdapterConfig;
use tracing::debug;

use crate::error::CliError;

/// Parse a JSON configuration document. Missing fields keep their defaults.
pub fn parse_config(text: &str) -> Result<AdapterConfig, CliError> {
    serde_json::from_str(text).map_err(|e| CliError::InvalidConfiguration(e.to_string()))
}

/// Load `path` (or the defaults) and apply environment overrides on top.
pub fn load_config(path: Option<&Path>) -> Result<AdapterConfig> {
    let base = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading configuration {}", path.display()))?;
            parse_config(&text).with_context(|| format!("in {}", path.display()))?
        }
        None => AdapterConfig::default(),
    };
    let config = base.with_overrides(|name| std::env::var(name).ok());
    debug!("Adapter configuration: {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_partial_document_keeps_defaults() -> TestResult {
        let config = parse_config(r#"{ "exchange_timeout_ms": 250 }"#)?;
        assert_eq!(config.exchange_timeout_ms, 250);
        assert!(config.verify_ram_writes);
        assert!(config.suspend_polling_for_bulk);
        Ok(())
    }

    #[test]
    fn test_malformed_document_is_rejected() {
        assert!(matches!(
            parse_config("{ exchange_timeout_ms: }"),
            Err(CliError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_load_from_file() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("rnt.json");
        fs::write(&path, r#"{ "poll_sleep_us": 50, "verify_ram_writes": false }"#)?;
        let config = parse_config(&fs::read_to_string(&path)?)?;
        assert_eq!(config.poll_sleep_us, 50);
        assert!(!config.verify_ram_writes);
        assert!(load_config(Some(dir.path().join("missing.json").as_path())).is_err());
        Ok(())
    }
}
