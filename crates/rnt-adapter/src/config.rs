//! Host-side tuning knobs for an adapter session.

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const EXCHANGE_TIMEOUT_ENV: &str = "RNT_EXCHANGE_TIMEOUT_MS";
pub const POLL_SLEEP_ENV: &str = "RNT_POLL_SLEEP_US";
pub const SUSPEND_POLLING_ENV: &str = "RNT_SUSPEND_POLLING";
pub const VERIFY_RAM_WRITES_ENV: &str = "RNT_VERIFY_RAM_WRITES";

/// Default wait for a reply, in milliseconds.
pub const DEFAULT_EXCHANGE_TIMEOUT_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// How long an exchange polls for a reply before giving up.
    pub exchange_timeout_ms: u64,
    /// Sleep between get-feature-report polls; `0` spins.
    pub poll_sleep_us: u64,
    /// Hold a suspend-polling guard around bulk transfers.
    pub suspend_polling_for_bulk: bool,
    /// Read back cartridge RAM after writing it.
    pub verify_ram_writes: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            exchange_timeout_ms: DEFAULT_EXCHANGE_TIMEOUT_MS,
            poll_sleep_us: 0,
            suspend_polling_for_bulk: true,
            verify_ram_writes: true,
        }
    }
}

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enable" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disable" | "disabled" => Some(false),
        _ => None,
    }
}

fn override_u64(target: &mut u64, name: &str, value: Option<String>) {
    let Some(value) = value else { return };
    match value.trim().parse::<u64>() {
        Ok(parsed) => *target = parsed,
        Err(_) => warn!("Ignoring {}={:?}: not an integer", name, value),
    }
}

fn override_bool(target: &mut bool, name: &str, value: Option<String>) {
    let Some(value) = value else { return };
    match parse_bool_env(&value) {
        Some(parsed) => *target = parsed,
        None => warn!("Ignoring {}={:?}: not a boolean", name, value),
    }
}

impl AdapterConfig {
    /// Defaults with process environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup` (normally the environment) on top of `self`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        override_u64(
            &mut self.exchange_timeout_ms,
            EXCHANGE_TIMEOUT_ENV,
            lookup(EXCHANGE_TIMEOUT_ENV),
        );
        override_u64(&mut self.poll_sleep_us, POLL_SLEEP_ENV, lookup(POLL_SLEEP_ENV));
        override_bool(
            &mut self.suspend_polling_for_bulk,
            SUSPEND_POLLING_ENV,
            lookup(SUSPEND_POLLING_ENV),
        );
        override_bool(
            &mut self.verify_ram_writes,
            VERIFY_RAM_WRITES_ENV,
            lookup(VERIFY_RAM_WRITES_ENV),
        );
        self
    }

    pub fn exchange_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.exchange_timeout_ms)
    }

    pub fn poll_sleep(&self) -> std::time::Duration {
        std::time::Duration::from_micros(self.poll_sleep_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = AdapterConfig::default();
        assert_eq!(cfg.exchange_timeout_ms, 1000);
        assert_eq!(cfg.poll_sleep_us, 0);
        assert!(cfg.suspend_polling_for_bulk);
        assert!(cfg.verify_ram_writes);
    }

    #[test]
    fn test_overrides_apply() {
        let cfg = AdapterConfig::default().with_overrides(lookup_from(&[
            (EXCHANGE_TIMEOUT_ENV, "250"),
            (SUSPEND_POLLING_ENV, "off"),
            (VERIFY_RAM_WRITES_ENV, "Disabled"),
        ]));
        assert_eq!(cfg.exchange_timeout_ms, 250);
        assert!(!cfg.suspend_polling_for_bulk);
        assert!(!cfg.verify_ram_writes);
    }

    #[test]
    fn test_bad_values_keep_previous() {
        let cfg = AdapterConfig::default().with_overrides(lookup_from(&[
            (EXCHANGE_TIMEOUT_ENV, "soon"),
            (SUSPEND_POLLING_ENV, "maybe"),
        ]));
        assert_eq!(cfg, AdapterConfig::default());
    }

    #[test]
    fn test_partial_json_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let cfg: AdapterConfig = serde_json::from_str(r#"{"poll_sleep_us": 100}"#)?;
        assert_eq!(cfg.poll_sleep_us, 100);
        assert_eq!(cfg.exchange_timeout_ms, DEFAULT_EXCHANGE_TIMEOUT_MS);
        Ok(())
    }
}
