//! Configuration loading for the load balancer.
//!
//! Settings are read from a TOML file; every field has a sensible default
//! so a minimal file only needs to list the backend pool.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::pool::BackendSpec;

fn default_serving_port() -> u16 {
    5000
}
fn default_scrape_port() -> u16 {
    8000
}
fn default_metrics_poll_secs() -> u64 {
    5
}
fn default_health_probe_secs() -> u64 {
    10
}
fn default_dev_fallback_ip() -> String {
    "8.8.8.8".to_string()
}

/// Root configuration, deserialized from the config TOML.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// The backend pool, order significant.
    pub backends: Vec<BackendSpec>,

    #[serde(default = "default_serving_port")]
    pub serving_port: u16,
    #[serde(default = "default_scrape_port")]
    pub scrape_port: u16,

    #[serde(default = "default_metrics_poll_secs")]
    pub metrics_poll_secs: u64,
    #[serde(default = "default_health_probe_secs")]
    pub health_probe_secs: u64,

    /// Disabled (`None`) unless a period is given.
    #[serde(default)]
    pub container_stats_secs: Option<u64>,

    /// Base URL of the remote shared key-value store. `None` runs entirely
    /// on local, process-scoped fallback state.
    #[serde(default)]
    pub shared_store_address: Option<String>,

    /// Path to the geo-ip database file. Required at startup only if
    /// `geo_aware_enabled` is set.
    #[serde(default)]
    pub geo_db_path: Option<String>,
    #[serde(default)]
    pub geo_aware_enabled: bool,

    #[serde(default = "default_dev_fallback_ip")]
    pub dev_fallback_ip: String,
}

impl Config {
    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read, doesn't parse, the
    /// backend pool is empty, or `geo_aware_enabled` is set without a
    /// `geo_db_path` — all startup failures per §6's exit-code contract.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("parsing config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.backends.is_empty(), "backend pool must not be empty");
        anyhow::ensure!(
            !self.geo_aware_enabled || self.geo_db_path.is_some(),
            "geo_aware_enabled requires geo_db_path"
        );
        Ok(())
    }

    #[must_use]
    pub fn metrics_poll_period(&self) -> Duration {
        Duration::from_secs(self.metrics_poll_secs)
    }

    #[must_use]
    pub fn health_probe_period(&self) -> Duration {
        Duration::from_secs(self.health_probe_secs)
    }

    #[must_use]
    pub fn container_stats_period(&self) -> Option<Duration> {
        self.container_stats_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_in_defaults() {
        let toml = r#"
            [[backends]]
            name = "b1"
            url = "http://127.0.0.1:9001"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.serving_port, 5000);
        assert_eq!(config.scrape_port, 8000);
        assert_eq!(config.backends[0].weight, 1);
        assert!(!config.geo_aware_enabled);
    }

    #[test]
    fn geo_aware_without_db_path_fails_validation() {
        let toml = r#"
            geo_aware_enabled = true
            [[backends]]
            name = "b1"
            url = "http://127.0.0.1:9001"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }
}
