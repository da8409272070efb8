//! Configuration file handling.
//!
//! This module handles loading configuration from `.ecfr-metrics.toml`
//! files. The default effective date lives here rather than as a literal
//! inside the orchestrator so callers can pin the snapshot they want.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Base URL of the eCFR API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Effective date used for a title when no per-title date is known.
    /// Written as a quoted `YYYY-MM-DD` string in TOML.
    #[serde(default = "default_effective_date")]
    pub default_effective_date: NaiveDate,

    /// Number of concurrent title fetches per agency selection.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_effective_date: default_effective_date(),
            concurrency: default_concurrency(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.ecfr.gov/api".to_string()
}

fn default_effective_date() -> NaiveDate {
    // Last annual snapshot known to exist for every title.
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid default date")
}

fn default_concurrency() -> usize {
    4
}

fn default_timeout() -> u64 {
    30
}

impl MetricsConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: MetricsConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but
    /// can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".ecfr-metrics.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = MetricsConfig::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
