//! Configuration management
//!
//! Loads the agent's metrics and logging settings from a TOML file. Every
//! field has a default so an empty file (or no file) is valid.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::metrics::BindAddress;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metrics configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Serve the exposition endpoint
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// `host:port`, or `:port` for all interfaces
    #[serde(default = "default_metrics_addr")]
    pub bind_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            bind_addr: default_metrics_addr(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event, with source location
    Json,
    /// Human-readable lines
    #[default]
    Pretty,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_metrics_addr() -> String { ":9090".to_string() }
fn default_log_level() -> String { "info".to_string() }

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::parse(&contents)?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .with_context(|| "Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.metrics.enabled {
            BindAddress::parse(&self.metrics.bind_addr)
                .with_context(|| "metrics.bind_addr is invalid")?;
        }
        Ok(())
    }
}
