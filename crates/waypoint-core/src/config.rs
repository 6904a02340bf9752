//! Configuration loading and typed config structures for the harness.
//!
//! The canonical configuration lives in `waypoint-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror
//! the YAML structure and provides a loader that reads and validates the
//! file.

use std::path::Path;

use serde::Deserialize;
use waypoint_types::Track;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level harness configuration.
///
/// Mirrors the structure of `waypoint-config.yaml`. All fields have
/// sensible defaults so a missing file means a default run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HarnessConfig {
    /// Scenario orchestration settings.
    #[serde(default)]
    pub scenario: ScenarioConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HarnessConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yml::from_str(&contents)?)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// Scenario orchestration configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScenarioConfig {
    /// Seconds the loop may go without a watchdog refresh before the
    /// run is declared stalled.
    #[serde(default = "default_watchdog_timeout_seconds")]
    pub watchdog_timeout_seconds: f64,

    /// Whether debug side effects (spectator camera follow) are applied.
    #[serde(default)]
    pub debug_mode: bool,

    /// Track identifier handed to the agent at setup, if any.
    #[serde(default)]
    pub track: Option<Track>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            watchdog_timeout_seconds: default_watchdog_timeout_seconds(),
            debug_mode: false,
            track: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_watchdog_timeout_seconds() -> f64 {
    10.0
}

fn default_log_level() -> String {
    String::from("info")
}
