//! Configuration structures.
//!
//! Configuration is loaded from environment variables and JSON config files.

use super::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Global Houston configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Dispatch behaviour.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Parse a JSON document. Missing sections fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.dispatch.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    /// Apply `HOUSTON_*` environment overrides on top of this config.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(v) = lookup("HOUSTON_TRACKING_ENABLED") {
            self.dispatch.tracking_enabled = parse_bool("HOUSTON_TRACKING_ENABLED", &v)?;
        }
        if let Some(v) = lookup("HOUSTON_MESSAGE_BUFFER") {
            self.dispatch.message_buffer = parse_bool("HOUSTON_MESSAGE_BUFFER", &v)?;
        }
        if let Some(v) = lookup("HOUSTON_BUFFER_CAPACITY") {
            self.dispatch.buffer_capacity = v.trim().parse().map_err(|_| {
                Error::config(format!("HOUSTON_BUFFER_CAPACITY must be an integer, got '{}'", v))
            })?;
        }
        self.observability = self.observability.with_overrides(&lookup);
        self.dispatch.validate()?;
        Ok(self)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::config(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

/// Dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Whether tracking is enabled right after launch.
    pub tracking_enabled: bool,

    /// Hold messages while tracking is disabled and flush them on re-enable.
    pub message_buffer: bool,

    /// Maximum number of buffered messages. The oldest message is dropped
    /// when the buffer is full.
    pub buffer_capacity: usize,

    /// Upper bound for a single `initialize` or `send` call on one tool.
    #[serde(with = "humantime_serde")]
    pub send_timeout: Duration,
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.message_buffer && self.buffer_capacity == 0 {
            return Err(Error::validation(
                "buffer_capacity must be greater than zero when message_buffer is enabled",
            ));
        }
        if self.send_timeout.is_zero() {
            return Err(Error::validation("send_timeout must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tracking_enabled: true,
            message_buffer: false,
            buffer_capacity: 256,
            send_timeout: Duration::from_secs(10),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl ObservabilityConfig {
    /// Defaults plus the `HOUSTON_LOG_FORMAT` override.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("HOUSTON_LOG_FORMAT") {
            self.json_logs = v.eq_ignore_ascii_case("json");
        }
        self
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
