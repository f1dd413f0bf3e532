//! Layered configuration: defaults, then an optional TOML file, then
//! `HIDDB_*` environment variables.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub client: ClientConfig,
    pub scenario: ScenarioConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// How the demo waits for a mutation to become visible.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum SettleMode {
    /// Sleep for `settle_interval_ms`.
    #[default]
    Fixed,
    /// Probe the index every `settle_interval_ms`, at most `poll_max_attempts` times.
    Poll,
}

impl std::str::FromStr for SettleMode {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(SettleMode::Fixed),
            "poll" => Ok(SettleMode::Poll),
            other => Err(ClientError::Config(format!("unknown settle mode: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub index_id: u64,
    pub k: usize,
    pub dimension: usize,
    pub settle_mode: SettleMode,
    pub settle_interval_ms: u64,
    pub poll_max_attempts: u32,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            index_id: 0,
            k: 10,
            dimension: 3,
            settle_mode: SettleMode::Fixed,
            settle_interval_ms: 2000,
            poll_max_attempts: 10,
        }
    }
}

impl ScenarioConfig {
    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load config from `path` if given, then apply environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Apply `HIDDB_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("HIDDB_URL") {
            self.client.base_url = url;
        }
        if let Some(mode) = lookup("HIDDB_SETTLE_MODE") {
            self.scenario.settle_mode = mode.parse()?;
        }
        if let Some(ms) = lookup("HIDDB_SETTLE_INTERVAL_MS") {
            self.scenario.settle_interval_ms = parse_env("HIDDB_SETTLE_INTERVAL_MS", &ms)?;
        }
        if let Some(n) = lookup("HIDDB_POLL_MAX_ATTEMPTS") {
            self.scenario.poll_max_attempts = parse_env("HIDDB_POLL_MAX_ATTEMPTS", &n)?;
        }
        if let Some(level) = lookup("HIDDB_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("HIDDB_LOG_FORMAT") {
            self.logging.format = format;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ClientError::Config(format!("{key}: invalid value '{value}'")))
}
