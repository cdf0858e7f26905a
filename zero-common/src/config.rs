//! Configuration management for the Zero screener.
//!
//! The service reads a single configuration file at `~/.zero-screener/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (ZERO_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `ZERO_LOG_LEVEL` → observability.log_level
//! - `ZERO_BIND_ADDRESS` → network.bind
//! - `ZERO_SCREENER_PORT` → screener.port
//! - `ZERO_SCREENER_PROVIDER_URL` → screener.provider_url
//! - `ZERO_SCREENER_NOTIFY_ENDPOINT` → screener.notification.endpoint

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".zero-screener"),
        |dirs| dirs.home_dir().join(".zero-screener"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Network Configuration
// ============================================================================

/// Global network configuration.
///
/// Default is `127.0.0.1` (local only). Set to `0.0.0.0` to allow remote access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bind address for the HTTP surface.
    #[serde(default = "default_bind_address")]
    pub bind: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ============================================================================
// Observability
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to force to `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// ============================================================================
// Screener Service
// ============================================================================

/// Runtime knobs of the screener service.
///
/// Indicator settings live in `settings` as raw JSON and are decoded by the
/// screener crate, which owns their schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerServiceConfig {
    /// HTTP port
    #[serde(default = "default_screener_port")]
    pub port: u16,

    /// Market data REST base URL
    #[serde(default = "default_provider_url")]
    pub provider_url: String,

    /// Quote asset the universe is drawn from
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,

    /// Number of symbols evaluated per pass (top-N by quote volume)
    #[serde(default = "default_universe_size")]
    pub universe_size: usize,

    /// Candles requested per symbol and timeframe
    #[serde(default = "default_candle_limit")]
    pub candle_limit: usize,

    /// Symbols with fewer candles than this on any timeframe are skipped
    #[serde(default = "default_min_candles")]
    pub min_candles: usize,

    /// Symbols fetched concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches in milliseconds
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Response cache TTL in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: i64,

    /// Proactive request budget against the provider
    #[serde(default = "default_rate_limit_rpm")]
    pub rate_limit_rpm: u32,

    /// Upper bound on a single pass, enforced by the scheduler
    #[serde(default = "default_pass_timeout_secs")]
    pub pass_timeout_secs: u64,

    /// Allow-list used when the "restrict universe" setting is on
    #[serde(default)]
    pub restricted_symbols: Vec<String>,

    /// Indicator/filter/sort settings (decoded by the screener crate)
    #[serde(default)]
    pub settings: Option<serde_json::Value>,

    /// Outbound alerting
    #[serde(default)]
    pub notification: NotificationConfig,
}

impl Default for ScreenerServiceConfig {
    fn default() -> Self {
        Self {
            port: default_screener_port(),
            provider_url: default_provider_url(),
            quote_asset: default_quote_asset(),
            universe_size: default_universe_size(),
            candle_limit: default_candle_limit(),
            min_candles: default_min_candles(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            rate_limit_rpm: default_rate_limit_rpm(),
            pass_timeout_secs: default_pass_timeout_secs(),
            restricted_symbols: Vec::new(),
            settings: None,
            notification: NotificationConfig::default(),
        }
    }
}

fn default_screener_port() -> u16 {
    4440
}

fn default_provider_url() -> String {
    "https://api.binance.com/api/v3".to_string()
}

fn default_quote_asset() -> String {
    "USDT".to_string()
}

fn default_universe_size() -> usize {
    100
}

fn default_candle_limit() -> usize {
    100
}

fn default_min_candles() -> usize {
    50
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_delay_ms() -> u64 {
    200
}

fn default_cache_ttl_secs() -> i64 {
    60
}

fn default_rate_limit_rpm() -> u32 {
    1200
}

fn default_pass_timeout_secs() -> u64 {
    90
}

/// Outbound alert delivery through the channels service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Channels service base URL
    #[serde(default = "default_notify_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_channel_type")]
    pub channel_type: String,

    #[serde(default)]
    pub channel_id: String,

    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Signals worth an alert, by their wire name (e.g. "ULTRA_BUY")
    #[serde(default = "default_notable_signals")]
    pub notable_signals: Vec<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_notify_endpoint(),
            channel_type: default_channel_type(),
            channel_id: String::new(),
            retry_count: default_retry_count(),
            notable_signals: default_notable_signals(),
        }
    }
}

fn default_notify_endpoint() -> String {
    "http://127.0.0.1:4431".to_string()
}

fn default_channel_type() -> String {
    "telegram".to_string()
}

fn default_retry_count() -> u32 {
    3
}

fn default_notable_signals() -> Vec<String> {
    ["STRONG_BUY", "STRONG_SELL", "ULTRA_BUY", "ULTRA_SELL"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub screener: ScreenerServiceConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("ZERO_LOG_LEVEL") {
            self.observability.log_level = level;
        }

        if let Ok(bind) = std::env::var("ZERO_BIND_ADDRESS") {
            self.network.bind = bind;
        }

        if let Ok(port) = std::env::var("ZERO_SCREENER_PORT") {
            if let Ok(p) = port.parse() {
                self.screener.port = p;
            }
        }

        if let Ok(url) = std::env::var("ZERO_SCREENER_PROVIDER_URL") {
            self.screener.provider_url = url;
        }

        if let Ok(endpoint) = std::env::var("ZERO_SCREENER_NOTIFY_ENDPOINT") {
            self.screener.notification.endpoint = endpoint;
        }
    }

    /// Socket address string for the HTTP surface, e.g. "127.0.0.1:4440".
    pub fn screener_addr(&self) -> String {
        format!("{}:{}", self.network.bind, self.screener.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.screener.batch_size, 10);
        assert_eq!(config.screener.batch_delay_ms, 200);
        assert_eq!(config.screener.cache_ttl_secs, 60);
        assert_eq!(config.screener.min_candles, 50);
        assert_eq!(config.screener_addr(), "127.0.0.1:4440");
        assert_eq!(config.screener.notification.notable_signals.len(), 4);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"observability": {{"level": "debug"}}, "screener": {{"universe_size": 20}}}}"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.screener.universe_size, 20);
        assert_eq!(config.screener.candle_limit, 100);
        assert!(config.screener.settings.is_none());
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }
}
