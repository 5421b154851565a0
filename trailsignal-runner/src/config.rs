//! Scan configuration, loaded from TOML.
//!
//! Every section is optional; a missing file section falls back to defaults:
//!
//! ```toml
//! [scan]
//! coins = ["BTCUSDT", "ETHUSDT"]
//! timeframes = ["1m", "15m", "1h", "1d"]
//! limit = 100
//!
//! [signal]
//! sensitivity = 1.0
//! window_size = 10
//!
//! [cache]
//! ttl_secs = 60
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use trailsignal_core::data::{BinanceConfig, CoinGeckoConfig};
use trailsignal_core::domain::Timeframe;
use trailsignal_core::engine::{EngineError, SignalParams};

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "BINANCE_API_KEY";

/// Most candles a single klines request may return.
pub const MAX_LIMIT: usize = 1000;

/// Upper bound on per-endpoint retries.
pub const MAX_RETRIES: u32 = 10;

/// USDT pairs offered for selection.
pub const KNOWN_COINS: [&str; 10] = [
    "BTCUSDT", "ETHUSDT", "XRPUSDT", "ADAUSDT", "BNBUSDT", "SOLUSDT", "DOTUSDT", "DOGEUSDT",
    "MATICUSDT", "SHIBUSDT",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid signal parameters: {0}")]
    Signal(#[from] EngineError),
}

/// Which pairs to scan and how many candles to request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSection {
    pub coins: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    pub limit: usize,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            coins: vec!["BTCUSDT".into(), "ETHUSDT".into()],
            timeframes: vec![Timeframe::M1, Timeframe::M15, Timeframe::H1, Timeframe::D1],
            limit: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self { ttl_secs: 60 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    pub interval_secs: u64,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

/// Complete scan configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub scan: ScanSection,
    pub signal: SignalParams,
    pub binance: BinanceConfig,
    pub coingecko: CoinGeckoConfig,
    pub cache: CacheSection,
    pub watch: WatchSection,
}

impl ScanConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Fill the API key from `BINANCE_API_KEY` if the file did not set one.
    pub fn apply_env(&mut self) {
        self.apply_api_key(std::env::var(API_KEY_ENV).ok());
    }

    fn apply_api_key(&mut self, key: Option<String>) {
        if self.binance.api_key.is_none() {
            self.binance.api_key = key.filter(|k| !k.trim().is_empty());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.coins.is_empty() {
            return Err(ConfigError::Invalid("scan.coins must not be empty".into()));
        }
        if let Some(blank) = self.scan.coins.iter().find(|c| c.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "scan.coins contains a blank symbol: {blank:?}"
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.scan.coins.iter().find(|c| !seen.insert(*c)) {
            return Err(ConfigError::Invalid(format!(
                "scan.coins lists {dup} more than once"
            )));
        }
        if self.scan.timeframes.is_empty() {
            return Err(ConfigError::Invalid("scan.timeframes must not be empty".into()));
        }
        if !(1..=MAX_LIMIT).contains(&self.scan.limit) {
            return Err(ConfigError::Invalid(format!(
                "scan.limit must be between 1 and {MAX_LIMIT}, got {}",
                self.scan.limit
            )));
        }
        if self.binance.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "binance.max_retries must be <= {MAX_RETRIES}, got {}",
                self.binance.max_retries
            )));
        }
        if self.binance.base_urls.is_empty() {
            return Err(ConfigError::Invalid("binance.base_urls must not be empty".into()));
        }
        self.signal.validate()?;
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch.interval_secs)
    }
}
