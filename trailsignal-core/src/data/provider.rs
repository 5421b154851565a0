//! Candle provider trait and structured error types.
//!
//! The CandleProvider trait abstracts over market-data sources (Binance klines,
//! CoinGecko snapshots, CSV files, synthetic series) so they can be chained,
//! cached and mocked in tests.

use crate::domain::{Candle, Timeframe};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Structured error types for data operations.
///
/// These are designed to be displayable in CLI output and scan reports.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("all providers failed: {}", format_failures(.0))]
    AllProvidersFailed(Vec<(String, String)>),

    #[error("data error: {0}")]
    Other(String),
}

fn format_failures(failures: &[(String, String)]) -> String {
    if failures.is_empty() {
        return "no provider available".to_string();
    }
    failures
        .iter()
        .map(|(name, reason)| format!("{name}: {reason}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result of a successful fetch for one (symbol, timeframe) pair.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Ascending by timestamp.
    pub candles: Vec<Candle>,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Binance,
    CoinGecko,
    CsvImport,
    Cache,
    Synthetic,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataSource::Binance => "binance",
            DataSource::CoinGecko => "coingecko",
            DataSource::CsvImport => "csv",
            DataSource::Cache => "cache",
            DataSource::Synthetic => "synthetic",
        };
        f.write_str(name)
    }
}

/// Trait for candle providers.
///
/// Implementations handle the specifics of one source. Caching and fallback
/// ordering are layered on top (`CachedProvider`, `ProviderChain`).
pub trait CandleProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the most recent `limit` candles for a symbol, ascending.
    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<FetchResult, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}

impl<P: CandleProvider + ?Sized> CandleProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<FetchResult, DataError> {
        (**self).fetch(symbol, timeframe, limit)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

/// Keep only the last `limit` candles.
pub(crate) fn keep_last(mut candles: Vec<Candle>, limit: usize) -> Vec<Candle> {
    if candles.len() > limit {
        candles.drain(..candles.len() - limit);
    }
    candles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_providers_failed_lists_reasons() {
        let err = DataError::AllProvidersFailed(vec![
            ("binance".into(), "HTTP 451".into()),
            ("coingecko".into(), "timeout".into()),
        ]);
        assert_eq!(
            err.to_string(),
            "all providers failed: binance: HTTP 451; coingecko: timeout"
        );
        assert_eq!(
            DataError::AllProvidersFailed(vec![]).to_string(),
            "all providers failed: no provider available"
        );
    }

    #[test]
    fn data_source_display() {
        assert_eq!(DataSource::CoinGecko.to_string(), "coingecko");
        assert_eq!(DataSource::CsvImport.to_string(), "csv");
    }
}
