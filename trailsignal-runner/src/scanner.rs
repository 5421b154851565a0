//! One scan pass over every configured (coin, timeframe) pair.
//!
//! Each pair is fetched and evaluated independently. A failed fetch does not
//! abort the scan: the pair is evaluated on an empty window (yielding `Empty`)
//! and the fetch error is kept on the entry. Engine rejections of malformed
//! windows are recorded the same way.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trailsignal_core::data::{CandleProvider, DataSource};
use trailsignal_core::domain::{Candle, Timeframe};
use trailsignal_core::engine::{evaluate, EvaluationResult, SignalParams};

use crate::config::{ConfigError, ScanConfig};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Engine outcome for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    Evaluated(EvaluationResult),
    Rejected { reason: String },
}

impl ScanOutcome {
    pub fn result(&self) -> Option<&EvaluationResult> {
        match self {
            ScanOutcome::Evaluated(r) => Some(r),
            ScanOutcome::Rejected { .. } => None,
        }
    }
}

/// Result for one (coin, timeframe) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEntry {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Absent when the fetch failed.
    pub source: Option<DataSource>,
    pub fetch_error: Option<String>,
    pub candle_count: usize,
    /// BLAKE3 over the evaluated window.
    pub window_hash: String,
    pub outcome: ScanOutcome,
}

/// Entries of one scan in (coin, timeframe) configuration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub params: SignalParams,
    pub entries: Vec<ScanEntry>,
}

impl ScanReport {
    /// Entries for one coin, in timeframe order.
    pub fn entries_for<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = &'a ScanEntry> + 'a {
        self.entries.iter().filter(move |e| e.symbol == symbol)
    }

    /// Distinct coins in first-seen order.
    pub fn symbols(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !seen.contains(&entry.symbol.as_str()) {
                seen.push(&entry.symbol);
            }
        }
        seen
    }
}

/// Deterministic BLAKE3 digest of a candle window.
pub fn window_hash(candles: &[Candle]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in candles {
        hasher.update(&c.timestamp.timestamp_millis().to_le_bytes());
        hasher.update(&c.open.to_le_bytes());
        hasher.update(&c.high.to_le_bytes());
        hasher.update(&c.low.to_le_bytes());
        hasher.update(&c.close.to_le_bytes());
        match c.volume {
            Some(v) => hasher.update(&v.to_le_bytes()),
            None => hasher.update(&[0xff]),
        };
    }
    hasher.finalize().to_hex().to_string()
}

/// Runs scans against a provider.
pub struct Scanner<'a, P: ?Sized> {
    config: &'a ScanConfig,
    provider: &'a P,
    parallel: bool,
}

impl<'a, P: CandleProvider + ?Sized> Scanner<'a, P> {
    pub fn new(config: &'a ScanConfig, provider: &'a P) -> Self {
        Self {
            config,
            provider,
            parallel: true,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Scan every configured pair once.
    pub fn run(&self, started_at: DateTime<Utc>) -> Result<ScanReport, ScanError> {
        self.config.validate()?;

        let pairs: Vec<(&str, Timeframe)> = self
            .config
            .scan
            .coins
            .iter()
            .flat_map(|coin| {
                self.config
                    .scan
                    .timeframes
                    .iter()
                    .map(move |tf| (coin.as_str(), *tf))
            })
            .collect();

        tracing::info!(pairs = pairs.len(), "starting scan");

        let entries: Vec<ScanEntry> = if self.parallel {
            pairs
                .par_iter()
                .map(|(symbol, tf)| self.scan_pair(symbol, *tf))
                .collect()
        } else {
            pairs
                .iter()
                .map(|(symbol, tf)| self.scan_pair(symbol, *tf))
                .collect()
        };

        Ok(ScanReport {
            started_at,
            params: self.config.signal,
            entries,
        })
    }

    fn scan_pair(&self, symbol: &str, timeframe: Timeframe) -> ScanEntry {
        let (candles, source, fetch_error) =
            match self.provider.fetch(symbol, timeframe, self.config.scan.limit) {
                Ok(result) => (result.candles, Some(result.source), None),
                Err(e) => {
                    tracing::warn!(%symbol, %timeframe, error = %e, "fetch failed; evaluating empty window");
                    (Vec::new(), None, Some(e.to_string()))
                }
            };

        let outcome = match evaluate(&candles, &self.config.signal) {
            Ok(result) => ScanOutcome::Evaluated(result),
            Err(e) => {
                tracing::warn!(%symbol, %timeframe, error = %e, "window rejected");
                ScanOutcome::Rejected {
                    reason: e.to_string(),
                }
            }
        };

        ScanEntry {
            symbol: symbol.to_string(),
            timeframe,
            source,
            fetch_error,
            candle_count: candles.len(),
            window_hash: window_hash(&candles),
            outcome,
        }
    }
}

/// Scan once with the default (parallel) scanner.
pub fn run_scan<P: CandleProvider + ?Sized>(
    config: &ScanConfig,
    provider: &P,
    started_at: DateTime<Utc>,
) -> Result<ScanReport, ScanError> {
    Scanner::new(config, provider).run(started_at)
}
