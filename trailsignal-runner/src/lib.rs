//! TrailSignal Runner: scan orchestration on top of `trailsignal-core`.
//!
//! This crate provides:
//! - TOML scan configuration with environment overrides
//! - Provider chain assembly (CSV → Binance → CoinGecko → synthetic, TTL cached)
//! - Parallel scans over (coin, timeframe) pairs
//! - A cancellable watch loop
//! - Text, JSON and CSV reports

pub mod config;
pub mod report;
pub mod scanner;
pub mod sources;
pub mod watch;

pub use config::{ConfigError, ScanConfig, API_KEY_ENV, KNOWN_COINS, MAX_LIMIT, MAX_RETRIES};
pub use report::{export_csv, export_json, render_line, render_text, ReportError, ScanSummary};
pub use scanner::{run_scan, window_hash, ScanEntry, ScanError, ScanOutcome, ScanReport, Scanner};
pub use sources::{build_provider, ScanProvider, SourceOptions};
pub use watch::{run_watch, WatchOptions, WatchSummary};
