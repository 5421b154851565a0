//! CSV candle files.
//!
//! Expected header: `timestamp,open,high,low,close[,volume]`. Timestamps may be
//! RFC 3339 strings or integer epoch milliseconds.

use super::provider::{keep_last, CandleProvider, DataError, DataSource, FetchResult};
use crate::domain::{Candle, Timeframe};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

/// Parse a timestamp cell: RFC 3339 first, then epoch milliseconds.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DataError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .ok_or_else(|| DataError::InvalidTimestamp(raw.to_string()))
}

/// Read a whole CSV file into candles, sorted ascending by timestamp.
///
/// Rows are not validated here; the engine rejects malformed candles.
pub fn load_csv(path: &Path) -> Result<Vec<Candle>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let mut candles = Vec::new();
    for row in reader.deserialize() {
        let row: CsvRow = row?;
        candles.push(Candle {
            timestamp: parse_timestamp(&row.timestamp)?,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

/// Provider reading `<SYMBOL>_<timeframe>.csv` files from a directory.
pub struct CsvDirProvider {
    dir: PathBuf,
}

impl CsvDirProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.dir.join(format!("{symbol}_{timeframe}.csv"))
    }
}

impl CandleProvider for CsvDirProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<FetchResult, DataError> {
        let path = self.file_path(symbol, timeframe);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: format!("{symbol} ({})", path.display()),
            });
        }
        let candles = load_csv(&path)?;
        tracing::debug!(path = %path.display(), rows = candles.len(), "loaded csv candles");
        Ok(FetchResult {
            symbol: symbol.to_string(),
            timeframe,
            candles: keep_last(candles, limit),
            source: DataSource::CsvImport,
        })
    }

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }
}
