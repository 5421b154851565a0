//! Scan reports: console text, JSON, CSV, and per-classification counts.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;
use trailsignal_core::domain::Classification;
use trailsignal_core::engine::EvaluationResult;

use crate::scanner::{ScanEntry, ScanOutcome, ScanReport};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize report to JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to flush CSV writer: {0}")]
    Flush(String),

    #[error("CSV output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Prices keep a decimal point so whole numbers read as prices (`95.0`).
fn format_price(price: f64) -> String {
    let s = price.to_string();
    if price.is_finite() && !s.contains('.') {
        format!("{s}.0")
    } else {
        s
    }
}

/// One console line for an entry.
pub fn render_line(entry: &ScanEntry) -> String {
    let signal = entry.outcome.result().and_then(|r| match r {
        EvaluationResult {
            reference_price: Some(price),
            timestamp: Some(ts),
            classification,
        } => Some((*classification, *price, *ts)),
        _ => None,
    });

    match signal {
        Some((classification, price, ts)) => format!(
            "Timeframe: {} | Signal: {} | Price: {} | Time: {}",
            entry.timeframe,
            classification,
            format_price(price),
            ts.format(TIME_FORMAT)
        ),
        None => format!("Timeframe: {} | No signal.", entry.timeframe),
    }
}

/// Console report: a heading per coin, one line per timeframe, plus a note
/// for pairs whose data could not be fetched or was rejected.
pub fn render_text(report: &ScanReport) -> String {
    let mut out = String::new();
    for symbol in report.symbols() {
        let _ = writeln!(out, "{symbol}");
        for entry in report.entries_for(symbol) {
            let _ = writeln!(out, "{}", render_line(entry));
            if let Some(err) = &entry.fetch_error {
                let _ = writeln!(out, "  data unavailable: {err}");
            }
            if let ScanOutcome::Rejected { reason } = &entry.outcome {
                let _ = writeln!(out, "  rejected: {reason}");
            }
        }
        out.push('\n');
    }
    out
}

/// Pretty JSON of the whole report.
pub fn export_json(report: &ScanReport) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// One CSV row per entry.
///
/// Columns: symbol, timeframe, source, candles, classification, price, time,
/// window_hash, fetch_error, rejection
pub fn export_csv(report: &ScanReport) -> Result<String, ReportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "timeframe",
        "source",
        "candles",
        "classification",
        "price",
        "time",
        "window_hash",
        "fetch_error",
        "rejection",
    ])?;

    for entry in &report.entries {
        let (classification, price, time, rejection) = match &entry.outcome {
            ScanOutcome::Evaluated(r) => (
                r.classification.to_string(),
                r.reference_price.map(format_price).unwrap_or_default(),
                r.timestamp.map(|t| t.to_rfc3339()).unwrap_or_default(),
                String::new(),
            ),
            ScanOutcome::Rejected { reason } => {
                (String::new(), String::new(), String::new(), reason.clone())
            }
        };
        wtr.write_record([
            entry.symbol.as_str(),
            entry.timeframe.as_str(),
            &entry.source.map(|s| s.to_string()).unwrap_or_default(),
            &entry.candle_count.to_string(),
            &classification,
            &price,
            &time,
            &entry.window_hash,
            entry.fetch_error.as_deref().unwrap_or(""),
            &rejection,
        ])?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| ReportError::Flush(e.to_string()))?;
    Ok(String::from_utf8(data)?)
}

/// Counts of entries per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub buy: usize,
    pub sell: usize,
    pub hold: usize,
    pub empty: usize,
    pub rejected: usize,
    /// Entries whose fetch failed (these also count as `empty`).
    pub fetch_failures: usize,
}

impl ScanSummary {
    pub fn from_report(report: &ScanReport) -> Self {
        let mut summary = Self::default();
        for entry in &report.entries {
            if entry.fetch_error.is_some() {
                summary.fetch_failures += 1;
            }
            match &entry.outcome {
                ScanOutcome::Rejected { .. } => summary.rejected += 1,
                ScanOutcome::Evaluated(r) => match r.classification {
                    Classification::Buy => summary.buy += 1,
                    Classification::Sell => summary.sell += 1,
                    Classification::Hold => summary.hold += 1,
                    Classification::Empty => summary.empty += 1,
                },
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.buy + self.sell + self.hold + self.empty + self.rejected
    }
}

impl std::fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} pairs: {} buy, {} sell, {} hold, {} empty, {} rejected ({} fetch failures)",
            self.total(),
            self.buy,
            self.sell,
            self.hold,
            self.empty,
            self.rejected,
            self.fetch_failures
        )
    }
}
