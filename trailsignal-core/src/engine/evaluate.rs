//! Batch evaluation over a whole candle window.

use super::{EngineError, SignalParams};
use crate::domain::{validate_series, Candle, Classification};
use crate::indicators::{classify, next_stop, Atr, Ema, Indicator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derived values for one candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub true_range: f64,
    pub average_true_range: f64,
    /// `sensitivity * average_true_range`.
    pub n_loss: f64,
    /// Absent only for row 0 under `StopSeed::Unseeded`.
    pub trailing_stop: Option<f64>,
    pub trend_reference: f64,
    pub classification: Classification,
}

/// Decision for the last row of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub classification: Classification,
    /// Close of the last row, present only for Buy or Sell.
    pub reference_price: Option<f64>,
    /// Timestamp of the last row, present whenever the series is non-empty.
    pub timestamp: Option<DateTime<Utc>>,
}

impl EvaluationResult {
    pub fn empty() -> Self {
        Self {
            classification: Classification::Empty,
            reference_price: None,
            timestamp: None,
        }
    }

    pub fn from_row(row: &IndicatorRow) -> Self {
        Self {
            classification: row.classification,
            reference_price: row.classification.is_actionable().then_some(row.close),
            timestamp: Some(row.timestamp),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.classification == Classification::Empty
    }
}

/// Validate inputs and compute one [`IndicatorRow`] per candle.
pub fn indicator_rows(
    candles: &[Candle],
    params: &SignalParams,
) -> Result<Vec<IndicatorRow>, EngineError> {
    params.validate()?;
    validate_series(candles)
        .map_err(|(index, defect)| EngineError::MalformedCandle { index, defect })?;

    let atr_indicator = Atr::new(params.window_size);
    let tr = crate::indicators::true_range(candles);
    let atr = atr_indicator.compute(candles);
    let trend = Ema::new(params.trend_span).compute(candles);

    let mut rows: Vec<IndicatorRow> = Vec::with_capacity(candles.len());

    for (i, candle) in candles.iter().enumerate() {
        let n_loss = params.sensitivity * atr[i];
        let stop = match rows.last() {
            None => params.seed.initial_stop(candle.close),
            Some(prev) => Some(next_stop(prev.trailing_stop, prev.close, candle.close, n_loss)),
        };

        rows.push(IndicatorRow {
            timestamp: candle.timestamp,
            close: candle.close,
            true_range: tr[i],
            average_true_range: atr[i],
            n_loss,
            trailing_stop: stop,
            trend_reference: trend[i],
            classification: classify(candle.close, trend[i], stop),
        });
    }

    Ok(rows)
}

/// Evaluate a series and return the last row's decision.
///
/// An empty series yields `Classification::Empty` with no price and no timestamp.
pub fn evaluate(candles: &[Candle], params: &SignalParams) -> Result<EvaluationResult, EngineError> {
    let rows = indicator_rows(candles, params)?;
    Ok(rows
        .last()
        .map(EvaluationResult::from_row)
        .unwrap_or_else(EvaluationResult::empty))
}
