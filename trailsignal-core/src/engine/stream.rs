//! Incremental form of the engine for continuously arriving candles.
//!
//! Carries only the previous close and stop, a ring buffer of the last
//! `window_size` true ranges, and the smoothing state.
//! Produces the same rows as [`indicator_rows`](super::indicator_rows) over the
//! same prefix.

use super::{EngineError, EvaluationResult, IndicatorRow, SignalParams};
use crate::domain::Candle;
use crate::indicators::atr::{candle_true_range, window_mean};
use crate::indicators::ema::{ewm_step, span_alpha};
use crate::indicators::{classify, next_stop};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct TrailingStopStream {
    params: SignalParams,
    alpha: f64,
    window: VecDeque<f64>,
    trend: Option<f64>,
    last: Option<IndicatorRow>,
    rows_seen: usize,
}

impl TrailingStopStream {
    /// Create an empty stream. Parameters are validated up front.
    pub fn new(params: SignalParams) -> Result<Self, EngineError> {
        params.validate()?;
        Ok(Self {
            alpha: span_alpha(params.trend_span),
            window: VecDeque::with_capacity(params.window_size + 1),
            trend: None,
            last: None,
            rows_seen: 0,
            params,
        })
    }

    pub fn params(&self) -> &SignalParams {
        &self.params
    }

    /// Number of candles accepted so far.
    pub fn len(&self) -> usize {
        self.rows_seen
    }

    pub fn is_empty(&self) -> bool {
        self.rows_seen == 0
    }

    /// Feed the next candle. A rejected candle leaves the stream unchanged.
    pub fn push(&mut self, candle: &Candle) -> Result<IndicatorRow, EngineError> {
        let malformed = |defect| EngineError::MalformedCandle {
            index: self.rows_seen,
            defect,
        };
        candle.check().map_err(malformed)?;
        if let Some(prev) = &self.last {
            if candle.timestamp <= prev.timestamp {
                return Err(malformed(crate::domain::CandleDefect::TimestampNotAscending));
            }
        }

        let prev_close = self.last.as_ref().map(|r| r.close);
        let tr = candle_true_range(candle, prev_close);

        self.window.push_back(tr);
        if self.window.len() > self.params.window_size {
            self.window.pop_front();
        }
        let atr = window_mean(&self.window);
        let n_loss = self.params.sensitivity * atr;

        let stop = match &self.last {
            None => self.params.seed.initial_stop(candle.close),
            Some(prev) => Some(next_stop(prev.trailing_stop, prev.close, candle.close, n_loss)),
        };

        let trend = ewm_step(self.trend, candle.close, self.alpha);
        self.trend = Some(trend);

        let row = IndicatorRow {
            timestamp: candle.timestamp,
            close: candle.close,
            true_range: tr,
            average_true_range: atr,
            n_loss,
            trailing_stop: stop,
            trend_reference: trend,
            classification: classify(candle.close, trend, stop),
        };
        self.last = Some(row.clone());
        self.rows_seen += 1;
        Ok(row)
    }

    /// Decision for the most recent candle (`Empty` before the first push).
    pub fn last(&self) -> EvaluationResult {
        self.last
            .as_ref()
            .map(EvaluationResult::from_row)
            .unwrap_or_else(EvaluationResult::empty)
    }

    /// Forget all history, keeping the parameters.
    pub fn reset(&mut self) {
        self.window.clear();
        self.trend = None;
        self.last = None;
        self.rows_seen = 0;
    }
}
