//! True Range and its simple moving average (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|); the first
//! candle has no previous close and uses high-low alone.
//! ATR here is a simple moving average with "minimum periods 1" semantics:
//! before `window` rows exist, the mean is taken over every row so far.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Atr {
    window: usize,
    name: String,
}

impl Atr {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "ATR window must be >= 1");
        Self {
            window,
            name: format!("atr_{window}"),
        }
    }
}

/// True range of one candle given the previous close, if any.
pub fn candle_true_range(candle: &Candle, prev_close: Option<f64>) -> f64 {
    let range = candle.high - candle.low;
    match prev_close {
        None => range,
        Some(pc) => range
            .max((candle.high - pc).abs())
            .max((candle.low - pc).abs()),
    }
}

/// Compute the True Range series.
/// TR[0] = high[0] - low[0].
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let prev_close = i.checked_sub(1).map(|p| candles[p].close);
            candle_true_range(c, prev_close)
        })
        .collect()
}

/// Rolling mean over the trailing `window` values, clipped to available history.
///
/// result[i] = mean(values[max(0, i+1-window) ..= i]).
/// Each mean is summed oldest-first from its own window, never from a running
/// sum, so an all-zero window is exactly 0. The streaming engine sums its ring
/// buffer in the same order.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    assert!(window >= 1, "rolling window must be >= 1");
    (0..values.len())
        .map(|i| window_mean(&values[(i + 1).saturating_sub(window)..=i]))
        .collect()
}

/// Mean of one non-empty window, summed oldest-first.
pub fn window_mean<'a>(window: impl IntoIterator<Item = &'a f64>) -> f64 {
    let (sum, count) = window
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    sum / count as f64
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        rolling_mean(&true_range(candles), self.window)
    }
}
