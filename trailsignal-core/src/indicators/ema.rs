//! Exponential moving average with a span-based smoothing constant.
//!
//! alpha = 2 / (span + 1); EMA[0] = value[0]; EMA[t] = alpha*value[t] + (1-alpha)*EMA[t-1].
//! No bias adjustment and no warmup: defined from row 0.
//! A span of 1 gives alpha = 1, so the output equals the input exactly.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Ema {
    span: usize,
    name: String,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        assert!(span >= 1, "EMA span must be >= 1");
        Self {
            span,
            name: format!("ema_{span}"),
        }
    }
}

/// Smoothing constant for a span.
pub fn span_alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// One smoothing step. With `prev = None` the value seeds the average.
pub fn ewm_step(prev: Option<f64>, value: f64, alpha: f64) -> f64 {
    match prev {
        None => value,
        Some(p) => alpha * value + (1.0 - alpha) * p,
    }
}

/// Compute the span-based EMA of an arbitrary series.
pub fn ewm_of_series(values: &[f64], span: usize) -> Vec<f64> {
    assert!(span >= 1, "EMA span must be >= 1");
    let alpha = span_alpha(span);
    let mut prev = None;
    values
        .iter()
        .map(|&v| {
            let next = ewm_step(prev, v, alpha);
            prev = Some(next);
            next
        })
        .collect()
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        ewm_of_series(&closes, self.span)
    }
}
