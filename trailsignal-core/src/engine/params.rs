//! Engine parameters.

use super::EngineError;
use crate::indicators::StopSeed;
use serde::{Deserialize, Serialize};

/// Parameters for one engine call, passed explicitly on every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalParams {
    /// Multiplier on the averaged true range.
    pub sensitivity: f64,
    /// Number of trailing candles in the true range average.
    pub window_size: usize,
    /// Span of the trend reference smoothing. 1 makes it equal to close.
    pub trend_span: usize,
    /// Row-0 rule for the trailing stop.
    pub seed: StopSeed,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            sensitivity: 1.0,
            window_size: 10,
            trend_span: 1,
            seed: StopSeed::AtClose,
        }
    }
}

impl SignalParams {
    pub fn new(sensitivity: f64, window_size: usize) -> Self {
        Self {
            sensitivity,
            window_size,
            ..Self::default()
        }
    }

    pub fn with_trend_span(mut self, trend_span: usize) -> Self {
        self.trend_span = trend_span;
        self
    }

    pub fn with_seed(mut self, seed: StopSeed) -> Self {
        self.seed = seed;
        self
    }

    /// Reject parameters before any computation begins.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.sensitivity.is_finite() || self.sensitivity <= 0.0 {
            return Err(EngineError::invalid(
                "sensitivity",
                format!("must be a finite number > 0, got {}", self.sensitivity),
            ));
        }
        if self.window_size < 1 {
            return Err(EngineError::invalid("window_size", "must be >= 1, got 0"));
        }
        if self.trend_span < 1 {
            return Err(EngineError::invalid("trend_span", "must be >= 1, got 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = SignalParams::default();
        assert_eq!(p.sensitivity, 1.0);
        assert_eq!(p.window_size, 10);
        assert_eq!(p.trend_span, 1);
        assert_eq!(p.seed, StopSeed::AtClose);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_sensitivity() {
        for s in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = SignalParams::new(s, 10).validate().unwrap_err();
            assert!(matches!(
                err,
                EngineError::InvalidParameter { name: "sensitivity", .. }
            ));
        }
    }

    #[test]
    fn rejects_zero_window() {
        let err = SignalParams::new(1.0, 0).validate().unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidParameter { name: "window_size", .. }
        ));
    }

    #[test]
    fn rejects_zero_span() {
        let err = SignalParams::default().with_trend_span(0).validate().unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidParameter { name: "trend_span", .. }
        ));
    }

    #[test]
    fn deserializes_partial_table() {
        let p: SignalParams = serde_json::from_str(r#"{"window_size": 14, "seed": "unseeded"}"#).unwrap();
        assert_eq!(p.window_size, 14);
        assert_eq!(p.sensitivity, 1.0);
        assert_eq!(p.seed, StopSeed::Unseeded);
    }
}
