//! Indicator series functions used by the signal engine.
//!
//! Indicators are pure functions: candle history in, numeric series out, one
//! value per candle. Unlike warmup-style indicators, every value here is
//! defined from row 0 onward: averages clip their window to the available
//! history.

pub mod atr;
pub mod ema;
pub mod trailing_stop;

pub use atr::{rolling_mean, true_range, Atr};
pub use ema::{ewm_of_series, Ema};
pub use trailing_stop::{classify, next_stop, StopSeed};

use crate::domain::Candle;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No value at row t may depend on candles from row t+1 or later.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "atr_10", "ema_1").
    fn name(&self) -> &str;

    /// Compute the indicator for the entire series.
    ///
    /// Returns a `Vec<f64>` of the same length as `candles`.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Create synthetic candles from close prices for testing.
///
/// open = prev_close (or close for the first candle),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, one minute apart.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                timestamp: base + chrono::Duration::minutes(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: Some(1000.0),
            }
        })
        .collect()
}

/// Create candles from explicit (high, low, close) triples; open = close.
#[cfg(test)]
pub fn make_hlc_candles(data: &[(f64, f64, f64)]) -> Vec<Candle> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(high, low, close))| Candle {
            timestamp: base + chrono::Duration::minutes(i as i64),
            open: close,
            high,
            low,
            close,
            volume: Some(1000.0),
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
