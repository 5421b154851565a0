//! Candle: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One sampled OHLCV observation for a single (asset, timeframe) pair.
///
/// `volume` is optional: snapshot sources and some CSV files do not carry it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

/// Price or volume field of a candle, used to name the field a defect refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandleField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl fmt::Display for CandleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CandleField::Open => "open",
            CandleField::High => "high",
            CandleField::Low => "low",
            CandleField::Close => "close",
            CandleField::Volume => "volume",
        };
        f.write_str(name)
    }
}

/// Why a candle was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "field", rename_all = "snake_case")]
pub enum CandleDefect {
    NonFinite(CandleField),
    Negative(CandleField),
    HighBelowLow,
    OpenOutsideRange,
    CloseOutsideRange,
    /// Timestamp is not strictly after the previous candle's.
    TimestampNotAscending,
}

impl fmt::Display for CandleDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandleDefect::NonFinite(field) => write!(f, "{field} is not finite"),
            CandleDefect::Negative(field) => write!(f, "{field} is negative"),
            CandleDefect::HighBelowLow => f.write_str("high is below low"),
            CandleDefect::OpenOutsideRange => f.write_str("open is outside [low, high]"),
            CandleDefect::CloseOutsideRange => f.write_str("close is outside [low, high]"),
            CandleDefect::TimestampNotAscending => {
                f.write_str("timestamp is not after the previous candle")
            }
        }
    }
}

impl Candle {
    /// Check the single-candle invariants: finite, non-negative, `low <= open,close <= high`.
    ///
    /// Ordering against neighbouring candles is checked by [`validate_series`].
    pub fn check(&self) -> Result<(), CandleDefect> {
        let prices = [
            (CandleField::Open, self.open),
            (CandleField::High, self.high),
            (CandleField::Low, self.low),
            (CandleField::Close, self.close),
        ];
        let volume = self.volume.map(|v| (CandleField::Volume, v));

        for (field, value) in prices.into_iter().chain(volume) {
            if !value.is_finite() {
                return Err(CandleDefect::NonFinite(field));
            }
            if value < 0.0 {
                return Err(CandleDefect::Negative(field));
            }
        }

        if self.low > self.high {
            return Err(CandleDefect::HighBelowLow);
        }
        if self.open < self.low || self.open > self.high {
            return Err(CandleDefect::OpenOutsideRange);
        }
        if self.close < self.low || self.close > self.high {
            return Err(CandleDefect::CloseOutsideRange);
        }
        Ok(())
    }

    /// Convenience for `check().is_ok()`.
    pub fn is_sane(&self) -> bool {
        self.check().is_ok()
    }
}

/// Validate a whole series: every candle passes [`Candle::check`] and timestamps
/// are strictly ascending. Returns the index and defect of the first bad row.
pub fn validate_series(candles: &[Candle]) -> Result<(), (usize, CandleDefect)> {
    let mut prev: Option<&Candle> = None;
    for (i, candle) in candles.iter().enumerate() {
        candle.check().map_err(|defect| (i, defect))?;
        if let Some(p) = prev {
            if candle.timestamp <= p.timestamp {
                return Err((i, CandleDefect::TimestampNotAscending));
            }
        }
        prev = Some(candle);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_candle() -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: Some(50_000.0),
        }
    }

    #[test]
    fn candle_is_sane() {
        assert!(sample_candle().is_sane());
    }

    #[test]
    fn missing_volume_is_fine() {
        let mut c = sample_candle();
        c.volume = None;
        assert!(c.is_sane());
    }

    #[test]
    fn detects_nan_and_infinity() {
        let mut c = sample_candle();
        c.close = f64::NAN;
        assert_eq!(c.check(), Err(CandleDefect::NonFinite(CandleField::Close)));

        let mut c = sample_candle();
        c.volume = Some(f64::INFINITY);
        assert_eq!(c.check(), Err(CandleDefect::NonFinite(CandleField::Volume)));
    }

    #[test]
    fn detects_negative_price() {
        let mut c = sample_candle();
        c.low = -1.0;
        assert_eq!(c.check(), Err(CandleDefect::Negative(CandleField::Low)));
    }

    #[test]
    fn detects_high_below_low() {
        let mut c = sample_candle();
        c.high = 97.0;
        assert_eq!(c.check(), Err(CandleDefect::HighBelowLow));
    }

    #[test]
    fn detects_open_and_close_outside_range() {
        let mut c = sample_candle();
        c.open = 106.0;
        assert_eq!(c.check(), Err(CandleDefect::OpenOutsideRange));

        let mut c = sample_candle();
        c.close = 97.5;
        assert_eq!(c.check(), Err(CandleDefect::CloseOutsideRange));
    }

    #[test]
    fn series_rejects_duplicate_timestamp() {
        let a = sample_candle();
        let b = sample_candle();
        assert_eq!(
            validate_series(&[a, b]),
            Err((1, CandleDefect::TimestampNotAscending))
        );
    }

    #[test]
    fn empty_series_is_valid() {
        assert!(validate_series(&[]).is_ok());
    }

    #[test]
    fn defect_serialization_roundtrip() {
        let defect = CandleDefect::NonFinite(CandleField::High);
        let json = serde_json::to_string(&defect).unwrap();
        let back: CandleDefect = serde_json::from_str(&json).unwrap();
        assert_eq!(defect, back);
    }
}
