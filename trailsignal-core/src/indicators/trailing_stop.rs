//! ATR trailing stop recurrence.
//!
//! The stop ratchets in the direction of the prevailing trend and resets on a
//! reversal:
//! - close and previous close both above the previous stop: max(prev_stop, close - n_loss)
//! - close and previous close both below the previous stop: min(prev_stop, close + n_loss)
//! - close above the previous stop (flip up): close - n_loss
//! - otherwise (flip down): close + n_loss
//!
//! The recurrence is self-referential, so row 0 needs an explicit seed; see [`StopSeed`].

use crate::domain::Classification;
use serde::{Deserialize, Serialize};

/// Rule for the row-0 stop, which has no previous stop to ratchet from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopSeed {
    /// `stop[0] = close[0]`: no trend yet, row 0 classifies Hold and row 1
    /// resets toward whichever side the close moved.
    #[default]
    AtClose,
    /// `stop[0]` is absent. An absent stop fails every comparison, so row 1
    /// always takes the flip-down branch (`close[1] + n_loss[1]`).
    Unseeded,
}

impl StopSeed {
    /// Stop value for row 0.
    pub fn initial_stop(&self, close: f64) -> Option<f64> {
        match self {
            StopSeed::AtClose => Some(close),
            StopSeed::Unseeded => None,
        }
    }
}

/// One step of the recurrence for row i >= 1.
pub fn next_stop(prev_stop: Option<f64>, prev_close: f64, close: f64, n_loss: f64) -> f64 {
    let Some(prev) = prev_stop else {
        return close + n_loss;
    };

    if close > prev && prev_close > prev {
        prev.max(close - n_loss)
    } else if close < prev && prev_close < prev {
        prev.min(close + n_loss)
    } else if close > prev {
        close - n_loss
    } else {
        close + n_loss
    }
}

/// Classify a row from its close, trend reference and stop.
///
/// Buy needs both close and trend reference strictly above the stop, Sell both
/// strictly below; anything else (including an absent stop) is Hold.
pub fn classify(close: f64, trend_reference: f64, stop: Option<f64>) -> Classification {
    match stop {
        Some(s) if close > s && trend_reference > s => Classification::Buy,
        Some(s) if close < s && trend_reference < s => Classification::Sell,
        _ => Classification::Hold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn ratchets_up_while_uptrend_holds() {
        // Both closes above 95: max(95, 110 - 4) = 106
        assert_approx(next_stop(Some(95.0), 100.0, 110.0, 4.0), 106.0, DEFAULT_EPSILON);
        // Never falls: max(95, 99 - 10) = 95
        assert_approx(next_stop(Some(95.0), 100.0, 99.0, 10.0), 95.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ratchets_down_while_downtrend_holds() {
        // Both closes below 105: min(105, 90 + 4) = 94
        assert_approx(next_stop(Some(105.0), 100.0, 90.0, 4.0), 94.0, DEFAULT_EPSILON);
        // Never rises: min(105, 101 + 10) = 105
        assert_approx(next_stop(Some(105.0), 100.0, 101.0, 10.0), 105.0, DEFAULT_EPSILON);
    }

    #[test]
    fn resets_on_flip_up() {
        // prev close below stop, close above: 110 - 4
        assert_approx(next_stop(Some(105.0), 100.0, 110.0, 4.0), 106.0, DEFAULT_EPSILON);
    }

    #[test]
    fn resets_on_flip_down() {
        // prev close above stop, close below: 90 + 4
        assert_approx(next_stop(Some(95.0), 100.0, 90.0, 4.0), 94.0, DEFAULT_EPSILON);
    }

    #[test]
    fn close_equal_to_stop_takes_flip_down_branch() {
        assert_approx(next_stop(Some(100.0), 100.0, 100.0, 2.0), 102.0, DEFAULT_EPSILON);
    }

    #[test]
    fn absent_stop_takes_flip_down_branch() {
        assert_approx(next_stop(None, 100.0, 105.0, 4.0), 109.0, DEFAULT_EPSILON);
    }

    #[test]
    fn seeds() {
        assert_eq!(StopSeed::AtClose.initial_stop(42.0), Some(42.0));
        assert_eq!(StopSeed::Unseeded.initial_stop(42.0), None);
        assert_eq!(StopSeed::default(), StopSeed::AtClose);
    }

    #[test]
    fn classification_rules() {
        assert_eq!(classify(105.0, 105.0, Some(100.0)), Classification::Buy);
        assert_eq!(classify(95.0, 95.0, Some(100.0)), Classification::Sell);
        assert_eq!(classify(100.0, 100.0, Some(100.0)), Classification::Hold);
        // close above, trend reference below: no agreement
        assert_eq!(classify(105.0, 99.0, Some(100.0)), Classification::Hold);
        assert_eq!(classify(105.0, 105.0, None), Classification::Hold);
    }
}
