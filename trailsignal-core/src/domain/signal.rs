//! Signal classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete decision for one row, or for the last row of an evaluated series.
///
/// `Empty` is only produced for a series with no rows; per-row classifications
/// are always `Buy`, `Sell` or `Hold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Buy,
    Sell,
    Hold,
    Empty,
}

impl Classification {
    /// Buy or Sell.
    pub fn is_actionable(&self) -> bool {
        matches!(self, Classification::Buy | Classification::Sell)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Buy => "Buy",
            Classification::Sell => "Sell",
            Classification::Hold => "Hold",
            Classification::Empty => "Empty",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
