//! Engine error types.

use crate::domain::CandleDefect;
use thiserror::Error;

/// Typed failures of a single engine call.
///
/// An empty series is not an error; it evaluates to `Classification::Empty`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("malformed candle at row {index}: {defect}")]
    MalformedCandle { index: usize, defect: CandleDefect },
}

impl EngineError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
