//! Signal engine: ATR trailing stop and Buy/Sell/Hold classification.
//!
//! The engine is a pure function of its input window and parameters:
//!
//! 1. Validate parameters, then every candle (fail fast, no partial result)
//! 2. True range and its clipped rolling mean (ATR)
//! 3. Trailing stop recurrence seeded per [`StopSeed`](crate::indicators::StopSeed)
//! 4. Trend reference smoothing and per-row classification
//!
//! Only the last row's decision is surfaced by [`evaluate`]; [`indicator_rows`]
//! exposes the full trace. [`TrailingStopStream`] is the incremental form.
//! Nothing here logs, retries or keeps state between calls.

pub mod error;
pub mod evaluate;
pub mod params;
pub mod stream;

pub use error::EngineError;
pub use evaluate::{evaluate, indicator_rows, EvaluationResult, IndicatorRow};
pub use params::SignalParams;
pub use stream::TrailingStopStream;
