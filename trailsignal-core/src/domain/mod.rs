//! Domain types for trailsignal

pub mod candle;
pub mod signal;
pub mod timeframe;

pub use candle::{validate_series, Candle, CandleDefect, CandleField};
pub use signal::Classification;
pub use timeframe::{ParseTimeframeError, Timeframe};
