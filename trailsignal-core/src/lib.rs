//! TrailSignal Core: candles, indicators, the trailing-stop signal engine and
//! market data providers.
//!
//! - Domain types (candles, timeframes, classifications)
//! - ATR / EMA indicators and the trailing-stop recurrence
//! - Batch evaluation and an incremental stream evaluator
//! - Candle providers (Binance, CoinGecko, CSV, synthetic) with fallback and caching
//!
//! The engine never performs I/O and never logs; everything under `data` may.

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;

pub use domain::{Candle, Classification, Timeframe};
pub use engine::{evaluate, indicator_rows, EngineError, EvaluationResult, SignalParams};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the runner shares across rayon workers
    /// is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::CandleDefect>();
        require_sync::<domain::CandleDefect>();
        require_send::<domain::Timeframe>();
        require_sync::<domain::Timeframe>();

        // Engine types
        require_send::<engine::SignalParams>();
        require_sync::<engine::SignalParams>();
        require_send::<engine::EvaluationResult>();
        require_sync::<engine::EvaluationResult>();
        require_send::<engine::IndicatorRow>();
        require_sync::<engine::IndicatorRow>();
        require_send::<engine::EngineError>();
        require_sync::<engine::EngineError>();
        require_send::<engine::TrailingStopStream>();
        require_sync::<engine::TrailingStopStream>();

        // Providers
        require_send::<data::BinanceProvider>();
        require_sync::<data::BinanceProvider>();
        require_send::<data::CoinGeckoProvider>();
        require_sync::<data::CoinGeckoProvider>();
        require_send::<data::ProviderChain>();
        require_sync::<data::ProviderChain>();
        require_send::<data::CachedProvider<data::ProviderChain>>();
        require_sync::<data::CachedProvider<data::ProviderChain>>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
        require_send::<data::DataError>();
        require_sync::<data::DataError>();
    }

    /// Architecture contract: the engine works on a borrowed candle slice and
    /// has no access to providers.
    #[test]
    fn evaluate_takes_only_candles_and_params() {
        fn _check(candles: &[Candle], params: &SignalParams) -> Result<EvaluationResult, EngineError> {
            evaluate(candles, params)
        }
        let result = evaluate(&[], &SignalParams::default()).unwrap();
        assert_eq!(result.classification, Classification::Empty);
    }
}
