//! Market data acquisition: providers, fallback chain, caching.

pub mod binance;
pub mod cache;
pub mod chain;
pub mod circuit_breaker;
pub mod coingecko;
pub mod csv_source;
pub mod provider;
pub mod synthetic;

pub use binance::{BinanceConfig, BinanceProvider};
pub use cache::{CachedProvider, DEFAULT_TTL};
pub use chain::ProviderChain;
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use coingecko::{CoinGeckoConfig, CoinGeckoProvider};
pub use csv_source::{load_csv, parse_timestamp, CsvDirProvider};
pub use provider::{CandleProvider, DataError, DataSource, FetchResult};
pub use synthetic::SyntheticProvider;
