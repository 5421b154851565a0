//! Provider assembly for scans.
//!
//! Builds the fallback chain from the configuration and command-line source
//! flags:
//! 1. CSV directory, when given
//! 2. Binance klines, unless offline
//! 3. CoinGecko snapshot, unless offline or disabled
//! 4. Synthetic candles, when enabled
//!
//! The chain is wrapped in the in-memory TTL cache. Synthetic data is a
//! developer-only mode; entries produced from it carry the `synthetic` source tag.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use trailsignal_core::data::{
    BinanceProvider, CachedProvider, CandleProvider, CircuitBreaker, CoinGeckoProvider,
    CsvDirProvider, DataError, ProviderChain, SyntheticProvider,
};

use crate::config::ScanConfig;

/// Options controlling where candles come from.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    /// If true, never make network requests.
    pub offline: bool,
    /// If true, fall back to synthetic candles when every other source fails.
    pub synthetic: bool,
    /// Directory of `<SYMBOL>_<timeframe>.csv` files, tried first.
    pub csv_dir: Option<PathBuf>,
}

/// Provider type used by the scanner.
pub type ScanProvider = CachedProvider<ProviderChain>;

/// Assemble the provider chain. `anchor` fixes the end of synthetic series.
pub fn build_provider(
    config: &ScanConfig,
    opts: &SourceOptions,
    anchor: DateTime<Utc>,
) -> Result<ScanProvider, DataError> {
    let mut providers: Vec<Box<dyn CandleProvider>> = Vec::new();

    if let Some(dir) = &opts.csv_dir {
        providers.push(Box::new(CsvDirProvider::new(dir.clone())));
    }

    if !opts.offline {
        let breaker = Arc::new(CircuitBreaker::default_provider());
        providers.push(Box::new(BinanceProvider::new(config.binance.clone(), breaker)?));
        if config.coingecko.enabled {
            providers.push(Box::new(CoinGeckoProvider::new(config.coingecko.clone())?));
        }
    }

    if opts.synthetic {
        tracing::warn!("synthetic fallback enabled; results may not reflect the market");
        providers.push(Box::new(SyntheticProvider::new(anchor)));
    }

    let chain = ProviderChain::new(providers);
    tracing::debug!(providers = ?chain.provider_names(), "assembled provider chain");
    if chain.is_empty() {
        tracing::warn!("no data source configured; every fetch will fail");
    }

    Ok(CachedProvider::with_ttl(chain, config.cache_ttl()))
}
