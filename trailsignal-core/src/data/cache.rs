//! In-memory TTL cache in front of a provider.
//!
//! Repeated scans in watch mode hit the network at most once per TTL for each
//! (symbol, timeframe, limit) key.

use super::provider::{CandleProvider, DataError, DataSource, FetchResult};
use crate::domain::{Candle, Timeframe};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

type CacheKey = (String, Timeframe, usize);

struct CacheEntry {
    stored_at: Instant,
    candles: Vec<Candle>,
}

/// Wraps a provider with a time-bounded memo of successful fetches.
///
/// Failures are never cached. Hits are tagged `DataSource::Cache`.
pub struct CachedProvider<P> {
    inner: P,
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl<P: CandleProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self::with_ttl(inner, DEFAULT_TTL)
    }

    pub fn with_ttl(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of entries still within their TTL.
    pub fn live_entries(&self) -> usize {
        let ttl = self.ttl;
        self.lock()
            .values()
            .filter(|e| e.stored_at.elapsed() < ttl)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: CandleProvider> CandleProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<FetchResult, DataError> {
        let key = (symbol.to_string(), timeframe, limit);
        {
            let mut entries = self.lock();
            match entries.get(&key) {
                Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                    tracing::debug!(%symbol, %timeframe, "cache hit");
                    return Ok(FetchResult {
                        symbol: symbol.to_string(),
                        timeframe,
                        candles: entry.candles.clone(),
                        source: DataSource::Cache,
                    });
                }
                Some(_) => {
                    entries.remove(&key);
                }
                None => {}
            }
        }

        // Lock is released while the inner provider does network I/O.
        let result = self.inner.fetch(symbol, timeframe, limit)?;
        self.lock().insert(
            key,
            CacheEntry {
                stored_at: Instant::now(),
                candles: result.candles.clone(),
            },
        );
        Ok(result)
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}
