//! Deterministic synthetic candles for offline development.
//!
//! Series are a random walk seeded from BLAKE3(symbol, timeframe), so the same
//! request always yields the same candles. They are tagged `Synthetic` and
//! must never be mistaken for market data.

use super::provider::{CandleProvider, DataError, DataSource, FetchResult};
use crate::domain::{Candle, Timeframe};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Provider that generates random-walk candles ending at a fixed anchor time.
pub struct SyntheticProvider {
    anchor: DateTime<Utc>,
    start_price: f64,
}

impl SyntheticProvider {
    /// The last candle of every series opens on the timeframe boundary at or
    /// before `anchor`.
    pub fn new(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            start_price: 100.0,
        }
    }

    pub fn with_start_price(mut self, price: f64) -> Self {
        self.start_price = price;
        self
    }

    /// Generate `count` candles for a symbol/timeframe pair.
    pub fn generate(&self, symbol: &str, timeframe: Timeframe, count: usize) -> Vec<Candle> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(symbol.as_bytes());
        hasher.update(timeframe.as_str().as_bytes());
        let seed: [u8; 32] = *hasher.finalize().as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let step = timeframe.duration();
        let Some(last_open) = align_to_grid(self.anchor, timeframe) else {
            return Vec::new();
        };
        // Every later open is closer to the anchor, so checking the first suffices.
        if count > 0 && open_before(last_open, step, count - 1).is_none() {
            tracing::warn!(
                count,
                %timeframe,
                "synthetic series would start before the representable range"
            );
            return Vec::new();
        }

        let mut candles = Vec::with_capacity(count);
        let mut price = self.start_price;
        for i in 0..count {
            let Some(timestamp) = open_before(last_open, step, count - 1 - i) else {
                break;
            };

            let ret: f64 = rng.gen_range(-0.02..0.02);
            let open = price;
            let close = price * (1.0 + ret);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.005));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.005));
            let volume = rng.gen_range(10.0..1_000.0);

            candles.push(Candle {
                timestamp,
                open,
                high,
                low,
                close,
                volume: Some(volume),
            });
            price = close;
        }
        candles
    }
}

/// Open time `back` steps before `last_open`, if representable.
fn open_before(last_open: DateTime<Utc>, step: Duration, back: usize) -> Option<DateTime<Utc>> {
    let secs = step.num_seconds().checked_mul(i64::try_from(back).ok()?)?;
    last_open.checked_sub_signed(Duration::try_seconds(secs)?)
}

/// Floor a timestamp to the start of its timeframe bucket (epoch-aligned).
fn align_to_grid(at: DateTime<Utc>, timeframe: Timeframe) -> Option<DateTime<Utc>> {
    let secs = timeframe.minutes() * 60;
    let floored = at.timestamp().div_euclid(secs) * secs;
    Utc.timestamp_opt(floored, 0).single()
}

impl CandleProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<FetchResult, DataError> {
        tracing::warn!(%symbol, %timeframe, "generating synthetic candles");
        Ok(FetchResult {
            symbol: symbol.to_string(),
            timeframe,
            candles: self.generate(symbol, timeframe, limit),
            source: DataSource::Synthetic,
        })
    }
}
