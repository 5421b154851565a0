//! CoinGecko market snapshot provider.
//!
//! Used as a last-resort fallback when every klines endpoint fails. The
//! markets endpoint only reports the current price and 24h extremes, so the
//! result is a single candle regardless of the requested timeframe.

use super::provider::{CandleProvider, DataError, DataSource, FetchResult};
use crate::domain::{Candle, Timeframe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Connection settings for the CoinGecko provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinGeckoConfig {
    pub enabled: bool,
    pub base_url: String,
    pub timeout_secs: u64,
    pub proxy: Option<String>,
    /// Explicit symbol → CoinGecko id mapping (e.g. `BTCUSDT = "bitcoin"`).
    pub ids: BTreeMap<String, String>,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.coingecko.com/api/v3/coins/markets".into(),
            timeout_secs: 30,
            proxy: None,
            ids: BTreeMap::new(),
        }
    }
}

impl CoinGeckoConfig {
    /// CoinGecko id for a symbol: the configured mapping, otherwise the
    /// lowercased symbol with a trailing `usdt` removed.
    pub fn coin_id(&self, symbol: &str) -> String {
        if let Some(id) = self.ids.get(symbol) {
            return id.clone();
        }
        let lower = symbol.to_lowercase();
        lower
            .strip_suffix("usdt")
            .map(str::to_string)
            .unwrap_or(lower)
    }
}

/// One entry of the markets response. Only the fields we use.
#[derive(Debug, Deserialize)]
struct MarketEntry {
    current_price: Option<f64>,
    high_24h: Option<f64>,
    low_24h: Option<f64>,
    total_volume: Option<f64>,
    last_updated: Option<String>,
}

pub struct CoinGeckoProvider {
    client: reqwest::blocking::Client,
    config: CoinGeckoConfig,
}

impl CoinGeckoProvider {
    pub fn new(config: CoinGeckoConfig) -> Result<Self, DataError> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Mozilla/5.0");
        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| DataError::Other(format!("invalid proxy '{proxy}': {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn markets_url(&self, id: &str) -> String {
        format!(
            "{}?vs_currency=usd&ids={id}&order=market_cap_desc",
            self.config.base_url
        )
    }

    /// Turn a markets response into a one-candle series.
    ///
    /// open = close = current price; the 24h extremes are widened to include
    /// the current price so the candle is always well-formed.
    fn parse_markets(
        symbol: &str,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Candle>, DataError> {
        let entries: Vec<MarketEntry> = serde_json::from_str(body)
            .map_err(|e| DataError::ResponseFormatChanged(format!("coingecko markets: {e}")))?;

        let entry = entries.into_iter().next().ok_or_else(|| DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        })?;

        let price = entry.current_price.ok_or_else(|| {
            DataError::ResponseFormatChanged("coingecko entry has no current_price".into())
        })?;

        let timestamp = entry
            .last_updated
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now);

        Ok(vec![Candle {
            timestamp,
            open: price,
            high: entry.high_24h.map_or(price, |h| h.max(price)),
            low: entry.low_24h.map_or(price, |l| l.min(price)),
            close: price,
            volume: entry.total_volume,
        }])
    }
}

impl CandleProvider for CoinGeckoProvider {
    fn name(&self) -> &str {
        "coingecko"
    }

    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        _limit: usize,
    ) -> Result<FetchResult, DataError> {
        let id = self.config.coin_id(symbol);
        let url = self.markets_url(&id);
        tracing::debug!(%url, %symbol, "requesting coingecko snapshot");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited {
                retry_after_secs: 60,
            });
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        let candles = Self::parse_markets(symbol, &body, Utc::now())?;

        Ok(FetchResult {
            symbol: symbol.to_string(),
            timeframe,
            candles,
            source: DataSource::CoinGecko,
        })
    }

    fn is_available(&self) -> bool {
        self.config.enabled
    }
}
