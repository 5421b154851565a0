//! Binance klines provider.
//!
//! Fetches recent OHLCV candles from the public `/api/v3/klines` endpoint.
//! Several mirror hosts are tried in order: some regions block one host but
//! not another. Each host gets bounded retries with exponential backoff.
//! All hosts share one circuit breaker, which counts a single failure per
//! fetch and only once every host has failed.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{keep_last, CandleProvider, DataError, DataSource, FetchResult};
use crate::domain::{Candle, Timeframe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Binance error code for an unknown trading pair.
const INVALID_SYMBOL_CODE: i64 = -1121;

/// Connection settings for the Binance provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinanceConfig {
    /// Klines endpoints, tried in order.
    pub base_urls: Vec<String>,
    /// Sent as `X-MBX-APIKEY` when present. Not required for market data.
    pub api_key: Option<String>,
    /// Proxy URL applied to both http and https.
    pub proxy: Option<String>,
    pub timeout_secs: u64,
    /// Retries per endpoint after the first attempt.
    pub max_retries: u32,
    /// Base delay of the exponential retry backoff.
    pub backoff_ms: u64,
    /// Pause before moving on to the next endpoint.
    pub endpoint_pause_ms: u64,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_urls: vec![
                "https://api.binance.com/api/v3/klines".into(),
                "https://api1.binance.com/api/v3/klines".into(),
                "https://api2.binance.com/api/v3/klines".into(),
                "https://api3.binance.com/api/v3/klines".into(),
            ],
            api_key: None,
            proxy: None,
            timeout_secs: 30,
            max_retries: 2,
            backoff_ms: 500,
            endpoint_pause_ms: 1_000,
        }
    }
}

/// Binance klines provider.
pub struct BinanceProvider {
    client: reqwest::blocking::Client,
    config: BinanceConfig,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl BinanceProvider {
    pub fn new(config: BinanceConfig, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Mozilla/5.0");

        if let Some(key) = &config.api_key {
            let mut headers = reqwest::header::HeaderMap::new();
            let value = reqwest::header::HeaderValue::from_str(key)
                .map_err(|e| DataError::Other(format!("invalid API key header: {e}")))?;
            headers.insert("X-MBX-APIKEY", value);
            builder = builder.default_headers(headers);
        }

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| DataError::Other(format!("invalid proxy '{proxy}': {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            circuit_breaker,
        })
    }

    /// Build the klines URL for one endpoint.
    fn klines_url(base: &str, symbol: &str, timeframe: Timeframe, limit: usize) -> String {
        format!("{base}?symbol={symbol}&interval={timeframe}&limit={limit}")
    }

    /// Parse a klines response body into candles, ascending.
    ///
    /// Each kline is an array whose first six entries are the open time in
    /// milliseconds and string-encoded open, high, low, close and volume.
    pub fn parse_klines(body: &Value) -> Result<Vec<Candle>, DataError> {
        let rows = body.as_array().ok_or_else(|| {
            DataError::ResponseFormatChanged("klines response is not an array".into())
        })?;
        if rows.is_empty() {
            return Err(DataError::ResponseFormatChanged(
                "klines response is empty".into(),
            ));
        }

        let mut candles = rows
            .iter()
            .enumerate()
            .map(|(i, row)| parse_kline(i, row))
            .collect::<Result<Vec<_>, _>>()?;
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }

    /// Delay before retry `attempt` (1-based): `base * 2^(attempt - 1)`, saturating.
    fn backoff_delay(base: Duration, attempt: u32) -> Duration {
        base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    /// One endpoint, with retries. Only a ban touches the circuit breaker here.
    fn fetch_from(
        &self,
        base: &str,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, DataError> {
        let url = Self::klines_url(base, symbol, timeframe, limit);
        let base_delay = Duration::from_millis(self.config.backoff_ms);
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                std::thread::sleep(Self::backoff_delay(base_delay, attempt));
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            tracing::debug!(%url, attempt, "requesting klines");
            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            match status.as_u16() {
                // 418 is Binance's IP ban after ignoring 429s
                403 | 418 => {
                    self.circuit_breaker.trip();
                    return Err(DataError::CircuitBreakerTripped);
                }
                429 => {
                    let retry_after = resp
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(60);
                    last_error = Some(DataError::RateLimited {
                        retry_after_secs: retry_after,
                    });
                    continue;
                }
                // Region restricted: retrying the same host is pointless
                451 => {
                    return Err(DataError::HttpStatus {
                        status: 451,
                        url: base.to_string(),
                    })
                }
                400 => {
                    let body: Value = resp.json().unwrap_or(Value::Null);
                    if body.get("code").and_then(Value::as_i64) == Some(INVALID_SYMBOL_CODE) {
                        return Err(DataError::SymbolNotFound {
                            symbol: symbol.to_string(),
                        });
                    }
                    return Err(DataError::HttpStatus {
                        status: 400,
                        url: base.to_string(),
                    });
                }
                _ if !status.is_success() => {
                    last_error = Some(DataError::HttpStatus {
                        status: status.as_u16(),
                        url: base.to_string(),
                    });
                    continue;
                }
                _ => {}
            }

            let body: Value = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!("failed to parse klines for {symbol}: {e}"))
            })?;
            return Self::parse_klines(&body);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

fn parse_kline(index: usize, row: &Value) -> Result<Candle, DataError> {
    let fields = row
        .as_array()
        .filter(|f| f.len() >= 6)
        .ok_or_else(|| {
            DataError::ResponseFormatChanged(format!("kline {index} is not an array of >= 6 fields"))
        })?;

    let open_time = fields[0].as_i64().ok_or_else(|| {
        DataError::ResponseFormatChanged(format!("kline {index} has no integer open time"))
    })?;
    let timestamp = DateTime::<Utc>::from_timestamp_millis(open_time)
        .ok_or_else(|| DataError::InvalidTimestamp(open_time.to_string()))?;

    let number = |pos: usize, name: &str| -> Result<f64, DataError> {
        let value = &fields[pos];
        value
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .or_else(|| value.as_f64())
            .ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("kline {index} has a non-numeric {name}"))
            })
    };

    Ok(Candle {
        timestamp,
        open: number(1, "open")?,
        high: number(2, "high")?,
        low: number(3, "low")?,
        close: number(4, "close")?,
        volume: Some(number(5, "volume")?),
    })
}

impl CandleProvider for BinanceProvider {
    fn name(&self) -> &str {
        "binance"
    }

    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<FetchResult, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let endpoints = &self.config.base_urls;
        let mut last_error = None;

        for (i, base) in endpoints.iter().enumerate() {
            match self.fetch_from(base, symbol, timeframe, limit) {
                Ok(candles) => {
                    self.circuit_breaker.record_success();
                    return Ok(FetchResult {
                        symbol: symbol.to_string(),
                        timeframe,
                        candles: keep_last(candles, limit),
                        source: DataSource::Binance,
                    });
                }
                Err(e @ (DataError::SymbolNotFound { .. } | DataError::CircuitBreakerTripped)) => {
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(endpoint = %base, %symbol, %timeframe, error = %e, "binance endpoint failed");
                    last_error = Some(e);
                    if i + 1 < endpoints.len() {
                        std::thread::sleep(Duration::from_millis(self.config.endpoint_pause_ms));
                    }
                }
            }
        }

        let Some(error) = last_error else {
            return Err(DataError::Other("no binance endpoints configured".into()));
        };
        self.circuit_breaker.record_failure();
        Err(error)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ONE_KLINE: &str = r#"[[1704153600000,"1.0","1.2","0.9","1.1","5.0"]]"#;

    /// Local HTTP endpoint that answers every request with the same response.
    /// Returns its klines URL and a request counter.
    fn stub_endpoint(
        status: &'static str,
        extra_headers: &'static str,
        body: &'static str,
    ) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/api/v3/klines", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut line = String::new();
                while reader.read_line(&mut line).map(|n| n > 0).unwrap_or(false) {
                    if line == "\r\n" {
                        break;
                    }
                    line.clear();
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{extra_headers}\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        (url, hits)
    }

    fn local_provider(base_urls: Vec<String>, breaker: Arc<CircuitBreaker>) -> BinanceProvider {
        let config = BinanceConfig {
            base_urls,
            timeout_secs: 5,
            max_retries: 2,
            backoff_ms: 0,
            endpoint_pause_ms: 0,
            ..BinanceConfig::default()
        };
        BinanceProvider::new(config, breaker).unwrap()
    }

    fn fresh_breaker() -> Arc<CircuitBreaker> {
        Arc::new(CircuitBreaker::new(Duration::from_secs(60)))
    }

    #[test]
    fn builds_klines_url() {
        let url = BinanceProvider::klines_url(
            "https://api.binance.com/api/v3/klines",
            "BTCUSDT",
            Timeframe::M15,
            100,
        );
        assert_eq!(
            url,
            "https://api.binance.com/api/v3/klines?symbol=BTCUSDT&interval=15m&limit=100"
        );
    }

    #[test]
    fn parses_kline_rows() {
        let body = json!([
            [1704153600000i64, "42000.1", "42100.0", "41900.5", "42050.0", "12.5", 1704153659999i64, "0", 10, "0", "0", "0"],
            [1704153660000i64, "42050.0", "42080.0", "42000.0", "42010.0", "3.25", 1704153719999i64, "0", 10, "0", "0", "0"]
        ]);
        let candles = BinanceProvider::parse_klines(&body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp.timestamp_millis(), 1704153600000);
        assert_eq!(candles[0].open, 42000.1);
        assert_eq!(candles[0].low, 41900.5);
        assert_eq!(candles[1].close, 42010.0);
        assert_eq!(candles[1].volume, Some(3.25));
    }

    #[test]
    fn sorts_rows_ascending() {
        let body = json!([
            [2000i64, "1", "1", "1", "1", "1"],
            [1000i64, "2", "2", "2", "2", "2"]
        ]);
        let candles = BinanceProvider::parse_klines(&body).unwrap();
        assert_eq!(candles[0].close, 2.0);
        assert_eq!(candles[1].close, 1.0);
    }

    #[test]
    fn rejects_empty_and_non_array_bodies() {
        assert!(matches!(
            BinanceProvider::parse_klines(&json!([])),
            Err(DataError::ResponseFormatChanged(_))
        ));
        assert!(matches!(
            BinanceProvider::parse_klines(&json!({"code": -1121, "msg": "Invalid symbol."})),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn rejects_short_or_non_numeric_rows() {
        assert!(BinanceProvider::parse_klines(&json!([[1000i64, "1", "1"]])).is_err());
        assert!(BinanceProvider::parse_klines(&json!([[1000i64, "x", "1", "1", "1", "1"]])).is_err());
    }

    #[test]
    fn tripped_breaker_refuses_without_network() {
        let breaker = Arc::new(CircuitBreaker::new(Duration::from_secs(60)));
        breaker.trip();
        let provider = BinanceProvider::new(BinanceConfig::default(), breaker).unwrap();
        assert!(!provider.is_available());
        assert!(matches!(
            provider.fetch("BTCUSDT", Timeframe::M1, 10),
            Err(DataError::CircuitBreakerTripped)
        ));
    }

    #[test]
    fn rejects_bad_proxy() {
        let config = BinanceConfig {
            proxy: Some("http://[::1".into()),
            ..BinanceConfig::default()
        };
        let breaker = Arc::new(CircuitBreaker::default_provider());
        assert!(BinanceProvider::new(config, breaker).is_err());
    }

    #[test]
    fn failing_mirror_falls_through_to_healthy_one() {
        let (bad, bad_hits) = stub_endpoint("500 Internal Server Error", "", "{}");
        let (good, good_hits) = stub_endpoint("200 OK", "", ONE_KLINE);
        let breaker = fresh_breaker();
        let provider = local_provider(vec![bad, good], Arc::clone(&breaker));

        let result = provider.fetch("BTCUSDT", Timeframe::H1, 10).unwrap();
        assert_eq!(result.source, DataSource::Binance);
        assert_eq!(result.candles.len(), 1);
        assert_eq!(result.candles[0].close, 1.1);
        // First attempt plus two retries on the failing mirror.
        assert_eq!(bad_hits.load(Ordering::SeqCst), 3);
        assert_eq!(good_hits.load(Ordering::SeqCst), 1);
        assert!(breaker.is_allowed());
    }

    #[test]
    fn breaker_counts_one_failure_per_exhausted_fetch() {
        let (a, _) = stub_endpoint("503 Service Unavailable", "", "{}");
        let (b, _) = stub_endpoint("502 Bad Gateway", "", "{}");
        let breaker = fresh_breaker();
        let provider = local_provider(vec![a, b], Arc::clone(&breaker));

        for _ in 0..2 {
            assert!(matches!(
                provider.fetch("BTCUSDT", Timeframe::H1, 10),
                Err(DataError::HttpStatus { status: 502, .. })
            ));
            assert!(breaker.is_allowed());
        }
        assert!(provider.fetch("BTCUSDT", Timeframe::H1, 10).is_err());
        assert!(!breaker.is_allowed());
    }

    #[test]
    fn rate_limit_reports_retry_after() {
        let (url, hits) = stub_endpoint("429 Too Many Requests", "Retry-After: 7\r\n", "{}");
        let provider = local_provider(vec![url], fresh_breaker());
        assert!(matches!(
            provider.fetch("BTCUSDT", Timeframe::M1, 10),
            Err(DataError::RateLimited { retry_after_secs: 7 })
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn region_restriction_moves_on_without_retrying() {
        let (blocked, blocked_hits) = stub_endpoint("451 Unavailable For Legal Reasons", "", "{}");
        let (good, _) = stub_endpoint("200 OK", "", ONE_KLINE);
        let provider = local_provider(vec![blocked, good], fresh_breaker());

        assert!(provider.fetch("BTCUSDT", Timeframe::M1, 10).is_ok());
        assert_eq!(blocked_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ban_status_trips_breaker_and_stops() {
        for status in ["403 Forbidden", "418 I'm a teapot"] {
            let (banned, _) = stub_endpoint(status, "", "{}");
            let (good, good_hits) = stub_endpoint("200 OK", "", ONE_KLINE);
            let breaker = fresh_breaker();
            let provider = local_provider(vec![banned, good], Arc::clone(&breaker));

            assert!(matches!(
                provider.fetch("BTCUSDT", Timeframe::M1, 10),
                Err(DataError::CircuitBreakerTripped)
            ));
            assert!(!breaker.is_allowed());
            assert_eq!(good_hits.load(Ordering::SeqCst), 0);
        }
    }

    #[test]
    fn invalid_symbol_code_is_symbol_not_found() {
        let (url, _) = stub_endpoint("400 Bad Request", "", r#"{"code":-1121,"msg":"Invalid symbol."}"#);
        let (other, other_hits) = stub_endpoint("200 OK", "", ONE_KLINE);
        let provider = local_provider(vec![url, other], fresh_breaker());

        assert!(matches!(
            provider.fetch("NOPEUSDT", Timeframe::M1, 10),
            Err(DataError::SymbolNotFound { symbol }) if symbol == "NOPEUSDT"
        ));
        assert_eq!(other_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn other_bad_request_is_http_status() {
        let (url, _) = stub_endpoint("400 Bad Request", "", r#"{"code":-1100,"msg":"Illegal characters."}"#);
        let provider = local_provider(vec![url], fresh_breaker());
        assert!(matches!(
            provider.fetch("BTCUSDT", Timeframe::M1, 10),
            Err(DataError::HttpStatus { status: 400, .. })
        ));
    }

    #[test]
    fn backoff_saturates_for_large_attempts() {
        let base = Duration::from_millis(500);
        assert_eq!(BinanceProvider::backoff_delay(base, 1), base);
        assert_eq!(BinanceProvider::backoff_delay(base, 3), Duration::from_millis(2_000));
        // 2^32 and beyond no longer fit the multiplier
        let capped = BinanceProvider::backoff_delay(base, 33);
        assert_eq!(BinanceProvider::backoff_delay(base, 40), capped);
        assert_eq!(BinanceProvider::backoff_delay(base, u32::MAX), capped);
        assert_eq!(BinanceProvider::backoff_delay(Duration::MAX, 5), Duration::MAX);
    }
}
