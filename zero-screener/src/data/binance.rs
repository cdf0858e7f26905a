//! Binance spot REST adapter.
//!
//! # Endpoints
//! - `GET /klines?symbol=&interval=&limit=` candle arrays with numbers
//!   encoded as strings
//! - `GET /ticker/24hr` rolling 24h statistics for every symbol
//!
//! # Caching
//! Every request goes through the shared [`ResponseCache`]. A fresh entry is
//! returned without touching the network. When the live call fails, the last
//! stored payload is served regardless of age; the error only surfaces when
//! nothing was ever cached for that request.
//!
//! [`ResponseCache`]: super::ResponseCache

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::cache::SharedCache;
use super::provider::{MarketDataProvider, ProviderError};
use super::rate_limiter::SharedRateLimiter;
use super::{Candle, Ticker, Timeframe};

const KLINES_ENDPOINT: &str = "/klines";
const TICKER_ENDPOINT: &str = "/ticker/24hr";

/// Binance caps `limit` on the klines endpoint
const MAX_KLINE_LIMIT: usize = 1000;

/// Retry hint after a 429/418
const RATE_LIMIT_RETRY_SECS: u64 = 60;

/// Binance REST adapter with response caching and stale fallback.
pub struct BinanceAdapter {
    base_url: String,
    client: reqwest::Client,
    cache: SharedCache,
    rate_limiter: SharedRateLimiter,
}

impl BinanceAdapter {
    /// Create an adapter against `base_url` (e.g. "https://api.binance.com/api/v3").
    pub fn new(base_url: impl Into<String>, cache: SharedCache, rate_limiter: SharedRateLimiter) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            cache,
            rate_limiter,
        }
    }

    /// Fetch a JSON payload through the cache.
    async fn fetch_cached(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, ProviderError> {
        let key = super::ResponseCache::request_key(endpoint, params);

        if let Some(payload) = self.cache.get(&key) {
            debug!(key = %key, "Cache hit");
            return Ok(payload);
        }

        match self.fetch_live(endpoint, params).await {
            Ok(payload) => {
                self.cache.put(key, payload.clone());
                Ok(payload)
            }
            Err(e) => match self.cache.get_stale(&key) {
                Some(stale) => {
                    warn!(
                        key = %key,
                        error = %e,
                        recoverable = e.is_recoverable(),
                        "Live fetch failed, serving stale data"
                    );
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    async fn fetch_live(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, ProviderError> {
        let url = format!("{}{}", self.base_url, endpoint);

        self.rate_limiter.acquire().await;

        debug!(url = %url, "Fetching from Binance");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Network("Request timeout".into())
                } else if e.is_connect() {
                    ProviderError::Network("Connection failed".into())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .or(Some(RATE_LIMIT_RETRY_SECS));
            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("Failed to parse response: {}", e)))
    }
}

// ============================================================================
// Payload Decoding
// ============================================================================

/// Binance encodes prices and volumes as strings; accept plain numbers too.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn millis(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_i64()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

fn parse_kline(row: &[Value]) -> Option<Candle> {
    if row.len() < 11 {
        return None;
    }

    Some(Candle {
        open_time: millis(&row[0])?,
        open: number(&row[1])?,
        high: number(&row[2])?,
        low: number(&row[3])?,
        close: number(&row[4])?,
        volume: number(&row[5])?,
        close_time: millis(&row[6])?,
        quote_volume: number(&row[7])?,
        trade_count: row[8].as_u64()?,
        taker_buy_base_volume: number(&row[9])?,
        taker_buy_quote_volume: number(&row[10])?,
    })
}

/// Decode a klines payload into candles ordered oldest first.
pub(crate) fn parse_klines(payload: &Value) -> Result<Vec<Candle>, ProviderError> {
    let rows = payload
        .as_array()
        .ok_or_else(|| ProviderError::Decode("klines payload is not an array".into()))?;

    let mut candles = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.as_array()
                .and_then(|r| parse_kline(r))
                .ok_or_else(|| ProviderError::Decode(format!("malformed kline at index {}", i)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    candles.sort_by_key(|c| c.open_time);
    Ok(candles)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    symbol: String,
    last_price: Value,
    price_change: Value,
    price_change_percent: Value,
    volume: Value,
    quote_volume: Value,
}

/// Decode a 24h ticker payload. Entries with unparsable numbers are skipped.
pub(crate) fn parse_tickers(payload: Value) -> Result<Vec<Ticker>, ProviderError> {
    let raw: Vec<RawTicker> = serde_json::from_value(payload)
        .map_err(|e| ProviderError::Decode(format!("Failed to parse tickers: {}", e)))?;

    Ok(raw
        .into_iter()
        .filter_map(|t| {
            Some(Ticker {
                last_price: number(&t.last_price)?,
                price_change: number(&t.price_change)?,
                price_change_percent: number(&t.price_change_percent)?,
                volume: number(&t.volume)?,
                quote_volume: number(&t.quote_volume)?,
                symbol: t.symbol,
            })
        })
        .collect())
}

// ============================================================================
// MarketDataProvider Implementation
// ============================================================================

#[async_trait]
impl MarketDataProvider for BinanceAdapter {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, ProviderError> {
        if symbol.is_empty() {
            return Err(ProviderError::InvalidRequest("empty symbol".into()));
        }

        let params = [
            ("symbol", symbol.to_uppercase()),
            ("interval", timeframe.as_interval().to_string()),
            ("limit", limit.clamp(1, MAX_KLINE_LIMIT).to_string()),
        ];

        let payload = self.fetch_cached(KLINES_ENDPOINT, &params).await?;
        parse_klines(&payload)
    }

    async fn get_all_tickers(&self) -> Result<Vec<Ticker>, ProviderError> {
        let payload = self.fetch_cached(TICKER_ENDPOINT, &[]).await?;
        parse_tickers(payload)
    }
}

// ============================================================================
// Tests
// ============================================================================
