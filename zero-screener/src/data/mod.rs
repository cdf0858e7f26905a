//! Market data module for spot crypto pairs.
//!
//! Provides data fetching, response caching and universe selection.
//!
//! # Data Sources
//! - **Binance** REST API (`/klines`, `/ticker/24hr`), fronted by a TTL cache
//!   that falls back to the last-known-good payload when a live call fails.

mod binance;
mod cache;
mod provider;
mod rate_limiter;
mod universe;

pub use binance::BinanceAdapter;
pub use cache::{CacheStats, ResponseCache, SharedCache};
pub use provider::{MarketDataProvider, ProviderError};
pub use rate_limiter::{shared_limiter, RateLimiter, SharedRateLimiter};
pub use universe::{UniverseSelector, FALLBACK_SYMBOLS};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Core Data Types
// ============================================================================

/// Timeframe for candle data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "2h")]
    H2,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "12h")]
    H12,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
    #[serde(rename = "1M")]
    Mo1,
}

impl Timeframe {
    /// Interval parameter understood by the Binance REST API.
    pub fn as_interval(&self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H2 => "2h",
            Self::H4 => "4h",
            Self::H12 => "12h",
            Self::D1 => "1d",
            Self::W1 => "1w",
            Self::Mo1 => "1M",
        }
    }

    /// Middle and higher timeframes used to confirm a signal on `self`.
    pub fn confirmation_frames(&self) -> (Timeframe, Timeframe) {
        match self {
            Self::M1 => (Self::M5, Self::M15),
            Self::M5 => (Self::M15, Self::H1),
            Self::M15 => (Self::H1, Self::H4),
            Self::M30 => (Self::H2, Self::H12),
            Self::H1 => (Self::H4, Self::D1),
            Self::H2 => (Self::H12, Self::D1),
            Self::H4 => (Self::D1, Self::W1),
            Self::H12 => (Self::D1, Self::W1),
            Self::D1 => (Self::W1, Self::Mo1),
            Self::W1 | Self::Mo1 => (Self::Mo1, Self::Mo1),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_interval())
    }
}

/// A single candlestick (OHLCV)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    /// Bucket open time
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Base asset volume
    pub volume: f64,
    /// Bucket close time
    pub close_time: DateTime<Utc>,
    /// Quote asset volume
    pub quote_volume: f64,
    pub trade_count: u64,
    pub taker_buy_base_volume: f64,
    pub taker_buy_quote_volume: f64,
}

/// 24h rolling statistics for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub symbol: String,
    pub last_price: f64,
    pub price_change: f64,
    pub price_change_percent: f64,
    /// Base asset volume
    pub volume: f64,
    /// Quote asset volume
    pub quote_volume: f64,
}
