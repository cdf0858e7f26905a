//! Data provider abstraction.
//!
//! Defines the `MarketDataProvider` trait that every market data source
//! implements, so the screening pass can run against Binance or a test double.

use async_trait::async_trait;
use thiserror::Error;

use super::{Candle, Ticker, Timeframe};

// ============================================================================
// Provider Error
// ============================================================================

/// Errors specific to data providers.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Rate limit exceeded (HTTP 418/429)
    #[error("Rate limited{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    /// Payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    retry_after_secs
        .map(|secs| format!(", retry after {} seconds", secs))
        .unwrap_or_default()
}

impl ProviderError {
    /// Check if the error is transient (worth retrying or serving stale data)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            Self::Decode(_) | Self::InvalidRequest(_) => false,
        }
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Source of candles and 24h ticker statistics.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider name for logging (e.g., "binance")
    fn name(&self) -> &'static str;

    /// Fetch the most recent `limit` candles, oldest first.
    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, ProviderError>;

    /// Fetch 24h statistics for every listed symbol.
    async fn get_all_tickers(&self) -> Result<Vec<Ticker>, ProviderError>;
}
