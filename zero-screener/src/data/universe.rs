//! Universe selection.
//!
//! Picks the symbols evaluated in a pass: the top-N pairs quoted in the
//! reference asset, ranked by 24h quote volume. Falls back to a fixed list of
//! well-known pairs when ticker data is unavailable.

use std::cmp::Ordering;
use tracing::{debug, warn};

use super::provider::MarketDataProvider;
use super::Ticker;

/// Pairs evaluated when the ticker ranking cannot be fetched.
pub const FALLBACK_SYMBOLS: [&str; 15] = [
    "BTCUSDT", "ETHUSDT", "BNBUSDT", "ADAUSDT", "XRPUSDT",
    "SOLUSDT", "DOTUSDT", "DOGEUSDT", "AVAXUSDT", "LINKUSDT",
    "LTCUSDT", "UNIUSDT", "MATICUSDT", "ALGOUSDT", "ATOMUSDT",
];

/// Top-N-by-volume universe selector.
#[derive(Debug, Clone)]
pub struct UniverseSelector {
    quote_asset: String,
    size: usize,
    allow_list: Vec<String>,
}

impl UniverseSelector {
    pub fn new(quote_asset: impl Into<String>, size: usize) -> Self {
        Self {
            quote_asset: quote_asset.into().to_uppercase(),
            size,
            allow_list: Vec::new(),
        }
    }

    /// Symbols kept when the universe is restricted.
    pub fn with_allow_list(mut self, symbols: &[String]) -> Self {
        self.allow_list = symbols.iter().map(|s| s.to_uppercase()).collect();
        self
    }

    /// Rank tickers by quote volume, highest first, and keep the top `size`
    /// pairs quoted in the reference asset.
    pub fn rank_by_volume(&self, tickers: &[Ticker]) -> Vec<String> {
        let mut pairs: Vec<&Ticker> = tickers
            .iter()
            .filter(|t| t.symbol.ends_with(&self.quote_asset))
            .collect();

        pairs.sort_by(|a, b| {
            b.quote_volume
                .partial_cmp(&a.quote_volume)
                .unwrap_or(Ordering::Equal)
        });

        pairs
            .into_iter()
            .take(self.size)
            .map(|t| t.symbol.clone())
            .collect()
    }

    /// Select the universe for a pass.
    ///
    /// With `restricted` set, the selection is intersected with the allow
    /// list, keeping volume order.
    pub async fn select<P>(&self, provider: &P, restricted: bool) -> Vec<String>
    where
        P: MarketDataProvider + ?Sized,
    {
        let symbols = match provider.get_all_tickers().await {
            Ok(tickers) => self.rank_by_volume(&tickers),
            Err(e) => {
                warn!(
                    provider = provider.name(),
                    error = %e,
                    "Failed to rank universe, using fallback symbols"
                );
                FALLBACK_SYMBOLS.iter().map(|s| s.to_string()).collect()
            }
        };

        let symbols = if restricted {
            self.restrict(symbols)
        } else {
            symbols
        };

        debug!(count = symbols.len(), restricted, "Universe selected");
        symbols
    }

    fn restrict(&self, symbols: Vec<String>) -> Vec<String> {
        symbols
            .into_iter()
            .filter(|s| self.allow_list.contains(s))
            .collect()
    }
}
