//! Screener engine.
//!
//! Runs one pass over the universe:
//! select universe, fetch candles in paced batches, compute indicators,
//! classify, filter, sort, rank and aggregate.
//!
//! A pass either completes (possibly with zero symbols) or fails as a whole,
//! in which case the result is empty, the statistics are zeroed and `failed`
//! is set. Errors on a single symbol only drop that symbol.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use zero_common::config::ScreenerServiceConfig;
use zero_common::logging::generate_span_id;

use super::config::ScreenerSettings;
use super::filter::apply_filters;
use super::sort::{assign_ranking, sort_symbols};
use crate::data::{Candle, MarketDataProvider, ProviderError, Ticker, Timeframe, UniverseSelector};
use crate::indicators::{calculate_stochastic_slow, detect_crossover, latest_rsi, CrossDirection};
use crate::notification::{Alert, AlertSink};
use crate::signal::{classify, IndicatorSnapshot, Signal};

// ============================================================================
// Errors
// ============================================================================

/// Per-symbol evaluation errors. None of them aborts a pass.
#[derive(Debug, Error)]
pub enum ScreenerError {
    #[error("transport error: {0}")]
    Transport(#[from] ProviderError),

    #[error("{symbol} {timeframe}: {got} candles, need {need}")]
    InsufficientData {
        symbol: String,
        timeframe: Timeframe,
        got: usize,
        need: usize,
    },

    #[error("{symbol}: {reason}")]
    Compute { symbol: String, reason: String },
}

// ============================================================================
// Screened Symbol
// ============================================================================

/// A symbol that survived a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenedSymbol {
    pub symbol: String,
    pub price: f64,
    pub price_change_24h: f64,
    pub price_change_percent_24h: f64,
    /// 24h quote volume
    pub volume_24h: f64,
    /// Hourly average of the 24h quote volume
    pub volume_1h: f64,
    /// Rough estimate: price x 24h base volume x 365
    pub market_cap: f64,
    /// Rough estimate: 10% of 24h quote volume
    pub open_interest_24h: f64,
    /// Native timeframe snapshot
    pub native: IndicatorSnapshot,
    /// Middle timeframe snapshot
    #[serde(rename = "mtf")]
    pub mid: IndicatorSnapshot,
    /// Higher timeframe snapshot
    #[serde(rename = "htf")]
    pub high: IndicatorSnapshot,
    /// Fresh native-timeframe %K/%D crossover
    pub crossover: CrossDirection,
    pub signal: Signal,
    /// 1-based position after sorting
    pub ranking: usize,
}

/// Ticker-derived metrics
struct TickerMetrics {
    volume_24h: f64,
    volume_1h: f64,
    market_cap: f64,
    open_interest_24h: f64,
}

impl From<&Ticker> for TickerMetrics {
    fn from(t: &Ticker) -> Self {
        Self {
            volume_24h: t.quote_volume,
            volume_1h: t.quote_volume / 24.0,
            market_cap: t.last_price * t.volume * 365.0,
            open_interest_24h: t.quote_volume * 0.1,
        }
    }
}

// ============================================================================
// Screener Result
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenerStats {
    /// Symbols evaluated in the pass
    pub total_symbols: usize,
    /// Symbols surviving the filters
    pub filtered_symbols: usize,
    /// Mean native RSI over surviving symbols (0 if none)
    #[serde(rename = "avgRSI")]
    pub avg_rsi: f64,
    /// Surviving symbols with |%K - %D| < 5
    pub crossovers: usize,
    pub cross_ups: usize,
    pub cross_downs: usize,
}

impl ScreenerStats {
    fn from_symbols(total_symbols: usize, symbols: &[ScreenedSymbol]) -> Self {
        let filtered_symbols = symbols.len();
        let avg_rsi = if filtered_symbols > 0 {
            symbols.iter().map(|s| s.native.rsi).sum::<f64>() / filtered_symbols as f64
        } else {
            0.0
        };

        Self {
            total_symbols,
            filtered_symbols,
            avg_rsi,
            crossovers: symbols
                .iter()
                .filter(|s| (s.native.slow_k - s.native.slow_d).abs() < 5.0)
                .count(),
            cross_ups: symbols.iter().filter(|s| s.crossover == CrossDirection::Up).count(),
            cross_downs: symbols.iter().filter(|s| s.crossover == CrossDirection::Down).count(),
        }
    }
}

/// Output of one pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenerResult {
    pub pass_id: String,
    pub timeframe: Timeframe,
    /// Ranked symbols, in sort order
    pub symbols: Vec<ScreenedSymbol>,
    pub stats: ScreenerStats,
    pub settings_summary: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_secs: f64,
    /// Set when the pass failed as a whole
    pub failed: bool,
}

impl ScreenerResult {
    /// Top N symbols
    pub fn top(&self, n: usize) -> &[ScreenedSymbol] {
        &self.symbols[..n.min(self.symbols.len())]
    }

    pub fn with_signal(&self, signal: Signal) -> Vec<&ScreenedSymbol> {
        self.symbols.iter().filter(|s| s.signal == signal).collect()
    }
}

// ============================================================================
// Engine Options
// ============================================================================

/// Pass-independent knobs, taken from the service config.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub quote_asset: String,
    pub universe_size: usize,
    pub candle_limit: usize,
    pub min_candles: usize,
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub restricted_symbols: Vec<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&ScreenerServiceConfig::default())
    }
}

impl From<&ScreenerServiceConfig> for EngineOptions {
    fn from(config: &ScreenerServiceConfig) -> Self {
        Self {
            quote_asset: config.quote_asset.clone(),
            universe_size: config.universe_size,
            candle_limit: config.candle_limit,
            min_candles: config.min_candles,
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            restricted_symbols: config.restricted_symbols.clone(),
        }
    }
}

// ============================================================================
// Screener Engine
// ============================================================================

/// Stateless pass runner. The only state shared across passes lives in the
/// provider's response cache.
pub struct ScreenerEngine<P: MarketDataProvider + ?Sized> {
    provider: Arc<P>,
    options: EngineOptions,
    selector: UniverseSelector,
    alerts: Option<Arc<dyn AlertSink>>,
}

impl<P: MarketDataProvider + ?Sized> ScreenerEngine<P> {
    pub fn new(provider: Arc<P>, options: EngineOptions) -> Self {
        let selector = UniverseSelector::new(&options.quote_asset, options.universe_size)
            .with_allow_list(&options.restricted_symbols);

        Self {
            provider,
            options,
            selector,
            alerts: None,
        }
    }

    /// Offer notable signals to `sink` after each pass.
    pub fn with_alerts(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.alerts = Some(sink);
        self
    }

    /// Run one screening pass.
    pub async fn run_pass(&self, settings: &ScreenerSettings) -> ScreenerResult {
        let started_at = Utc::now();
        let pass_id = generate_span_id();

        info!(
            pass_id = %pass_id,
            timeframe = %settings.timeframe,
            provider = self.provider.name(),
            "Starting screening pass"
        );

        let universe = self.selector.select(self.provider.as_ref(), settings.restrict_universe).await;

        let tickers = match self.provider.get_all_tickers().await {
            Ok(tickers) => tickers,
            Err(e) => {
                error!(pass_id = %pass_id, error = %e, "Ticker fetch failed, pass aborted");
                return self.finish(pass_id, settings, started_at, 0, Vec::new(), true);
            }
        };

        let by_symbol: HashMap<&str, &Ticker> =
            tickers.iter().map(|t| (t.symbol.as_str(), t)).collect();
        let relevant: Vec<&Ticker> = universe
            .iter()
            .filter_map(|s| by_symbol.get(s.as_str()).copied())
            .collect();

        let evaluated = self.evaluate_in_batches(&pass_id, &relevant, settings).await;

        let mut symbols = apply_filters(evaluated, &settings.indicators);
        sort_symbols(&mut symbols, settings.sort_column, settings.sort_direction);
        assign_ranking(&mut symbols);

        let result = self.finish(pass_id, settings, started_at, relevant.len(), symbols, false);
        self.dispatch_alerts(&result, settings);
        result
    }

    /// Evaluate tickers in fixed-size concurrent batches, pausing between
    /// batches. Results keep submission order.
    async fn evaluate_in_batches(
        &self,
        pass_id: &str,
        tickers: &[&Ticker],
        settings: &ScreenerSettings,
    ) -> Vec<ScreenedSymbol> {
        let mut evaluated = Vec::with_capacity(tickers.len());
        let batch_count = tickers.len().div_ceil(self.options.batch_size);

        for (i, batch) in tickers.chunks(self.options.batch_size).enumerate() {
            let results = join_all(batch.iter().map(|t| self.evaluate(t, settings))).await;

            for result in results {
                match result {
                    Ok(symbol) => evaluated.push(symbol),
                    Err(e @ ScreenerError::InsufficientData { .. }) => {
                        debug!(pass_id = %pass_id, reason = %e, "Skipping symbol");
                    }
                    Err(e @ ScreenerError::Transport(_)) => {
                        warn!(pass_id = %pass_id, error = %e, "Symbol fetch failed");
                    }
                    Err(e @ ScreenerError::Compute { .. }) => {
                        error!(pass_id = %pass_id, error = %e, "Indicator computation failed");
                    }
                }
            }

            if i + 1 < batch_count && !self.options.batch_delay.is_zero() {
                tokio::time::sleep(self.options.batch_delay).await;
            }
        }

        evaluated
    }

    async fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Candle>, ScreenerError> {
        let candles = self
            .provider
            .get_candles(symbol, timeframe, self.options.candle_limit)
            .await?;

        if candles.len() < self.options.min_candles {
            return Err(ScreenerError::InsufficientData {
                symbol: symbol.to_string(),
                timeframe,
                got: candles.len(),
                need: self.options.min_candles,
            });
        }
        Ok(candles)
    }

    /// Fetch all three timeframes and build the screened symbol (unranked,
    /// unfiltered).
    async fn evaluate(&self, ticker: &Ticker, settings: &ScreenerSettings) -> Result<ScreenedSymbol, ScreenerError> {
        let symbol = ticker.symbol.as_str();
        let native_tf = settings.timeframe;
        let (mid_tf, high_tf) = native_tf.confirmation_frames();

        let (native_candles, mid_candles, high_candles) = futures::try_join!(
            self.fetch(symbol, native_tf),
            self.fetch(symbol, mid_tf),
            self.fetch(symbol, high_tf),
        )?;

        let (native, crossover) = snapshot(symbol, native_tf, &native_candles, settings)?;
        let (mid, _) = snapshot(symbol, mid_tf, &mid_candles, settings)?;
        let (high, _) = snapshot(symbol, high_tf, &high_candles, settings)?;

        let metrics = TickerMetrics::from(ticker);

        Ok(ScreenedSymbol {
            symbol: symbol.to_string(),
            price: ticker.last_price,
            price_change_24h: ticker.price_change,
            price_change_percent_24h: ticker.price_change_percent,
            volume_24h: metrics.volume_24h,
            volume_1h: metrics.volume_1h,
            market_cap: metrics.market_cap,
            open_interest_24h: metrics.open_interest_24h,
            signal: classify(&native, &mid, &high),
            native,
            mid,
            high,
            crossover,
            ranking: 0,
        })
    }

    fn finish(
        &self,
        pass_id: String,
        settings: &ScreenerSettings,
        started_at: DateTime<Utc>,
        total_symbols: usize,
        symbols: Vec<ScreenedSymbol>,
        failed: bool,
    ) -> ScreenerResult {
        let completed_at = Utc::now();
        let duration_secs = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        let stats = ScreenerStats::from_symbols(total_symbols, &symbols);

        info!(
            pass_id = %pass_id,
            total = stats.total_symbols,
            passed = stats.filtered_symbols,
            avg_rsi = format!("{:.2}", stats.avg_rsi),
            failed,
            duration = format!("{:.1}s", duration_secs),
            "Screening pass complete"
        );

        ScreenerResult {
            pass_id,
            timeframe: settings.timeframe,
            symbols,
            stats,
            settings_summary: settings.summary(),
            started_at,
            completed_at,
            duration_secs,
            failed,
        }
    }

    /// Hand notable signals to the sink on detached tasks.
    fn dispatch_alerts(&self, result: &ScreenerResult, settings: &ScreenerSettings) {
        let Some(sink) = &self.alerts else {
            return;
        };

        for symbol in result.symbols.iter().filter(|s| sink.accepts(s.signal)) {
            let alert = Alert::from_symbol(symbol, result.timeframe, settings.restrict_universe);
            let sink = Arc::clone(sink);
            let pass_id = result.pass_id.clone();

            tokio::spawn(async move {
                if let Err(e) = sink.deliver(&alert).await {
                    warn!(pass_id = %pass_id, symbol = %alert.symbol, error = %e, "Alert delivery failed");
                }
            });
        }
    }
}

/// Latest snapshot plus the crossover state for one timeframe.
fn snapshot(
    symbol: &str,
    timeframe: Timeframe,
    candles: &[Candle],
    settings: &ScreenerSettings,
) -> Result<(IndicatorSnapshot, CrossDirection), ScreenerError> {
    let stoch = &settings.indicators.stochastic;
    let rsi_period = settings.indicators.rsi.period;

    let series = calculate_stochastic_slow(candles, stoch.fast_period, stoch.slow_k, stoch.slow_d);
    let point = series.latest();
    let rsi = latest_rsi(candles, rsi_period);

    let (Some(point), Some(rsi)) = (point, rsi) else {
        let need = (rsi_period + 1).max((stoch.fast_period + stoch.slow_k + stoch.slow_d).saturating_sub(2));
        return Err(ScreenerError::InsufficientData {
            symbol: symbol.to_string(),
            timeframe,
            got: candles.len(),
            need,
        });
    };

    let snapshot = IndicatorSnapshot {
        slow_k: point.slow_k,
        slow_d: point.slow_d,
        rsi,
    };

    if !(snapshot.slow_k.is_finite() && snapshot.slow_d.is_finite() && snapshot.rsi.is_finite()) {
        return Err(ScreenerError::Compute {
            symbol: symbol.to_string(),
            reason: format!("non-finite indicator on {}: {:?}", timeframe, snapshot),
        });
    }

    Ok((snapshot, detect_crossover(&series).direction))
}

// ============================================================================
// Tests
// ============================================================================
