//! Multi-timeframe Stochastic/RSI screener.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────────┐
//! │   Universe   │──▶│ Batched fetch │──▶│  Indicators  │
//! │   Selector   │   │ (cache-backed)│   │  RSI, Stoch  │
//! └──────────────┘   └───────────────┘   └──────┬───────┘
//!                                               │
//!        ┌──────────────────────────────────────┘
//!        ▼
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   Classify   │──▶│    Filter    │──▶│ Sort + Rank  │──▶ ScreenerResult
//! │ (native/MTF/ │   │  (native TF) │   │   + Stats    │
//! │     HTF)     │   └──────────────┘   └──────────────┘
//! └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use zero_screener::screener::{EngineOptions, ScreenerEngine, ScreenerSettings};
//!
//! let engine = ScreenerEngine::new(provider, EngineOptions::default());
//! let result = engine.run_pass(&ScreenerSettings::default()).await;
//! println!("{} of {} symbols passed", result.stats.filtered_symbols, result.stats.total_symbols);
//! ```

mod config;
mod engine;
mod filter;
mod sort;

pub use config::{CrossFilter, IndicatorSettings, RsiSettings, ScreenerSettings, StochasticSettings};
pub use engine::{
    EngineOptions, ScreenedSymbol, ScreenerEngine, ScreenerError, ScreenerResult, ScreenerStats,
};
pub use filter::{apply_filters, passes_filters, passes_rsi, passes_stochastic};
pub use sort::{assign_ranking, sort_symbols, SortColumn, SortDirection};
