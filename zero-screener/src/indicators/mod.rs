//! Technical indicators.
//!
//! Pure functions over candle series. Every "latest value" accessor returns
//! `None` when the series is too short, so an unavailable reading can never
//! be mistaken for an extreme one.

pub mod rsi;
pub mod stochastic;

pub use rsi::{
    calculate_rsi, check_rsi_threshold, classify_rsi, latest_rsi, rsi_divergence, RsiDirection,
    RsiDivergence, RsiZone,
};
pub use stochastic::{
    calculate_stochastic_slow, detect_crossover, latest_stochastic, CrossDirection, Crossover,
    StochasticPoint, StochasticSeries,
};

/// Simple moving average over every full window of `data`.
///
/// Returns an empty vector when `period` is zero or exceeds the input length.
pub(crate) fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(data.len() - period + 1);
    let mut sum: f64 = data[..period].iter().sum();
    out.push(sum / period as f64);

    for i in period..data.len() {
        sum += data[i] - data[i - period];
        out.push(sum / period as f64);
    }
    out
}
