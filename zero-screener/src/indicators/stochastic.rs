//! Stochastic Slow oscillator (%K and %D).

use serde::{Deserialize, Serialize};

use super::sma;
use crate::data::Candle;

/// Fast %K when the window's high equals its low.
const FLAT_RANGE_K: f64 = 50.0;

/// Slow %K and Slow %D lines.
///
/// `slow_d` is shorter than `slow_k` by `slow_d_period - 1`; both end on the
/// last candle, so the lines are aligned at the tail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StochasticSeries {
    pub slow_k: Vec<f64>,
    pub slow_d: Vec<f64>,
}

impl StochasticSeries {
    pub fn is_empty(&self) -> bool {
        self.slow_k.is_empty() || self.slow_d.is_empty()
    }

    /// Final (%K, %D) pair.
    pub fn latest(&self) -> Option<StochasticPoint> {
        Some(StochasticPoint {
            slow_k: *self.slow_k.last()?,
            slow_d: *self.slow_d.last()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StochasticPoint {
    pub slow_k: f64,
    pub slow_d: f64,
}

/// Fast %K for every full window of `period` candles.
fn fast_k(candles: &[Candle], period: usize) -> Vec<f64> {
    if period == 0 || candles.len() < period {
        return Vec::new();
    }

    candles
        .windows(period)
        .map(|window| {
            let high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
            let low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            let close = window[period - 1].close;

            if high == low {
                FLAT_RANGE_K
            } else {
                (close - low) / (high - low) * 100.0
            }
        })
        .collect()
}

/// Stochastic Slow over `candles`.
///
/// Empty when fewer than `fast + slow_k + slow_d - 2` candles are supplied.
pub fn calculate_stochastic_slow(
    candles: &[Candle],
    fast_period: usize,
    slow_k_period: usize,
    slow_d_period: usize,
) -> StochasticSeries {
    let needed = (fast_period + slow_k_period + slow_d_period).saturating_sub(2);
    if fast_period == 0 || slow_k_period == 0 || slow_d_period == 0 || candles.len() < needed {
        return StochasticSeries::default();
    }

    let slow_k = sma(&fast_k(candles, fast_period), slow_k_period);
    let slow_d = sma(&slow_k, slow_d_period);

    StochasticSeries { slow_k, slow_d }
}

/// Final (%K, %D), or `None` when the series is too short.
pub fn latest_stochastic(
    candles: &[Candle],
    fast_period: usize,
    slow_k_period: usize,
    slow_d_period: usize,
) -> Option<StochasticPoint> {
    calculate_stochastic_slow(candles, fast_period, slow_k_period, slow_d_period).latest()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossDirection {
    Up,
    Down,
    #[default]
    None,
}

/// Crossover state at the end of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crossover {
    pub direction: CrossDirection,
    /// Index into `slow_k` of the crossing point, if any
    pub index: Option<usize>,
    pub current_k: f64,
    pub current_d: f64,
}

/// Classify the last two points: `Up` when %K moved from at-or-below %D to
/// above it, `Down` for the mirror case.
pub fn detect_crossover(series: &StochasticSeries) -> Crossover {
    let (k, d) = (&series.slow_k, &series.slow_d);
    if k.len() < 2 || d.len() < 2 {
        return Crossover {
            direction: CrossDirection::None,
            index: None,
            current_k: 0.0,
            current_d: 0.0,
        };
    }

    let (cur_k, prev_k) = (k[k.len() - 1], k[k.len() - 2]);
    let (cur_d, prev_d) = (d[d.len() - 1], d[d.len() - 2]);

    let direction = if prev_k <= prev_d && cur_k > cur_d {
        CrossDirection::Up
    } else if prev_k >= prev_d && cur_k < cur_d {
        CrossDirection::Down
    } else {
        CrossDirection::None
    };

    Crossover {
        direction,
        index: (direction != CrossDirection::None).then(|| k.len() - 1),
        current_k: cur_k,
        current_d: cur_d,
    }
}
