//! Relative Strength Index with Wilder smoothing.

use serde::{Deserialize, Serialize};

use crate::data::Candle;

/// Floor applied to the average loss so RS stays finite on monotonic rises.
const MIN_AVG_LOSS: f64 = 1e-4;

/// RSI series aligned to candles `period ..= len-1`.
///
/// Empty if fewer than `period + 1` candles are supplied or `period` is zero.
pub fn calculate_rsi(candles: &[Candle], period: usize) -> Vec<f64> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    rsi_from_closes(&closes, period)
}

pub(crate) fn rsi_from_closes(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period + 1 {
        return Vec::new();
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let p = period as f64;
    let mut avg_gain = gains[..period].iter().sum::<f64>() / p;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / p;

    let mut out = Vec::with_capacity(gains.len() - period + 1);
    out.push(rsi_value(avg_gain, avg_loss));

    for i in period..gains.len() {
        avg_gain = (avg_gain * (p - 1.0) + gains[i]) / p;
        avg_loss = (avg_loss * (p - 1.0) + losses[i]) / p;
        out.push(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    let avg_loss = if avg_loss > 0.0 { avg_loss } else { MIN_AVG_LOSS };
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Most recent RSI, or `None` if the series is too short.
pub fn latest_rsi(candles: &[Candle], period: usize) -> Option<f64> {
    calculate_rsi(candles, period).last().copied()
}

/// Threshold direction for the RSI filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiDirection {
    Above,
    Below,
    #[default]
    Both,
}

/// `Above` passes strictly above the threshold, `Below` strictly below,
/// `Both` always.
pub fn check_rsi_threshold(rsi: f64, threshold: f64, direction: RsiDirection) -> bool {
    match direction {
        RsiDirection::Above => rsi > threshold,
        RsiDirection::Below => rsi < threshold,
        RsiDirection::Both => true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiZone {
    Oversold,
    Overbought,
    Neutral,
}

/// Oversold below 30, overbought above 70.
pub fn classify_rsi(rsi: f64) -> RsiZone {
    if rsi < 30.0 {
        RsiZone::Oversold
    } else if rsi > 70.0 {
        RsiZone::Overbought
    } else {
        RsiZone::Neutral
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RsiDivergence {
    pub bullish: bool,
    pub bearish: bool,
}

/// Basic divergence over the last `lookback` points.
///
/// Bullish when the price low sits in the older half of the window while the
/// RSI low sits in the newer half; bearish is the same test on the highs.
pub fn rsi_divergence(prices: &[f64], rsi: &[f64], lookback: usize) -> RsiDivergence {
    if lookback == 0 || prices.len() < lookback || rsi.len() < lookback {
        return RsiDivergence::default();
    }

    let prices = &prices[prices.len() - lookback..];
    let rsi = &rsi[rsi.len() - lookback..];
    let half = lookback as f64 / 2.0;

    let older = |i: usize| (i as f64) < half;
    let newer = |i: usize| (i as f64) > half;

    RsiDivergence {
        bullish: older(argmin(prices)) && newer(argmin(rsi)),
        bearish: older(argmax(prices)) && newer(argmax(rsi)),
    }
}

/// Index of the first minimum.
fn argmin(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |(bi, bv), (i, &v)| if v < bv { (i, v) } else { (bi, bv) })
        .0
}

/// Index of the first maximum.
fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_too_short_series_is_empty() {
        assert!(rsi_from_closes(&[1.0; 14], 14).is_empty());
        assert!(rsi_from_closes(&[1.0, 2.0], 0).is_empty());
        assert_eq!(rsi_from_closes(&[1.0; 15], 14).len(), 1);
        assert_eq!(rsi_from_closes(&[1.0; 20], 14).len(), 6);
    }

    #[test]
    fn test_wilder_reference_value() {
        let closes = [
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            45.61, 46.28, 46.28,
        ];
        let rsi = rsi_from_closes(&closes, 14);
        assert_eq!(rsi.len(), 1);
        assert!((rsi[0] - 70.5).abs() < 0.5, "rsi = {}", rsi[0]);
    }

    #[test]
    fn test_seed_average_is_simple_mean() {
        let closes = [
            44.0, 44.25, 44.5, 43.75, 44.65, 45.12, 45.1, 45.42, 45.84, 46.08, 45.89, 46.03,
            45.61, 46.28, 46.28,
        ];
        // gains 3.66 / 14, losses 1.38 / 14
        let expected = 100.0 - 100.0 / (1.0 + 3.66 / 1.38);
        let rsi = rsi_from_closes(&closes, 14);
        assert!((rsi[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_monotonic_rise_stays_finite() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let rsi = rsi_from_closes(&closes, 14);
        assert!(rsi.iter().all(|v| v.is_finite() && *v <= 100.0 && *v > 99.0));
    }

    #[test]
    fn test_flat_series_is_zero() {
        let rsi = rsi_from_closes(&[10.0; 20], 14);
        assert!(rsi.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_bounded_on_oscillating_input() {
        let closes: Vec<f64> = (0..200)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 15.0 + (i % 7) as f64)
            .collect();
        for period in [2, 5, 14, 30] {
            for v in rsi_from_closes(&closes, period) {
                assert!((0.0..=100.0).contains(&v));
            }
        }
    }

    #[test_case(55.0, 50.0, RsiDirection::Above => true)]
    #[test_case(50.0, 50.0, RsiDirection::Above => false)]
    #[test_case(45.0, 50.0, RsiDirection::Below => true)]
    #[test_case(50.0, 50.0, RsiDirection::Below => false)]
    #[test_case(99.0, 50.0, RsiDirection::Both => true)]
    fn test_threshold(rsi: f64, threshold: f64, direction: RsiDirection) -> bool {
        check_rsi_threshold(rsi, threshold, direction)
    }

    #[test]
    fn test_classify_rsi() {
        assert_eq!(classify_rsi(29.9), RsiZone::Oversold);
        assert_eq!(classify_rsi(30.0), RsiZone::Neutral);
        assert_eq!(classify_rsi(70.0), RsiZone::Neutral);
        assert_eq!(classify_rsi(70.1), RsiZone::Overbought);
    }

    #[test]
    fn test_bullish_divergence() {
        // Price bottoms early, RSI bottoms late.
        let prices = [10.0, 8.0, 9.0, 9.5, 9.8, 9.6, 9.7, 9.9, 10.1, 10.2];
        let rsi = [40.0, 38.0, 39.0, 41.0, 42.0, 40.0, 37.0, 35.0, 30.0, 33.0];
        let div = rsi_divergence(&prices, &rsi, 10);
        assert!(div.bullish);
        assert!(!div.bearish);
    }

    #[test]
    fn test_divergence_needs_full_window() {
        assert_eq!(rsi_divergence(&[1.0; 5], &[50.0; 5], 10), RsiDivergence::default());
    }
}
