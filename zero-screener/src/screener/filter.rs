//! Indicator filters.
//!
//! Small pure predicates composed by the engine. Every filter reads the
//! native-timeframe snapshot only; a disabled indicator always passes.

use super::config::{CrossFilter, IndicatorSettings, RsiSettings, StochasticSettings};
use super::engine::ScreenedSymbol;
use crate::indicators::check_rsi_threshold;
use crate::signal::IndicatorSnapshot;

pub fn passes_stochastic(snapshot: &IndicatorSnapshot, settings: &StochasticSettings) -> bool {
    if !settings.enabled {
        return true;
    }
    match settings.cross_direction {
        CrossFilter::Up => snapshot.slow_k > snapshot.slow_d,
        CrossFilter::Down => snapshot.slow_k < snapshot.slow_d,
        CrossFilter::Both => true,
    }
}

pub fn passes_rsi(snapshot: &IndicatorSnapshot, settings: &RsiSettings) -> bool {
    !settings.enabled || check_rsi_threshold(snapshot.rsi, settings.threshold, settings.direction)
}

/// Both enabled filters must pass.
pub fn passes_filters(snapshot: &IndicatorSnapshot, settings: &IndicatorSettings) -> bool {
    passes_stochastic(snapshot, &settings.stochastic) && passes_rsi(snapshot, &settings.rsi)
}

/// Keep symbols whose native snapshot passes, preserving order.
pub fn apply_filters(symbols: Vec<ScreenedSymbol>, settings: &IndicatorSettings) -> Vec<ScreenedSymbol> {
    symbols
        .into_iter()
        .filter(|s| passes_filters(&s.native, settings))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::RsiDirection;
    use crate::screener::engine::tests::screened_with;
    use test_case::test_case;

    fn snap(slow_k: f64, slow_d: f64, rsi: f64) -> IndicatorSnapshot {
        IndicatorSnapshot { slow_k, slow_d, rsi }
    }

    fn stoch(cross_direction: CrossFilter) -> StochasticSettings {
        StochasticSettings {
            cross_direction,
            ..Default::default()
        }
    }

    #[test_case(18.0, 22.0, CrossFilter::Up => false ; "k below d rejected for up")]
    #[test_case(22.0, 18.0, CrossFilter::Up => true ; "k above d passes up")]
    #[test_case(20.0, 20.0, CrossFilter::Up => false ; "equal fails up")]
    #[test_case(20.0, 20.0, CrossFilter::Down => false ; "equal fails down")]
    #[test_case(18.0, 22.0, CrossFilter::Down => true ; "k below d passes down")]
    #[test_case(18.0, 22.0, CrossFilter::Both => true ; "both always passes")]
    fn test_stochastic_filter(k: f64, d: f64, cross: CrossFilter) -> bool {
        passes_stochastic(&snap(k, d, 50.0), &stoch(cross))
    }

    #[test]
    fn test_disabled_filters_pass() {
        let mut settings = IndicatorSettings::default();
        settings.stochastic = StochasticSettings {
            enabled: false,
            ..stoch(CrossFilter::Up)
        };
        settings.rsi.enabled = false;
        settings.rsi.direction = RsiDirection::Above;
        settings.rsi.threshold = 99.0;

        assert!(passes_filters(&snap(10.0, 90.0, 1.0), &settings));
    }

    #[test]
    fn test_rsi_filter_strict() {
        let mut settings = RsiSettings::default();
        settings.direction = RsiDirection::Above;
        settings.threshold = 50.0;
        assert!(passes_rsi(&snap(0.0, 0.0, 50.01), &settings));
        assert!(!passes_rsi(&snap(0.0, 0.0, 50.0), &settings));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let mut settings = IndicatorSettings::default();
        settings.stochastic.cross_direction = CrossFilter::Up;
        settings.rsi.direction = RsiDirection::Below;
        settings.rsi.threshold = 60.0;

        let symbols = vec![
            screened_with("A", snap(22.0, 18.0, 40.0)),
            screened_with("B", snap(18.0, 22.0, 40.0)),
            screened_with("C", snap(30.0, 10.0, 70.0)),
            screened_with("D", snap(55.0, 50.0, 59.0)),
        ];

        let once = apply_filters(symbols, &settings);
        let names: Vec<_> = once.iter().map(|s| s.symbol.clone()).collect();
        assert_eq!(names, vec!["A", "D"]);

        let twice = apply_filters(once.clone(), &settings);
        assert_eq!(twice, once);
    }
}
