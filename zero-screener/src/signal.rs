//! Multi-timeframe signal classification.
//!
//! A symbol's native snapshot is confirmed against the RSI of two coarser
//! timeframes. Rules are checked in order, most extreme first; the first
//! match wins.

use serde::{Deserialize, Serialize};

/// Stochastic and RSI readings for one timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSnapshot {
    pub slow_k: f64,
    pub slow_d: f64,
    pub rsi: f64,
}

impl IndicatorSnapshot {
    fn oversold(&self) -> bool {
        self.slow_k < 20.0 && self.slow_d < 20.0
    }

    fn overbought(&self) -> bool {
        self.slow_k > 80.0 && self.slow_d > 80.0
    }
}

/// Discrete trading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    UltraBuy,
    UltraSell,
    StrongBuy,
    StrongSell,
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// Wire name, e.g. "ULTRA_BUY".
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UltraBuy => "ULTRA_BUY",
            Self::UltraSell => "ULTRA_SELL",
            Self::StrongBuy => "STRONG_BUY",
            Self::StrongSell => "STRONG_SELL",
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }

    /// Parse a wire name; case-insensitive, spaces accepted for underscores.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().replace(' ', "_").as_str() {
            "ULTRA_BUY" => Some(Self::UltraBuy),
            "ULTRA_SELL" => Some(Self::UltraSell),
            "STRONG_BUY" => Some(Self::StrongBuy),
            "STRONG_SELL" => Some(Self::StrongSell),
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            "HOLD" => Some(Self::Hold),
            _ => None,
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, Self::UltraBuy | Self::StrongBuy | Self::Buy)
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, Self::UltraSell | Self::StrongSell | Self::Sell)
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a symbol from its native, mid and high timeframe snapshots.
///
/// Only the RSI of `mid` and `high` is consulted.
pub fn classify(native: &IndicatorSnapshot, mid: &IndicatorSnapshot, high: &IndicatorSnapshot) -> Signal {
    let mid_bull = mid.rsi > 50.0;
    let mid_bear = mid.rsi < 50.0;

    if high.rsi > 50.0 && mid_bull && native.oversold() && native.rsi < 30.0 {
        return Signal::UltraBuy;
    }
    if high.rsi < 50.0 && mid_bear && native.overbought() && native.rsi > 70.0 {
        return Signal::UltraSell;
    }
    if mid_bull && native.oversold() && native.rsi < 30.0 {
        return Signal::StrongBuy;
    }
    if mid_bear && native.overbought() && native.rsi > 70.0 {
        return Signal::StrongSell;
    }
    if mid_bull && native.oversold() {
        return Signal::Buy;
    }
    if mid_bear && native.overbought() {
        return Signal::Sell;
    }
    Signal::Hold
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn snap(slow_k: f64, slow_d: f64, rsi: f64) -> IndicatorSnapshot {
        IndicatorSnapshot { slow_k, slow_d, rsi }
    }

    fn rsi_only(rsi: f64) -> IndicatorSnapshot {
        snap(50.0, 50.0, rsi)
    }

    #[test_case(snap(15.0, 10.0, 25.0), 55.0, 60.0 => Signal::UltraBuy ; "ultra buy beats strong buy")]
    #[test_case(snap(85.0, 90.0, 75.0), 45.0, 40.0 => Signal::UltraSell ; "ultra sell")]
    #[test_case(snap(15.0, 10.0, 25.0), 55.0, 45.0 => Signal::StrongBuy ; "strong buy without htf")]
    #[test_case(snap(85.0, 90.0, 75.0), 45.0, 55.0 => Signal::StrongSell ; "strong sell without htf")]
    #[test_case(snap(15.0, 10.0, 40.0), 55.0, 60.0 => Signal::Buy ; "buy needs no rsi extreme")]
    #[test_case(snap(85.0, 90.0, 60.0), 45.0, 40.0 => Signal::Sell ; "sell")]
    #[test_case(snap(15.0, 10.0, 25.0), 50.0, 60.0 => Signal::Hold ; "mid rsi at fifty is neutral")]
    #[test_case(snap(15.0, 25.0, 25.0), 55.0, 60.0 => Signal::Hold ; "d not oversold")]
    #[test_case(snap(50.0, 50.0, 50.0), 55.0, 60.0 => Signal::Hold ; "nothing")]
    fn test_classify(native: IndicatorSnapshot, mid_rsi: f64, high_rsi: f64) -> Signal {
        classify(&native, &rsi_only(mid_rsi), &rsi_only(high_rsi))
    }

    #[test]
    fn test_mid_stochastic_is_ignored() {
        let native = snap(15.0, 10.0, 25.0);
        let a = classify(&native, &snap(0.0, 0.0, 55.0), &rsi_only(60.0));
        let b = classify(&native, &snap(100.0, 100.0, 55.0), &rsi_only(60.0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_wire_names_round_trip() {
        for signal in [
            Signal::UltraBuy,
            Signal::UltraSell,
            Signal::StrongBuy,
            Signal::StrongSell,
            Signal::Buy,
            Signal::Sell,
            Signal::Hold,
        ] {
            let json = serde_json::to_string(&signal).unwrap();
            assert_eq!(json, format!("\"{}\"", signal.as_str()));
            assert_eq!(Signal::parse(signal.as_str()), Some(signal));
        }
        assert_eq!(Signal::parse("strong buy"), Some(Signal::StrongBuy));
        assert_eq!(Signal::parse("moon"), None);
    }
}
