//! Sorting and ranking of screened symbols.
//!
//! Sort keys are a closed set of columns; each knows whether it compares as
//! text or as a number. Sorting is stable, so symbols with equal keys keep
//! their processing order (universe order).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::engine::ScreenedSymbol;

/// Column a pass is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortColumn {
    Symbol,
    Price,
    PriceChange24h,
    PriceChangePercent24h,
    #[default]
    Volume24h,
    Volume1h,
    MarketCap,
    OpenInterest24h,
    SlowK,
    SlowD,
    Rsi,
    #[serde(rename = "rsiMTF")]
    RsiMtf,
    #[serde(rename = "rsiHTF")]
    RsiHtf,
    Signal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

enum SortKey<'a> {
    Text(&'a str),
    Number(f64),
}

impl SortColumn {
    fn key<'a>(&self, s: &'a ScreenedSymbol) -> SortKey<'a> {
        match self {
            Self::Symbol => SortKey::Text(&s.symbol),
            Self::Signal => SortKey::Text(s.signal.as_str()),
            Self::Price => SortKey::Number(s.price),
            Self::PriceChange24h => SortKey::Number(s.price_change_24h),
            Self::PriceChangePercent24h => SortKey::Number(s.price_change_percent_24h),
            Self::Volume24h => SortKey::Number(s.volume_24h),
            Self::Volume1h => SortKey::Number(s.volume_1h),
            Self::MarketCap => SortKey::Number(s.market_cap),
            Self::OpenInterest24h => SortKey::Number(s.open_interest_24h),
            Self::SlowK => SortKey::Number(s.native.slow_k),
            Self::SlowD => SortKey::Number(s.native.slow_d),
            Self::Rsi => SortKey::Number(s.native.rsi),
            Self::RsiMtf => SortKey::Number(s.mid.rsi),
            Self::RsiHtf => SortKey::Number(s.high.rsi),
        }
    }

    /// Ascending comparison of two symbols on this column.
    pub fn compare(&self, a: &ScreenedSymbol, b: &ScreenedSymbol) -> Ordering {
        match (self.key(a), self.key(b)) {
            (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
            (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        }
    }
}

/// Stable sort in place.
pub fn sort_symbols(symbols: &mut [ScreenedSymbol], column: SortColumn, direction: SortDirection) {
    symbols.sort_by(|a, b| {
        let ord = column.compare(a, b);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

/// Assign 1-based contiguous rankings in current order.
pub fn assign_ranking(symbols: &mut [ScreenedSymbol]) {
    for (i, symbol) in symbols.iter_mut().enumerate() {
        symbol.ranking = i + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screener::engine::tests::screened;

    fn order(symbols: &[ScreenedSymbol]) -> Vec<&str> {
        symbols.iter().map(|s| s.symbol.as_str()).collect()
    }

    #[test]
    fn test_numeric_desc() {
        let mut symbols = vec![screened("A", 1.0), screened("B", 3.0), screened("C", 2.0)];
        sort_symbols(&mut symbols, SortColumn::Volume24h, SortDirection::Desc);
        assert_eq!(order(&symbols), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_text_asc() {
        let mut symbols = vec![screened("SOLUSDT", 1.0), screened("BTCUSDT", 1.0), screened("ETHUSDT", 1.0)];
        sort_symbols(&mut symbols, SortColumn::Symbol, SortDirection::Asc);
        assert_eq!(order(&symbols), vec!["BTCUSDT", "ETHUSDT", "SOLUSDT"]);
    }

    #[test]
    fn test_ties_keep_processing_order_both_directions() {
        let mut symbols = vec![screened("X", 5.0), screened("Y", 5.0), screened("Z", 7.0)];
        sort_symbols(&mut symbols, SortColumn::Volume24h, SortDirection::Desc);
        assert_eq!(order(&symbols), vec!["Z", "X", "Y"]);

        sort_symbols(&mut symbols, SortColumn::Volume24h, SortDirection::Asc);
        assert_eq!(order(&symbols), vec!["X", "Y", "Z"]);
    }

    #[test]
    fn test_ranking_is_contiguous() {
        let mut symbols = vec![screened("A", 1.0), screened("B", 2.0), screened("C", 3.0)];
        assign_ranking(&mut symbols);
        let ranks: Vec<usize> = symbols.iter().map(|s| s.ranking).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_column_wire_names() {
        let col: SortColumn = serde_json::from_str("\"rsiHTF\"").unwrap();
        assert_eq!(col, SortColumn::RsiHtf);
        let col: SortColumn = serde_json::from_str("\"priceChangePercent24h\"").unwrap();
        assert_eq!(col, SortColumn::PriceChangePercent24h);
        assert_eq!(serde_json::to_string(&SortColumn::MarketCap).unwrap(), "\"marketCap\"");
    }
}
