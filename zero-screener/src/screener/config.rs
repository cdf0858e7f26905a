//! Screener settings.
//!
//! One immutable `ScreenerSettings` value drives a pass. It is read from the
//! `screener.settings` object of the service config and can be replaced at
//! runtime through the settings endpoint; a pass always works on a snapshot.

use serde::{Deserialize, Serialize};
use zero_common::config::ScreenerServiceConfig;
use zero_common::validation::{collect_errors, Validate, ValidationError, ValidationResult};

use super::sort::{SortColumn, SortDirection};
use crate::data::Timeframe;
use crate::indicators::RsiDirection;

// ============================================================================
// Screener Settings
// ============================================================================

/// Settings for one screening pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenerSettings {
    /// Native timeframe; mid and high frames follow from it
    #[serde(default = "default_timeframe")]
    pub timeframe: Timeframe,

    #[serde(default)]
    pub indicators: IndicatorSettings,

    #[serde(default)]
    pub sort_column: SortColumn,

    #[serde(default)]
    pub sort_direction: SortDirection,

    /// Milliseconds between scheduled passes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    /// Limit the universe to the configured allow list
    #[serde(default)]
    pub restrict_universe: bool,
}

impl Default for ScreenerSettings {
    fn default() -> Self {
        Self {
            timeframe: default_timeframe(),
            indicators: IndicatorSettings::default(),
            sort_column: SortColumn::default(),
            sort_direction: SortDirection::default(),
            refresh_interval: default_refresh_interval(),
            restrict_universe: false,
        }
    }
}

fn default_timeframe() -> Timeframe {
    Timeframe::H1
}

fn default_refresh_interval() -> u64 {
    60_000
}

impl ScreenerSettings {
    /// Decode from the service config, falling back to defaults when no
    /// settings object is present.
    pub fn from_config(config: &ScreenerServiceConfig) -> ValidationResult<Self> {
        let settings = match &config.settings {
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                ValidationError::InvalidValue {
                    field: "screener.settings".to_string(),
                    reason: e.to_string(),
                }
            })?,
            None => Self::default(),
        };

        settings.validate()?;
        settings.check_allow_list(&config.restricted_symbols)?;
        Ok(settings)
    }

    /// A restricted universe needs a non-empty allow list, otherwise every
    /// pass would evaluate nothing.
    pub fn check_allow_list(&self, allow_list: &[String]) -> ValidationResult<()> {
        if self.restrict_universe && allow_list.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "restrictUniverse".to_string(),
                reason: "screener.restricted_symbols is empty".to_string(),
            });
        }
        Ok(())
    }

    /// Short human-readable description for logs and alerts.
    pub fn summary(&self) -> String {
        let stoch = &self.indicators.stochastic;
        let rsi = &self.indicators.rsi;
        format!(
            "{} Stoch({},{},{}) {} RSI({}) {} {}",
            self.timeframe,
            stoch.fast_period,
            stoch.slow_k,
            stoch.slow_d,
            if stoch.enabled { stoch.cross_direction.as_str() } else { "off" },
            rsi.period,
            if rsi.enabled { rsi_direction_str(rsi.direction) } else { "off" },
            rsi.threshold,
        )
    }
}

fn rsi_direction_str(direction: RsiDirection) -> &'static str {
    match direction {
        RsiDirection::Above => "above",
        RsiDirection::Below => "below",
        RsiDirection::Both => "both",
    }
}

// ============================================================================
// Indicator Settings
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSettings {
    #[serde(default)]
    pub stochastic: StochasticSettings,

    #[serde(default)]
    pub rsi: RsiSettings,
}

/// Which side of %D the %K line must sit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossFilter {
    Up,
    Down,
    #[default]
    Both,
}

impl CrossFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Both => "both",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StochasticSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_fast_period")]
    pub fast_period: usize,

    /// Slow %K smoothing period
    #[serde(default = "default_smoothing")]
    pub slow_k: usize,

    /// Slow %D smoothing period
    #[serde(default = "default_smoothing")]
    pub slow_d: usize,

    #[serde(default)]
    pub cross_direction: CrossFilter,
}

impl Default for StochasticSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            fast_period: default_fast_period(),
            slow_k: default_smoothing(),
            slow_d: default_smoothing(),
            cross_direction: CrossFilter::Both,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsiSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_rsi_period")]
    pub period: usize,

    #[serde(default = "default_rsi_threshold")]
    pub threshold: f64,

    #[serde(default)]
    pub direction: RsiDirection,
}

impl Default for RsiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            period: default_rsi_period(),
            threshold: default_rsi_threshold(),
            direction: RsiDirection::Both,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_fast_period() -> usize {
    10
}

fn default_smoothing() -> usize {
    5
}

fn default_rsi_period() -> usize {
    14
}

fn default_rsi_threshold() -> f64 {
    50.0
}

// ============================================================================
// Validation
// ============================================================================

impl Validate for ScreenerSettings {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();
        let mut positive = |field: &str, value: usize| {
            if value == 0 {
                errors.push(ValidationError::InvalidValue {
                    field: field.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        };

        let stoch = &self.indicators.stochastic;
        positive("indicators.stochastic.fastPeriod", stoch.fast_period);
        positive("indicators.stochastic.slowK", stoch.slow_k);
        positive("indicators.stochastic.slowD", stoch.slow_d);
        positive("indicators.rsi.period", self.indicators.rsi.period);

        let threshold = self.indicators.rsi.threshold;
        if !(0.0..=100.0).contains(&threshold) {
            errors.push(ValidationError::InvalidValue {
                field: "indicators.rsi.threshold".to_string(),
                reason: format!("{} is outside [0, 100]", threshold),
            });
        }

        if self.refresh_interval < 1_000 {
            errors.push(ValidationError::InvalidValue {
                field: "refreshInterval".to_string(),
                reason: "must be at least 1000 ms".to_string(),
            });
        }

        collect_errors(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let settings = ScreenerSettings::default();
        assert_eq!(settings.timeframe, Timeframe::H1);
        assert_eq!(settings.indicators.stochastic.fast_period, 10);
        assert_eq!(settings.indicators.rsi.period, 14);
        assert_eq!(settings.sort_column, SortColumn::Volume24h);
        assert_eq!(settings.sort_direction, SortDirection::Desc);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_decode_camel_case() {
        let settings: ScreenerSettings = serde_json::from_value(json!({
            "timeframe": "15m",
            "indicators": {
                "stochastic": {"enabled": true, "fastPeriod": 14, "slowK": 3, "slowD": 3, "crossDirection": "up"},
                "rsi": {"enabled": false, "period": 7, "threshold": 40, "direction": "below"}
            },
            "sortColumn": "rsi",
            "sortDirection": "asc",
            "refreshInterval": 30000,
            "restrictUniverse": true
        }))
        .unwrap();

        assert_eq!(settings.timeframe, Timeframe::M15);
        assert_eq!(settings.indicators.stochastic.cross_direction, CrossFilter::Up);
        assert_eq!(settings.indicators.rsi.direction, RsiDirection::Below);
        assert_eq!(settings.sort_column, SortColumn::Rsi);
        assert!(settings.restrict_universe);
    }

    #[test]
    fn test_from_config_without_settings() {
        let config = ScreenerServiceConfig::default();
        assert_eq!(ScreenerSettings::from_config(&config).unwrap(), ScreenerSettings::default());
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = ScreenerServiceConfig::default();
        config.settings = Some(json!({"indicators": {"rsi": {"threshold": 150}}}));
        assert!(ScreenerSettings::from_config(&config).is_err());

        config.settings = Some(json!({"timeframe": "7m"}));
        assert!(ScreenerSettings::from_config(&config).is_err());
    }

    #[test]
    fn test_restricted_universe_needs_allow_list() {
        let mut config = ScreenerServiceConfig::default();
        config.settings = Some(json!({"restrictUniverse": true}));
        assert!(ScreenerSettings::from_config(&config).is_err());

        config.restricted_symbols = vec!["BTCUSDT".to_string()];
        let settings = ScreenerSettings::from_config(&config).unwrap();
        assert!(settings.restrict_universe);
        assert!(ScreenerSettings::default().check_allow_list(&[]).is_ok());
    }

    #[test]
    fn test_zero_periods_collected() {
        let mut settings = ScreenerSettings::default();
        settings.indicators.stochastic.slow_k = 0;
        settings.indicators.rsi.period = 0;
        assert!(matches!(settings.validate(), Err(ValidationError::Multiple(_))));
    }

    #[test]
    fn test_summary() {
        assert_eq!(ScreenerSettings::default().summary(), "1h Stoch(10,5,5) both RSI(14) both 50");
    }
}
