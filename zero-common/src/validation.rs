//! Configuration validation.
//!
//! Ensures required values are present and within valid ranges before the
//! service starts.

use thiserror::Error;

use crate::config::{Config, NotificationConfig, ObservabilityConfig, ScreenerServiceConfig};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port {port}: must be between 1 and 65535")]
    InvalidPort { port: u16, field: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

/// Collapse a list of errors into a single result.
pub fn collect_errors(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    if errors.is_empty() {
        Ok(())
    } else if errors.len() == 1 {
        Err(errors.remove(0))
    } else {
        Err(ValidationError::Multiple(errors))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }

        if let Err(e) = self.screener.validate() {
            errors.push(e);
        }

        collect_errors(errors)
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(invalid("observability.log_level", format!("unknown level '{}'", other))),
        }

        match self.log_format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(invalid("observability.log_format", format!("unknown format '{}'", other))),
        }
    }
}

impl Validate for ScreenerServiceConfig {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push(ValidationError::InvalidPort {
                port: self.port,
                field: "screener.port".to_string(),
            });
        }
        if self.provider_url.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: "screener.provider_url".to_string(),
            });
        }
        if self.universe_size == 0 {
            errors.push(invalid("screener.universe_size", "must be at least 1"));
        }
        if self.batch_size == 0 {
            errors.push(invalid("screener.batch_size", "must be at least 1"));
        }
        if self.candle_limit == 0 {
            errors.push(invalid("screener.candle_limit", "must be at least 1"));
        }
        if self.min_candles > self.candle_limit {
            errors.push(invalid(
                "screener.min_candles",
                format!(
                    "{} exceeds candle_limit {}",
                    self.min_candles, self.candle_limit
                ),
            ));
        }
        if self.pass_timeout_secs == 0 {
            errors.push(invalid("screener.pass_timeout_secs", "must be at least 1"));
        }
        if self.rate_limit_rpm == 0 {
            errors.push(invalid("screener.rate_limit_rpm", "must be at least 1"));
        }
        if self.cache_ttl_secs <= 0 {
            errors.push(invalid("screener.cache_ttl_secs", "must be positive"));
        }
        if let Err(e) = self.notification.validate() {
            errors.push(e);
        }

        collect_errors(errors)
    }
}

impl Validate for NotificationConfig {
    fn validate(&self) -> ValidationResult<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.channel_id.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "screener.notification.channel_id".to_string(),
            });
        }
        if self.retry_count == 0 {
            return Err(invalid("screener.notification.retry_count", "must be at least 1"));
        }
        Ok(())
    }
}
