//! Error types for the Zero screener.

use thiserror::Error;

/// Result type alias using the Zero error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to HTTP callers of the screener service.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource is busy with another operation
    #[error("Busy: {0}")]
    Busy(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,
}

impl Error {
    /// Check if this is a timeout.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Get HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Timeout => 408,
            Self::Busy(_) => 409,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(Error::InvalidInput("test".into()).status_code(), 400);
        assert_eq!(Error::Timeout.status_code(), 408);
        assert_eq!(Error::Busy("pass".into()).status_code(), 409);
    }

    #[test]
    fn test_display() {
        assert!(Error::Timeout.is_timeout());
        assert!(!Error::Busy("pass".into()).is_timeout());
        assert_eq!(Error::InvalidInput("period is 0".into()).to_string(), "Invalid input: period is 0");
    }
}
