//! Unified error types for the scheduler.

use thiserror::Error;

/// Result type used across the Strata crates.
pub type StrataResult<T> = Result<T, StrataError>;

/// Unified error type for the Strata scheduler.
///
/// Per-message errors (`MalformedJob`, `UnknownJobType`) are logged and
/// dropped by the consumer; `Configuration` and `Bus` errors are fatal and
/// terminate the process.
#[derive(Debug, Error)]
pub enum StrataError {
    /// A new-job event could not be turned into a job (missing field or
    /// unparseable timestamp).
    #[error("Malformed job event: {0}")]
    MalformedJob(String),

    /// The job type has no entry in the resource catalog.
    #[error("Job resources not exist: {0}")]
    UnknownJobType(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Non-recoverable message bus error.
    #[error("Bus error: {0}")]
    Bus(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StrataError {
    /// Creates a malformed-job error.
    #[must_use]
    pub fn malformed_job<T: Into<String>>(message: T) -> Self {
        Self::MalformedJob(message.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if the consumer must stop instead of dropping the
    /// offending message.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Bus(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_message_errors_are_not_fatal() {
        assert!(!StrataError::malformed_job("bad deadline").is_fatal());
        assert!(!StrataError::UnknownJobType("mystery_job".to_string()).is_fatal());
    }

    #[test]
    fn test_bus_and_config_errors_are_fatal() {
        assert!(StrataError::Bus("broker down".to_string()).is_fatal());
        assert!(StrataError::configuration("LEVEL_LIMIT too short").is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = StrataError::UnknownJobType("demand_forecasting_2hr".to_string());
        assert!(err.to_string().contains("demand_forecasting_2hr"));
    }
}
