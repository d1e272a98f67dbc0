//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while setting up logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The logging configuration is invalid.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The global subscriber could not be installed.
    #[error("initialization error: {0}")]
    InitError(String),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
