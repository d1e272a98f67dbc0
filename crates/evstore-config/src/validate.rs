//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Accepted values for `logging.level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Accepted values for `logging.format`.
pub const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a fully merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_logging(config)?;
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let logging = &config.logging;

    if !LOG_LEVELS.contains(&logging.level.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unsupported log level '{}'; expected one of: {}",
                logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if !LOG_FORMATS.contains(&logging.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported log format '{}'; expected one of: {}",
                logging.format,
                LOG_FORMATS.join(", ")
            ),
        });
    }

    if let Some(index) = logging.directives.iter().position(|d| d.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: format!("logging.directives[{index}]"),
            message: "directive must not be empty".to_owned(),
        });
    }

    Ok(())
}
