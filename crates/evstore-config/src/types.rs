//! Configuration types for evstore.
//!
//! These types have no dependency on `evstore-core`; the core crate converts
//! them into its own option types behind its `config` feature. Every struct
//! implements [`Default`], so a bare `[section]` header yields a working
//! configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dispatch behaviour of the event store.
    pub dispatch: DispatchConfig,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// DispatchConfig
// ---------------------------------------------------------------------------

/// What dispatch does after a handler fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Run every handler and report every failure.
    #[default]
    Continue,
    /// Stop at the first failing handler.
    StopOnFirst,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => f.write_str("continue"),
            Self::StopOnFirst => f.write_str("stop_on_first"),
        }
    }
}

/// Event store dispatch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Failure handling during dispatch.
    pub failure_policy: FailurePolicy,
    /// Report handler panics as failures instead of unwinding.
    pub catch_panics: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Continue,
            catch_panics: true,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingConfig
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["evstore_core=trace"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_sections_use_defaults() {
        let config: Config = toml::from_str("[dispatch]\n[logging]\n").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_failure_policy_names() {
        let config: DispatchConfig = toml::from_str("failure_policy = \"stop_on_first\"").unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::StopOnFirst);
        assert!(config.catch_panics);
        assert_eq!(FailurePolicy::StopOnFirst.to_string(), "stop_on_first");
    }

    #[test]
    fn test_unknown_failure_policy_is_rejected() {
        let result: Result<DispatchConfig, _> = toml::from_str("failure_policy = \"retry\"");
        assert!(result.is_err());
    }
}
