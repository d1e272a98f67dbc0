#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for the evstore event dispatcher.
//!
//! # Usage
//!
//! ```rust,no_run
//! use evstore_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("failure policy: {}", resolved.config.dispatch.failure_policy);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Explicit file** (argument to [`Config::load`], else `EVSTORE_CONFIG`)
//! 2. **User** (`<config dir>/evstore/config.toml`)
//! 3. **Environment variables** (`EVSTORE_*`), fallback only
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate has no dependency on the other evstore crates. Conversion into
//! dispatch and logging options happens in those crates behind their
//! `config` feature.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging.
pub mod merge;
/// Resolved configuration display.
pub mod show;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use merge::{ConfigLayer, FieldSources};
pub use show::{ResolvedConfig, ShowFormat};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// See [`loader::load`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(config_file: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(config_file)
    }

    /// Load a single config file without layering.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or
    /// validated.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }

    /// Validate this configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found.
    pub fn validate(&self) -> ConfigResult<()> {
        validate::validate(self)
    }
}
