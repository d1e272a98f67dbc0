//! Evstore Telemetry - Logging setup for the evstore event dispatcher.
//!
//! This crate provides:
//! - Configurable `tracing` subscriber setup with several output formats
//! - An `EnvFilter` built from a base level plus per-crate directives
//! - With the `config` feature, conversion from `evstore_config::LoggingConfig`
//!
//! # Example
//!
//! ```rust,no_run
//! use evstore_telemetry::{LogConfig, LogFormat, LogTarget, setup_logging};
//!
//! # fn main() -> Result<(), evstore_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_target(LogTarget::Stdout)
//!     .with_directive("evstore_core=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
