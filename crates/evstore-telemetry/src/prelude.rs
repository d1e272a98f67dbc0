//! Prelude module - commonly used types for convenient import.
//!
//! Use `use evstore_telemetry::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust,no_run
//! use evstore_telemetry::prelude::*;
//!
//! # fn main() -> TelemetryResult<()> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("evstore_core=trace");
//!
//! setup_logging(&config)?;
//! # Ok(())
//! # }
//! ```

// Errors
pub use crate::{TelemetryError, TelemetryResult};

// Logging configuration
pub use crate::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
