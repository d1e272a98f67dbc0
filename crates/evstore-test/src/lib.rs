//! Evstore Test - Shared test utilities for the evstore crates.
//!
//! This crate provides fixture events and handlers, a recording service
//! locator, and a tracing setup for tests.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! evstore-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! use evstore_core::EventStoreInstaller;
//! use evstore_test::{Journal, OrderCreated, OrderCreatedHandler};
//!
//! #[test]
//! fn test_order_flow() {
//!     let journal = Journal::new();
//!     let store = EventStoreInstaller::from_types(vec![OrderCreatedHandler::handler_type(&journal)])
//!         .unwrap()
//!         .install_in_memory()
//!         .unwrap();
//!
//!     store.dispatch(&OrderCreated::new(1)).unwrap();
//!     assert_eq!(journal.len(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]

pub mod fixtures;
pub mod mocks;
pub mod tracing_setup;

pub use fixtures::*;
pub use mocks::*;
pub use tracing_setup::init_test_tracing;
