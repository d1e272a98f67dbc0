//! Prelude module - commonly used types for convenient import.
//!
//! Use `use evstore_core::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use evstore_core::prelude::*;
//!
//! struct UserRegistered;
//!
//! #[derive(Default)]
//! struct WelcomeMailer;
//!
//! impl Handles<UserRegistered> for WelcomeMailer {
//!     fn handle(&self, _event: &UserRegistered) -> Result<(), HandlerError> {
//!         Ok(())
//!     }
//! }
//!
//! handles!(WelcomeMailer => UserRegistered);
//!
//! let store = EventStore::in_memory();
//! store.initialize(vec![HandlerType::of::<WelcomeMailer>()]).unwrap();
//!
//! let report = store.dispatch(&UserRegistered).unwrap();
//! assert_eq!(report.succeeded, 1);
//! ```

// Store and bootstrap
pub use crate::{Candidates, EventStore, EventStoreInstaller, StoreState};

// Handlers
pub use crate::{EventHandler, HandlerInstance, HandlerType, Handles, handles};

// Events
pub use crate::{Event, EventType};

// Dispatch
pub use crate::{DispatchOptions, DispatchReport, FailurePolicy};

// Locator
pub use crate::{InMemoryLocator, ServiceLocator};

// Errors
pub use crate::{EventStoreError, EventStoreResult, HandlerError};
