//! Evstore Core - Capability registry and dispatcher for in-process events.
//!
//! This crate provides:
//! - Capability discovery: which handler consumes which event type
//! - A type-indexed registry of those capabilities
//! - A once-initialized [`EventStore`] that routes an event to every
//!   handler registered for its type
//!
//! # Architecture
//!
//! A handler implements [`Handles<E>`] once per event type it consumes and
//! declares those implementations through [`EventHandler`] (usually with the
//! [`handles!`] macro). Bootstrap hands the store either a list of handler
//! *types* or a list of handler *instances*:
//!
//! 1. **Types** register as [`RegistrationMode::Transient`]; every dispatch
//!    resolves a fresh handler through the [`ServiceLocator`].
//! 2. **Instances** register as [`RegistrationMode::SharedInstance`]; the
//!    store keeps the instance and reuses it for every dispatch.
//!
//! After [`EventStore::initialize`] succeeds the registry is immutable and
//! [`EventStore::dispatch`] may be called from any number of threads.
//!
//! # Example
//!
//! ```rust
//! use evstore_core::{EventStoreInstaller, HandlerError, HandlerType, Handles, handles};
//!
//! #[derive(Debug)]
//! struct OrderCreated {
//!     order_id: u64,
//! }
//!
//! #[derive(Default)]
//! struct OrderCreatedHandler;
//!
//! impl Handles<OrderCreated> for OrderCreatedHandler {
//!     fn handle(&self, event: &OrderCreated) -> Result<(), HandlerError> {
//!         println!("order {} created", event.order_id);
//!         Ok(())
//!     }
//! }
//!
//! handles!(OrderCreatedHandler => OrderCreated);
//!
//! # fn main() -> evstore_core::EventStoreResult<()> {
//! let store = EventStoreInstaller::from_types(vec![HandlerType::of::<OrderCreatedHandler>()])?
//!     .install_in_memory()?;
//!
//! let report = store.dispatch(&OrderCreated { order_id: 7 })?;
//! assert_eq!(report.succeeded, 1);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;
pub mod scanner;

mod capability;
mod error;
mod event;
mod handler;
mod installer;
mod locator;
mod options;
mod registry;
mod report;
mod store;

pub use capability::{BindingKey, HandlerCapability};
pub use error::{
    EventStoreError, EventStoreResult, HandlerError, HandlerInvocationFailure, InvocationCause,
};
pub use event::{Event, EventType};
pub use handler::{
    CapabilitySet, EventHandler, HandlerFactory, HandlerIdentity, HandlerInstance, HandlerType,
    Handles, SharedHandler,
};
pub use installer::EventStoreInstaller;
pub use locator::{InMemoryLocator, LocatorError, LocatorResult, ServiceLocator};
pub use options::{DispatchOptions, FailurePolicy};
pub use registry::{HandlerRegistry, Registered, Registration, RegistrationMode};
pub use report::DispatchReport;
pub use scanner::Candidate;
pub use store::{Candidates, EventStore, StoreState};

/// Declare the event types a handler consumes.
///
/// Expands to an [`EventHandler`] implementation that lists every event
/// type. Each listed type must have a matching [`Handles`] implementation,
/// otherwise the declaration does not compile.
///
/// ```rust
/// use evstore_core::{HandlerError, Handles, handles};
///
/// struct Shipped;
/// struct Cancelled;
///
/// struct OrderLifecycle;
///
/// impl Handles<Shipped> for OrderLifecycle {
///     fn handle(&self, _event: &Shipped) -> Result<(), HandlerError> {
///         Ok(())
///     }
/// }
///
/// impl Handles<Cancelled> for OrderLifecycle {
///     fn handle(&self, _event: &Cancelled) -> Result<(), HandlerError> {
///         Ok(())
///     }
/// }
///
/// handles!(OrderLifecycle => Shipped, Cancelled);
/// ```
#[macro_export]
macro_rules! handles {
    ($handler:ty) => {
        impl $crate::EventHandler for $handler {
            fn capabilities(_set: &mut $crate::CapabilitySet<Self>) {}
        }
    };
    ($handler:ty => $($event:ty),+ $(,)?) => {
        impl $crate::EventHandler for $handler {
            fn capabilities(set: &mut $crate::CapabilitySet<Self>) {
                $(
                    set.handles::<$event>();
                )+
            }
        }
    };
}
