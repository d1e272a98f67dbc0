//! Fixture events and handlers.
//!
//! Every handler records what it receives into a shared [`Journal`], so a
//! test can assert which handler saw which event and on which instance.

use std::io::Write as _;
use std::path::PathBuf;

use evstore_core::{HandlerError, HandlerType, Handles, handles};
use tempfile::TempDir;

use crate::mocks::Journal;

/// An order was placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCreated {
    /// Order identifier.
    pub order_id: u64,
}

impl OrderCreated {
    /// Create an event for `order_id`.
    #[must_use]
    pub fn new(order_id: u64) -> Self {
        Self { order_id }
    }
}

/// An order left the warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderShipped {
    /// Order identifier.
    pub order_id: u64,
    /// Shipping carrier.
    pub carrier: String,
}

impl OrderShipped {
    /// Create an event for `order_id` shipped with `carrier`.
    #[must_use]
    pub fn new(order_id: u64, carrier: impl Into<String>) -> Self {
        Self {
            order_id,
            carrier: carrier.into(),
        }
    }
}

/// Payment for an order arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceived {
    /// Order identifier.
    pub order_id: u64,
    /// Amount in cents.
    pub amount_cents: u64,
}

impl PaymentReceived {
    /// Create an event for `amount_cents` paid on `order_id`.
    #[must_use]
    pub fn new(order_id: u64, amount_cents: u64) -> Self {
        Self {
            order_id,
            amount_cents,
        }
    }
}

/// Expands to a journaled handler struct with a counting `handler_type`.
macro_rules! journaled_handler {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone)]
        pub struct $name {
            /// Where deliveries are recorded.
            pub journal: Journal,
        }

        impl $name {
            /// Wrap `journal`.
            #[must_use]
            pub fn new(journal: &Journal) -> Self {
                Self {
                    journal: journal.clone(),
                }
            }

            /// Describe this handler as a type whose factory records each
            /// construction in `journal`.
            #[must_use]
            pub fn handler_type(journal: &Journal) -> HandlerType {
                let journal = journal.clone();
                HandlerType::with_factory::<Self, _>(move || {
                    journal.note_construction();
                    Self::new(&journal)
                })
            }
        }
    };
}

journaled_handler!(
    /// Consumes [`OrderCreated`].
    OrderCreatedHandler
);

journaled_handler!(
    /// Consumes [`PaymentReceived`].
    PaymentHandler
);

journaled_handler!(
    /// Consumes [`OrderCreated`] and [`OrderShipped`].
    OrderLifecycleHandler
);

journaled_handler!(
    /// Consumes [`OrderCreated`] and always fails.
    FailingHandler
);

journaled_handler!(
    /// Consumes [`OrderCreated`] and always panics.
    PanickingHandler
);

journaled_handler!(
    /// Declares no event types.
    SilentHandler
);

impl Handles<OrderCreated> for OrderCreatedHandler {
    fn handle(&self, event: &OrderCreated) -> Result<(), HandlerError> {
        self.journal.record("order_created", self, event);
        Ok(())
    }
}

impl Handles<PaymentReceived> for PaymentHandler {
    fn handle(&self, event: &PaymentReceived) -> Result<(), HandlerError> {
        self.journal.record("payment", self, event);
        Ok(())
    }
}

impl Handles<OrderCreated> for OrderLifecycleHandler {
    fn handle(&self, event: &OrderCreated) -> Result<(), HandlerError> {
        self.journal.record("lifecycle", self, event);
        Ok(())
    }
}

impl Handles<OrderShipped> for OrderLifecycleHandler {
    fn handle(&self, event: &OrderShipped) -> Result<(), HandlerError> {
        self.journal.record("lifecycle", self, event);
        Ok(())
    }
}

impl Handles<OrderCreated> for FailingHandler {
    fn handle(&self, event: &OrderCreated) -> Result<(), HandlerError> {
        self.journal.record("failing", self, event);
        Err(HandlerError::failed(format!(
            "cannot process order {}",
            event.order_id
        )))
    }
}

impl Handles<OrderCreated> for PanickingHandler {
    fn handle(&self, event: &OrderCreated) -> Result<(), HandlerError> {
        self.journal.record("panicking", self, event);
        panic!("order {} blew up", event.order_id);
    }
}

handles!(OrderCreatedHandler => OrderCreated);
handles!(PaymentHandler => PaymentReceived);
handles!(OrderLifecycleHandler => OrderCreated, OrderShipped);
handles!(FailingHandler => OrderCreated);
handles!(PanickingHandler => OrderCreated);
handles!(SilentHandler);

/// Write `contents` to `evstore.toml` in a fresh temporary directory.
///
/// The directory is removed when the returned guard drops.
///
/// # Panics
///
/// Panics if the file cannot be created.
#[allow(clippy::unwrap_used)]
#[must_use]
pub fn write_config(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("evstore.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    (dir, path)
}
