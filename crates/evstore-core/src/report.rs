//! Dispatch outcome.

use crate::error::HandlerInvocationFailure;
use crate::event::EventType;

/// Outcome of dispatching one event.
#[derive(Debug)]
pub struct DispatchReport {
    /// The dispatched event type.
    pub event_type: EventType,
    /// Handlers that processed the event successfully.
    pub succeeded: usize,
    /// Handlers that failed, in invocation order.
    pub failures: Vec<HandlerInvocationFailure>,
    /// Handlers not invoked because dispatch stopped at a failure.
    pub skipped: usize,
}

impl DispatchReport {
    pub(crate) fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            succeeded: 0,
            failures: Vec::new(),
            skipped: 0,
        }
    }

    /// Number of handlers that were invoked, successfully or not.
    #[must_use]
    pub fn invoked(&self) -> usize {
        self.succeeded.saturating_add(self.failures.len())
    }

    /// Whether every invoked handler succeeded and none were skipped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0
    }
}
