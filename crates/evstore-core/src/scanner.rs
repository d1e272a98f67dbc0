//! Capability discovery for bootstrap candidates.
//!
//! A candidate is either a handler type (built later through the service
//! locator) or a live handler instance. Scanning lists every event type the
//! candidate declared through [`EventHandler`](crate::EventHandler), one
//! [`HandlerCapability`] per event type.

use tracing::debug;

use crate::capability::HandlerCapability;
use crate::handler::{HandlerInstance, HandlerType};

/// A bootstrap candidate to scan.
#[derive(Debug, Clone, Copy)]
pub enum Candidate<'a> {
    /// A handler described by its type.
    Type(&'a HandlerType),
    /// A pre-built handler.
    Instance(&'a HandlerInstance),
}

impl<'a> From<&'a HandlerType> for Candidate<'a> {
    fn from(handler_type: &'a HandlerType) -> Self {
        Self::Type(handler_type)
    }
}

impl<'a> From<&'a HandlerInstance> for Candidate<'a> {
    fn from(instance: &'a HandlerInstance) -> Self {
        Self::Instance(instance)
    }
}

/// List the capabilities a candidate exposes.
///
/// Abstract handler types yield nothing. A handler that declares no event
/// types also yields nothing; neither case is an error.
#[must_use]
pub fn scan<'a>(candidate: impl Into<Candidate<'a>>) -> Vec<HandlerCapability> {
    let (identity, capabilities) = match candidate.into() {
        Candidate::Type(handler_type) => {
            if !handler_type.is_concrete() {
                debug!(handler = %handler_type.identity(), "Skipping abstract handler type");
                return Vec::new();
            }
            (handler_type.identity(), handler_type.declared())
        },
        Candidate::Instance(instance) => (instance.identity(), instance.declared()),
    };

    if capabilities.is_empty() {
        debug!(handler = %identity, "Handler declares no event types");
    } else {
        debug!(
            handler = %identity,
            capability_count = capabilities.len(),
            "Scanned handler capabilities"
        );
    }

    capabilities
}

/// Keep only the handler types that can be instantiated.
pub fn concrete<'a>(
    types: impl IntoIterator<Item = &'a HandlerType>,
) -> impl Iterator<Item = &'a HandlerType> {
    types.into_iter().filter(|t| t.is_concrete())
}
