//! Event store error types.

use thiserror::Error;

use crate::capability::BindingKey;
use crate::event::EventType;
use crate::handler::HandlerIdentity;
use crate::locator::LocatorError;
use crate::options::DispatchOptions;
use crate::registry::RegistrationMode;
use crate::report::DispatchReport;

/// Errors raised by bootstrap and dispatch.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The bootstrap candidate list was unusable.
    #[error("invalid bootstrap input: {reason}")]
    InvalidBootstrapInput {
        /// Why the input was rejected.
        reason: String,
    },

    /// `initialize` was called on a store that is initializing or ready.
    #[error("event store is already initialized")]
    AlreadyInitialized,

    /// The store was used before `initialize` completed.
    #[error("event store is not initialized")]
    NotInitialized,

    /// The same binding was registered again with a different mode.
    #[error("duplicate binding {key}: registered as {existing}, requested {requested}")]
    DuplicateBinding {
        /// The conflicting binding key.
        key: BindingKey,
        /// Mode of the registration already present.
        existing: RegistrationMode,
        /// Mode of the rejected registration.
        requested: RegistrationMode,
    },

    /// A registration did not match its mode.
    #[error("invalid registration for {key}: {reason}")]
    InvalidRegistration {
        /// The binding key.
        key: BindingKey,
        /// What was wrong with it.
        reason: String,
    },

    /// An installer asked for dispatch options the target store was not
    /// built with.
    #[error("dispatch options mismatch: store has {existing:?}, installer requested {requested:?}")]
    OptionsMismatch {
        /// Options the store was built with.
        existing: DispatchOptions,
        /// Options the installer was configured with.
        requested: DispatchOptions,
    },

    /// The service locator refused a registration.
    #[error("service locator error: {0}")]
    Locator(#[from] LocatorError),

    /// One or more handlers failed while processing an event.
    #[error(
        "{} of {} handler(s) failed for event {event_type}",
        .report.failures.len(),
        .report.invoked()
    )]
    HandlerFailures {
        /// The dispatched event type.
        event_type: EventType,
        /// Outcome of the dispatch, including every failure.
        report: DispatchReport,
    },
}

impl EventStoreError {
    /// Per-handler failures carried by this error, if any.
    #[must_use]
    pub fn failures(&self) -> &[HandlerInvocationFailure] {
        match self {
            Self::HandlerFailures { report, .. } => &report.failures,
            _ => &[],
        }
    }
}

/// Result type for event store operations.
pub type EventStoreResult<T> = Result<T, EventStoreError>;

/// Errors returned by handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler could not process the event.
    #[error("processing failed: {message}")]
    Failed {
        /// Failure description.
        message: String,
    },

    /// The handler refused the event.
    #[error("event rejected: {reason}")]
    Rejected {
        /// Reason for rejection.
        reason: String,
    },

    /// An underlying error.
    #[error("internal error: {source}")]
    Internal {
        /// The wrapped error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Shorthand for [`HandlerError::Rejected`].
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Wrap any error as [`HandlerError::Internal`].
    pub fn internal(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Internal {
            source: source.into(),
        }
    }
}

/// Why a single handler invocation failed.
#[derive(Debug, Error)]
pub enum InvocationCause {
    /// The handler returned an error.
    #[error(transparent)]
    Handler(HandlerError),

    /// The handler panicked.
    #[error("handler panicked: {message}")]
    Panicked {
        /// The panic payload, when it was a string.
        message: String,
    },

    /// The handler could not be resolved.
    #[error("failed to resolve handler: {0}")]
    Resolve(#[source] LocatorError),

    /// The resolved object was not the bound handler type.
    #[error("resolved handler is not a {expected}")]
    HandlerTypeMismatch {
        /// Expected handler type name.
        expected: &'static str,
    },

    /// The event did not match the bound event type.
    #[error("event is not a {expected}")]
    EventTypeMismatch {
        /// Expected event type name.
        expected: &'static str,
    },
}

/// A handler failure surfaced by dispatch.
#[derive(Debug, Error)]
#[error("handler {handler} failed: {cause}")]
pub struct HandlerInvocationFailure {
    /// The failing handler.
    pub handler: HandlerIdentity,
    /// The binding that was being invoked.
    pub binding_key: BindingKey,
    /// The original failure.
    #[source]
    pub cause: InvocationCause,
}
