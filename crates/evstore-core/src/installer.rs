//! One-call bootstrap of an event store.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{EventStoreError, EventStoreResult};
use crate::handler::{HandlerInstance, HandlerType};
use crate::locator::{InMemoryLocator, ServiceLocator};
use crate::options::DispatchOptions;
use crate::store::{Candidates, EventStore};

/// Builds and initializes an [`EventStore`] from a candidate list.
///
/// Either every handler is given by type (resolved per dispatch) or every
/// handler is a pre-built instance (reused), never a mix.
#[derive(Debug, Clone)]
pub struct EventStoreInstaller {
    candidates: Candidates,
    options: Option<DispatchOptions>,
}

impl EventStoreInstaller {
    /// Install handlers by type.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::InvalidBootstrapInput`] if `types` is empty.
    pub fn from_types(types: Vec<HandlerType>) -> EventStoreResult<Self> {
        Self::from_candidates(Candidates::Types(types))
    }

    /// Install pre-built handler instances.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::InvalidBootstrapInput`] if `handlers` is empty.
    pub fn from_handlers(handlers: Vec<HandlerInstance>) -> EventStoreResult<Self> {
        Self::from_candidates(Candidates::Instances(handlers))
    }

    fn from_candidates(candidates: Candidates) -> EventStoreResult<Self> {
        if candidates.is_empty() {
            return Err(EventStoreError::InvalidBootstrapInput {
                reason: "installer needs at least one handler".to_string(),
            });
        }
        Ok(Self {
            candidates,
            options: None,
        })
    }

    /// Dispatch options for the store being installed.
    ///
    /// Stores built by [`install`](Self::install) use them. An existing store
    /// must already have been built with them.
    #[must_use]
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// The candidates to install.
    #[must_use]
    pub fn candidates(&self) -> &Candidates {
        &self.candidates
    }

    /// Build a store over `locator` and initialize it.
    ///
    /// # Errors
    ///
    /// Any error from [`EventStore::initialize`].
    pub fn install(self, locator: Arc<dyn ServiceLocator>) -> EventStoreResult<EventStore> {
        let store = EventStore::with_options(locator, self.options.unwrap_or_default());
        store.initialize(self.candidates)?;
        Ok(store)
    }

    /// Build a store over a fresh [`InMemoryLocator`] and initialize it.
    ///
    /// # Errors
    ///
    /// Any error from [`EventStore::initialize`].
    pub fn install_in_memory(self) -> EventStoreResult<EventStore> {
        self.install(Arc::new(InMemoryLocator::new()))
    }

    /// Initialize an existing store.
    ///
    /// Options cannot be changed after a store is built, so options set with
    /// [`with_options`](Self::with_options) must equal the store's.
    ///
    /// # Errors
    ///
    /// - [`EventStoreError::OptionsMismatch`] if explicit options differ from
    ///   the store's. The store is left untouched.
    /// - Any error from [`EventStore::initialize`].
    pub fn install_into(self, store: &EventStore) -> EventStoreResult<()> {
        if let Some(requested) = self.options {
            let existing = store.options();
            if requested != existing {
                warn!(?existing, ?requested, "Installer options do not match target store");
                return Err(EventStoreError::OptionsMismatch {
                    existing,
                    requested,
                });
            }
        }
        store.initialize(self.candidates)
    }

    /// Initialize the process-wide store returned by [`EventStore::global`].
    ///
    /// If the global store does not exist yet it is created with this
    /// installer's options.
    ///
    /// # Errors
    ///
    /// Same as [`install_into`](Self::install_into).
    pub fn install_global(self) -> EventStoreResult<&'static EventStore> {
        let store = EventStore::global_with(self.options.unwrap_or_default());
        debug!(options = ?store.options(), "Installing into global event store");
        self.install_into(store)?;
        Ok(store)
    }
}
