//! Service locator seam between the store and the host container.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use thiserror::Error;
use tracing::{debug, trace};

use crate::capability::BindingKey;
use crate::error::HandlerError;
use crate::handler::{HandlerFactory, SharedHandler};
use crate::registry::RegistrationMode;

/// Errors raised by a [`ServiceLocator`].
#[derive(Debug, Error)]
pub enum LocatorError {
    /// Nothing is registered under the key.
    #[error("no handler registered for binding {key}")]
    NotRegistered {
        /// The unknown key.
        key: BindingKey,
    },

    /// The registered factory failed to build the handler.
    #[error("failed to construct handler for binding {key}: {source}")]
    Construction {
        /// The binding being resolved.
        key: BindingKey,
        /// The factory error.
        source: HandlerError,
    },

    /// The locator rejected a registration.
    #[error("registration rejected for binding {key}: {reason}")]
    Rejected {
        /// The binding being registered.
        key: BindingKey,
        /// Why it was rejected.
        reason: String,
    },

    /// An internal lock was poisoned by a panicking thread.
    #[error("service locator lock poisoned")]
    LockPoisoned,
}

/// Result type for locator operations.
pub type LocatorResult<T> = Result<T, LocatorError>;

/// Resolves binding keys to handler instances.
///
/// The store registers every binding during bootstrap and resolves
/// [`RegistrationMode::Transient`] bindings on each dispatch. Implement this
/// to back the store with a host container; [`InMemoryLocator`] is the
/// built-in implementation.
pub trait ServiceLocator: Send + Sync {
    /// Register a constructor under `key`.
    ///
    /// `lifetime` decides whether `resolve` builds a new handler every time
    /// (`Transient`) or once (`SharedInstance`).
    ///
    /// # Errors
    ///
    /// Returns an error if the registration cannot be stored.
    fn register_type(
        &self,
        key: BindingKey,
        factory: HandlerFactory,
        lifetime: RegistrationMode,
    ) -> LocatorResult<()>;

    /// Register a pre-built instance under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration cannot be stored.
    fn register_instance(&self, key: BindingKey, instance: SharedHandler) -> LocatorResult<()>;

    /// Resolve the handler registered under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is registered or construction fails.
    fn resolve(&self, key: &BindingKey) -> LocatorResult<SharedHandler>;

    /// Whether anything is registered under `key`.
    fn contains(&self, key: &BindingKey) -> bool;

    /// Drop the registration under `key`.
    ///
    /// Used to undo a bootstrap that failed partway. Removing an unknown key
    /// is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration cannot be removed.
    fn remove(&self, key: &BindingKey) -> LocatorResult<()>;
}

#[derive(Clone)]
enum Entry {
    Transient(HandlerFactory),
    Singleton {
        factory: HandlerFactory,
        built: Arc<OnceLock<SharedHandler>>,
    },
    Instance(SharedHandler),
}

impl Entry {
    fn kind(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::Singleton { .. } => "singleton",
            Self::Instance(_) => "instance",
        }
    }
}

/// Locator backed by an in-memory map.
///
/// Registering a key that is already present keeps the first registration,
/// so re-applying the same bootstrap list is harmless.
#[derive(Default)]
pub struct InMemoryLocator {
    entries: RwLock<HashMap<BindingKey, Entry>>,
}

impl fmt::Debug for InMemoryLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.entries.read().map(|e| e.len()).unwrap_or_default();
        f.debug_struct("InMemoryLocator")
            .field("entry_count", &count)
            .finish()
    }
}

impl InMemoryLocator {
    /// Create an empty locator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or_default()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, key: BindingKey, entry: Entry) -> LocatorResult<()> {
        let mut entries = self.entries.write().map_err(|_| LocatorError::LockPoisoned)?;
        if entries.contains_key(&key) {
            trace!(binding_key = %key, "Locator key already registered");
            return Ok(());
        }
        debug!(binding_key = %key, kind = entry.kind(), "Locator entry registered");
        entries.insert(key, entry);
        Ok(())
    }
}

impl ServiceLocator for InMemoryLocator {
    fn register_type(
        &self,
        key: BindingKey,
        factory: HandlerFactory,
        lifetime: RegistrationMode,
    ) -> LocatorResult<()> {
        let entry = match lifetime {
            RegistrationMode::Transient => Entry::Transient(factory),
            RegistrationMode::SharedInstance => Entry::Singleton {
                factory,
                built: Arc::new(OnceLock::new()),
            },
        };
        self.insert(key, entry)
    }

    fn register_instance(&self, key: BindingKey, instance: SharedHandler) -> LocatorResult<()> {
        self.insert(key, Entry::Instance(instance))
    }

    fn resolve(&self, key: &BindingKey) -> LocatorResult<SharedHandler> {
        // Clone the entry out so factories run without holding the lock.
        let entry = {
            let entries = self.entries.read().map_err(|_| LocatorError::LockPoisoned)?;
            entries
                .get(key)
                .cloned()
                .ok_or_else(|| LocatorError::NotRegistered { key: key.clone() })?
        };

        let construct = |factory: &HandlerFactory| {
            factory().map_err(|source| LocatorError::Construction {
                key: key.clone(),
                source,
            })
        };

        match entry {
            Entry::Transient(factory) => construct(&factory),
            Entry::Singleton { factory, built } => {
                if let Some(handler) = built.get() {
                    return Ok(Arc::clone(handler));
                }
                let handler = construct(&factory)?;
                // A concurrent resolve may have won; keep whichever was stored first.
                Ok(Arc::clone(built.get_or_init(|| handler)))
            },
            Entry::Instance(handler) => Ok(handler),
        }
    }

    fn contains(&self, key: &BindingKey) -> bool {
        self.entries
            .read()
            .map(|e| e.contains_key(key))
            .unwrap_or(false)
    }

    fn remove(&self, key: &BindingKey) -> LocatorResult<()> {
        let mut entries = self.entries.write().map_err(|_| LocatorError::LockPoisoned)?;
        if entries.remove(key).is_some() {
            debug!(binding_key = %key, "Locator entry removed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Widget;

    struct Ping;

    fn key() -> BindingKey {
        BindingKey::for_pair(
            &crate::handler::HandlerIdentity::of::<Widget>(),
            crate::event::EventType::of::<Ping>(),
        )
    }

    fn counting_factory(counter: &Arc<AtomicUsize>) -> HandlerFactory {
        let counter = Arc::clone(counter);
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let handler: SharedHandler = Arc::new(Widget);
            Ok(handler)
        })
    }

    #[test]
    fn test_transient_builds_every_time() {
        let locator = InMemoryLocator::new();
        let built = Arc::new(AtomicUsize::new(0));
        locator
            .register_type(key(), counting_factory(&built), RegistrationMode::Transient)
            .unwrap();

        let first = locator.resolve(&key()).unwrap();
        let second = locator.resolve(&key()).unwrap();

        assert_eq!(built.load(Ordering::SeqCst), 2);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_singleton_builds_once() {
        let locator = InMemoryLocator::new();
        let built = Arc::new(AtomicUsize::new(0));
        locator
            .register_type(
                key(),
                counting_factory(&built),
                RegistrationMode::SharedInstance,
            )
            .unwrap();

        assert_eq!(built.load(Ordering::SeqCst), 0);
        let first = locator.resolve(&key()).unwrap();
        let second = locator.resolve(&key()).unwrap();

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_instance_is_returned_as_is() {
        let locator = InMemoryLocator::new();
        let instance: SharedHandler = Arc::new(Widget);
        locator
            .register_instance(key(), Arc::clone(&instance))
            .unwrap();

        let resolved = locator.resolve(&key()).unwrap();
        assert!(Arc::ptr_eq(&instance, &resolved));
    }

    #[test]
    fn test_first_registration_wins() {
        let locator = InMemoryLocator::new();
        let instance: SharedHandler = Arc::new(Widget);
        let built = Arc::new(AtomicUsize::new(0));

        locator
            .register_instance(key(), Arc::clone(&instance))
            .unwrap();
        locator
            .register_type(key(), counting_factory(&built), RegistrationMode::Transient)
            .unwrap();

        let resolved = locator.resolve(&key()).unwrap();
        assert!(Arc::ptr_eq(&instance, &resolved));
        assert_eq!(built.load(Ordering::SeqCst), 0);
        assert_eq!(locator.len(), 1);
    }

    #[test]
    fn test_unknown_key() {
        let locator = InMemoryLocator::new();
        assert!(!locator.contains(&key()));
        let err = locator.resolve(&key()).unwrap_err();
        assert!(matches!(err, LocatorError::NotRegistered { .. }));
    }

    #[test]
    fn test_construction_failure() {
        let locator = InMemoryLocator::new();
        let factory: HandlerFactory = Arc::new(|| Err(HandlerError::failed("pool exhausted")));
        locator
            .register_type(key(), factory, RegistrationMode::Transient)
            .unwrap();

        let err = locator.resolve(&key()).unwrap_err();
        assert!(matches!(err, LocatorError::Construction { .. }));
        assert!(err.to_string().contains("pool exhausted"));
    }

    #[test]
    fn test_remove_allows_reregistration() {
        let locator = InMemoryLocator::new();
        let instance: SharedHandler = Arc::new(Widget);
        let built = Arc::new(AtomicUsize::new(0));
        locator.register_instance(key(), instance).unwrap();

        locator.remove(&key()).unwrap();
        assert!(!locator.contains(&key()));
        locator.remove(&key()).unwrap();

        locator
            .register_type(key(), counting_factory(&built), RegistrationMode::Transient)
            .unwrap();
        locator.resolve(&key()).unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }
}
