//! Mock implementations for testing.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use evstore_core::{
    BindingKey, HandlerError, HandlerFactory, InMemoryLocator, LocatorError, LocatorResult,
    RegistrationMode, ServiceLocator, SharedHandler,
};

/// One event delivered to one handler instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Label of the handler that received the event.
    pub handler: &'static str,
    /// `Debug` rendering of the event.
    pub event: String,
    /// Address of the event value the handler saw.
    pub event_addr: usize,
    /// Address of the handler instance that ran.
    pub instance_addr: usize,
}

/// Shared record of handler constructions and deliveries.
///
/// Clones share the same record, so a journal can be handed to every
/// handler a test builds.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    constructions: Arc<AtomicUsize>,
}

impl Journal {
    /// Create an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `instance` handled `event`.
    pub fn record<H, E: Debug>(&self, handler: &'static str, instance: &H, event: &E) {
        let delivery = Delivery {
            handler,
            event: format!("{event:?}"),
            event_addr: std::ptr::from_ref(event).addr(),
            instance_addr: std::ptr::from_ref(instance).addr(),
        };
        if let Ok(mut guard) = self.deliveries.lock() {
            guard.push(delivery);
        }
    }

    /// Record that a handler was constructed.
    pub fn note_construction(&self) {
        self.constructions.fetch_add(1, Ordering::SeqCst);
    }

    /// All deliveries, in order.
    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Handler labels of all deliveries, in order.
    #[must_use]
    pub fn handlers(&self) -> Vec<&'static str> {
        self.deliveries().iter().map(|d| d.handler).collect()
    }

    /// Number of deliveries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deliveries.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    /// Whether nothing was delivered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of handlers constructed through factories.
    #[must_use]
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }
}

/// How a key was registered with a [`RecordingLocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedRegistration {
    /// Registered with a factory and lifetime.
    Type(RegistrationMode),
    /// Registered with a pre-built instance.
    Instance,
}

/// Service locator that records every call and can inject failures.
///
/// Delegates storage to an [`InMemoryLocator`].
#[derive(Debug, Default)]
pub struct RecordingLocator {
    inner: InMemoryLocator,
    resolves: Mutex<HashMap<BindingKey, usize>>,
    registrations: Mutex<Vec<(BindingKey, RecordedRegistration)>>,
    removals: Mutex<Vec<BindingKey>>,
    accept_budget: Mutex<Option<usize>>,
    failing_key: Mutex<Option<BindingKey>>,
    refuse_registrations: AtomicBool,
}

impl RecordingLocator {
    /// Create a new recording locator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `resolve` of `key` fail.
    #[must_use]
    pub fn with_failing_key(self, key: BindingKey) -> Self {
        self.fail_resolve_for(key);
        self
    }

    /// Make every `resolve` of `key` fail from now on.
    pub fn fail_resolve_for(&self, key: BindingKey) {
        if let Ok(mut guard) = self.failing_key.lock() {
            *guard = Some(key);
        }
    }

    /// Refuse (or accept again) all registrations.
    pub fn set_refuse_registrations(&self, refuse: bool) {
        self.refuse_registrations.store(refuse, Ordering::SeqCst);
    }

    /// Accept `count` more registrations, then refuse the rest.
    ///
    /// `None` lifts the limit.
    pub fn refuse_after(&self, count: Option<usize>) {
        if let Ok(mut guard) = self.accept_budget.lock() {
            *guard = count;
        }
    }

    /// Number of `resolve` calls made for `key`.
    #[must_use]
    pub fn resolve_count(&self, key: &BindingKey) -> usize {
        self.resolves
            .lock()
            .map(|guard| guard.get(key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of `resolve` calls made for any key.
    #[must_use]
    pub fn total_resolves(&self) -> usize {
        self.resolves
            .lock()
            .map(|guard| guard.values().fold(0_usize, |acc, n| acc.saturating_add(*n)))
            .unwrap_or(0)
    }

    /// Every accepted registration, in call order.
    #[must_use]
    pub fn registrations(&self) -> Vec<(BindingKey, RecordedRegistration)> {
        self.registrations
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Every key passed to `remove`, in call order.
    #[must_use]
    pub fn removals(&self) -> Vec<BindingKey> {
        self.removals
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn check_accepting(&self, key: &BindingKey) -> LocatorResult<()> {
        let exhausted = self
            .accept_budget
            .lock()
            .map(|mut guard| match *guard {
                Some(0) => true,
                Some(left) => {
                    *guard = Some(left.saturating_sub(1));
                    false
                },
                None => false,
            })
            .unwrap_or(false);
        if exhausted || self.refuse_registrations.load(Ordering::SeqCst) {
            return Err(LocatorError::Rejected {
                key: key.clone(),
                reason: "registrations are refused".to_string(),
            });
        }
        Ok(())
    }

    fn remember(&self, key: &BindingKey, registration: RecordedRegistration) {
        if let Ok(mut guard) = self.registrations.lock() {
            guard.push((key.clone(), registration));
        }
    }
}

impl ServiceLocator for RecordingLocator {
    fn register_type(
        &self,
        key: BindingKey,
        factory: HandlerFactory,
        lifetime: RegistrationMode,
    ) -> LocatorResult<()> {
        self.check_accepting(&key)?;
        self.remember(&key, RecordedRegistration::Type(lifetime));
        self.inner.register_type(key, factory, lifetime)
    }

    fn register_instance(&self, key: BindingKey, instance: SharedHandler) -> LocatorResult<()> {
        self.check_accepting(&key)?;
        self.remember(&key, RecordedRegistration::Instance);
        self.inner.register_instance(key, instance)
    }

    fn resolve(&self, key: &BindingKey) -> LocatorResult<SharedHandler> {
        if let Ok(mut guard) = self.resolves.lock() {
            let count = guard.entry(key.clone()).or_insert(0);
            *count = count.saturating_add(1);
        }

        let failing = self
            .failing_key
            .lock()
            .map(|guard| guard.as_ref() == Some(key))
            .unwrap_or(false);
        if failing {
            return Err(LocatorError::Construction {
                key: key.clone(),
                source: HandlerError::failed("injected resolve failure"),
            });
        }

        self.inner.resolve(key)
    }

    fn contains(&self, key: &BindingKey) -> bool {
        self.inner.contains(key)
    }

    fn remove(&self, key: &BindingKey) -> LocatorResult<()> {
        if let Ok(mut guard) = self.removals.lock() {
            guard.push(key.clone());
        }
        self.inner.remove(key)
    }
}
