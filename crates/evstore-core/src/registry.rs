//! Type-indexed registry of handler capabilities.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::capability::{BindingKey, HandlerCapability};
use crate::error::{EventStoreError, EventStoreResult};
use crate::event::EventType;
use crate::handler::SharedHandler;

/// How a registered handler is obtained at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationMode {
    /// A fresh handler is resolved for every dispatch.
    Transient,
    /// One retained handler instance serves every dispatch.
    SharedInstance,
}

impl fmt::Display for RegistrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => f.write_str("transient"),
            Self::SharedInstance => f.write_str("shared instance"),
        }
    }
}

/// A capability together with its lifetime policy.
#[derive(Clone)]
pub struct Registration {
    capability: HandlerCapability,
    mode: RegistrationMode,
    instance: Option<SharedHandler>,
}

impl Registration {
    /// The registered capability.
    #[must_use]
    pub fn capability(&self) -> &HandlerCapability {
        &self.capability
    }

    /// The binding key of the capability.
    #[must_use]
    pub fn binding_key(&self) -> &BindingKey {
        self.capability.binding_key()
    }

    /// The lifetime policy.
    #[must_use]
    pub fn mode(&self) -> RegistrationMode {
        self.mode
    }

    /// The retained handler; present exactly for
    /// [`RegistrationMode::SharedInstance`].
    #[must_use]
    pub fn instance(&self) -> Option<&SharedHandler> {
        self.instance.as_ref()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("binding_key", self.binding_key())
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Outcome of [`HandlerRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registered {
    /// The binding was new and has been stored.
    Added,
    /// An identical binding was already present; nothing changed.
    AlreadyPresent,
}

/// Registry mapping each event type to its handlers, in registration order.
///
/// A binding key appears at most once. Re-registering a key with the same
/// mode is a no-op; with a different mode it is rejected.
#[derive(Default)]
pub struct HandlerRegistry {
    by_event: HashMap<EventType, Vec<Registration>>,
    modes: HashMap<BindingKey, RegistrationMode>,
    event_order: Vec<EventType>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("event_types", &self.event_order.len())
            .field("bindings", &self.modes.len())
            .finish()
    }
}

impl HandlerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability.
    ///
    /// `instance` must be `Some` for [`RegistrationMode::SharedInstance`] and
    /// `None` for [`RegistrationMode::Transient`].
    ///
    /// # Errors
    ///
    /// - [`EventStoreError::InvalidRegistration`] if `instance` does not match `mode`.
    /// - [`EventStoreError::DuplicateBinding`] if the key is already registered
    ///   with a different mode.
    pub fn register(
        &mut self,
        capability: HandlerCapability,
        mode: RegistrationMode,
        instance: Option<SharedHandler>,
    ) -> EventStoreResult<Registered> {
        let key = capability.binding_key();

        match (mode, instance.is_some()) {
            (RegistrationMode::Transient, true) => {
                return Err(EventStoreError::InvalidRegistration {
                    key: key.clone(),
                    reason: "transient registrations cannot carry an instance".to_string(),
                });
            },
            (RegistrationMode::SharedInstance, false) => {
                return Err(EventStoreError::InvalidRegistration {
                    key: key.clone(),
                    reason: "shared instance registrations require an instance".to_string(),
                });
            },
            _ => {},
        }

        if let Some(&existing) = self.modes.get(key) {
            if existing != mode {
                return Err(EventStoreError::DuplicateBinding {
                    key: key.clone(),
                    existing,
                    requested: mode,
                });
            }
            debug!(binding_key = %key, "Binding already registered");
            return Ok(Registered::AlreadyPresent);
        }

        let event_type = capability.event_type();
        debug!(
            binding_key = %key,
            event_type = %event_type,
            mode = %mode,
            "Binding registered"
        );

        self.modes.insert(key.clone(), mode);
        let entries = self.by_event.entry(event_type).or_insert_with(|| {
            self.event_order.push(event_type);
            Vec::new()
        });
        entries.push(Registration {
            capability,
            mode,
            instance,
        });

        Ok(Registered::Added)
    }

    /// Handlers registered for `event_type`, in registration order.
    ///
    /// Unknown event types yield an empty slice.
    #[must_use]
    pub fn lookup(&self, event_type: EventType) -> &[Registration] {
        self.by_event
            .get(&event_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every event type with at least one handler, in first-registration order.
    #[must_use]
    pub fn event_types(&self) -> Vec<EventType> {
        self.event_order.clone()
    }

    /// Find a registration by binding key.
    #[must_use]
    pub fn get(&self, key: &BindingKey) -> Option<&Registration> {
        self.iter().find(|r| r.binding_key() == key)
    }

    /// Whether a binding key is registered.
    #[must_use]
    pub fn contains(&self, key: &BindingKey) -> bool {
        self.modes.contains_key(key)
    }

    /// All registrations, grouped by event type in first-registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.event_order
            .iter()
            .flat_map(move |ty| self.lookup(*ty).iter())
    }

    /// Number of registered bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modes.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::handler::Handles;
    use std::sync::Arc;

    struct Deposited;
    struct Withdrawn;

    struct Audit;
    struct Balance;

    impl Handles<Deposited> for Audit {
        fn handle(&self, _event: &Deposited) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    impl Handles<Withdrawn> for Audit {
        fn handle(&self, _event: &Withdrawn) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    impl Handles<Deposited> for Balance {
        fn handle(&self, _event: &Deposited) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    fn shared(handler: impl std::any::Any + Send + Sync) -> Option<SharedHandler> {
        Some(Arc::new(handler))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.is_empty());

        let outcome = registry
            .register(
                HandlerCapability::new::<Audit, Deposited>(),
                RegistrationMode::Transient,
                None,
            )
            .unwrap();
        assert_eq!(outcome, Registered::Added);

        let found = registry.lookup(EventType::of::<Deposited>());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].mode(), RegistrationMode::Transient);
        assert!(found[0].instance().is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_preserves_registration_order() {
        let mut registry = HandlerRegistry::new();
        let balance = HandlerCapability::new::<Balance, Deposited>();
        let audit = HandlerCapability::new::<Audit, Deposited>();
        let expected = vec![balance.binding_key().clone(), audit.binding_key().clone()];

        registry
            .register(balance, RegistrationMode::Transient, None)
            .unwrap();
        registry
            .register(audit, RegistrationMode::Transient, None)
            .unwrap();

        let keys: Vec<_> = registry
            .lookup(EventType::of::<Deposited>())
            .iter()
            .map(|r| r.binding_key().clone())
            .collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_reregistration_is_idempotent() {
        let mut registry = HandlerRegistry::new();
        for _ in 0..3 {
            registry
                .register(
                    HandlerCapability::new::<Audit, Deposited>(),
                    RegistrationMode::Transient,
                    None,
                )
                .unwrap();
        }

        let outcome = registry
            .register(
                HandlerCapability::new::<Audit, Deposited>(),
                RegistrationMode::Transient,
                None,
            )
            .unwrap();
        assert_eq!(outcome, Registered::AlreadyPresent);
        assert_eq!(registry.lookup(EventType::of::<Deposited>()).len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_conflicting_mode_is_rejected() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(
                HandlerCapability::new::<Audit, Deposited>(),
                RegistrationMode::Transient,
                None,
            )
            .unwrap();

        let err = registry
            .register(
                HandlerCapability::new::<Audit, Deposited>(),
                RegistrationMode::SharedInstance,
                shared(Audit),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            EventStoreError::DuplicateBinding {
                existing: RegistrationMode::Transient,
                requested: RegistrationMode::SharedInstance,
                ..
            }
        ));
        let found = registry.lookup(EventType::of::<Deposited>());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].mode(), RegistrationMode::Transient);
    }

    #[test]
    fn test_instance_must_match_mode() {
        let mut registry = HandlerRegistry::new();

        let err = registry
            .register(
                HandlerCapability::new::<Audit, Deposited>(),
                RegistrationMode::SharedInstance,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidRegistration { .. }));

        let err = registry
            .register(
                HandlerCapability::new::<Audit, Deposited>(),
                RegistrationMode::Transient,
                shared(Audit),
            )
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidRegistration { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_event_type_is_empty() {
        let registry = HandlerRegistry::new();
        assert!(registry.lookup(EventType::of::<Withdrawn>()).is_empty());
    }

    #[test]
    fn test_event_types_and_iteration() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(
                HandlerCapability::new::<Audit, Withdrawn>(),
                RegistrationMode::SharedInstance,
                shared(Audit),
            )
            .unwrap();
        registry
            .register(
                HandlerCapability::new::<Audit, Deposited>(),
                RegistrationMode::SharedInstance,
                shared(Audit),
            )
            .unwrap();

        assert_eq!(
            registry.event_types(),
            vec![EventType::of::<Withdrawn>(), EventType::of::<Deposited>()]
        );
        assert_eq!(registry.iter().count(), 2);

        let key = HandlerCapability::new::<Audit, Deposited>()
            .binding_key()
            .clone();
        assert!(registry.contains(&key));
        assert_eq!(
            registry.get(&key).map(Registration::mode),
            Some(RegistrationMode::SharedInstance)
        );
    }
}
