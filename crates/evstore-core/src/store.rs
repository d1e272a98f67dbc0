//! The event store: one-shot bootstrap, then type-routed dispatch.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{debug, info, trace, warn};

use crate::capability::BindingKey;
use crate::error::{EventStoreError, EventStoreResult, HandlerInvocationFailure, InvocationCause};
use crate::event::{Event, EventType, is_wrapper, unwrap_event};
use crate::handler::{HandlerFactory, HandlerInstance, HandlerType, SharedHandler};
use crate::locator::{InMemoryLocator, ServiceLocator};
use crate::options::{DispatchOptions, FailurePolicy};
use crate::registry::{HandlerRegistry, Registered, Registration, RegistrationMode};
use crate::report::DispatchReport;
use crate::scanner;

static GLOBAL_STORE: OnceLock<EventStore> = OnceLock::new();

/// Lifecycle of an [`EventStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StoreState {
    /// No successful bootstrap yet.
    Uninitialized = 0,
    /// A bootstrap is in progress.
    Initializing = 1,
    /// The registry is published; dispatch is available.
    Ready = 2,
}

impl StoreState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Initializing,
            2 => Self::Ready,
            _ => Self::Uninitialized,
        }
    }
}

impl fmt::Display for StoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::Initializing => f.write_str("initializing"),
            Self::Ready => f.write_str("ready"),
        }
    }
}

/// The full bootstrap candidate set: all handler types or all instances.
#[derive(Debug, Clone)]
pub enum Candidates {
    /// Handler types, registered as [`RegistrationMode::Transient`].
    Types(Vec<HandlerType>),
    /// Handler instances, registered as [`RegistrationMode::SharedInstance`].
    Instances(Vec<HandlerInstance>),
}

impl Candidates {
    /// Number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Types(types) => types.len(),
            Self::Instances(instances) => instances.len(),
        }
    }

    /// Whether there are no candidates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The registration mode these candidates produce.
    #[must_use]
    pub fn mode(&self) -> RegistrationMode {
        match self {
            Self::Types(_) => RegistrationMode::Transient,
            Self::Instances(_) => RegistrationMode::SharedInstance,
        }
    }
}

impl From<Vec<HandlerType>> for Candidates {
    fn from(types: Vec<HandlerType>) -> Self {
        Self::Types(types)
    }
}

impl From<Vec<HandlerInstance>> for Candidates {
    fn from(instances: Vec<HandlerInstance>) -> Self {
        Self::Instances(instances)
    }
}

/// A locator registration staged during bootstrap.
enum LocatorInstall {
    Type {
        key: BindingKey,
        factory: HandlerFactory,
    },
    Instance {
        key: BindingKey,
        instance: SharedHandler,
    },
}

impl LocatorInstall {
    fn key(&self) -> &BindingKey {
        match self {
            Self::Type { key, .. } | Self::Instance { key, .. } => key,
        }
    }
}

/// Routes events to the handlers registered for their type.
///
/// The store is initialized exactly once. Until then every dispatch fails
/// with [`EventStoreError::NotInitialized`]; afterwards the registry is
/// immutable and dispatch can run on any number of threads.
pub struct EventStore {
    locator: Arc<dyn ServiceLocator>,
    options: DispatchOptions,
    state: AtomicU8,
    registry: OnceLock<HandlerRegistry>,
}

impl EventStore {
    /// Create an uninitialized store over `locator` with default options.
    #[must_use]
    pub fn new(locator: Arc<dyn ServiceLocator>) -> Self {
        Self::with_options(locator, DispatchOptions::default())
    }

    /// Create an uninitialized store over `locator`.
    #[must_use]
    pub fn with_options(locator: Arc<dyn ServiceLocator>, options: DispatchOptions) -> Self {
        Self {
            locator,
            options,
            state: AtomicU8::new(StoreState::Uninitialized as u8),
            registry: OnceLock::new(),
        }
    }

    /// Create an uninitialized store over a fresh [`InMemoryLocator`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryLocator::new()))
    }

    /// The process-wide store.
    ///
    /// Created on first access over an [`InMemoryLocator`] with default
    /// options unless [`EventStoreInstaller::install_global`](crate::EventStoreInstaller::install_global)
    /// created it first. The host still has to initialize it.
    #[must_use]
    pub fn global() -> &'static EventStore {
        Self::global_with(DispatchOptions::default())
    }

    /// The process-wide store, created with `options` if nobody has touched
    /// it yet. An existing global store keeps its own options.
    #[must_use]
    pub(crate) fn global_with(options: DispatchOptions) -> &'static EventStore {
        GLOBAL_STORE.get_or_init(|| {
            debug!(?options, "Creating global event store");
            Self::with_options(Arc::new(InMemoryLocator::new()), options)
        })
    }

    /// Register every capability exposed by `candidates`.
    ///
    /// Handler types register as transient bindings resolved through the
    /// locator on each dispatch. Instances register as shared bindings and
    /// are reused; when two instances of the same handler type are supplied,
    /// the first one is kept.
    ///
    /// Abstract handler types are skipped. Bootstrap is all or nothing: on
    /// error the store returns to [`StoreState::Uninitialized`] and may be
    /// initialized again.
    ///
    /// # Errors
    ///
    /// - [`EventStoreError::AlreadyInitialized`] if another call is in
    ///   progress or has succeeded.
    /// - [`EventStoreError::InvalidBootstrapInput`] if `candidates` is empty.
    /// - [`EventStoreError::DuplicateBinding`] or
    ///   [`EventStoreError::InvalidRegistration`] on a conflicting binding.
    /// - [`EventStoreError::Locator`] if the locator refuses a registration.
    pub fn initialize(&self, candidates: impl Into<Candidates>) -> EventStoreResult<()> {
        let candidates = candidates.into();

        if self
            .state
            .compare_exchange(
                StoreState::Uninitialized as u8,
                StoreState::Initializing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            debug!(state = %self.state(), "Rejected repeated initialization");
            return Err(EventStoreError::AlreadyInitialized);
        }

        let registry = match self.bootstrap(&candidates) {
            Ok(registry) => registry,
            Err(e) => {
                warn!(error = %e, "Event store bootstrap failed");
                self.state
                    .store(StoreState::Uninitialized as u8, Ordering::Release);
                return Err(e);
            },
        };

        let bindings = registry.len();
        let event_types = registry.event_types().len();

        if self.registry.set(registry).is_err() {
            // Only reachable if a registry was published earlier, which
            // also means the store is already ready.
            self.state.store(StoreState::Ready as u8, Ordering::Release);
            return Err(EventStoreError::AlreadyInitialized);
        }
        self.state.store(StoreState::Ready as u8, Ordering::Release);

        info!(
            candidates = candidates.len(),
            bindings,
            event_types,
            mode = %candidates.mode(),
            "Event store initialized"
        );
        Ok(())
    }

    fn bootstrap(&self, candidates: &Candidates) -> EventStoreResult<HandlerRegistry> {
        if candidates.is_empty() {
            return Err(EventStoreError::InvalidBootstrapInput {
                reason: "no handler candidates supplied".to_string(),
            });
        }

        let mut registry = HandlerRegistry::new();
        let mut installs = Vec::new();

        match candidates {
            Candidates::Types(types) => {
                for handler_type in types {
                    let Some(factory) = handler_type.factory() else {
                        debug!(handler = %handler_type.identity(), "Skipping abstract handler type");
                        continue;
                    };
                    for capability in scanner::scan(handler_type) {
                        let key = capability.binding_key().clone();
                        let outcome =
                            registry.register(capability, RegistrationMode::Transient, None)?;
                        if outcome == Registered::Added {
                            installs.push(LocatorInstall::Type {
                                key,
                                factory: Arc::clone(factory),
                            });
                        }
                    }
                }
            },
            Candidates::Instances(instances) => {
                for instance in instances {
                    for capability in scanner::scan(instance) {
                        let key = capability.binding_key().clone();
                        let outcome = registry.register(
                            capability,
                            RegistrationMode::SharedInstance,
                            Some(Arc::clone(instance.instance())),
                        )?;
                        if outcome == Registered::Added {
                            installs.push(LocatorInstall::Instance {
                                key,
                                instance: Arc::clone(instance.instance()),
                            });
                        }
                    }
                }
            },
        }

        self.install_bindings(installs)?;
        Ok(registry)
    }

    /// Install staged bindings into the locator.
    ///
    /// On failure every key this call added is removed again, so a retried
    /// bootstrap never resolves through a factory from the failed attempt.
    /// Keys the locator already held are left alone.
    fn install_bindings(&self, installs: Vec<LocatorInstall>) -> EventStoreResult<()> {
        let mut installed = Vec::with_capacity(installs.len());

        for install in installs {
            let key = install.key().clone();
            let fresh = !self.locator.contains(&key);
            let outcome = match install {
                LocatorInstall::Type { key, factory } => {
                    self.locator
                        .register_type(key, factory, RegistrationMode::Transient)
                },
                LocatorInstall::Instance { key, instance } => {
                    self.locator.register_instance(key, instance)
                },
            };

            if let Err(e) = outcome {
                warn!(binding_key = %key, error = %e, "Locator refused binding");
                self.roll_back(&installed);
                return Err(e.into());
            }
            if fresh {
                installed.push(key);
            }
        }

        Ok(())
    }

    fn roll_back(&self, keys: &[BindingKey]) {
        for key in keys.iter().rev() {
            if let Err(e) = self.locator.remove(key) {
                warn!(binding_key = %key, error = %e, "Failed to roll back locator binding");
            }
        }
        debug!(count = keys.len(), "Rolled back locator bindings");
    }

    /// Deliver `event` to every handler registered for its type, in
    /// registration order.
    ///
    /// An event type nobody handles is not an error; the report is empty.
    ///
    /// # Errors
    ///
    /// - [`EventStoreError::NotInitialized`] before a successful
    ///   [`initialize`](Self::initialize).
    /// - [`EventStoreError::HandlerFailures`] if any handler failed. The
    ///   carried report lists every failure and, under
    ///   [`FailurePolicy::StopOnFirst`], how many handlers were skipped.
    pub fn dispatch<E: Event>(&self, event: &E) -> EventStoreResult<DispatchReport> {
        self.dispatch_dyn(event)
    }

    /// Deliver a type-erased event.
    ///
    /// The event is routed by its concrete type. A `Box<dyn Event>` or
    /// `Arc<dyn Event>` is routed by the event it holds. Other wrappers, such
    /// as `Box<MyEvent>`, are routed by the wrapper type and should be
    /// dereferenced first.
    ///
    /// # Errors
    ///
    /// Same as [`dispatch`](Self::dispatch).
    pub fn dispatch_dyn(&self, event: &dyn Event) -> EventStoreResult<DispatchReport> {
        let registry = self.ready_registry()?;
        let event = unwrap_event(event);
        let event_type = event.event_type();
        let registrations = registry.lookup(event_type);
        let mut report = DispatchReport::new(event_type);

        if registrations.is_empty() {
            if is_wrapper(event_type) {
                debug!(
                    event_type = %event_type,
                    "Event is a smart pointer with no handlers; dereference it before dispatch"
                );
            } else {
                trace!(event_type = %event_type, "No handlers registered for event");
            }
            return Ok(report);
        }

        for (index, registration) in registrations.iter().enumerate() {
            trace!(
                event_type = %event_type,
                binding_key = %registration.binding_key(),
                "Invoking handler"
            );

            let Err(cause) = self.invoke(registration, event.as_any()) else {
                report.succeeded = report.succeeded.saturating_add(1);
                continue;
            };

            let handler = registration.capability().handler();
            warn!(
                handler = %handler,
                event_type = %event_type,
                error = %cause,
                "Handler failed"
            );
            report.failures.push(HandlerInvocationFailure {
                handler,
                binding_key: registration.binding_key().clone(),
                cause,
            });

            if self.options.failure_policy == FailurePolicy::StopOnFirst {
                report.skipped = registrations.len().saturating_sub(index.saturating_add(1));
                break;
            }
        }

        if report.failures.is_empty() {
            Ok(report)
        } else {
            Err(EventStoreError::HandlerFailures { event_type, report })
        }
    }

    fn invoke(&self, registration: &Registration, event: &dyn Any) -> Result<(), InvocationCause> {
        let run = || -> Result<(), InvocationCause> {
            let handler = match registration.instance() {
                Some(instance) => Arc::clone(instance),
                None => self
                    .locator
                    .resolve(registration.binding_key())
                    .map_err(InvocationCause::Resolve)?,
            };
            registration.capability().invoke(&*handler, event)
        };

        if !self.options.catch_panics {
            return run();
        }

        match panic::catch_unwind(AssertUnwindSafe(run)) {
            Ok(result) => result,
            Err(payload) => Err(InvocationCause::Panicked {
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    fn ready_registry(&self) -> EventStoreResult<&HandlerRegistry> {
        if self.state() != StoreState::Ready {
            return Err(EventStoreError::NotInitialized);
        }
        self.registry.get().ok_or(EventStoreError::NotInitialized)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> StoreState {
        StoreState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether dispatch is available.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == StoreState::Ready
    }

    /// Binding keys registered for event type `E`, in dispatch order.
    ///
    /// Empty until the store is ready.
    #[must_use]
    pub fn handlers_for<E: Event>(&self) -> Vec<BindingKey> {
        self.ready_registry()
            .map(|registry| {
                registry
                    .lookup(EventType::of::<E>())
                    .iter()
                    .map(|r| r.binding_key().clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Event types with at least one handler. Empty until the store is ready.
    #[must_use]
    pub fn event_types(&self) -> Vec<EventType> {
        self.ready_registry()
            .map(HandlerRegistry::event_types)
            .unwrap_or_default()
    }

    /// The published registry, once the store is ready.
    #[must_use]
    pub fn registry(&self) -> Option<&HandlerRegistry> {
        self.ready_registry().ok()
    }

    /// Dispatch options fixed at construction.
    #[must_use]
    pub fn options(&self) -> DispatchOptions {
        self.options
    }

    /// The service locator backing transient bindings.
    #[must_use]
    pub fn locator(&self) -> &Arc<dyn ServiceLocator> {
        &self.locator
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl fmt::Debug for EventStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStore")
            .field("state", &self.state())
            .field("options", &self.options)
            .field("registry", &self.registry.get())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
