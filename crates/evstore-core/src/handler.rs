//! Handler capability traits and bootstrap candidates.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::capability::HandlerCapability;
use crate::error::HandlerError;
use crate::event::{Event, EventType};

/// A type-erased handler object, as stored in the registry and locator.
pub type SharedHandler = Arc<dyn Any + Send + Sync>;

/// Constructor registered with a [`ServiceLocator`](crate::ServiceLocator)
/// for handlers bootstrapped from their type.
pub type HandlerFactory = Arc<dyn Fn() -> Result<SharedHandler, HandlerError> + Send + Sync>;

/// The ability to process events of type `E`.
///
/// Handlers are shared between threads once the store is ready, so `handle`
/// takes `&self`; use interior mutability for state.
pub trait Handles<E: Event>: Send + Sync + 'static {
    /// Process one event.
    ///
    /// # Errors
    ///
    /// Any error is reported to the caller of
    /// [`EventStore::dispatch`](crate::EventStore::dispatch).
    fn handle(&self, event: &E) -> Result<(), HandlerError>;
}

/// Declares which [`Handles`] implementations a handler exposes.
///
/// Usually implemented with the [`handles!`](crate::handles) macro.
pub trait EventHandler: Sized + Send + Sync + 'static {
    /// Record every event type this handler consumes.
    fn capabilities(set: &mut CapabilitySet<Self>);
}

/// Collects the capabilities declared by handler `H`.
pub struct CapabilitySet<H> {
    capabilities: Vec<HandlerCapability>,
    _handler: PhantomData<fn() -> H>,
}

impl<H: EventHandler> CapabilitySet<H> {
    fn new() -> Self {
        Self {
            capabilities: Vec::new(),
            _handler: PhantomData,
        }
    }

    /// Declare that `H` consumes events of type `E`.
    ///
    /// Declaring the same event type twice has no further effect.
    pub fn handles<E: Event>(&mut self) -> &mut Self
    where
        H: Handles<E>,
    {
        let event_type = EventType::of::<E>();
        if !self
            .capabilities
            .iter()
            .any(|c| c.event_type() == event_type)
        {
            self.capabilities.push(HandlerCapability::new::<H, E>());
        }
        self
    }

    /// Number of distinct event types declared so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Whether nothing has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

/// Collect the declared capabilities of `H`.
fn declared_capabilities<H: EventHandler>() -> Vec<HandlerCapability> {
    let mut set = CapabilitySet::<H>::new();
    H::capabilities(&mut set);
    set.capabilities
}

/// Identity of a concrete handler type.
#[derive(Clone, Copy)]
pub struct HandlerIdentity {
    id: TypeId,
    name: &'static str,
}

impl HandlerIdentity {
    /// The identity of handler type `H`.
    #[must_use]
    pub fn of<H: 'static>() -> Self {
        Self {
            id: TypeId::of::<H>(),
            name: std::any::type_name::<H>(),
        }
    }

    /// The handler's type id.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully-qualified type name of the handler.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for HandlerIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for HandlerIdentity {}

impl std::hash::Hash for HandlerIdentity {
    fn hash<S: std::hash::Hasher>(&self, state: &mut S) {
        self.id.hash(state);
    }
}

impl fmt::Debug for HandlerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandlerIdentity").field(&self.name).finish()
    }
}

impl fmt::Display for HandlerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A handler supplied by type; the store builds instances on demand.
#[derive(Clone)]
pub struct HandlerType {
    identity: HandlerIdentity,
    capabilities: fn() -> Vec<HandlerCapability>,
    factory: Option<HandlerFactory>,
}

impl HandlerType {
    /// Describe `H`, constructed with `H::default()`.
    #[must_use]
    pub fn of<H: EventHandler + Default>() -> Self {
        Self::with_factory::<H, _>(H::default)
    }

    /// Describe `H`, constructed with `factory`.
    pub fn with_factory<H, F>(factory: F) -> Self
    where
        H: EventHandler,
        F: Fn() -> H + Send + Sync + 'static,
    {
        Self::try_with_factory::<H, _>(move || Ok(factory()))
    }

    /// Describe `H`, constructed with a fallible `factory`.
    ///
    /// A construction error surfaces as a per-handler failure when the
    /// handler is resolved for dispatch.
    pub fn try_with_factory<H, F>(factory: F) -> Self
    where
        H: EventHandler,
        F: Fn() -> Result<H, HandlerError> + Send + Sync + 'static,
    {
        let factory: HandlerFactory = Arc::new(move || -> Result<SharedHandler, HandlerError> {
            let handler: SharedHandler = Arc::new(factory()?);
            Ok(handler)
        });
        Self {
            identity: HandlerIdentity::of::<H>(),
            capabilities: declared_capabilities::<H>,
            factory: Some(factory),
        }
    }

    /// Describe `H` without a way to construct it.
    ///
    /// Such a type is abstract: bootstrap skips it.
    #[must_use]
    pub fn abstract_of<H: EventHandler>() -> Self {
        Self {
            identity: HandlerIdentity::of::<H>(),
            capabilities: declared_capabilities::<H>,
            factory: None,
        }
    }

    /// The handler type's identity.
    #[must_use]
    pub fn identity(&self) -> HandlerIdentity {
        self.identity
    }

    /// Whether the type can be instantiated.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.factory.is_some()
    }

    /// The constructor, if the type is concrete.
    #[must_use]
    pub fn factory(&self) -> Option<&HandlerFactory> {
        self.factory.as_ref()
    }

    pub(crate) fn declared(&self) -> Vec<HandlerCapability> {
        (self.capabilities)()
    }
}

impl fmt::Debug for HandlerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerType")
            .field("identity", &self.identity)
            .field("concrete", &self.is_concrete())
            .finish()
    }
}

/// A pre-built handler; the store reuses it for every dispatch.
#[derive(Clone)]
pub struct HandlerInstance {
    identity: HandlerIdentity,
    capabilities: fn() -> Vec<HandlerCapability>,
    instance: SharedHandler,
}

impl HandlerInstance {
    /// Wrap an owned handler.
    pub fn new<H: EventHandler>(handler: H) -> Self {
        Self::from_arc(Arc::new(handler))
    }

    /// Wrap a handler the caller keeps a reference to.
    #[must_use]
    pub fn from_arc<H: EventHandler>(handler: Arc<H>) -> Self {
        let instance: SharedHandler = handler;
        Self {
            identity: HandlerIdentity::of::<H>(),
            capabilities: declared_capabilities::<H>,
            instance,
        }
    }

    /// The handler's identity.
    #[must_use]
    pub fn identity(&self) -> HandlerIdentity {
        self.identity
    }

    /// The retained instance.
    #[must_use]
    pub fn instance(&self) -> &SharedHandler {
        &self.instance
    }

    pub(crate) fn declared(&self) -> Vec<HandlerCapability> {
        (self.capabilities)()
    }
}

impl fmt::Debug for HandlerInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerInstance")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
