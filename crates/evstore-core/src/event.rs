//! Event identity.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Anything that can be dispatched through the event store.
///
/// Implemented for every `'static + Send + Sync` type, so event structs need
/// no extra declaration.
pub trait Event: Any + Send + Sync {
    /// The event type of this value.
    fn event_type(&self) -> EventType;

    /// Borrow the event as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync> Event for T {
    fn event_type(&self) -> EventType {
        EventType::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Look through `Box<dyn Event>` and `Arc<dyn Event>` to the event inside.
///
/// Both wrappers are events themselves, so without this a boxed event would
/// be routed by the wrapper type.
pub(crate) fn unwrap_event(mut event: &dyn Event) -> &dyn Event {
    loop {
        let any = event.as_any();
        if let Some(boxed) = any.downcast_ref::<Box<dyn Event>>() {
            event = &**boxed;
        } else if let Some(shared) = any.downcast_ref::<Arc<dyn Event>>() {
            event = &**shared;
        } else {
            return event;
        }
    }
}

/// Whether `event_type` names a smart pointer around the real event.
pub(crate) fn is_wrapper(event_type: EventType) -> bool {
    ["alloc::boxed::Box<", "alloc::sync::Arc<"]
        .iter()
        .any(|prefix| event_type.name().starts_with(prefix))
}

/// Stable identity of an event shape.
///
/// Equality and hashing use the [`TypeId`]; the type name is carried for
/// logs and binding keys.
#[derive(Clone, Copy)]
pub struct EventType {
    id: TypeId,
    name: &'static str,
}

impl EventType {
    /// The event type of `E`.
    #[must_use]
    pub fn of<E: Event>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: std::any::type_name::<E>(),
        }
    }

    /// The underlying type id.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully-qualified type name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventType {}

impl Hash for EventType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventType").field(&self.name).finish()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
