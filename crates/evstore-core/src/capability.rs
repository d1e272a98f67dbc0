//! Handler capabilities and their binding keys.

use std::any::{Any, type_name};
use std::fmt;

use crate::error::InvocationCause;
use crate::event::{Event, EventType};
use crate::handler::{HandlerIdentity, Handles};

/// Calls `Handles<E>::handle` on type-erased handler and event values.
type Invoker = fn(&(dyn Any + Send + Sync), &dyn Any) -> Result<(), InvocationCause>;

/// Deterministic registry key for a (handler, event type) pair.
///
/// Formatted as `handler::Type<event::Type>`; for capabilities with several
/// event arguments they are joined with `", "`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingKey(String);

impl BindingKey {
    /// Build the key for `handler` bound to `event_types`.
    #[must_use]
    pub fn new(handler: &HandlerIdentity, event_types: &[EventType]) -> Self {
        let arguments = event_types
            .iter()
            .map(EventType::name)
            .collect::<Vec<_>>()
            .join(", ");
        Self(format!("{}<{arguments}>", handler.name()))
    }

    /// Build the key for `handler` bound to a single event type.
    #[must_use]
    pub fn for_pair(handler: &HandlerIdentity, event_type: EventType) -> Self {
        Self::new(handler, &[event_type])
    }

    /// The key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BindingKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One handler bound to one event type it can process.
#[derive(Clone)]
pub struct HandlerCapability {
    handler: HandlerIdentity,
    event_type: EventType,
    binding_key: BindingKey,
    invoker: Invoker,
}

impl HandlerCapability {
    pub(crate) fn new<H, E>() -> Self
    where
        H: Handles<E>,
        E: Event,
    {
        let handler = HandlerIdentity::of::<H>();
        let event_type = EventType::of::<E>();
        Self {
            binding_key: BindingKey::for_pair(&handler, event_type),
            handler,
            event_type,
            invoker: invoke::<H, E>,
        }
    }

    /// The handler this capability belongs to.
    #[must_use]
    pub fn handler(&self) -> HandlerIdentity {
        self.handler
    }

    /// The event type the handler consumes.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// The registry key of this binding.
    #[must_use]
    pub fn binding_key(&self) -> &BindingKey {
        &self.binding_key
    }

    pub(crate) fn invoke(
        &self,
        handler: &(dyn Any + Send + Sync),
        event: &dyn Any,
    ) -> Result<(), InvocationCause> {
        (self.invoker)(handler, event)
    }
}

impl fmt::Debug for HandlerCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerCapability")
            .field("handler", &self.handler)
            .field("event_type", &self.event_type)
            .field("binding_key", &self.binding_key)
            .finish_non_exhaustive()
    }
}

fn invoke<H, E>(handler: &(dyn Any + Send + Sync), event: &dyn Any) -> Result<(), InvocationCause>
where
    H: Handles<E>,
    E: Event,
{
    let Some(handler) = handler.downcast_ref::<H>() else {
        return Err(InvocationCause::HandlerTypeMismatch {
            expected: type_name::<H>(),
        });
    };
    let Some(event) = event.downcast_ref::<E>() else {
        return Err(InvocationCause::EventTypeMismatch {
            expected: type_name::<E>(),
        });
    };
    handler.handle(event).map_err(InvocationCause::Handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tick;
    struct Tock;

    #[derive(Default)]
    struct Clock {
        ticks: AtomicUsize,
    }

    impl Handles<Tick> for Clock {
        fn handle(&self, _event: &Tick) -> Result<(), HandlerError> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_binding_key_format() {
        let key = BindingKey::for_pair(&HandlerIdentity::of::<Clock>(), EventType::of::<Tick>());
        assert_eq!(
            key.as_str(),
            format!("{}<{}>", type_name::<Clock>(), type_name::<Tick>())
        );
    }

    #[test]
    fn test_binding_key_joins_arguments() {
        let key = BindingKey::new(
            &HandlerIdentity::of::<Clock>(),
            &[EventType::of::<Tick>(), EventType::of::<Tock>()],
        );
        assert!(key.as_str().ends_with(&format!(
            "<{}, {}>",
            type_name::<Tick>(),
            type_name::<Tock>()
        )));
    }

    #[test]
    fn test_binding_key_is_deterministic() {
        let a = HandlerCapability::new::<Clock, Tick>();
        let b = HandlerCapability::new::<Clock, Tick>();
        assert_eq!(a.binding_key(), b.binding_key());
    }

    #[test]
    fn test_invoke_downcasts_and_calls() {
        let capability = HandlerCapability::new::<Clock, Tick>();
        let clock = Clock::default();

        capability.invoke(&clock, &Tick).unwrap();
        assert_eq!(clock.ticks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invoke_rejects_wrong_event() {
        let capability = HandlerCapability::new::<Clock, Tick>();
        let clock = Clock::default();

        let err = capability.invoke(&clock, &Tock).unwrap_err();
        assert!(matches!(err, InvocationCause::EventTypeMismatch { .. }));
        assert_eq!(clock.ticks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invoke_rejects_wrong_handler() {
        let capability = HandlerCapability::new::<Clock, Tick>();
        let err = capability.invoke(&Tock, &Tick).unwrap_err();
        assert!(matches!(err, InvocationCause::HandlerTypeMismatch { .. }));
    }
}
