//! Shared helpers for integration tests.

use std::sync::Arc;

use evstore_core::{
    BindingKey, DispatchOptions, EventStore, EventType, HandlerIdentity, HandlerType,
    ServiceLocator,
};
use evstore_test::RecordingLocator;

/// A store bootstrapped from handler types, plus the locator behind it.
#[allow(dead_code)]
pub struct TypedStore {
    /// The ready store.
    pub store: EventStore,
    /// The recording locator the store resolves through.
    pub locator: Arc<RecordingLocator>,
}

/// Build and initialize a store from `types` over a fresh recording locator.
#[allow(dead_code)]
pub fn typed_store(types: Vec<HandlerType>, options: DispatchOptions) -> TypedStore {
    typed_store_with(RecordingLocator::new(), types, options)
}

/// Build and initialize a store from `types` over `locator`.
#[allow(dead_code)]
pub fn typed_store_with(
    locator: RecordingLocator,
    types: Vec<HandlerType>,
    options: DispatchOptions,
) -> TypedStore {
    let locator = Arc::new(locator);
    let shared: Arc<dyn ServiceLocator> = Arc::clone(&locator) as Arc<dyn ServiceLocator>;
    let store = EventStore::with_options(shared, options);
    store.initialize(types).expect("bootstrap should succeed");
    TypedStore { store, locator }
}

/// Binding key of handler `H` for event `E`.
#[allow(dead_code)]
pub fn key<H: 'static, E: evstore_core::Event>() -> BindingKey {
    BindingKey::for_pair(&HandlerIdentity::of::<H>(), EventType::of::<E>())
}
