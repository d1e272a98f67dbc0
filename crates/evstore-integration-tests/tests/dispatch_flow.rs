//! Integration tests for routing events to registered handlers.

mod common;

use std::sync::Arc;

use evstore_core::{
    DispatchOptions, Event, EventStoreError, EventStoreInstaller, FailurePolicy, HandlerInstance,
    InvocationCause,
};
use evstore_test::{
    FailingHandler, Journal, OrderCreated, OrderCreatedHandler, OrderLifecycleHandler,
    OrderShipped, PanickingHandler, PaymentHandler, PaymentReceived, RecordingLocator,
    init_test_tracing,
};

use common::{key, typed_store, typed_store_with};

#[test]
fn test_transient_handler_is_resolved_per_dispatch() {
    init_test_tracing();
    let journal = Journal::new();
    let harness = typed_store(
        vec![OrderCreatedHandler::handler_type(&journal)],
        DispatchOptions::default(),
    );

    harness.store.dispatch(&OrderCreated::new(1)).unwrap();
    harness.store.dispatch(&OrderCreated::new(2)).unwrap();

    assert_eq!(journal.constructions(), 2);
    assert_eq!(
        harness
            .locator
            .resolve_count(&key::<OrderCreatedHandler, OrderCreated>()),
        2
    );
    assert_eq!(journal.handlers(), vec!["order_created", "order_created"]);
}

#[test]
fn test_shared_instance_handles_every_dispatch() {
    let journal = Journal::new();
    let handler = Arc::new(OrderCreatedHandler::new(&journal));
    let store = EventStoreInstaller::from_handlers(vec![HandlerInstance::from_arc(Arc::clone(
        &handler,
    ))])
    .unwrap()
    .install_in_memory()
    .unwrap();

    for order_id in 0..3 {
        store.dispatch(&OrderCreated::new(order_id)).unwrap();
    }

    let expected = std::ptr::from_ref(handler.as_ref()).addr();
    let deliveries = journal.deliveries();
    assert_eq!(deliveries.len(), 3);
    assert!(deliveries.iter().all(|d| d.instance_addr == expected));
    assert_eq!(journal.constructions(), 0);
}

#[test]
fn test_handler_sees_the_dispatched_value() {
    let journal = Journal::new();
    let harness = typed_store(
        vec![OrderCreatedHandler::handler_type(&journal)],
        DispatchOptions::default(),
    );

    let event = OrderCreated::new(42);
    harness.store.dispatch(&event).unwrap();

    let deliveries = journal.deliveries();
    assert_eq!(deliveries[0].event_addr, std::ptr::from_ref(&event).addr());
    assert_eq!(deliveries[0].event, "OrderCreated { order_id: 42 }");
}

#[test]
fn test_multi_capability_handler_receives_each_event_type() {
    let journal = Journal::new();
    let harness = typed_store(
        vec![OrderLifecycleHandler::handler_type(&journal)],
        DispatchOptions::default(),
    );

    harness.store.dispatch(&OrderCreated::new(5)).unwrap();
    harness
        .store
        .dispatch(&OrderShipped::new(5, "ACME Freight"))
        .unwrap();

    let events: Vec<String> = journal.deliveries().into_iter().map(|d| d.event).collect();
    assert_eq!(events.len(), 2);
    assert!(events[0].starts_with("OrderCreated"));
    assert!(events[1].contains("ACME Freight"));
    assert_eq!(harness.store.event_types().len(), 2);
}

#[test]
fn test_event_routed_only_to_its_handlers() {
    let journal = Journal::new();
    let harness = typed_store(
        vec![
            OrderCreatedHandler::handler_type(&journal),
            PaymentHandler::handler_type(&journal),
        ],
        DispatchOptions::default(),
    );

    let report = harness
        .store
        .dispatch(&PaymentReceived::new(9, 1_500))
        .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(journal.handlers(), vec!["payment"]);
}

#[test]
fn test_unhandled_event_type_is_not_an_error() {
    let journal = Journal::new();
    let harness = typed_store(
        vec![OrderCreatedHandler::handler_type(&journal)],
        DispatchOptions::default(),
    );

    let report = harness
        .store
        .dispatch(&OrderShipped::new(1, "Post"))
        .unwrap();

    assert_eq!(report.invoked(), 0);
    assert!(report.is_clean());
    assert!(journal.is_empty());
    assert_eq!(harness.locator.total_resolves(), 0);
}

#[test]
fn test_continue_policy_runs_every_handler_in_order() {
    let journal = Journal::new();
    let harness = typed_store(
        vec![
            OrderCreatedHandler::handler_type(&journal),
            FailingHandler::handler_type(&journal),
            OrderLifecycleHandler::handler_type(&journal),
        ],
        DispatchOptions::default(),
    );

    let err = harness.store.dispatch(&OrderCreated::new(3)).unwrap_err();

    assert_eq!(journal.handlers(), vec!["order_created", "failing", "lifecycle"]);
    let EventStoreError::HandlerFailures { report, .. } = &err else {
        panic!("expected handler failures, got {err:?}");
    };
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(err.failures().len(), 1);
    assert_eq!(
        err.failures()[0].binding_key,
        key::<FailingHandler, OrderCreated>()
    );
    assert!(err.to_string().contains("1 of 3 handler(s) failed"));
}

#[test]
fn test_stop_on_first_policy_skips_the_rest() {
    let journal = Journal::new();
    let harness = typed_store(
        vec![
            FailingHandler::handler_type(&journal),
            OrderCreatedHandler::handler_type(&journal),
            OrderLifecycleHandler::handler_type(&journal),
        ],
        DispatchOptions::default().with_failure_policy(FailurePolicy::StopOnFirst),
    );

    let err = harness.store.dispatch(&OrderCreated::new(4)).unwrap_err();

    assert_eq!(journal.handlers(), vec!["failing"]);
    let EventStoreError::HandlerFailures { report, .. } = err else {
        panic!("expected handler failures");
    };
    assert_eq!(report.succeeded, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.skipped, 2);
}

#[test]
fn test_panicking_handler_is_reported() {
    let journal = Journal::new();
    let harness = typed_store(
        vec![
            PanickingHandler::handler_type(&journal),
            OrderCreatedHandler::handler_type(&journal),
        ],
        DispatchOptions::default(),
    );

    let err = harness.store.dispatch(&OrderCreated::new(13)).unwrap_err();

    match &err.failures()[0].cause {
        InvocationCause::Panicked { message } => {
            assert_eq!(message, "order 13 blew up");
        },
        other => panic!("expected a panic failure, got {other:?}"),
    }
    assert_eq!(journal.handlers(), vec!["panicking", "order_created"]);
}

#[test]
fn test_resolve_failure_is_reported_per_handler() {
    let journal = Journal::new();
    let locator =
        RecordingLocator::new().with_failing_key(key::<OrderCreatedHandler, OrderCreated>());
    let harness = typed_store_with(
        locator,
        vec![
            OrderCreatedHandler::handler_type(&journal),
            OrderLifecycleHandler::handler_type(&journal),
        ],
        DispatchOptions::default(),
    );

    let err = harness.store.dispatch(&OrderCreated::new(8)).unwrap_err();

    assert_eq!(err.failures().len(), 1);
    assert!(matches!(
        err.failures()[0].cause,
        InvocationCause::Resolve(_)
    ));
    assert_eq!(journal.handlers(), vec!["lifecycle"]);
}

#[test]
fn test_dispatch_dyn_routes_boxed_events() {
    let journal = Journal::new();
    let harness = typed_store(
        vec![
            OrderCreatedHandler::handler_type(&journal),
            PaymentHandler::handler_type(&journal),
        ],
        DispatchOptions::default(),
    );

    let events: Vec<Box<dyn Event>> = vec![
        Box::new(PaymentReceived::new(1, 250)),
        Box::new(OrderCreated::new(1)),
    ];
    for event in &events {
        harness.store.dispatch_dyn(&**event).unwrap();
    }

    assert_eq!(journal.handlers(), vec!["payment", "order_created"]);
}
