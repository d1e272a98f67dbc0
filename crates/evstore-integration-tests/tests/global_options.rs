//! The global store honours installer options.
//!
//! Kept in its own test binary: the global store is created once per process.

use evstore_core::{
    DispatchOptions, EventStore, EventStoreError, EventStoreInstaller, FailurePolicy,
};
use evstore_test::{FailingHandler, Journal, OrderCreated, OrderCreatedHandler, PaymentHandler};

#[test]
fn test_install_global_applies_installer_options() {
    let journal = Journal::new();
    let options = DispatchOptions::default().with_failure_policy(FailurePolicy::StopOnFirst);

    let store = EventStoreInstaller::from_types(vec![
        FailingHandler::handler_type(&journal),
        OrderCreatedHandler::handler_type(&journal),
    ])
    .unwrap()
    .with_options(options)
    .install_global()
    .unwrap();

    assert!(std::ptr::eq(store, EventStore::global()));
    assert_eq!(EventStore::global().options(), options);

    let err = EventStore::global()
        .dispatch(&OrderCreated::new(3))
        .unwrap_err();
    let EventStoreError::HandlerFailures { report, .. } = err else {
        panic!("expected handler failures");
    };
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(journal.handlers(), vec!["failing"]);

    let conflicting = EventStoreInstaller::from_types(vec![PaymentHandler::handler_type(&journal)])
        .unwrap()
        .with_options(DispatchOptions::default())
        .install_global();
    assert!(matches!(
        conflicting,
        Err(EventStoreError::OptionsMismatch { .. })
    ));
}
