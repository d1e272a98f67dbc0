//! Tracing subscriber for tests.

use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber so logs show up in failing test output.
///
/// Honors `RUST_LOG`, defaulting to `debug`. Safe to call from every test;
/// only the first call installs a subscriber.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
