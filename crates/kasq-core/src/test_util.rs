//! Shared test helpers for `kasq-core` unit tests.

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a test subscriber once per process. Honors `RUST_LOG`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("kasq_core=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Owned address list from string literals.
pub fn addresses(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_owned()).collect()
}
