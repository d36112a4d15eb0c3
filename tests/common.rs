// tests/common.rs
//! Shared test utilities: logging setup

#[cfg(feature = "logging")]
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Route library logs to the test writer.
/// Call at the start of any test that wants to see them.
pub fn setup() {
    #[cfg(feature = "logging")]
    tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env()) // respects RUST_LOG=
        .try_init()
        .ok(); // idempotent

    #[cfg(not(feature = "logging"))]
    { /* no-op */ }
}
