//! Structured logging bootstrap.
//!
//! Installs a `tracing-subscriber` fmt subscriber filtered by `RUST_LOG`,
//! falling back to the given directive when the variable is unset.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed, which makes the
/// call safe to repeat from tests.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Install a JSON-formatted subscriber for log shippers.
pub fn init_json_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
