//! Hive Testing Framework
//!
//! Utilities for testing agents, orchestrators and integrations without live
//! services: a scriptable [`MockAgent`], a [`ScriptedTransport`] for the
//! integration agent, and assertion macros.

pub mod agent;
pub mod transport;

pub use agent::{Behavior, MockAgent, RecordedCall};
pub use transport::ScriptedTransport;

use hive_kernel::Payload;
use serde_json::Value;

/// Turn a `json!` object into a payload. Anything else yields an empty one.
pub fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

/// Install a test subscriber once, honoring `RUST_LOG`
pub fn init_test_tracing() {
    let _ = hive_kernel::logging::init_tracing("warn");
}

#[macro_export]
macro_rules! assert_agent_called {
    ($agent:expr, $action:expr, $expected_count:expr) => {
        let count = $agent.call_count($action).await;
        assert_eq!(
            count,
            $expected_count,
            "Expected action '{}' on agent '{}' to be called {} times, but was called {} times",
            $action,
            $agent.name(),
            $expected_count,
            count
        );
    };
}

#[macro_export]
macro_rules! assert_response_ok {
    ($response:expr) => {
        assert!(
            $response.is_success(),
            "Expected a successful response, got error: {}",
            $response.error_message()
        );
    };
}

#[macro_export]
macro_rules! assert_response_err {
    ($response:expr, $expected:expr) => {
        assert!(!$response.is_success(), "Expected a failed response, got success");
        assert_eq!($response.error_message(), $expected);
    };
}
