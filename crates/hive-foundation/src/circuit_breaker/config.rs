//! Circuit Breaker Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_ms() -> u64 {
    30_000
}

/// Configuration for a circuit breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of recorded failures that opens the circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Time since the last failure after which an open circuit lets a trial
    /// call through, in milliseconds
    #[serde(default = "default_recovery_timeout_ms")]
    pub recovery_timeout_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_ms: default_recovery_timeout_ms(),
        }
    }
}

impl CircuitBreakerConfig {
    /// Set the failure threshold. A threshold of zero is treated as one.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Set the recovery timeout
    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_millis(self.recovery_timeout_ms)
    }

    /// Create a strict configuration (opens quickly)
    pub fn strict() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout_ms: 10_000,
        }
    }

    /// Create a lenient configuration (requires many failures)
    pub fn lenient() -> Self {
        Self {
            failure_threshold: 10,
            recovery_timeout_ms: 60_000,
        }
    }
}
