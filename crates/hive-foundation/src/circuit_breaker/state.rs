//! Circuit Breaker State Machine
//!
//! Three states:
//! - Closed: normal operation, failures are counted
//! - Open: calls are rejected until the recovery timeout has elapsed since the
//!   last failure
//! - Half-Open: calls are let through; the next outcome decides whether the
//!   circuit closes or opens again
//!
//! The breaker is a plain synchronous state machine. Callers keep it behind
//! their own lock and consult it before and after the protected call, never
//! while awaiting it.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::CircuitBreakerConfig;
use super::metrics::{CircuitBreakerMetrics, CircuitBreakerSnapshot, StateTransition};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum State {
    #[default]
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Closed => write!(f, "closed"),
            State::Open => write!(f, "open"),
            State::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Error returned when the breaker refuses a call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CircuitBreakerError {
    #[error("Circuit breaker open for service: {0}")]
    Open(String),
}

impl From<CircuitBreakerError> for hive_kernel::AgentError {
    fn from(err: CircuitBreakerError) -> Self {
        match err {
            CircuitBreakerError::Open(name) => hive_kernel::AgentError::CircuitOpen(name),
        }
    }
}

/// Circuit breaker guarding one external service
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: State,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    metrics: CircuitBreakerMetrics,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: State::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            metrics: CircuitBreakerMetrics::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state, without applying the recovery timeout
    pub fn state(&self) -> State {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn metrics(&self) -> &CircuitBreakerMetrics {
        &self.metrics
    }

    /// Whether a call may go through right now
    ///
    /// An open circuit whose recovery timeout has elapsed moves to half-open
    /// and admits the call.
    pub fn can_execute(&mut self) -> bool {
        match self.state {
            State::Closed | State::HalfOpen => true,
            State::Open => {
                let recovered = self
                    .last_failure_at
                    .map(|at| at.elapsed() >= self.config.recovery_timeout())
                    .unwrap_or(true);
                if recovered {
                    self.transition_to(State::HalfOpen);
                    info!(service = %self.name, "Circuit breaker half-open, allowing trial call");
                }
                recovered
            }
        }
    }

    /// Gate a call, counting the rejection when the circuit refuses it
    pub fn try_acquire(&mut self) -> Result<(), CircuitBreakerError> {
        if self.can_execute() {
            Ok(())
        } else {
            self.metrics.record_rejected();
            debug!(service = %self.name, "Circuit breaker rejected call");
            Err(CircuitBreakerError::Open(self.name.clone()))
        }
    }

    pub fn record_success(&mut self) {
        self.metrics.record_success();
        self.consecutive_failures = 0;
        if self.state != State::Closed {
            self.transition_to(State::Closed);
            info!(service = %self.name, "Circuit breaker closed");
        }
    }

    pub fn record_failure(&mut self) {
        self.metrics.record_failure();
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure_at = Some(Instant::now());

        let should_open = match self.state {
            State::HalfOpen => true,
            State::Closed => self.consecutive_failures >= self.config.failure_threshold,
            State::Open => false,
        };
        if should_open {
            self.transition_to(State::Open);
            warn!(
                service = %self.name,
                failures = self.consecutive_failures,
                "Circuit breaker opened"
            );
        }
    }

    /// Force the breaker back to closed with a zero failure count
    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.last_failure_at = None;
        if self.state != State::Closed {
            self.transition_to(State::Closed);
        }
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        CircuitBreakerSnapshot {
            name: self.name.clone(),
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            failure_threshold: self.config.failure_threshold,
            total_successes: self.metrics.total_successes(),
            total_failures: self.metrics.total_failures(),
            total_rejected: self.metrics.total_rejected(),
            total_transitions: self.metrics.total_transitions(),
            failure_rate: self.metrics.failure_rate(),
            last_opened_at: self.metrics.last_opened_at(),
        }
    }

    fn transition_to(&mut self, to: State) {
        let from = self.state;
        self.state = to;
        self.metrics.record_transition(StateTransition::new(from, to));
    }
}
