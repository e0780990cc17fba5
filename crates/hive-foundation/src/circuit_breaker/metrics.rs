//! Circuit Breaker Metrics
//!
//! Request statistics and a bounded history of state transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::state::State;

const MAX_TRANSITIONS: usize = 32;

/// State transition event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from_state: State,
    pub to_state: State,
    pub at: DateTime<Utc>,
}

impl StateTransition {
    pub fn new(from_state: State, to_state: State) -> Self {
        Self {
            from_state,
            to_state,
            at: Utc::now(),
        }
    }
}

/// Cumulative counters for one breaker
///
/// The breaker that owns the metrics is always accessed under a lock, so the
/// counters are plain integers.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerMetrics {
    total_successes: u64,
    total_failures: u64,
    total_rejected: u64,
    total_transitions: u64,
    last_opened_at: Option<DateTime<Utc>>,
    transitions: VecDeque<StateTransition>,
}

impl CircuitBreakerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.total_successes += 1;
    }

    pub fn record_failure(&mut self) {
        self.total_failures += 1;
    }

    pub fn record_rejected(&mut self) {
        self.total_rejected += 1;
    }

    pub fn record_transition(&mut self, transition: StateTransition) {
        self.total_transitions += 1;
        if transition.to_state == State::Open {
            self.last_opened_at = Some(transition.at);
        }
        if self.transitions.len() == MAX_TRANSITIONS {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    pub fn total_successes(&self) -> u64 {
        self.total_successes
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures
    }

    pub fn total_rejected(&self) -> u64 {
        self.total_rejected
    }

    pub fn total_transitions(&self) -> u64 {
        self.total_transitions
    }

    pub fn last_opened_at(&self) -> Option<DateTime<Utc>> {
        self.last_opened_at
    }

    /// Successful plus failed requests; rejections never reached the service
    pub fn total_requests(&self) -> u64 {
        self.total_successes + self.total_failures
    }

    pub fn failure_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.total_failures as f64 / total as f64
        }
    }

    /// Most recent transitions, oldest first
    pub fn transitions(&self) -> Vec<StateTransition> {
        self.transitions.iter().cloned().collect()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Point-in-time view of a breaker, safe to hand out of the lock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerSnapshot {
    pub name: String,
    pub state: State,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub total_successes: u64,
    pub total_failures: u64,
    pub total_rejected: u64,
    pub total_transitions: u64,
    pub failure_rate: f64,
    pub last_opened_at: Option<DateTime<Utc>>,
}

impl std::fmt::Display for CircuitBreakerSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] failures {}/{} (ok: {}, failed: {}, rejected: {}, failure rate: {:.1}%)",
            self.name,
            self.state,
            self.consecutive_failures,
            self.failure_threshold,
            self.total_successes,
            self.total_failures,
            self.total_rejected,
            self.failure_rate * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_rate() {
        let mut metrics = CircuitBreakerMetrics::new();
        metrics.record_success();
        metrics.record_failure();
        metrics.record_failure();
        metrics.record_failure();
        metrics.record_rejected();

        assert_eq!(metrics.total_requests(), 4);
        assert_eq!(metrics.total_rejected(), 1);
        assert!((metrics.failure_rate() - 0.75).abs() < f64::EPSILON);

        metrics.reset();
        assert_eq!(metrics.total_requests(), 0);
        assert_eq!(metrics.failure_rate(), 0.0);
    }

    #[test]
    fn test_transition_history_is_bounded() {
        let mut metrics = CircuitBreakerMetrics::new();
        for _ in 0..(MAX_TRANSITIONS + 5) {
            metrics.record_transition(StateTransition::new(State::Closed, State::Open));
        }
        assert_eq!(metrics.transitions().len(), MAX_TRANSITIONS);
        assert_eq!(metrics.total_transitions(), (MAX_TRANSITIONS + 5) as u64);
        assert!(metrics.last_opened_at.is_some());
    }
}
