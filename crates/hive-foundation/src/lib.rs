//! Hive Foundation
//!
//! Concrete building blocks on top of `hive-kernel`:
//!
//! - [`orchestrator`] - agent registry, routing, workflows and broadcast
//! - [`circuit_breaker`] - per-service failure isolation
//! - [`retry`] - exponential backoff for transient failures
//! - [`integration`] - the agent that talks to external services
//! - [`config`] - deployment settings loaded from YAML, TOML, JSON and more

pub mod circuit_breaker;
pub mod config;
pub mod integration;
pub mod orchestrator;
pub mod retry;

pub use self::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};
pub use self::config::HiveSettings;
pub use self::integration::{IntegrationAgent, ServiceTransport};
pub use self::orchestrator::{MergePolicy, Orchestrator, OrchestratorStatus, Workflow, WorkflowStep};
pub use self::retry::{RetryConfig, RetryError, Retried, retry_with_backoff};

/// Kernel re-exports, so downstream crates can depend on the foundation alone
pub use hive_kernel::{
    Agent, AgentConfig, AgentCore, AgentError, AgentMessage, AgentResponse, AgentResult,
    AgentStatus, Payload,
};
