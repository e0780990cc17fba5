//! 编排器
//! Orchestrator
//!
//! The central coordinator: owns the agent registry and the workflow table,
//! routes every message to its target agent, runs multi-step workflows and
//! broadcasts actions to all running agents.
//!
//! ```text
//!   caller ──route_message──▶ Orchestrator ──handle_message──▶ Agent
//!                                  ▲                              │
//!                                  └────── Messenger (Weak) ◀─────┘
//!                                          send_message
//! ```
//!
//! Agents reach the orchestrator only through the [`Messenger`] capability
//! bound at registration, which holds a weak reference; dropping every
//! [`Orchestrator`] handle therefore frees the registry even while agents
//! are still alive.

pub mod messenger;
pub mod registry;
pub mod workflow;

pub use self::registry::AgentRegistry;
pub use self::workflow::{MergePolicy, StepRecord, Workflow, WorkflowStep};

use futures::future::join_all;
use hive_kernel::{
    Agent, AgentConfig, AgentError, AgentMessage, AgentResponse, AgentResult, AgentStatus,
    AgentStatusReport, Messenger, Payload,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use self::messenger::OrchestratorMessenger;
use self::workflow::records_to_value;
use crate::config::HiveSettings;

/// Default orchestrator name, used as the source of orchestrator-built messages
pub const ORCHESTRATOR_NAME: &str = "orchestrator";

/// Read-only snapshot returned by [`Orchestrator::get_all_agents_status`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    pub orchestrator: AgentStatusReport,
    pub agents: BTreeMap<String, AgentStatusReport>,
    pub workflows: Vec<String>,
}

// ============================================================================
// OrchestratorInner - state shared with the messengers
// ============================================================================

pub(crate) struct OrchestratorInner {
    config: AgentConfig,
    status: RwLock<AgentStatus>,
    agents: RwLock<AgentRegistry>,
    workflows: RwLock<BTreeMap<String, Workflow>>,
}

impl OrchestratorInner {
    pub(crate) async fn route_message(&self, message: AgentMessage) -> AgentResponse {
        let target = self.agents.read().get(&message.target);
        let Some(agent) = target else {
            warn!(target_agent = %message.target, source = %message.source, "Agent not found");
            return AgentError::NotFound(message.target).into();
        };

        if !agent.status().is_running() {
            warn!(target_agent = %message.target, status = %agent.status(), "Agent not running");
            return AgentError::NotRunning(message.target).into();
        }

        debug!(
            source = %message.source,
            target_agent = %message.target,
            action = %message.action,
            correlation_id = %message.correlation_id,
            "Routing message"
        );
        agent.handle_message(message).await
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Central coordinator for a set of agents
///
/// Cloning is cheap; clones share the same registry and workflows.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::with_config(
            AgentConfig::new(ORCHESTRATOR_NAME).with_description("Central task coordinator and router"),
        )
    }

    pub fn with_config(config: AgentConfig) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                config,
                status: RwLock::new(AgentStatus::Idle),
                agents: RwLock::new(AgentRegistry::new()),
                workflows: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    /// Orchestrator identity and workflows taken from loaded settings
    pub fn from_settings(settings: &HiveSettings) -> AgentResult<Self> {
        let orchestrator = Self::with_config(settings.orchestrator.clone());
        orchestrator.apply_settings(settings)?;
        Ok(orchestrator)
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn config(&self) -> &AgentConfig {
        &self.inner.config
    }

    pub fn status(&self) -> AgentStatus {
        *self.inner.status.read()
    }

    fn set_status(&self, status: AgentStatus) {
        *self.inner.status.write() = status;
    }

    /// A messenger routing through this orchestrator
    pub fn messenger(&self) -> Arc<dyn Messenger> {
        Arc::new(OrchestratorMessenger::new(Arc::downgrade(&self.inner)))
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Register an agent under its name, replacing any agent of the same name
    /// in place, and bind this orchestrator as its messenger
    pub fn register_agent(&self, agent: Arc<dyn Agent>) {
        agent.core().bind_messenger(self.messenger());
        let name = agent.name().to_string();
        let replaced = self.inner.agents.write().insert(agent).is_some();
        info!(orchestrator = %self.name(), agent = %name, replaced, "Registered agent");
    }

    /// Remove an agent without stopping it
    pub fn unregister_agent(&self, name: &str) -> Option<Arc<dyn Agent>> {
        let removed = self.inner.agents.write().remove(name);
        if removed.is_some() {
            info!(orchestrator = %self.name(), agent = %name, "Unregistered agent");
        }
        removed
    }

    pub fn get_agent(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.inner.agents.read().get(name)
    }

    /// Registered agent names in registration order
    pub fn agent_names(&self) -> Vec<String> {
        self.inner.agents.read().names()
    }

    pub fn agent_count(&self) -> usize {
        self.inner.agents.read().len()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start every enabled agent in registration order
    ///
    /// An agent whose startup hook fails is left in `Error` and the remaining
    /// agents are still started; the failures are then reported together and
    /// the orchestrator itself moves to `Error`.
    pub async fn start(&self) -> AgentResult<()> {
        let agents = self.inner.agents.read().snapshot();
        info!(orchestrator = %self.name(), agents = agents.len(), "Orchestrator starting");
        self.set_status(AgentStatus::Running);

        let mut failed = Vec::new();
        for agent in agents.iter().filter(|a| a.config().enabled) {
            if let Err(e) = agent.start().await {
                error!(agent = %agent.name(), error = %e, "Agent failed to start");
                failed.push(agent.name().to_string());
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            self.set_status(AgentStatus::Error);
            Err(AgentError::StartupFailed(failed.join(", ")))
        }
    }

    /// Stop every enabled agent in registration order. Failures are logged
    /// and never interrupt the loop.
    pub async fn stop(&self) -> AgentResult<()> {
        info!(orchestrator = %self.name(), "Orchestrator stopping");
        let agents = self.inner.agents.read().snapshot();
        for agent in agents.iter().filter(|a| a.config().enabled) {
            if let Err(e) = agent.stop().await {
                warn!(agent = %agent.name(), error = %e, "Agent failed to stop cleanly");
            }
        }
        self.set_status(AgentStatus::Stopped);
        Ok(())
    }

    // ========================================================================
    // Routing
    // ========================================================================

    /// Deliver a message to its target agent
    ///
    /// Unknown and not-running targets produce failed responses; otherwise
    /// the agent's response is returned as is.
    pub async fn route_message(&self, message: AgentMessage) -> AgentResponse {
        self.inner.route_message(message).await
    }

    /// Build and route a message from the orchestrator itself
    pub async fn send(&self, target: &str, action: &str, payload: Payload) -> AgentResponse {
        let message = AgentMessage::new(target, action)
            .with_source(self.name())
            .with_payload(payload);
        self.route_message(message).await
    }

    fn running_agents(&self) -> Vec<Arc<dyn Agent>> {
        self.inner
            .agents
            .read()
            .snapshot()
            .into_iter()
            .filter(|a| a.status().is_running())
            .collect()
    }

    fn broadcast_message(&self, agent: &Arc<dyn Agent>, action: &str, payload: &Payload) -> AgentMessage {
        AgentMessage::new(agent.name(), action)
            .with_source(self.name())
            .with_payload(payload.clone())
    }

    /// Send an independent copy of `action` to every running agent, one after
    /// the other in registration order. Responses come back in that order.
    pub async fn broadcast(&self, action: &str, payload: Payload) -> Vec<(String, AgentResponse)> {
        let agents = self.running_agents();
        debug!(action = %action, recipients = agents.len(), "Broadcasting");

        let mut responses = Vec::with_capacity(agents.len());
        for agent in &agents {
            let message = self.broadcast_message(agent, action, &payload);
            responses.push((agent.name().to_string(), agent.handle_message(message).await));
        }
        responses
    }

    /// Same as [`Orchestrator::broadcast`] with all deliveries in flight at once
    pub async fn broadcast_concurrent(&self, action: &str, payload: Payload) -> Vec<(String, AgentResponse)> {
        let agents = self.running_agents();
        debug!(action = %action, recipients = agents.len(), "Broadcasting concurrently");

        let deliveries = agents.iter().map(|agent| {
            let message = self.broadcast_message(agent, action, &payload);
            async move { (agent.name().to_string(), agent.handle_message(message).await) }
        });
        join_all(deliveries).await.into_iter().collect()
    }

    // ========================================================================
    // Workflows
    // ========================================================================

    /// Register (or replace) a workflow with the default merge policy
    pub fn register_workflow(&self, name: impl Into<String>, steps: Vec<WorkflowStep>) {
        self.add_workflow(Workflow::new(name, steps));
    }

    /// Register a workflow from textual `agent:action` steps
    pub fn register_workflow_steps<S: AsRef<str>>(&self, name: impl Into<String>, steps: &[S]) -> AgentResult<()> {
        self.add_workflow(Workflow::parse(name, steps)?);
        Ok(())
    }

    /// Register (or replace) a fully specified workflow
    pub fn add_workflow(&self, workflow: Workflow) {
        info!(workflow = %workflow.name, steps = workflow.len(), "Registered workflow");
        self.inner.workflows.write().insert(workflow.name.clone(), workflow);
    }

    pub fn remove_workflow(&self, name: &str) -> Option<Workflow> {
        self.inner.workflows.write().remove(name)
    }

    pub fn workflow(&self, name: &str) -> Option<Workflow> {
        self.inner.workflows.read().get(name).cloned()
    }

    /// Workflow names in sorted order
    pub fn workflow_names(&self) -> Vec<String> {
        self.inner.workflows.read().keys().cloned().collect()
    }

    /// Run a workflow step by step
    ///
    /// Every step is routed with the orchestrator as source and a correlation
    /// id shared by the whole run. On failure the response carries the
    /// records of the steps completed so far under `completed_steps`.
    pub async fn execute_workflow(&self, name: &str, initial_payload: Payload) -> AgentResponse {
        let Some(workflow) = self.workflow(name) else {
            warn!(workflow = %name, "Workflow not found");
            return AgentError::WorkflowNotFound(name.to_string()).into();
        };

        let correlation_id = Uuid::new_v4().to_string();
        info!(
            workflow = %name,
            steps = workflow.len(),
            correlation_id = %correlation_id,
            "Executing workflow"
        );

        let mut current = initial_payload;
        let mut completed: Vec<StepRecord> = Vec::with_capacity(workflow.len());

        for step in &workflow.steps {
            let label = step.to_string();
            let message = AgentMessage::new(&step.agent, &step.action)
                .with_source(self.name())
                .with_payload(current.clone())
                .with_correlation_id(&correlation_id);

            let response = self.route_message(message).await;
            if !response.is_success() {
                let error = format!("Workflow failed at step {label}: {}", response.error_message());
                warn!(workflow = %name, step = %label, error = %error, "Workflow step failed");
                return Self::workflow_failure(name, error, &completed);
            }

            let result = response.data.unwrap_or(Value::Null);
            if let Value::Object(fields) = &result {
                if let Err(key) = workflow.merge_policy.merge(&mut current, fields) {
                    let error = format!("Payload key conflict at step {label}: {key}");
                    warn!(workflow = %name, step = %label, key = %key, "Workflow payload conflict");
                    return Self::workflow_failure(name, error, &completed);
                }
            }

            debug!(workflow = %name, step = %label, "Workflow step completed");
            completed.push(StepRecord { step: label, result });
        }

        info!(workflow = %name, steps = completed.len(), "Workflow completed");
        AgentResponse::ok(records_to_value(&completed)).with_metadata("workflow", name)
    }

    fn workflow_failure(name: &str, error: String, completed: &[StepRecord]) -> AgentResponse {
        AgentResponse::fail(error)
            .with_metadata("completed_steps", records_to_value(completed))
            .with_metadata("workflow", name)
    }

    /// Register every workflow declared in `settings`
    ///
    /// All definitions are parsed before any is registered, so a malformed
    /// step leaves the workflow table unchanged.
    pub fn apply_settings(&self, settings: &HiveSettings) -> AgentResult<()> {
        let workflows = settings
            .workflows
            .iter()
            .map(|(name, steps)| Workflow::parse(name.clone(), steps.as_slice()))
            .collect::<AgentResult<Vec<_>>>()?;
        for workflow in workflows {
            self.add_workflow(workflow);
        }
        Ok(())
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub fn status_report(&self) -> AgentStatusReport {
        AgentStatusReport {
            name: self.inner.config.name.clone(),
            description: self.inner.config.description.clone(),
            status: self.status(),
            enabled: self.inner.config.enabled,
            handlers: Vec::new(),
        }
    }

    /// Snapshot of the orchestrator, every registered agent and the workflows
    pub fn get_all_agents_status(&self) -> OrchestratorStatus {
        let agents = self
            .inner
            .agents
            .read()
            .snapshot()
            .into_iter()
            .map(|agent| (agent.name().to_string(), agent.get_status()))
            .collect();

        OrchestratorStatus {
            orchestrator: self.status_report(),
            agents,
            workflows: self.workflow_names(),
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("name", &self.name())
            .field("status", &self.status())
            .field("agents", &self.agent_names())
            .field("workflows", &self.workflow_names())
            .finish()
    }
}
