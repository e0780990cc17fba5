//! Messenger capability handed to registered agents

use async_trait::async_trait;
use hive_kernel::{AgentMessage, AgentResponse, Messenger};
use std::sync::Weak;
use tracing::warn;

use super::OrchestratorInner;

/// Routes agent-originated messages back through the orchestrator
///
/// Holds a weak reference so an agent never keeps its orchestrator alive.
pub(crate) struct OrchestratorMessenger {
    inner: Weak<OrchestratorInner>,
}

impl OrchestratorMessenger {
    pub(crate) fn new(inner: Weak<OrchestratorInner>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Messenger for OrchestratorMessenger {
    async fn route(&self, message: AgentMessage) -> AgentResponse {
        match self.inner.upgrade() {
            Some(inner) => inner.route_message(message).await,
            None => {
                warn!(source = %message.source, target_agent = %message.target, "Orchestrator dropped, message not routed");
                AgentResponse::fail("Orchestrator no longer available")
            }
        }
    }
}
