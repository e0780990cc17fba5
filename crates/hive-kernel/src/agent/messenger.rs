//! 消息发送能力
//! Outbound messaging capability
//!
//! An agent never holds its orchestrator. At registration it receives a
//! [`Messenger`], a narrow capability that can only route messages.

use crate::message::{AgentMessage, AgentResponse};
use async_trait::async_trait;

/// Route a message on behalf of an agent
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Route `message` and return the target's response.
    ///
    /// Implementations must report routing failures as failed responses
    /// rather than errors.
    async fn route(&self, message: AgentMessage) -> AgentResponse;
}
