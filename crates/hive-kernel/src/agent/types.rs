//! Agent 状态类型
//! Agent status types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Agent 生命周期状态
/// Agent lifecycle status
///
/// A deliberately small lifecycle: `start()` moves an agent to `Running`,
/// `stop()` to `Stopped`, and a failed startup hook to `Error`. No other
/// transitions are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// 已创建，尚未启动
    /// Constructed, not started yet
    #[default]
    Idle,
    /// 运行中，可以接收消息
    /// Running, accepts routed messages
    Running,
    /// 已停止
    /// Stopped
    Stopped,
    /// 启动失败
    /// Startup hook failed
    Error,
}

impl AgentStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, AgentStatus::Running)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::Idle => write!(f, "idle"),
            AgentStatus::Running => write!(f, "running"),
            AgentStatus::Stopped => write!(f, "stopped"),
            AgentStatus::Error => write!(f, "error"),
        }
    }
}

/// Agent 状态快照
/// Read-only status snapshot of one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatusReport {
    pub name: String,
    pub description: String,
    pub status: AgentStatus,
    pub enabled: bool,
    /// Registered action names, sorted
    pub handlers: Vec<String>,
}
