//! Agent 错误类型定义
//!
//! 统一的 Agent 错误处理

use thiserror::Error;

/// Agent 操作结果类型
pub type AgentResult<T> = Result<T, AgentError>;

/// Agent 错误类型
///
/// The `Display` text of each variant is what ends up in a failed
/// [`AgentResponse`](crate::message::AgentResponse), so the wording is part of
/// the routing contract.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum AgentError {
    /// Agent 未找到
    #[error("Agent not found: {0}")]
    NotFound(String),

    /// Agent 未运行
    #[error("Agent not running: {0}")]
    NotRunning(String),

    /// 动作未注册
    #[error("No handler for action: {0}")]
    NoHandler(String),

    /// 未绑定编排器
    #[error("No orchestrator configured")]
    NoOrchestrator,

    /// 工作流未找到
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    /// Agent 启动失败
    #[error("Agent startup failed: {0}")]
    StartupFailed(String),

    /// Agent 执行失败
    #[error("{0}")]
    ExecutionFailed(String),

    /// 无效输入
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 超时错误
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// 断路器打开
    #[error("Circuit breaker open for service: {0}")]
    CircuitOpen(String),

    /// 外部服务未注册
    #[error("Service not registered: {0}")]
    ServiceNotRegistered(String),

    /// 外部服务调用失败
    #[error("Service call failed: {service}: {message}")]
    ServiceCallFailed { service: String, message: String },

    /// 资源不可用
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// 创建超时错误
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// 创建外部服务调用失败错误
    pub fn service_call_failed(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ServiceCallFailed {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Whether a retrying caller should try the operation again.
    ///
    /// Transport-level failures and timeouts are transient; everything that
    /// describes a wrong request or a missing registration is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::Timeout { .. }
                | AgentError::ServiceCallFailed { .. }
                | AgentError::ResourceUnavailable(_)
                | AgentError::ExecutionFailed(_)
        )
    }
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        AgentError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::SerializationError(err.to_string())
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::ExecutionFailed(err.to_string())
    }
}
