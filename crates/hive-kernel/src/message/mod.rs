//! 消息模型
//! Message model
//!
//! [`AgentMessage`] is the only way work reaches an agent, and
//! [`AgentResponse`] is the only shape results come back in. Both are plain
//! serde values so collaborators (HTTP bridges, tests) can marshal free-form
//! JSON into them.

use crate::agent::error::{AgentError, AgentResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// 消息负载：字符串键到任意 JSON 值的映射
/// Message payload: a mapping from string keys to arbitrary JSON values
pub type Payload = serde_json::Map<String, Value>;

// ============================================================================
// AgentMessage
// ============================================================================

/// 智能体之间路由的消息
/// A routed request unit between agents
///
/// Messages are immutable once built; use the `with_*` builders before
/// handing the message to an orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentMessage {
    /// 消息 ID
    /// Message ID
    pub id: String,
    /// 发送者名称
    /// Source agent name
    #[serde(default)]
    pub source: String,
    /// 接收者名称
    /// Target agent name
    pub target: String,
    /// 处理器表中的动作名
    /// Action name, a key into the target's handler table
    pub action: String,
    /// 负载
    /// Payload
    #[serde(default)]
    pub payload: Payload,
    /// 关联 ID
    /// Correlation id tying related requests and responses together
    pub correlation_id: String,
    /// 创建时间
    /// Creation timestamp
    pub timestamp: DateTime<Utc>,
    /// Informational priority. Messages are never reordered by it.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub retry_count: u32,
    /// Time budget for handling this message. When absent the target agent's
    /// configured timeout applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Duration>,
}

impl AgentMessage {
    /// 创建新消息
    /// Create a new message for `target` / `action` with an empty payload
    pub fn new(target: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source: String::new(),
            target: target.into(),
            action: action.into(),
            payload: Payload::new(),
            correlation_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            priority: 0,
            retry_count: 0,
            deadline: None,
        }
    }

    /// 设置发送者
    /// Set the sender
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// 设置负载
    /// Set the payload
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Set the correlation id. An empty id keeps the generated one.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        let correlation_id = correlation_id.into();
        if !correlation_id.is_empty() {
            self.correlation_id = correlation_id;
        }
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// 设置处理时限
    /// Set the time budget for handling this message
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

// ============================================================================
// AgentResponse
// ============================================================================

/// 统一的处理结果
/// Uniform result of handling a message
///
/// `data` is only set on success and `error` only on failure; use the
/// constructors rather than building the struct by hand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AgentResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    /// Side-channel information such as status-code hints or completed
    /// workflow steps
    #[serde(default)]
    pub metadata: Payload,
}

impl AgentResponse {
    /// 成功响应
    /// Successful response carrying `data`
    pub fn ok(data: impl Into<Value>) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            error: None,
            metadata: Payload::new(),
        }
    }

    /// Successful response with no data
    pub fn ok_empty() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// 失败响应
    /// Failed response carrying an error description
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            metadata: Payload::new(),
        }
    }

    /// 附加元数据
    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The error description, or an empty string for successful responses
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }

    /// Convert into a [`AgentResult`], mapping failures to
    /// [`AgentError::ExecutionFailed`]
    pub fn into_result(self) -> AgentResult<Value> {
        if self.success {
            Ok(self.data.unwrap_or(Value::Null))
        } else {
            Err(AgentError::ExecutionFailed(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

impl From<AgentError> for AgentResponse {
    fn from(err: AgentError) -> Self {
        AgentResponse::fail(err.to_string())
    }
}

impl From<AgentResult<Value>> for AgentResponse {
    fn from(result: AgentResult<Value>) -> Self {
        match result {
            Ok(data) => AgentResponse::ok(data),
            Err(err) => err.into(),
        }
    }
}
