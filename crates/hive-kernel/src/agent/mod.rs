//! 统一 Agent 契约
//! Unified Agent contract
//!
//! An agent is a named, independently lifecycled unit exposing a table of
//! actions. Agents never call each other directly; every request travels as
//! an [`AgentMessage`](crate::message::AgentMessage) routed by an
//! orchestrator, and every result comes back as an
//! [`AgentResponse`](crate::message::AgentResponse).
//!
//! # 模块结构
//! # Module Structure
//!
//! - `core` - `Agent` trait 与 `AgentCore`
//! - `core` - the `Agent` trait and the embedded `AgentCore`
//! - `handler` - 动作处理器表
//! - `handler` - action handler table, dynamic and typed
//! - `messenger` - 向外发送消息的能力
//! - `messenger` - outbound messaging capability
//! - `config` - Agent 配置
//! - `config` - agent configuration
//! - `types` - 状态类型
//! - `types` - status types
//! - `error` - 错误类型
//! - `error` - error types

pub mod config;
pub mod core;
pub mod error;
pub mod handler;
pub mod messenger;
pub mod types;

pub use self::config::AgentConfig;
pub use self::core::{Agent, AgentCore};
pub use self::error::{AgentError, AgentResult};
pub use self::handler::{Handler, HandlerFuture, HandlerTable};
pub use self::messenger::Messenger;
pub use self::types::{AgentStatus, AgentStatusReport};

/// 常用类型预导入
/// Commonly used types
pub mod prelude {
    pub use super::{
        Agent, AgentConfig, AgentCore, AgentError, AgentResult, AgentStatus, AgentStatusReport,
        Messenger,
    };
    pub use crate::message::{AgentMessage, AgentResponse, Payload};
    pub use async_trait::async_trait;
}
