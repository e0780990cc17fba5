//! Hive Kernel
//!
//! The contract every Hive component speaks: the routed [`message::AgentMessage`]
//! and [`message::AgentResponse`] values, the [`agent::Agent`] trait with its
//! handler table and lifecycle, and the error types shared by the rest of the
//! workspace.

// message module
pub mod message;

// Unified Agent contract (统一 Agent 契约)
pub mod agent;

// error module
pub mod error;

// config module
pub mod config;

// logging module
pub mod logging;

pub use agent::{
    Agent, AgentConfig, AgentCore, AgentError, AgentResult, AgentStatus, AgentStatusReport,
    Messenger,
};
pub use error::{KernelError, KernelResult};
pub use message::{AgentMessage, AgentResponse, Payload};
