//! Agent 配置
//! Agent configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_enabled() -> bool {
    true
}

/// Agent 配置
/// Configuration recognized by an agent at construction
///
/// Only `name` is required when deserializing; every other field falls back
/// to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// 唯一名称
    /// Unique name within an orchestrator
    pub name: String,
    /// 描述（仅用于文档）
    /// Description, documentation only
    #[serde(default)]
    pub description: String,
    /// Attempt budget for retrying callers
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-message handling budget in seconds. `0` disables the budget.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 是否由编排器自动启动
    /// Whether the orchestrator starts this agent automatically
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl AgentConfig {
    /// 创建新配置
    /// Create a configuration with defaults for everything but the name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            enabled: default_enabled(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// The configured handling budget, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}
