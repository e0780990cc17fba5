//! Hive Agent 核心接口
//! Hive Agent core interface
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Agent (trait)                          │
//! │  • core()                         (required)                │
//! │  • on_start() / on_stop()         (hooks, default no-op)    │
//! │  • start() / stop()               (lifecycle, provided)     │
//! │  • handle_message()               (dispatch, provided)      │
//! │  • send_message()                 (outbound, provided)      │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                │ owns
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        AgentCore                            │
//! │  config │ status │ HandlerTable │ Option<Messenger>         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! `handle_message` is the failure boundary of the system: whatever a handler
//! does (return an error, panic, overrun its budget) comes back as a failed
//! [`AgentResponse`].

use crate::agent::config::AgentConfig;
use crate::agent::error::{AgentError, AgentResult};
use crate::agent::handler::{Handler, HandlerTable};
use crate::agent::messenger::Messenger;
use crate::agent::types::{AgentStatus, AgentStatusReport};
use crate::message::{AgentMessage, AgentResponse, Payload};
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info};

// ============================================================================
// AgentCore - 每个 Agent 内嵌的共享状态
// AgentCore - shared state embedded in every agent
// ============================================================================

/// 每个 Agent 内嵌的核心状态
/// Core state embedded in every agent
///
/// Holds the configuration, lifecycle status, handler table and the outbound
/// messenger. All fields use interior mutability so an agent can be shared as
/// `Arc<dyn Agent>`; no lock is held across an `.await`.
pub struct AgentCore {
    config: AgentConfig,
    status: RwLock<AgentStatus>,
    handlers: RwLock<HandlerTable>,
    messenger: RwLock<Option<Arc<dyn Messenger>>>,
}

impl AgentCore {
    /// 创建新的核心状态
    /// Create the core in the `Idle` status
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            status: RwLock::new(AgentStatus::Idle),
            handlers: RwLock::new(HandlerTable::new()),
            messenger: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn status(&self) -> AgentStatus {
        *self.status.read()
    }

    pub fn set_status(&self, status: AgentStatus) {
        *self.status.write() = status;
    }

    /// 注册动作处理器
    /// Register an action handler, replacing any earlier one for `action`
    pub fn register_handler<F, Fut>(&self, action: impl Into<String>, handler: F)
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AgentResult<Value>> + Send + 'static,
    {
        let action = action.into();
        debug!(agent = %self.config.name, action = %action, "Registered handler");
        self.handlers.write().register(action, handler);
    }

    /// 注册类型化动作处理器
    /// Register a handler with typed request and response structs
    pub fn register_typed_handler<Req, Resp, F, Fut>(&self, action: impl Into<String>, handler: F)
    where
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + Send + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AgentResult<Resp>> + Send + 'static,
    {
        let action = action.into();
        debug!(agent = %self.config.name, action = %action, "Registered typed handler");
        self.handlers.write().register_typed(action, handler);
    }

    pub fn handler(&self, action: &str) -> Option<Handler> {
        self.handlers.read().get(action)
    }

    /// Registered action names in sorted order
    pub fn actions(&self) -> Vec<String> {
        self.handlers.read().actions()
    }

    /// 绑定消息发送能力
    /// Bind the outbound messenger, replacing any previous binding
    pub fn bind_messenger(&self, messenger: Arc<dyn Messenger>) {
        *self.messenger.write() = Some(messenger);
    }

    pub fn messenger(&self) -> Option<Arc<dyn Messenger>> {
        self.messenger.read().clone()
    }

    pub fn status_report(&self) -> AgentStatusReport {
        AgentStatusReport {
            name: self.config.name.clone(),
            description: self.config.description.clone(),
            status: self.status(),
            enabled: self.config.enabled,
            handlers: self.actions(),
        }
    }
}

impl std::fmt::Debug for AgentCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentCore")
            .field("config", &self.config)
            .field("status", &self.status())
            .field("handlers", &self.actions())
            .field("has_messenger", &self.messenger.read().is_some())
            .finish()
    }
}

// ============================================================================
// Agent - 统一接口
// Agent - unified interface
// ============================================================================

/// Hive Agent 统一接口
/// Unified interface implemented by every agent
///
/// Implementors provide [`Agent::core`] and, optionally, the startup and
/// shutdown hooks. Everything else is provided.
///
/// # 示例
/// # Example
///
/// ```rust,ignore
/// use hive_kernel::agent::prelude::*;
///
/// struct EchoAgent {
///     core: AgentCore,
/// }
///
/// impl EchoAgent {
///     fn new() -> Self {
///         let core = AgentCore::new(AgentConfig::new("echo"));
///         core.register_handler("echo", |payload| async move { Ok(payload.into()) });
///         Self { core }
///     }
/// }
///
/// #[async_trait]
/// impl Agent for EchoAgent {
///     fn core(&self) -> &AgentCore {
///         &self.core
///     }
/// }
/// ```
#[async_trait]
pub trait Agent: Send + Sync + 'static {
    // ========================================================================
    // 必须实现
    // Required
    // ========================================================================

    fn core(&self) -> &AgentCore;

    // ========================================================================
    // 生命周期钩子
    // Lifecycle hooks
    // ========================================================================

    /// One-time initialization, called by [`Agent::start`] after the status
    /// has moved to `Running`.
    async fn on_start(&self) -> AgentResult<()> {
        Ok(())
    }

    /// Release caches and state, called by [`Agent::stop`].
    async fn on_stop(&self) -> AgentResult<()> {
        Ok(())
    }

    // ========================================================================
    // 提供的方法
    // Provided methods
    // ========================================================================

    fn name(&self) -> &str {
        self.core().name()
    }

    fn config(&self) -> &AgentConfig {
        self.core().config()
    }

    fn status(&self) -> AgentStatus {
        self.core().status()
    }

    /// 启动 Agent
    /// Start the agent
    ///
    /// Moves the status to `Running` and runs the startup hook. If the hook
    /// fails the status becomes `Error` and the hook's error is returned.
    async fn start(&self) -> AgentResult<()> {
        info!(agent = %self.name(), "Starting agent");
        self.core().set_status(AgentStatus::Running);
        if let Err(e) = self.on_start().await {
            error!(agent = %self.name(), error = %e, "Agent startup hook failed");
            self.core().set_status(AgentStatus::Error);
            return Err(e);
        }
        Ok(())
    }

    /// 停止 Agent
    /// Stop the agent. Stopping an already stopped agent does nothing.
    async fn stop(&self) -> AgentResult<()> {
        if self.status() == AgentStatus::Stopped {
            debug!(agent = %self.name(), "Agent already stopped");
            return Ok(());
        }
        info!(agent = %self.name(), "Stopping agent");
        self.core().set_status(AgentStatus::Stopped);
        self.on_stop().await
    }

    /// 处理消息
    /// Dispatch a message to the handler registered for its action
    ///
    /// Never returns an error: an unknown action, a handler error, a handler
    /// panic and an exhausted time budget all become failed responses.
    async fn handle_message(&self, message: AgentMessage) -> AgentResponse {
        debug!(
            agent = %self.name(),
            action = %message.action,
            message_id = %message.id,
            correlation_id = %message.correlation_id,
            "Handling message"
        );

        let Some(handler) = self.core().handler(&message.action) else {
            return AgentError::NoHandler(message.action).into();
        };

        let budget = message.deadline.or_else(|| self.config().timeout());
        // Building the future runs handler code too, so it belongs inside the guard
        let payload = message.payload;
        let call = AssertUnwindSafe(async move { handler(payload).await }).catch_unwind();

        let outcome = match budget {
            Some(budget) => match tokio::time::timeout(budget, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let err = AgentError::timeout(u64::try_from(budget.as_millis()).unwrap_or(u64::MAX));
                    error!(agent = %self.name(), action = %message.action, error = %err, "Handler timed out");
                    return err.into();
                }
            },
            None => call.await,
        };

        match outcome {
            Ok(Ok(data)) => AgentResponse::ok(data),
            Ok(Err(e)) => {
                error!(agent = %self.name(), action = %message.action, error = %e, "Error handling message");
                e.into()
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(agent = %self.name(), action = %message.action, reason = %reason, "Handler panicked");
                AgentResponse::fail(format!("Handler panicked: {reason}"))
            }
        }
    }

    /// 通过编排器发送消息
    /// Ask the bound orchestrator to route a new message on this agent's behalf
    async fn send_message(
        &self,
        target: &str,
        action: &str,
        payload: Payload,
        correlation_id: Option<String>,
    ) -> AgentResponse {
        let Some(messenger) = self.core().messenger() else {
            return AgentError::NoOrchestrator.into();
        };

        let mut message = AgentMessage::new(target, action)
            .with_source(self.name())
            .with_payload(payload);
        if let Some(correlation_id) = correlation_id {
            message = message.with_correlation_id(correlation_id);
        }

        messenger.route(message).await
    }

    /// 获取状态快照
    /// Status snapshot
    fn get_status(&self) -> AgentStatusReport {
        self.core().status_report()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CounterAgent {
        core: AgentCore,
        starts: AtomicUsize,
        stops: AtomicUsize,
        fail_start: bool,
    }

    impl CounterAgent {
        fn new(name: &str) -> Self {
            let core = AgentCore::new(AgentConfig::new(name).with_timeout_secs(1));
            core.register_handler("echo", |payload: Payload| async move {
                Ok(Value::Object(payload))
            });
            core.register_handler("fail", |_| async {
                Err(AgentError::ExecutionFailed("Missing required fields".into()))
            });
            core.register_handler("panic", |_| async {
                panic!("sensor table corrupted");
            });
            core.register_handler("hang", |_| async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Value::Null)
            });
            Self {
                core,
                starts: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
                fail_start: false,
            }
        }
    }

    #[async_trait]
    impl Agent for CounterAgent {
        fn core(&self) -> &AgentCore {
            &self.core
        }

        async fn on_start(&self) -> AgentResult<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail_start {
                return Err(AgentError::StartupFailed("demo data missing".into()));
            }
            Ok(())
        }

        async fn on_stop(&self) -> AgentResult<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RecordingMessenger {
        seen: parking_lot::Mutex<Vec<AgentMessage>>,
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn route(&self, message: AgentMessage) -> AgentResponse {
            self.seen.lock().push(message);
            AgentResponse::ok(json!("routed"))
        }
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let agent = CounterAgent::new("sensor");
        assert_eq!(agent.status(), AgentStatus::Idle);

        agent.start().await.unwrap();
        assert_eq!(agent.status(), AgentStatus::Running);
        assert_eq!(agent.starts.load(Ordering::SeqCst), 1);

        agent.stop().await.unwrap();
        agent.stop().await.unwrap();
        assert_eq!(agent.status(), AgentStatus::Stopped);
        assert_eq!(agent.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_startup_hook_marks_error() {
        let mut agent = CounterAgent::new("vision");
        agent.fail_start = true;

        let err = agent.start().await.unwrap_err();
        assert!(matches!(err, AgentError::StartupFailed(_)));
        assert_eq!(agent.status(), AgentStatus::Error);
    }

    #[tokio::test]
    async fn test_unknown_action_is_failed_response() {
        let agent = CounterAgent::new("sensor");
        let response = agent
            .handle_message(AgentMessage::new("sensor", "teleport"))
            .await;
        assert!(!response.success);
        assert_eq!(response.error_message(), "No handler for action: teleport");
    }

    #[tokio::test]
    async fn test_handler_success_wraps_data() {
        let agent = CounterAgent::new("sensor");
        let mut payload = Payload::new();
        payload.insert("x".into(), json!(1));

        let response = agent
            .handle_message(AgentMessage::new("sensor", "echo").with_payload(payload))
            .await;
        assert!(response.success);
        assert_eq!(response.data, Some(json!({"x": 1})));
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_handler_error_is_normalized() {
        let agent = CounterAgent::new("sensor");
        let response = agent.handle_message(AgentMessage::new("sensor", "fail")).await;
        assert!(!response.success);
        assert_eq!(response.error_message(), "Missing required fields");
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        let agent = CounterAgent::new("sensor");
        let response = agent.handle_message(AgentMessage::new("sensor", "panic")).await;
        assert!(!response.success);
        assert!(response.error_message().contains("sensor table corrupted"));
    }

    #[tokio::test]
    async fn test_panic_while_building_future_is_contained() {
        let agent = CounterAgent::new("sensor");
        // Indexing a missing key panics before any future exists
        agent.core().register_handler("lookup", |payload: Payload| {
            let reading = payload["reading"].clone();
            async move { Ok(reading) }
        });

        let response = agent.handle_message(AgentMessage::new("sensor", "lookup")).await;
        assert!(!response.success);
        assert!(response.error_message().starts_with("Handler panicked"));

        let mut payload = Payload::new();
        payload.insert("reading".into(), json!(21.5));
        let response = agent
            .handle_message(AgentMessage::new("sensor", "lookup").with_payload(payload))
            .await;
        assert_eq!(response.data, Some(json!(21.5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_deadline_bounds_handler() {
        let agent = CounterAgent::new("sensor");
        let message = AgentMessage::new("sensor", "hang").with_deadline(Duration::from_millis(250));

        let response = agent.handle_message(message).await;
        assert!(!response.success);
        assert_eq!(response.error_message(), "Operation timed out after 250ms");
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_timeout_applies_without_deadline() {
        let agent = CounterAgent::new("sensor");
        let response = agent.handle_message(AgentMessage::new("sensor", "hang")).await;
        assert_eq!(response.error_message(), "Operation timed out after 1000ms");
    }

    #[tokio::test]
    async fn test_send_message_without_orchestrator() {
        let agent = CounterAgent::new("sensor");
        let response = agent.send_message("data", "query", Payload::new(), None).await;
        assert!(!response.success);
        assert_eq!(response.error_message(), "No orchestrator configured");
    }

    #[tokio::test]
    async fn test_send_message_through_messenger() {
        let agent = CounterAgent::new("sensor");
        let messenger = Arc::new(RecordingMessenger {
            seen: parking_lot::Mutex::new(Vec::new()),
        });
        agent.core().bind_messenger(messenger.clone());

        let response = agent
            .send_message("data", "query", Payload::new(), Some("corr-1".into()))
            .await;
        assert!(response.success);

        let seen = messenger.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].source, "sensor");
        assert_eq!(seen[0].target, "data");
        assert_eq!(seen[0].action, "query");
        assert_eq!(seen[0].correlation_id, "corr-1");
    }

    #[test]
    fn test_status_report() {
        let agent = CounterAgent::new("sensor");
        let report = agent.get_status();
        assert_eq!(report.name, "sensor");
        assert_eq!(report.status, AgentStatus::Idle);
        assert!(report.enabled);
        assert_eq!(report.handlers, vec!["echo", "fail", "hang", "panic"]);
    }
}
