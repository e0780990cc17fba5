use async_trait::async_trait;
use hive_kernel::{Agent, AgentConfig, AgentCore, AgentError, AgentResult, Payload};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// What a mock action does when invoked
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Return the given result
    Respond(AgentResult<Value>),
    /// Return the payload unchanged
    Echo,
    /// Panic with the given message
    Panic(String),
}

/// One recorded invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub action: String,
    pub payload: Payload,
}

#[derive(Default)]
struct MockState {
    calls: RwLock<Vec<RecordedCall>>,
    defaults: RwLock<HashMap<String, Behavior>>,
    scripts: RwLock<HashMap<String, VecDeque<Behavior>>>,
    delays: RwLock<HashMap<String, Duration>>,
    start_failure: RwLock<Option<String>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl MockState {
    async fn invoke(&self, action: &str, payload: Payload) -> AgentResult<Value> {
        self.calls.write().await.push(RecordedCall {
            action: action.to_string(),
            payload: payload.clone(),
        });

        let delay = self.delays.read().await.get(action).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .scripts
            .write()
            .await
            .get_mut(action)
            .and_then(|queue| queue.pop_front());
        let behavior = match scripted {
            Some(behavior) => behavior,
            None => self
                .defaults
                .read()
                .await
                .get(action)
                .cloned()
                .unwrap_or(Behavior::Echo),
        };

        match behavior {
            Behavior::Respond(result) => result,
            Behavior::Echo => Ok(Value::Object(payload)),
            Behavior::Panic(message) => panic!("{message}"),
        }
    }
}

/// A mock agent with scripted actions
///
/// Every configured action records its payload, optionally sleeps, then
/// plays the next queued behavior or, when the queue is empty, the default
/// one.
#[derive(Clone)]
pub struct MockAgent {
    core: Arc<AgentCore>,
    state: Arc<MockState>,
}

impl MockAgent {
    pub fn new(name: &str) -> Self {
        Self::with_config(AgentConfig::new(name))
    }

    pub fn with_config(config: AgentConfig) -> Self {
        Self {
            core: Arc::new(AgentCore::new(config)),
            state: Arc::new(MockState::default()),
        }
    }

    /// Convenience for registering with an orchestrator
    pub fn shared(&self) -> Arc<dyn Agent> {
        Arc::new(self.clone())
    }

    fn install(&self, action: &str) {
        let state = self.state.clone();
        let action_name = action.to_string();
        self.core.register_handler(action, move |payload| {
            let state = state.clone();
            let action = action_name.clone();
            async move { state.invoke(&action, payload).await }
        });
    }

    /// Default behavior of `action`, replacing any previous default
    pub async fn set_behavior(&self, action: &str, behavior: Behavior) {
        self.state
            .defaults
            .write()
            .await
            .insert(action.to_string(), behavior);
        self.install(action);
    }

    /// `action` answers with `result` until told otherwise
    pub async fn respond(&self, action: &str, result: AgentResult<Value>) {
        self.set_behavior(action, Behavior::Respond(result)).await;
    }

    /// `action` fails with an `ExecutionFailed` error carrying `message`
    pub async fn fail(&self, action: &str, message: &str) {
        self.respond(action, Err(AgentError::ExecutionFailed(message.to_string())))
            .await;
    }

    /// `action` returns its payload
    pub async fn echo(&self, action: &str) {
        self.set_behavior(action, Behavior::Echo).await;
    }

    /// Queue a one-shot behavior played before the default
    pub async fn enqueue(&self, action: &str, behavior: Behavior) {
        self.state
            .scripts
            .write()
            .await
            .entry(action.to_string())
            .or_default()
            .push_back(behavior);
        self.install(action);
    }

    /// Sleep `delay` before producing each result of `action`
    pub async fn set_delay(&self, action: &str, delay: Duration) {
        self.state
            .delays
            .write()
            .await
            .insert(action.to_string(), delay);
    }

    /// Make the startup hook fail with `reason`
    pub async fn fail_on_start(&self, reason: &str) {
        *self.state.start_failure.write().await = Some(reason.to_string());
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.read().await.clone()
    }

    pub async fn call_count(&self, action: &str) -> usize {
        self.state
            .calls
            .read()
            .await
            .iter()
            .filter(|c| c.action == action)
            .count()
    }

    pub async fn total_calls(&self) -> usize {
        self.state.calls.read().await.len()
    }

    pub async fn clear_history(&self) {
        self.state.calls.write().await.clear();
    }

    pub fn start_count(&self) -> usize {
        self.state.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.state.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn on_start(&self) -> AgentResult<()> {
        self.state.starts.fetch_add(1, Ordering::SeqCst);
        let failure = self.state.start_failure.read().await.clone();
        match failure {
            Some(reason) => Err(AgentError::ExecutionFailed(reason)),
            None => Ok(()),
        }
    }

    async fn on_stop(&self) -> AgentResult<()> {
        self.state.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
