use async_trait::async_trait;
use hive_foundation::integration::{ServiceRequest, ServiceTransport};
use hive_kernel::{AgentError, AgentResult};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// A transport that plays back scripted outcomes
///
/// Queued outcomes are consumed one per attempt; once the queue is empty the
/// fallback outcome is returned. Every request is recorded when it arrives,
/// before any configured latency.
#[derive(Clone)]
pub struct ScriptedTransport {
    script: Arc<RwLock<VecDeque<AgentResult<Value>>>>,
    fallback: Arc<RwLock<AgentResult<Value>>>,
    latency: Arc<RwLock<Duration>>,
    /// Every request received, in order
    pub requests: Arc<RwLock<Vec<ServiceRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            script: Arc::new(RwLock::new(VecDeque::new())),
            fallback: Arc::new(RwLock::new(Ok(json!({"status": 200})))),
            latency: Arc::new(RwLock::new(Duration::ZERO)),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Convenience for handing the transport to an integration agent
    pub fn shared(&self) -> Arc<dyn ServiceTransport> {
        Arc::new(self.clone())
    }

    pub async fn push_ok(&self, body: Value) {
        self.script.write().await.push_back(Ok(body));
    }

    pub async fn push_err(&self, err: AgentError) {
        self.script.write().await.push_back(Err(err));
    }

    /// Queue `n` transient failures (`HTTP 503`) for `service`
    pub async fn push_transient_failures(&self, service: &str, n: usize) {
        let mut script = self.script.write().await;
        for _ in 0..n {
            script.push_back(Err(AgentError::service_call_failed(service, "HTTP 503")));
        }
    }

    /// Outcome returned once the script is exhausted
    pub async fn set_fallback(&self, outcome: AgentResult<Value>) {
        *self.fallback.write().await = outcome;
    }

    /// Sleep `latency` before answering each request
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = latency;
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    pub async fn history(&self) -> Vec<ServiceRequest> {
        self.requests.read().await.clone()
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceTransport for ScriptedTransport {
    async fn send(&self, request: &ServiceRequest) -> AgentResult<Value> {
        self.requests.write().await.push(request.clone());
        let latency = *self.latency.read().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let scripted = self.script.write().await.pop_front();
        match scripted {
            Some(outcome) => outcome,
            None => self.fallback.read().await.clone(),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
