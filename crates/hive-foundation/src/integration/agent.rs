//! The integration agent: registered external services behind circuit
//! breakers and retries, plus webhook subscriptions.

use async_trait::async_trait;
use chrono::Utc;
use hive_kernel::{Agent, AgentConfig, AgentCore, AgentError, AgentResult};
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::transport::{
    DEFAULT_REQUEST_TIMEOUT, HttpTransport, ServiceTransport, SimulatedTransport,
};
use super::types::{
    CallServiceRequest, FetchRequest, IntegrationStats, RegisterServiceRequest,
    RegisterServiceResponse, RegisterWebhookRequest, RegisterWebhookResponse, ServiceEndpoint,
    ServiceRequest, TriggerWebhookRequest, TriggerWebhookResponse,
};
use super::webhook::WebhookRegistry;
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, State};
use crate::config::HiveSettings;
use crate::retry::{RetryConfig, retry_with_backoff};

/// Default name of the integration agent
pub const INTEGRATION_AGENT_NAME: &str = "integration";

// ============================================================================
// IntegrationState - shared by the agent and its handlers
// ============================================================================

struct IntegrationState {
    services: RwLock<BTreeMap<String, ServiceEndpoint>>,
    breakers: Mutex<BTreeMap<String, CircuitBreaker>>,
    webhooks: RwLock<WebhookRegistry>,
    transport: Arc<dyn ServiceTransport>,
    breaker_config: CircuitBreakerConfig,
    retry: RetryConfig,
}

impl IntegrationState {
    fn register_service(&self, request: RegisterServiceRequest) -> AgentResult<RegisterServiceResponse> {
        if request.name.is_empty() || request.base_url.is_empty() {
            return Err(AgentError::InvalidInput(
                "Name and base_url are required".to_string(),
            ));
        }

        let name = request.name;
        let endpoint = ServiceEndpoint {
            name: name.clone(),
            base_url: request.base_url,
            api_key: request.api_key,
            headers: request.headers,
            registered_at: Utc::now(),
        };

        let replaced = self.services.write().insert(name.clone(), endpoint).is_some();
        self.breakers.lock().insert(
            name.clone(),
            CircuitBreaker::new(name.clone(), self.breaker_config.clone()),
        );
        info!(service = %name, replaced, "Registered external service");

        Ok(RegisterServiceResponse {
            registered: true,
            service: name,
        })
    }

    async fn call_service(&self, request: CallServiceRequest) -> AgentResult<Value> {
        let endpoint = self
            .services
            .read()
            .get(&request.service)
            .cloned()
            .ok_or_else(|| AgentError::ServiceNotRegistered(request.service.clone()))?;

        self.breakers
            .lock()
            .entry(endpoint.name.clone())
            .or_insert_with(|| CircuitBreaker::new(endpoint.name.clone(), self.breaker_config.clone()))
            .try_acquire()?;

        let service_request = ServiceRequest::for_service(&endpoint, &request);
        debug!(service = %endpoint.name, url = %service_request.url, "Calling external service");

        let pending = PendingCall::new(&self.breakers, &endpoint.name);
        let transport = self.transport.clone();
        let outcome = retry_with_backoff(&self.retry, AgentError::is_retryable, || {
            let transport = transport.clone();
            let service_request = service_request.clone();
            async move { transport.send(&service_request).await }
        })
        .await;

        match outcome {
            Ok(retried) => {
                pending.succeeded();
                let mut body = retried.value;
                if let Some(map) = body.as_object_mut() {
                    map.insert("attempt".to_string(), json!(retried.attempts));
                } else {
                    body = json!({ "response": body, "attempt": retried.attempts });
                }
                Ok(body)
            }
            Err(e) => {
                pending.failed();
                warn!(
                    service = %endpoint.name,
                    attempts = e.attempts,
                    error = %e.last_error,
                    "External service call failed"
                );
                Err(e.into())
            }
        }
    }

    async fn fetch(&self, request: FetchRequest) -> AgentResult<Value> {
        if request.url.is_empty() {
            return Err(AgentError::InvalidInput("URL is required".to_string()));
        }
        let service_request = ServiceRequest::for_fetch(request);
        debug!(url = %service_request.url, "Fetching external URL");
        self.transport.send(&service_request).await
    }

    fn register_webhook(&self, request: RegisterWebhookRequest) -> AgentResult<RegisterWebhookResponse> {
        if request.event.is_empty() {
            return Err(AgentError::InvalidInput("Event name is required".to_string()));
        }
        let webhook_id = self
            .webhooks
            .write()
            .register(&request.event, request.callback_url);
        info!(event = %request.event, webhook_id = %webhook_id, "Registered webhook");

        Ok(RegisterWebhookResponse {
            webhook_id,
            event: request.event,
        })
    }

    fn trigger_webhook(&self, request: TriggerWebhookRequest) -> TriggerWebhookResponse {
        let triggered: Vec<String> = self
            .webhooks
            .read()
            .subscribers(&request.event)
            .into_iter()
            .map(|w| w.id.clone())
            .collect();
        debug!(event = %request.event, subscribers = triggered.len(), "Triggered webhook event");

        TriggerWebhookResponse {
            event: request.event,
            triggered_webhooks: triggered,
            timestamp: Utc::now(),
        }
    }

    fn stats(&self) -> IntegrationStats {
        IntegrationStats {
            registered_services: self.services.read().keys().cloned().collect(),
            webhooks_count: self.webhooks.read().len(),
            circuit_breaker_states: self
                .breakers
                .lock()
                .iter()
                .map(|(name, cb)| (name.clone(), cb.state()))
                .collect(),
        }
    }
}

/// Breaker bookkeeping for one admitted call
///
/// Settles the call as a success or a failure exactly once. A call dropped
/// before it settles (deadline elapsed, caller gone) counts as a failure.
struct PendingCall<'a> {
    breakers: &'a Mutex<BTreeMap<String, CircuitBreaker>>,
    service: &'a str,
    settled: bool,
}

impl<'a> PendingCall<'a> {
    fn new(breakers: &'a Mutex<BTreeMap<String, CircuitBreaker>>, service: &'a str) -> Self {
        Self {
            breakers,
            service,
            settled: false,
        }
    }

    fn settle(&mut self, success: bool) {
        if std::mem::replace(&mut self.settled, true) {
            return;
        }
        if let Some(breaker) = self.breakers.lock().get_mut(self.service) {
            if success {
                breaker.record_success();
            } else {
                breaker.record_failure();
            }
        }
    }

    fn succeeded(mut self) {
        self.settle(true);
    }

    fn failed(mut self) {
        self.settle(false);
    }
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(service = %self.service, "External service call abandoned before completion");
            self.settle(false);
        }
    }
}

// ============================================================================
// IntegrationAgent
// ============================================================================

/// External communication agent
///
/// Actions: `fetch`, `register_service`, `call_service`, `register_webhook`,
/// `trigger_webhook` and `get_stats`. Every action is also available as a
/// direct method.
pub struct IntegrationAgent {
    core: AgentCore,
    state: Arc<IntegrationState>,
}

impl IntegrationAgent {
    /// Integration agent with default configuration and the HTTP transport
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> IntegrationAgentBuilder {
        IntegrationAgentBuilder::new()
    }

    pub fn register_service(&self, request: RegisterServiceRequest) -> AgentResult<RegisterServiceResponse> {
        self.state.register_service(request)
    }

    /// Call a registered service through its breaker, retrying transient
    /// failures. The result carries the transport body plus `attempt`.
    pub async fn call_service(&self, request: CallServiceRequest) -> AgentResult<Value> {
        self.state.call_service(request).await
    }

    /// Single un-breakered request to an arbitrary URL
    pub async fn fetch(&self, request: FetchRequest) -> AgentResult<Value> {
        self.state.fetch(request).await
    }

    pub fn register_webhook(&self, request: RegisterWebhookRequest) -> AgentResult<RegisterWebhookResponse> {
        self.state.register_webhook(request)
    }

    pub fn unregister_webhook(&self, webhook_id: &str) -> bool {
        self.state.webhooks.write().unregister(webhook_id).is_some()
    }

    pub fn trigger_webhook(&self, request: TriggerWebhookRequest) -> TriggerWebhookResponse {
        self.state.trigger_webhook(request)
    }

    pub fn stats(&self) -> IntegrationStats {
        self.state.stats()
    }

    /// Registered service names in sorted order
    pub fn services(&self) -> Vec<String> {
        self.state.services.read().keys().cloned().collect()
    }

    pub fn breaker_state(&self, service: &str) -> Option<State> {
        self.state.breakers.lock().get(service).map(|cb| cb.state())
    }

    pub fn breaker_snapshot(&self, service: &str) -> Option<CircuitBreakerSnapshot> {
        self.state.breakers.lock().get(service).map(|cb| cb.snapshot())
    }

    /// Close the breaker of `service` by hand. Returns `false` if unknown.
    pub fn reset_breaker(&self, service: &str) -> bool {
        match self.state.breakers.lock().get_mut(service) {
            Some(cb) => {
                cb.reset();
                info!(service = %service, "Circuit breaker reset");
                true
            }
            None => false,
        }
    }

    pub fn transport_name(&self) -> &str {
        self.state.transport.name()
    }

    fn register_handlers(&self) {
        let state = self.state.clone();
        self.core.register_typed_handler("fetch", move |req: FetchRequest| {
            let state = state.clone();
            async move { state.fetch(req).await }
        });

        let state = self.state.clone();
        self.core
            .register_typed_handler("register_service", move |req: RegisterServiceRequest| {
                let state = state.clone();
                async move { state.register_service(req) }
            });

        let state = self.state.clone();
        self.core
            .register_typed_handler("call_service", move |req: CallServiceRequest| {
                let state = state.clone();
                async move { state.call_service(req).await }
            });

        let state = self.state.clone();
        self.core
            .register_typed_handler("register_webhook", move |req: RegisterWebhookRequest| {
                let state = state.clone();
                async move { state.register_webhook(req) }
            });

        let state = self.state.clone();
        self.core
            .register_typed_handler("trigger_webhook", move |req: TriggerWebhookRequest| {
                let state = state.clone();
                async move { Ok::<_, AgentError>(state.trigger_webhook(req)) }
            });

        let state = self.state.clone();
        self.core.register_handler("get_stats", move |_payload| {
            let state = state.clone();
            async move { Ok::<_, AgentError>(serde_json::to_value(state.stats())?) }
        });
    }
}

impl Default for IntegrationAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for IntegrationAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn on_start(&self) -> AgentResult<()> {
        info!(agent = %self.name(), transport = %self.transport_name(), "Integration agent initialized");
        Ok(())
    }

    async fn on_stop(&self) -> AgentResult<()> {
        info!(agent = %self.name(), "Integration agent stopped");
        Ok(())
    }
}

// ============================================================================
// IntegrationAgentBuilder
// ============================================================================

/// Builder for [`IntegrationAgent`]
///
/// Unless a retry configuration is supplied, the attempt budget is the agent
/// configuration's `max_retries`.
pub struct IntegrationAgentBuilder {
    config: AgentConfig,
    transport: Option<Arc<dyn ServiceTransport>>,
    breaker_config: CircuitBreakerConfig,
    retry: Option<RetryConfig>,
}

impl IntegrationAgentBuilder {
    pub fn new() -> Self {
        Self {
            config: AgentConfig::new(INTEGRATION_AGENT_NAME)
                .with_description("External API integrations and webhooks"),
            transport: None,
            breaker_config: CircuitBreakerConfig::default(),
            retry: None,
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn ServiceTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use the offline [`SimulatedTransport`]
    pub fn simulated(self) -> Self {
        self.with_transport(Arc::new(SimulatedTransport::new()))
    }

    pub fn with_circuit_breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker_config = config;
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Take the agent configuration (when listed), breaker and retry defaults
    /// from loaded settings
    pub fn with_settings(mut self, settings: &HiveSettings) -> Self {
        if let Some(config) = settings.agent(&self.config.name) {
            self.config = config.clone();
        }
        self.breaker_config = settings.circuit_breaker.clone();
        self.retry = Some(settings.retry.clone().with_max_attempts(self.config.max_retries));
        self
    }

    pub fn build(self) -> IntegrationAgent {
        let retry = self
            .retry
            .unwrap_or_else(|| RetryConfig::default().with_max_attempts(self.config.max_retries));
        let request_timeout = self.config.timeout().unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(HttpTransport::with_timeout(request_timeout)));

        let agent = IntegrationAgent {
            core: AgentCore::new(self.config),
            state: Arc::new(IntegrationState {
                services: RwLock::new(BTreeMap::new()),
                breakers: Mutex::new(BTreeMap::new()),
                webhooks: RwLock::new(WebhookRegistry::new()),
                transport,
                breaker_config: self.breaker_config,
                retry,
            }),
        };
        agent.register_handlers();
        agent
    }
}

impl Default for IntegrationAgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
