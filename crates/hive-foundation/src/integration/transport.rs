//! Pluggable transports performing the actual outbound request.
//!
//! The integration agent decides *whether* and *how often* a call is made
//! (registry, circuit breaker, retries); a [`ServiceTransport`] only performs a
//! single attempt.

use async_trait::async_trait;
use chrono::Utc;
use hive_kernel::{AgentError, AgentResult};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use super::types::ServiceRequest;

/// Performs one outbound request
///
/// Transient failures (network errors, 5xx, 429) should be reported with a
/// retryable [`AgentError`] such as `ServiceCallFailed`; requests the remote
/// side refuses for good should use a non-retryable one such as
/// `InvalidInput`.
#[async_trait]
pub trait ServiceTransport: Send + Sync {
    async fn send(&self, request: &ServiceRequest) -> AgentResult<Value>;

    fn name(&self) -> &str {
        "transport"
    }
}

// ============================================================================
// HttpTransport
// ============================================================================

/// Per-request timeout of [`HttpTransport::new`]
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Every request fails with a retryable error once `timeout` elapses
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client, falling back to defaults");
                reqwest::Client::new()
            });
        Self { client }
    }

    /// Use a preconfigured client (timeouts, proxies, TLS settings)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn map_error(label: &str, err: reqwest::Error) -> AgentError {
        if err.is_timeout() {
            AgentError::service_call_failed(label, format!("request timed out: {err}"))
        } else {
            AgentError::service_call_failed(label, format!("request failed: {err}"))
        }
    }
}

#[async_trait]
impl ServiceTransport for HttpTransport {
    async fn send(&self, request: &ServiceRequest) -> AgentResult<Value> {
        let label = request.label();
        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| AgentError::InvalidInput(format!("Unsupported HTTP method: {}", request.method)))?;

        let mut builder = self.client.request(method.clone(), &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(api_key) = &request.api_key {
            builder = builder.bearer_auth(api_key);
        }
        if let Some(data) = &request.data {
            builder = builder.json(data);
        }

        debug!(target_url = %request.url, method = %method, "Sending HTTP request");
        let resp = builder.send().await.map_err(|e| Self::map_error(label, e))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| Self::map_error(label, e))?;

        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AgentError::service_call_failed(label, format!("HTTP {}", status.as_u16())));
        }
        if status.is_client_error() {
            return Err(AgentError::InvalidInput(format!(
                "{label} rejected the request with HTTP {}",
                status.as_u16()
            )));
        }

        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
        Ok(json!({
            "url": request.url,
            "method": method.as_str(),
            "status": status.as_u16(),
            "response": body,
            "timestamp": Utc::now(),
        }))
    }

    fn name(&self) -> &str {
        "http"
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SimulatedTransport
// ============================================================================

/// Offline transport answering every request with a simulated 200 response
#[derive(Debug, Clone, Default)]
pub struct SimulatedTransport {
    latency: Duration,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated network latency per request
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl ServiceTransport for SimulatedTransport {
    async fn send(&self, request: &ServiceRequest) -> AgentResult<Value> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(json!({
            "url": request.url,
            "method": request.method,
            "status": 200,
            "response": {"data": "simulated response"},
            "timestamp": Utc::now(),
        }))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn request(method: &str) -> ServiceRequest {
        ServiceRequest {
            service: Some("weather".into()),
            url: "https://api.example.com/forecast".into(),
            method: method.into(),
            headers: BTreeMap::new(),
            api_key: None,
            data: None,
        }
    }

    #[tokio::test]
    async fn test_simulated_transport_echoes_request() {
        let body = SimulatedTransport::new().send(&request("POST")).await.unwrap();
        assert_eq!(body["url"], "https://api.example.com/forecast");
        assert_eq!(body["method"], "POST");
        assert_eq!(body["status"], 200);
        assert_eq!(body["response"]["data"], "simulated response");
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_latency() {
        let transport = SimulatedTransport::with_latency(Duration::from_millis(100));
        let started = tokio::time::Instant::now();
        transport.send(&request("GET")).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_http_rejects_invalid_method() {
        let err = HttpTransport::new().send(&request("NOT A METHOD")).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
        assert!(!err.is_retryable());
    }
}
