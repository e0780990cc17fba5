//! Request and response types of the integration agent actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::circuit_breaker::State;

fn default_method() -> String {
    "GET".to_string()
}

/// A registered external service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub name: String,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub registered_at: DateTime<Utc>,
}

/// Payload of the `register_service` action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterServiceRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl RegisterServiceRequest {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterServiceResponse {
    pub registered: bool,
    pub service: String,
}

/// Payload of the `call_service` action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallServiceRequest {
    pub service: String,
    /// Path appended to the service base URL
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CallServiceRequest {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            endpoint: String::new(),
            method: default_method(),
            data: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }
}

/// Payload of the `fetch` action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            ..Default::default()
        }
    }
}

/// A fully resolved outbound request handed to a
/// [`ServiceTransport`](super::transport::ServiceTransport)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRequest {
    /// Registered service name, `None` for a plain fetch
    pub service: Option<String>,
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    #[serde(skip)]
    pub api_key: Option<String>,
    pub data: Option<Value>,
}

impl ServiceRequest {
    pub(crate) fn for_service(endpoint: &ServiceEndpoint, call: &CallServiceRequest) -> Self {
        Self {
            service: Some(endpoint.name.clone()),
            url: format!("{}{}", endpoint.base_url, call.endpoint),
            method: call.method.clone(),
            headers: endpoint.headers.clone(),
            api_key: endpoint.api_key.clone(),
            data: call.data.clone(),
        }
    }

    pub(crate) fn for_fetch(fetch: FetchRequest) -> Self {
        Self {
            service: None,
            url: fetch.url,
            method: fetch.method,
            headers: fetch.headers,
            api_key: None,
            data: fetch.data,
        }
    }

    /// Name used in errors and logs
    pub fn label(&self) -> &str {
        self.service.as_deref().unwrap_or(&self.url)
    }
}

/// Payload of the `register_webhook` action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterWebhookRequest {
    #[serde(default)]
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

impl RegisterWebhookRequest {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            callback_url: None,
        }
    }

    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterWebhookResponse {
    pub webhook_id: String,
    pub event: String,
}

/// Payload of the `trigger_webhook` action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerWebhookRequest {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerWebhookResponse {
    pub event: String,
    /// Subscriber ids in registration order
    pub triggered_webhooks: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Result of the `get_stats` action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationStats {
    pub registered_services: Vec<String>,
    pub webhooks_count: usize,
    pub circuit_breaker_states: BTreeMap<String, State>,
}
