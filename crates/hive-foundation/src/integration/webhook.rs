//! Webhook subscriptions keyed by event name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One webhook subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: String,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    pub registered_at: DateTime<Utc>,
}

/// Subscriptions in registration order
#[derive(Debug, Clone, Default)]
pub struct WebhookRegistry {
    webhooks: Vec<Webhook>,
}

impl WebhookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription and return its id
    pub fn register(&mut self, event: &str, callback_url: Option<String>) -> String {
        let id = format!("webhook_{}_{}", event, Uuid::new_v4().simple());
        self.webhooks.push(Webhook {
            id: id.clone(),
            event: event.to_string(),
            callback_url,
            registered_at: Utc::now(),
        });
        id
    }

    pub fn unregister(&mut self, id: &str) -> Option<Webhook> {
        let index = self.webhooks.iter().position(|w| w.id == id)?;
        Some(self.webhooks.remove(index))
    }

    /// Subscribers of `event`, in registration order
    pub fn subscribers(&self, event: &str) -> Vec<&Webhook> {
        self.webhooks.iter().filter(|w| w.event == event).collect()
    }

    pub fn len(&self) -> usize {
        self.webhooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.webhooks.is_empty()
    }
}
