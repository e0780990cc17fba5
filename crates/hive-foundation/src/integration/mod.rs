//! External integrations
//!
//! [`IntegrationAgent`] is the only component that talks to the outside
//! world. It keeps a registry of named services, guards each one with its own
//! [`CircuitBreaker`](crate::circuit_breaker::CircuitBreaker), retries
//! transient failures with exponential backoff and tracks webhook
//! subscriptions. The request itself is performed by a pluggable
//! [`ServiceTransport`].

pub mod agent;
pub mod transport;
pub mod types;
pub mod webhook;

pub use self::agent::{INTEGRATION_AGENT_NAME, IntegrationAgent, IntegrationAgentBuilder};
pub use self::transport::{HttpTransport, ServiceTransport, SimulatedTransport};
pub use self::types::{
    CallServiceRequest, FetchRequest, IntegrationStats, RegisterServiceRequest,
    RegisterServiceResponse, RegisterWebhookRequest, RegisterWebhookResponse, ServiceEndpoint,
    ServiceRequest, TriggerWebhookRequest, TriggerWebhookResponse,
};
pub use self::webhook::{Webhook, WebhookRegistry};
