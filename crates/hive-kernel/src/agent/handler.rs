//! 动作处理器表
//! Action handler table
//!
//! Maps action names to async functions `Payload -> AgentResult<Value>`.
//! Typed handlers wrap a request/response struct pair around the same
//! dynamic entry point, so a generic message bridge still only sees JSON.

use crate::agent::error::{AgentError, AgentResult};
use crate::message::Payload;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a handler
pub type HandlerFuture = BoxFuture<'static, AgentResult<Value>>;

/// A registered action handler
pub type Handler = Arc<dyn Fn(Payload) -> HandlerFuture + Send + Sync>;

/// Action name → handler
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: BTreeMap<String, Handler>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `action`, replacing any earlier registration.
    pub fn register<F, Fut>(&mut self, action: impl Into<String>, handler: F)
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AgentResult<Value>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |payload| Box::pin(handler(payload)));
        self.handlers.insert(action.into(), handler);
    }

    /// Register a handler taking a typed request and returning a typed
    /// response.
    ///
    /// A payload that does not deserialize into `Req` fails with
    /// [`AgentError::InvalidInput`] before the handler runs.
    pub fn register_typed<Req, Resp, F, Fut>(&mut self, action: impl Into<String>, handler: F)
    where
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + Send + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AgentResult<Resp>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        self.register(action, move |payload: Payload| {
            let handler = Arc::clone(&handler);
            async move {
                let request: Req = serde_json::from_value(Value::Object(payload))
                    .map_err(|e| AgentError::InvalidInput(e.to_string()))?;
                let response = handler(request).await?;
                Ok::<Value, AgentError>(serde_json::to_value(response)?)
            }
        });
    }

    pub fn get(&self, action: &str) -> Option<Handler> {
        self.handlers.get(action).cloned()
    }

    pub fn contains(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Registered action names in sorted order
    pub fn actions(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("actions", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct AddRequest {
        a: i64,
        b: i64,
    }

    #[derive(Serialize)]
    struct AddResponse {
        sum: i64,
    }

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => Payload::new(),
        }
    }

    #[tokio::test]
    async fn test_register_and_invoke() {
        let mut table = HandlerTable::new();
        table.register("echo", |payload: Payload| async move {
            Ok(Value::Object(payload))
        });

        let handler = table.get("echo").unwrap();
        let result = handler(payload(json!({"k": "v"}))).await.unwrap();
        assert_eq!(result, json!({"k": "v"}));
        assert!(table.get("missing").is_none());
    }

    #[tokio::test]
    async fn test_later_registration_replaces() {
        let mut table = HandlerTable::new();
        table.register("version", |_| async { Ok(json!(1)) });
        table.register("version", |_| async { Ok(json!(2)) });

        assert_eq!(table.len(), 1);
        let handler = table.get("version").unwrap();
        assert_eq!(handler(Payload::new()).await.unwrap(), json!(2));
    }

    #[tokio::test]
    async fn test_typed_handler() {
        let mut table = HandlerTable::new();
        table.register_typed("add", |req: AddRequest| async move {
            Ok(AddResponse { sum: req.a + req.b })
        });

        let handler = table.get("add").unwrap();
        let result = handler(payload(json!({"a": 2, "b": 3}))).await.unwrap();
        assert_eq!(result, json!({"sum": 5}));

        let err = handler(payload(json!({"a": "two"}))).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
    }

    #[test]
    fn test_actions_are_sorted() {
        let mut table = HandlerTable::new();
        table.register("zeta", |_| async { Ok(Value::Null) });
        table.register("alpha", |_| async { Ok(Value::Null) });
        assert_eq!(table.actions(), vec!["alpha".to_string(), "zeta".to_string()]);
    }
}
