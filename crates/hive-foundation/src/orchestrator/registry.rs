//! Agent registry preserving registration order

use hive_kernel::Agent;
use std::collections::HashMap;
use std::sync::Arc;

/// Name → agent table iterated in first-registration order
///
/// Re-registering a name replaces the agent but keeps its original position.
#[derive(Default)]
pub struct AgentRegistry {
    order: Vec<String>,
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an agent under its own name, returning the one it replaced
    pub fn insert(&mut self, agent: Arc<dyn Agent>) -> Option<Arc<dyn Agent>> {
        let name = agent.name().to_string();
        let previous = self.agents.insert(name.clone(), agent);
        if previous.is_none() {
            self.order.push(name);
        }
        previous
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Agent>> {
        let removed = self.agents.remove(name)?;
        self.order.retain(|n| n != name);
        Some(removed)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Cloned handles in registration order, for use after the lock is released
    pub fn snapshot(&self) -> Vec<Arc<dyn Agent>> {
        self.order
            .iter()
            .filter_map(|name| self.agents.get(name).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hive_kernel::{AgentConfig, AgentCore};

    struct Named {
        core: AgentCore,
    }

    #[async_trait]
    impl Agent for Named {
        fn core(&self) -> &AgentCore {
            &self.core
        }
    }

    fn named(name: &str, description: &str) -> Arc<dyn Agent> {
        Arc::new(Named {
            core: AgentCore::new(AgentConfig::new(name).with_description(description)),
        })
    }

    #[test]
    fn test_order_survives_replacement() {
        let mut registry = AgentRegistry::new();
        registry.insert(named("sensor", "v1"));
        registry.insert(named("vision", "v1"));
        let previous = registry.insert(named("sensor", "v2"));

        assert_eq!(previous.map(|a| a.config().description.clone()), Some("v1".into()));
        assert_eq!(registry.names(), vec!["sensor", "vision"]);
        assert_eq!(registry.get("sensor").unwrap().config().description, "v2");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut registry = AgentRegistry::new();
        registry.insert(named("sensor", ""));
        registry.insert(named("vision", ""));

        assert!(registry.remove("sensor").is_some());
        assert!(registry.remove("sensor").is_none());
        assert!(!registry.contains("sensor"));
        let names: Vec<_> = registry.snapshot().iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["vision"]);
    }
}
