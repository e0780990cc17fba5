//! Hive settings
//!
//! One document describing a whole deployment: the orchestrator identity,
//! per-agent configuration, workflows in textual `agent:action` form, and
//! circuit breaker and retry defaults for the integration layer.
//!
//! ```yaml
//! orchestrator:
//!   name: orchestrator
//! agents:
//!   - name: integration
//!     max_retries: 5
//! workflows:
//!   inspect: ["sensor:read", "vision:detect"]
//! circuit_breaker:
//!   failure_threshold: 3
//!   recovery_timeout_ms: 10000
//! retry:
//!   base_delay_ms: 500
//! ```
//!
//! Values may reference environment variables as `${VAR}` or `$VAR`. Map
//! keys (such as workflow names) are lowercased by the loader.

use error_stack::{Report, ResultExt};
use hive_kernel::config::{self as loader, Format};
use hive_kernel::{AgentConfig, AgentResult, KernelError, KernelResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::orchestrator::{ORCHESTRATOR_NAME, Workflow};
use crate::retry::RetryConfig;

fn default_orchestrator() -> AgentConfig {
    AgentConfig::new(ORCHESTRATOR_NAME)
}

/// Deployment-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiveSettings {
    #[serde(default = "default_orchestrator")]
    pub orchestrator: AgentConfig,
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
    /// Workflow name → `agent:action` steps
    #[serde(default)]
    pub workflows: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for HiveSettings {
    fn default() -> Self {
        Self {
            orchestrator: default_orchestrator(),
            agents: Vec::new(),
            workflows: BTreeMap::new(),
            circuit_breaker: CircuitBreakerConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl HiveSettings {
    /// Load and validate settings from a file, detecting the format from its
    /// extension
    pub fn load(path: impl AsRef<Path>) -> KernelResult<Self> {
        let path = path.as_ref();
        let settings: Self = loader::load_config(path)
            .map_err(|e| Report::new(KernelError::from(e)))
            .attach(format!("loading hive settings from {}", path.display()))?;
        settings
            .validate()
            .map_err(|e| Report::new(KernelError::from(e)))
            .attach(format!("validating hive settings from {}", path.display()))?;
        Ok(settings)
    }

    /// Parse and validate settings from a string
    pub fn from_source(content: &str, format: Format) -> KernelResult<Self> {
        let settings: Self = loader::from_str(content, format)
            .map_err(|e| Report::new(KernelError::from(e)))
            .attach("parsing hive settings")?;
        settings
            .validate()
            .map_err(|e| Report::new(KernelError::from(e)))
            .attach("validating hive settings")?;
        Ok(settings)
    }

    /// Configuration of the agent named `name`, if listed
    pub fn agent(&self, name: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// Parse every declared workflow
    pub fn parsed_workflows(&self) -> AgentResult<Vec<Workflow>> {
        self.workflows
            .iter()
            .map(|(name, steps)| Workflow::parse(name.clone(), steps.as_slice()))
            .collect()
    }

    /// Reject malformed workflow steps
    pub fn validate(&self) -> AgentResult<()> {
        self.parsed_workflows().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_kernel::AgentError;
    use std::io::Write;

    const SETTINGS: &str = r#"
orchestrator:
  name: hive
  description: test hive
agents:
  - name: integration
    max_retries: 5
  - name: vision
    enabled: false
workflows:
  inspect: ["sensor:read", "vision:detect"]
circuit_breaker:
  failure_threshold: 3
retry:
  base_delay_ms: 250
"#;

    #[test]
    fn test_defaults() {
        let settings = HiveSettings::default();
        assert_eq!(settings.orchestrator.name, ORCHESTRATOR_NAME);
        assert_eq!(settings.circuit_breaker, CircuitBreakerConfig::default());
        assert!(settings.workflows.is_empty());
    }

    #[test]
    fn test_from_yaml_str() {
        let settings = HiveSettings::from_source(SETTINGS, Format::Yaml).unwrap();
        assert_eq!(settings.orchestrator.name, "hive");
        assert_eq!(settings.agent("integration").unwrap().max_retries, 5);
        assert!(!settings.agent("vision").unwrap().enabled);
        assert!(settings.agent("ghost").is_none());
        assert_eq!(settings.circuit_breaker.failure_threshold, 3);
        assert_eq!(settings.circuit_breaker.recovery_timeout_ms, 30_000);
        assert_eq!(settings.retry.base_delay_ms, 250);
        assert_eq!(settings.retry.max_attempts, 3);

        let workflows = settings.parsed_workflows().unwrap();
        assert_eq!(workflows.len(), 1);
        assert_eq!(workflows[0].steps[1].to_string(), "vision:detect");
    }

    #[test]
    fn test_load_with_env_substitution() {
        unsafe { std::env::set_var("HIVE_SETTINGS_TEST_THRESHOLD", "7"); }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hive.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[circuit_breaker]\nfailure_threshold = ${{HIVE_SETTINGS_TEST_THRESHOLD}}\n\n[workflows]\nping = [\"echo:ping\"]"
        )
        .unwrap();

        let settings = HiveSettings::load(&path).unwrap();
        assert_eq!(settings.circuit_breaker.failure_threshold, 7);
        assert_eq!(settings.workflows["ping"], vec!["echo:ping"]);
    }

    #[test]
    fn test_malformed_step_is_reported_with_context() {
        let report = HiveSettings::from_source(
            r#"{"workflows": {"broken": ["no-colon"]}}"#,
            Format::Json,
        )
        .unwrap_err();

        assert!(matches!(
            report.current_context(),
            KernelError::InvalidSettings(AgentError::InvalidInput(_))
        ));
        assert!(format!("{report:?}").contains("validating hive settings"));
    }

    #[test]
    fn test_missing_file() {
        let report = HiveSettings::load("/nonexistent/hive.yaml").unwrap_err();
        assert!(matches!(report.current_context(), KernelError::Load(_)));
    }
}
