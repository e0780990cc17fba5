//! Workflow definitions
//!
//! A workflow is a named, ordered list of `agent:action` steps. Each step
//! receives the payload accumulated so far; a successful step whose result is
//! a JSON object is merged into that payload before the next step runs.

use hive_kernel::{AgentError, AgentResult, Payload};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// One `agent:action` step
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub agent: String,
    pub action: String,
}

impl WorkflowStep {
    pub fn new(agent: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            action: action.into(),
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.agent, self.action)
    }
}

impl FromStr for WorkflowStep {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((agent, action))
                if !agent.trim().is_empty()
                    && !action.trim().is_empty()
                    && !action.contains(':') =>
            {
                Ok(Self::new(agent.trim(), action.trim()))
            }
            _ => Err(AgentError::InvalidInput(format!(
                "Invalid workflow step '{s}': expected agent:action"
            ))),
        }
    }
}

/// How a step result is merged into the running payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Keys from the step result overwrite existing keys
    #[default]
    LastWriteWins,
    /// A key already present in the payload fails the workflow
    RejectConflicts,
}

impl MergePolicy {
    /// Shallow-merge `result` into `payload`, returning the first conflicting
    /// key under [`MergePolicy::RejectConflicts`]
    pub fn merge(self, payload: &mut Payload, result: &Payload) -> Result<(), String> {
        if self == MergePolicy::RejectConflicts {
            if let Some(key) = result.keys().find(|k| payload.contains_key(*k)) {
                return Err(key.clone());
            }
        }
        for (key, value) in result {
            payload.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

/// A named, ordered list of steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub merge_policy: MergePolicy,
}

impl Workflow {
    pub fn new(name: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self {
            name: name.into(),
            steps,
            merge_policy: MergePolicy::default(),
        }
    }

    /// Build a workflow from textual `agent:action` steps
    pub fn parse<S: AsRef<str>>(name: impl Into<String>, steps: &[S]) -> AgentResult<Self> {
        let steps = steps
            .iter()
            .map(|s| s.as_ref().parse())
            .collect::<AgentResult<Vec<WorkflowStep>>>()?;
        Ok(Self::new(name, steps))
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Outcome of one completed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// The step in `agent:action` form
    pub step: String,
    pub result: Value,
}

impl From<StepRecord> for Value {
    fn from(record: StepRecord) -> Self {
        serde_json::json!({ "step": record.step, "result": record.result })
    }
}

/// Records as a JSON array, in completion order
pub(crate) fn records_to_value(records: &[StepRecord]) -> Value {
    Value::Array(records.iter().cloned().map(Value::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => Payload::new(),
        }
    }

    #[test]
    fn test_parse_step() {
        let step: WorkflowStep = "vision:detect".parse().unwrap();
        assert_eq!(step, WorkflowStep::new("vision", "detect"));
        assert_eq!(step.to_string(), "vision:detect");

        for bad in ["vision", "vision:", ":detect", "a:b:c", ""] {
            let err = bad.parse::<WorkflowStep>().unwrap_err();
            assert!(matches!(err, AgentError::InvalidInput(_)), "{bad}");
        }
    }

    #[test]
    fn test_parse_workflow() {
        let workflow = Workflow::parse("inspect", &["sensor:read", "vision:detect"]).unwrap();
        assert_eq!(workflow.len(), 2);
        assert_eq!(workflow.merge_policy, MergePolicy::LastWriteWins);

        assert!(Workflow::parse("broken", &["sensor:read", "oops"]).is_err());
        assert!(Workflow::parse::<&str>("empty", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let mut current = payload(json!({"a": 1, "b": 1}));
        MergePolicy::LastWriteWins
            .merge(&mut current, &payload(json!({"b": 2, "c": 3})))
            .unwrap();
        assert_eq!(Value::Object(current), json!({"a": 1, "b": 2, "c": 3}));
    }

    #[test]
    fn test_reject_conflicts_leaves_payload_untouched() {
        let mut current = payload(json!({"a": 1}));
        let err = MergePolicy::RejectConflicts
            .merge(&mut current, &payload(json!({"z": 0, "a": 2})))
            .unwrap_err();
        assert_eq!(err, "a");
        assert_eq!(Value::Object(current), json!({"a": 1}));
    }
}
