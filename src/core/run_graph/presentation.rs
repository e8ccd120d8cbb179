//! Collaborators that turn computed status into display attributes.

use chrono::{DateTime, Utc};
use pipegraph_types::TaskSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DISPLAY_NAME_ANNOTATION: &str = "pipelines.kubeflow.org/task_display_name";
const COMPONENT_SPEC_ANNOTATION: &str = "pipelines.kubeflow.org/component_spec";

/// Display phase derived from a condition reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodePhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Error,
    Skipped,
    Terminated,
    Unknown,
}

impl NodePhase {
    pub fn from_reason(reason: &str) -> Self {
        match reason {
            "" | "Pending" | "PipelineRunPending" => NodePhase::Pending,
            "Running" | "Started" => NodePhase::Running,
            "Succeeded" | "Completed" => NodePhase::Succeeded,
            "Failed" | "TaskRunTimeout" | "PipelineRunTimeout" | "CouldntGetTask"
            | "CreateContainerConfigError" | "TaskRunImagePullFailed" => NodePhase::Failed,
            "Error" => NodePhase::Error,
            "ConditionCheckFailed" | "Skipped" => NodePhase::Skipped,
            "Cancelled" | "TaskRunCancelled" | "PipelineRunCancelled" | "StoppedRunFinally" => {
                NodePhase::Terminated
            }
            _ => NodePhase::Unknown,
        }
    }

    pub fn is_finished(self) -> bool {
        !matches!(self, NodePhase::Pending | NodePhase::Running)
    }
}

/// Icon shown next to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconDescriptor {
    pub name: String,
    pub tooltip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_state: Option<String>,
}

/// Maps node status to display color and icon.
pub trait StatusPresenter {
    fn color(&self, phase: NodePhase) -> String;

    fn icon(
        &self,
        phase: NodePhase,
        started: Option<DateTime<Utc>>,
        finished: Option<DateTime<Utc>>,
        execution_state: Option<&str>,
    ) -> IconDescriptor;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPresenter;

impl StatusPresenter for DefaultPresenter {
    fn color(&self, phase: NodePhase) -> String {
        match phase {
            NodePhase::Failed | NodePhase::Error => "#fce8e6",
            NodePhase::Pending | NodePhase::Running => "#e8f0fe",
            NodePhase::Succeeded => "#e6f4ea",
            NodePhase::Skipped | NodePhase::Terminated => "#f1f3f4",
            NodePhase::Unknown => "#ffffff",
        }
        .to_string()
    }

    fn icon(
        &self,
        phase: NodePhase,
        started: Option<DateTime<Utc>>,
        finished: Option<DateTime<Utc>>,
        execution_state: Option<&str>,
    ) -> IconDescriptor {
        let cached = execution_state.is_some_and(|state| state.eq_ignore_ascii_case("cached"));
        let name = if cached {
            "cached"
        } else {
            match phase {
                NodePhase::Pending => "schedule",
                NodePhase::Running => "sync",
                NodePhase::Succeeded => "check_circle",
                NodePhase::Failed | NodePhase::Error => "error",
                NodePhase::Skipped => "skip_next",
                NodePhase::Terminated => "cancel",
                NodePhase::Unknown => "help",
            }
        };

        let duration_seconds = match (started, finished) {
            (Some(start), Some(end)) if phase.is_finished() => Some((end - start).num_seconds()),
            _ => None,
        };
        let tooltip = match duration_seconds {
            Some(seconds) => format!("{:?} after {}s", phase, seconds),
            None => match started {
                Some(start) if phase == NodePhase::Running => {
                    format!("Running since {}", start.to_rfc3339())
                }
                _ => format!("{:?}", phase),
            },
        };

        IconDescriptor {
            name: name.to_string(),
            tooltip,
            duration_seconds,
            execution_state: execution_state.map(str::to_string),
        }
    }
}

/// Produces a human readable label from a task specification.
pub trait TaskLabeler {
    fn label(&self, task_spec: Option<&TaskSpec>) -> Option<String>;
}

/// Reads the display name annotation, then the component spec name.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationLabeler;

impl TaskLabeler for AnnotationLabeler {
    fn label(&self, task_spec: Option<&TaskSpec>) -> Option<String> {
        let spec = task_spec?;
        if let Some(name) = spec.annotation(DISPLAY_NAME_ANNOTATION) {
            if !name.trim().is_empty() {
                return Some(name.to_string());
            }
        }
        let component = spec.annotation(COMPONENT_SPEC_ANNOTATION)?;
        let parsed: serde_json::Value = serde_json::from_str(component).ok()?;
        parsed
            .get("name")
            .and_then(|name| name.as_str())
            .map(str::to_string)
    }
}

/// Failure of an external execution state lookup.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("execution state store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed execution state for {key}: {reason}")]
    Malformed { key: String, reason: String },
}

/// External key-value lookup of execution state by pod name.
pub trait ExecutionStateLookup {
    fn execution_state(&self, node_id: &str) -> Result<Option<String>, LookupError>;
}

/// Lookup that never knows anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExecutionStates;

impl ExecutionStateLookup for NoExecutionStates {
    fn execution_state(&self, _node_id: &str) -> Result<Option<String>, LookupError> {
        Ok(None)
    }
}

/// Lookup backed by a map loaded ahead of time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct StaticExecutionStates {
    states: HashMap<String, String>,
}

impl StaticExecutionStates {
    pub fn new(states: HashMap<String, String>) -> Self {
        Self { states }
    }
}

impl ExecutionStateLookup for StaticExecutionStates {
    fn execution_state(&self, node_id: &str) -> Result<Option<String>, LookupError> {
        match self.states.get(node_id) {
            Some(state) if state.trim().is_empty() => Err(LookupError::Malformed {
                key: node_id.to_string(),
                reason: "empty state".to_string(),
            }),
            Some(state) => Ok(Some(state.clone())),
            None => Ok(None),
        }
    }
}
