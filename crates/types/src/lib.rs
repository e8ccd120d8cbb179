//! Typed view of a Tekton-style `PipelineRun` status document.
//!
//! Every optional field defaults to an empty value so that documents captured
//! while a run is still in progress deserialize without errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Root pipeline run document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PipelineRunDocument {
    #[serde(default)]
    pub metadata: RunMetadata,
    #[serde(default)]
    pub spec: PipelineRunSpec,
    #[serde(default)]
    pub status: Option<PipelineRunStatus>,
}

impl PipelineRunDocument {
    /// Parse a document from its JSON text.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Declared tasks followed by the `finally` tasks.
    pub fn declared_tasks(&self) -> impl Iterator<Item = (&PipelineTask, bool)> {
        let spec = self.spec.pipeline_spec.as_ref();
        let tasks = spec.map(|s| s.tasks.as_slice()).unwrap_or_default();
        let finally = spec.map(|s| s.finally.as_slice()).unwrap_or_default();
        tasks
            .iter()
            .map(|task| (task, false))
            .chain(finally.iter().map(|task| (task, true)))
    }
}

/// Object metadata of the run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RunMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunSpec {
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub pipeline_spec: Option<PipelineSpec>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PipelineSpec {
    #[serde(default)]
    pub tasks: Vec<PipelineTask>,
    #[serde(default)]
    pub finally: Vec<PipelineTask>,
}

/// A name/value pair. Non-string values are kept as their JSON text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Param {
    pub name: String,
    #[serde(default, deserialize_with = "string_or_json")]
    pub value: String,
}

impl Param {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A task declared in the pipeline specification.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTask {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub when: Vec<WhenExpression>,
    #[serde(default)]
    pub conditions: Vec<ConditionGuard>,
    #[serde(default)]
    pub run_after: Vec<String>,
    #[serde(default)]
    pub task_spec: Option<TaskSpec>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WhenExpression {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Legacy condition guard attached to a task.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionGuard {
    #[serde(default)]
    pub condition_ref: String,
    #[serde(default)]
    pub params: Vec<Param>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// Embedded task specification.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TaskSpec {
    #[serde(default)]
    pub metadata: Option<ObjectMeta>,
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl TaskSpec {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.labels.get(key))
            .map(String::as_str)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.annotations.get(key))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    #[serde(default)]
    pub mount_path: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completion_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub task_runs: BTreeMap<String, TaskRunRecord>,
    #[serde(default)]
    pub runs: BTreeMap<String, CustomRunRecord>,
    #[serde(default)]
    pub skipped_tasks: Vec<SkippedTask>,
}

impl PipelineRunStatus {
    /// Whether any run record of either shape has been recorded.
    pub fn has_run_records(&self) -> bool {
        !self.task_runs.is_empty() || !self.runs.is_empty()
    }

    pub fn is_skipped(&self, task_name: &str) -> bool {
        self.skipped_tasks.iter().any(|t| t.name == task_name)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SkippedTask {
    pub name: String,
}

/// Kubernetes-style status condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Condition {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

impl Condition {
    /// True for the terminal success condition.
    pub fn is_success(&self) -> bool {
        self.kind == "Succeeded" && self.status == "True"
    }
}

/// Entry of `status.taskRuns`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunRecord {
    #[serde(default)]
    pub pipeline_task_name: String,
    #[serde(default)]
    pub spec: Option<RunSpec>,
    #[serde(default)]
    pub status: Option<TaskRunStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RunSpec {
    #[serde(default)]
    pub params: Vec<Param>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub pod_name: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completion_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub task_results: Vec<Param>,
    #[serde(default)]
    pub task_spec: Option<TaskSpec>,
}

/// Entry of `status.runs`, produced by custom task controllers.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRunRecord {
    #[serde(default)]
    pub pipeline_task_name: String,
    #[serde(default)]
    pub spec: Option<RunSpec>,
    #[serde(default)]
    pub status: Option<CustomRunStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRunStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completion_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub results: Vec<Param>,
}

fn string_or_json<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}
