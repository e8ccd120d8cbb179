//! Lookup from declared task name to the run record produced for it.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use pipegraph_types::{
    Condition, CustomRunRecord, Param, PipelineRunStatus, Step, TaskRunRecord,
};
use std::collections::BTreeMap;

/// Shape-specific part of a run record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunKind {
    /// Entry of `status.taskRuns`, backed by a pod.
    Standard { pod_name: String, steps: Vec<Step> },
    /// Entry of `status.runs`, produced by a custom task controller.
    Aggregator,
}

/// Runtime state of one task, unified over both record shapes.
#[derive(Debug, Clone)]
pub struct RunRecord {
    /// Key the record was stored under in the status document.
    pub run_id: String,
    pub task_name: String,
    pub kind: RunKind,
    pub conditions: Vec<Condition>,
    pub start_time: Option<DateTime<Utc>>,
    pub completion_time: Option<DateTime<Utc>>,
    pub results: Vec<Param>,
    /// Copy of the task's parameter bindings; resolved values are written here.
    pub params: Vec<Param>,
}

impl RunRecord {
    fn from_task_run(run_id: &str, record: &TaskRunRecord) -> Option<Self> {
        let status = record.status.as_ref()?;
        Some(RunRecord {
            run_id: run_id.to_string(),
            task_name: record.pipeline_task_name.clone(),
            kind: RunKind::Standard {
                pod_name: status.pod_name.clone(),
                steps: status
                    .task_spec
                    .as_ref()
                    .map(|spec| spec.steps.clone())
                    .unwrap_or_default(),
            },
            conditions: status.conditions.clone(),
            start_time: status.start_time,
            completion_time: status.completion_time,
            results: status.task_results.clone(),
            params: record
                .spec
                .as_ref()
                .map(|spec| spec.params.clone())
                .unwrap_or_default(),
        })
    }

    fn from_custom_run(run_id: &str, record: &CustomRunRecord) -> Option<Self> {
        let status = record.status.as_ref()?;
        Some(RunRecord {
            run_id: run_id.to_string(),
            task_name: record.pipeline_task_name.clone(),
            kind: RunKind::Aggregator,
            conditions: status.conditions.clone(),
            start_time: status.start_time,
            completion_time: status.completion_time,
            results: status.results.clone(),
            params: record
                .spec
                .as_ref()
                .map(|spec| spec.params.clone())
                .unwrap_or_default(),
        })
    }

    /// Pod name, when the record is backed by a pod that has been named.
    pub fn pod_name(&self) -> Option<&str> {
        match &self.kind {
            RunKind::Standard { pod_name, .. } if !pod_name.is_empty() => Some(pod_name),
            _ => None,
        }
    }

    /// Graph identity of the task: its pod name, falling back to the task name.
    pub fn node_id(&self) -> &str {
        self.pod_name().unwrap_or(&self.task_name)
    }

    pub fn first_condition(&self) -> Option<&Condition> {
        self.conditions.first()
    }

    /// True once the first condition reports terminal success.
    pub fn succeeded(&self) -> bool {
        self.first_condition().is_some_and(Condition::is_success)
    }

    /// Reason of the first condition, "Pending" when none was recorded.
    pub fn reason(&self) -> &str {
        match self.first_condition() {
            Some(condition) if !condition.reason.is_empty() => &condition.reason,
            _ => PENDING_REASON,
        }
    }

    pub fn result(&self, name: &str) -> Option<&str> {
        self.results
            .iter()
            .find(|result| result.name == name)
            .map(|result| result.value.as_str())
    }

    pub fn steps(&self) -> &[Step] {
        match &self.kind {
            RunKind::Standard { steps, .. } => steps,
            RunKind::Aggregator => &[],
        }
    }

    /// Record `value` as the resolved value of the binding `name`.
    pub fn set_param(&mut self, name: &str, value: &str) {
        match self.params.iter_mut().find(|param| param.name == name) {
            Some(param) => param.value = value.to_string(),
            None => self.params.push(Param::new(name, value)),
        }
    }
}

/// Status reason of a task that has not reported a condition yet.
pub const PENDING_REASON: &str = "Pending";

/// Task name to run record index.
#[derive(Debug, Clone, Default)]
pub struct StatusIndex {
    records: IndexMap<String, RunRecord>,
}

impl StatusIndex {
    /// When a task name appears in both `taskRuns` and `runs`, the custom run
    /// is indexed last and replaces the standard one.
    pub const CUSTOM_RUNS_TAKE_PRECEDENCE: bool = true;

    /// Build the index from both record collections.
    ///
    /// Records without a nested status have not started reporting and are left
    /// out, so their task stays unmaterialized.
    pub fn build(
        task_runs: &BTreeMap<String, TaskRunRecord>,
        runs: &BTreeMap<String, CustomRunRecord>,
    ) -> Self {
        let mut index = StatusIndex::default();
        for (run_id, record) in task_runs {
            match RunRecord::from_task_run(run_id, record) {
                Some(run) => index.insert(run),
                None => tracing::debug!(run_id = %run_id, "task run has no status yet"),
            }
        }
        for (run_id, record) in runs {
            match RunRecord::from_custom_run(run_id, record) {
                Some(run) => index.insert(run),
                None => tracing::debug!(run_id = %run_id, "custom run has no status yet"),
            }
        }
        index
    }

    pub fn from_status(status: &PipelineRunStatus) -> Self {
        Self::build(&status.task_runs, &status.runs)
    }

    fn insert(&mut self, run: RunRecord) {
        if let Some(previous) = self.records.get(&run.task_name) {
            tracing::debug!(
                task = %run.task_name,
                replaced = %previous.run_id,
                by = %run.run_id,
                "task name recorded twice; keeping the later record"
            );
        }
        self.records.insert(run.task_name.clone(), run);
    }

    pub fn get(&self, task_name: &str) -> Option<&RunRecord> {
        self.records.get(task_name)
    }

    pub fn get_mut(&mut self, task_name: &str) -> Option<&mut RunRecord> {
        self.records.get_mut(task_name)
    }

    /// Graph identity of a declared task, whether or not it has a record.
    pub fn node_id_of<'a>(&'a self, task_name: &'a str) -> &'a str {
        self.get(task_name).map(RunRecord::node_id).unwrap_or(task_name)
    }

    pub fn contains(&self, task_name: &str) -> bool {
        self.records.contains_key(task_name)
    }

    /// Record whose graph identity equals `node_id`.
    pub fn find_by_node_id(&self, node_id: &str) -> Option<&RunRecord> {
        self.records.values().find(|run| run.node_id() == node_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &RunRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
