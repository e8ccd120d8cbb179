use crate::core::run_graph::reference::{decode, ParamRef};
use pipegraph_types::{
    ConditionGuard, Param, PipelineRunDocument, PipelineTask, TaskSpec, WhenExpression,
};
use regex::Regex;
use std::sync::OnceLock;

/// First command token of the "wait for any of" aggregator step.
pub const AGGREGATOR_COMMAND: &str = "any-task";
/// Option switching the aggregator argument grammar to a comma separated task list.
pub const TASK_LIST_FLAG: &str = "--taskList";
/// Option switching the aggregator argument grammar to a condition expression.
pub const CONDITION_FLAG: &str = "--condition";
/// Task label marking a task whose outputs may be served from cache.
pub const DEFAULT_CACHE_LABEL: &str = "pipelines.kubeflow.org/cache_enabled";

/// Step specification decoded once when the task is ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepSpec {
    Aggregator(AggregatorStep),
    Regular,
}

/// Upstream tasks an aggregator step waits on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatorStep {
    pub upstream: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ArgMode {
    Ignore,
    TaskList,
    Condition,
}

impl AggregatorStep {
    /// Parse the positional aggregator arguments.
    ///
    /// `--taskList` reads the next tokens as comma separated task names,
    /// `--condition` reads them as expressions carrying `results_<task>_output`
    /// markers. Any other option token stops both modes.
    pub fn parse(args: &[String]) -> Self {
        let mut mode = ArgMode::Ignore;
        let mut upstream: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            let name = name.trim();
            if !name.is_empty() && !upstream.iter().any(|known| known == name) {
                upstream.push(name.to_string());
            }
        };

        for arg in args {
            match arg.as_str() {
                TASK_LIST_FLAG => mode = ArgMode::TaskList,
                CONDITION_FLAG => mode = ArgMode::Condition,
                other if other.starts_with("--") => mode = ArgMode::Ignore,
                other => match mode {
                    ArgMode::TaskList => other.split(',').for_each(&mut push),
                    ArgMode::Condition => {
                        for captures in condition_marker().captures_iter(other) {
                            push(&captures[1]);
                        }
                    }
                    ArgMode::Ignore => {}
                },
            }
        }

        AggregatorStep { upstream }
    }
}

fn condition_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"results_([A-Za-z0-9-]+)_output").expect("static aggregator marker pattern")
    })
}

impl StepSpec {
    fn from_task_spec(spec: &TaskSpec) -> Option<Self> {
        let first = spec.steps.first()?;
        if first.command.first().map(String::as_str) == Some(AGGREGATOR_COMMAND) {
            Some(StepSpec::Aggregator(AggregatorStep::parse(&first.args)))
        } else {
            Some(StepSpec::Regular)
        }
    }
}

/// Static declaration of a pipeline task.
#[derive(Debug, Clone, Default)]
pub struct TaskDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub conditions: Vec<ConditionGuard>,
    pub when: Vec<WhenExpression>,
    pub run_after: Vec<String>,
    pub step: Option<StepSpec>,
    pub is_finally: bool,
    pub cache_enabled: bool,
    pub task_spec: Option<TaskSpec>,
}

impl TaskDecl {
    pub fn from_pipeline_task(task: &PipelineTask, is_finally: bool, cache_label: &str) -> Self {
        let cache_enabled = task
            .task_spec
            .as_ref()
            .and_then(|spec| spec.label(cache_label))
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        TaskDecl {
            name: task.name.clone(),
            params: task.params.clone(),
            conditions: task.conditions.clone(),
            when: task.when.clone(),
            run_after: task.run_after.clone(),
            step: task.task_spec.as_ref().and_then(StepSpec::from_task_spec),
            is_finally,
            cache_enabled,
            task_spec: task.task_spec.clone(),
        }
    }

    /// All declared tasks of a document, `finally` tasks last.
    pub fn from_document(document: &PipelineRunDocument, cache_label: &str) -> Vec<TaskDecl> {
        document
            .declared_tasks()
            .map(|(task, is_finally)| TaskDecl::from_pipeline_task(task, is_finally, cache_label))
            .collect()
    }

    /// Upstream task names referenced by the task's when guards.
    pub fn when_parents(&self) -> impl Iterator<Item = String> + '_ {
        self.when.iter().filter_map(|guard| match decode(&guard.input) {
            ParamRef::TaskResult { task, .. } => Some(task),
            _ => None,
        })
    }

    pub fn aggregator(&self) -> Option<&AggregatorStep> {
        match &self.step {
            Some(StepSpec::Aggregator(step)) => Some(step),
            _ => None,
        }
    }
}
