//! Inference of inbound edges for a declared task.

use crate::core::run_graph::graph::Edge;
use crate::core::run_graph::model::TaskDecl;
use crate::core::run_graph::reference::{decode, ParamRef};
use crate::core::run_graph::status_index::{RunRecord, StatusIndex};
use pipegraph_types::Param;

/// Which linkage produced an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeSource {
    Parameter,
    Condition,
    When,
    Aggregator,
    RunAfter,
}

impl EdgeSource {
    /// Whether the edge requires the parent to have succeeded.
    pub fn is_success_gated(self) -> bool {
        matches!(
            self,
            EdgeSource::Parameter | EdgeSource::Condition | EdgeSource::RunAfter
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    pub edge: Edge,
    pub source: EdgeSource,
}

/// Edges of one task plus the parameter values resolved along the way.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub edges: Vec<DependencyEdge>,
    /// Resolved values of the task's own bindings, to be written back onto its record.
    pub resolved: Vec<Param>,
}

impl Extraction {
    fn push(&mut self, parent: &str, child: &str, source: EdgeSource) {
        self.edges.push(DependencyEdge {
            edge: Edge::new(parent, child),
            source,
        });
    }
}

/// Read-only edge inference over a status index.
pub struct DependencyExtractor<'a> {
    index: &'a StatusIndex,
    pipeline_params: &'a [Param],
}

impl<'a> DependencyExtractor<'a> {
    pub fn new(index: &'a StatusIndex, pipeline_params: &'a [Param]) -> Self {
        Self {
            index,
            pipeline_params,
        }
    }

    /// Record of `task_name` when it may act as a parent for `source` edges.
    fn parent(&self, task_name: &str, source: EdgeSource) -> Option<&'a RunRecord> {
        self.index
            .get(task_name)
            .filter(|run| !source.is_success_gated() || run.succeeded())
    }

    /// All inbound edges of `task`.
    pub fn edges(&self, task: &TaskDecl) -> Extraction {
        let task_id = self.index.node_id_of(&task.name);
        let mut extraction = Extraction::default();

        let resolved =
            self.parameter_edges(&task.params, task_id, EdgeSource::Parameter, &mut extraction);
        extraction.resolved = resolved;

        for guard in &task.conditions {
            self.parameter_edges(&guard.params, task_id, EdgeSource::Condition, &mut extraction);
        }

        self.when_edges(task, task_id, &mut extraction);
        self.aggregator_edges(task, task_id, &mut extraction);
        self.run_after_edges(task, task_id, &mut extraction);
        extraction
    }

    /// Edges implied by `$(tasks.…)` references in `params`, attributed to `owner_id`.
    ///
    /// Returns each binding with its value resolved where possible.
    pub fn parameter_edges(
        &self,
        params: &[Param],
        owner_id: &str,
        source: EdgeSource,
        extraction: &mut Extraction,
    ) -> Vec<Param> {
        let mut resolved = Vec::with_capacity(params.len());
        for param in params {
            let mut value = param.value.clone();
            match decode(&param.value) {
                ParamRef::Pipeline { param: name } => {
                    if let Some(pipeline_param) =
                        self.pipeline_params.iter().find(|p| p.name == name)
                    {
                        value = pipeline_param.value.clone();
                    }
                }
                ParamRef::TaskResult { task, result } => {
                    if let Some(parent) = self.parent(&task, source) {
                        extraction.push(parent.node_id(), owner_id, source);
                        if let Some(produced) = parent.result(&result) {
                            value = produced.to_string();
                        }
                    }
                }
                ParamRef::Literal => {}
            }
            resolved.push(Param::new(param.name.clone(), value));
        }
        resolved
    }

    fn when_edges(&self, task: &TaskDecl, task_id: &str, extraction: &mut Extraction) {
        for parent_task in task.when_parents() {
            if let Some(parent) = self.parent(&parent_task, EdgeSource::When) {
                extraction.push(parent.node_id(), task_id, EdgeSource::When);
            }
        }
    }

    fn aggregator_edges(&self, task: &TaskDecl, task_id: &str, extraction: &mut Extraction) {
        let Some(step) = task.aggregator() else {
            return;
        };
        for upstream in &step.upstream {
            match self.parent(upstream, EdgeSource::Aggregator) {
                Some(parent) => extraction.push(parent.node_id(), task_id, EdgeSource::Aggregator),
                None => tracing::debug!(
                    task = %task.name,
                    upstream = %upstream,
                    "aggregator upstream has no run record"
                ),
            }
        }
    }

    fn run_after_edges(&self, task: &TaskDecl, task_id: &str, extraction: &mut Extraction) {
        for predecessor in &task.run_after {
            if let Some(parent) = self.parent(predecessor, EdgeSource::RunAfter) {
                extraction.push(parent.node_id(), task_id, EdgeSource::RunAfter);
            }
        }
    }
}
