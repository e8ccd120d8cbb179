//! Assembly of the runtime graph from declared tasks and the status index.

use crate::core::run_graph::dependencies::{DependencyExtractor, Extraction};
use crate::core::run_graph::graph::{GraphNode, RuntimeGraph};
use crate::core::run_graph::model::{TaskDecl, DEFAULT_CACHE_LABEL};
use crate::core::run_graph::presentation::{
    AnnotationLabeler, DefaultPresenter, ExecutionStateLookup, NoExecutionStates, NodePhase,
    StatusPresenter, TaskLabeler,
};
use crate::core::run_graph::status_index::{StatusIndex, PENDING_REASON};
use pipegraph_types::PipelineRunDocument;
use serde::{Deserialize, Serialize};

/// Status reported for a when-guarded task that the run skipped.
pub const CONDITION_CHECK_FAILED: &str = "ConditionCheckFailed";

/// Pipeline compiler generation; only V2 runs carry external execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineVariant {
    #[default]
    V1,
    V2,
}

impl std::str::FromStr for PipelineVariant {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "v1" => Ok(PipelineVariant::V1),
            "v2" => Ok(PipelineVariant::V2),
            other => Err(format!(
                "invalid pipeline variant '{}'; supported values are v1, v2",
                other
            )),
        }
    }
}

/// Rendering options applied to every node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphOptions {
    pub node_width: u32,
    pub node_height: u32,
    pub exit_handler_color: String,
    pub variant: PipelineVariant,
    pub cache_label: String,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            node_width: 172,
            node_height: 64,
            exit_handler_color: "#fef7f0".to_string(),
            variant: PipelineVariant::V1,
            cache_label: DEFAULT_CACHE_LABEL.to_string(),
        }
    }
}

/// Graph plus the status index it was built from, with resolved parameter
/// values written back onto the index records.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub graph: RuntimeGraph,
    pub index: StatusIndex,
}

struct NodeDraft {
    task_name: String,
    node: GraphNode,
    extraction: Extraction,
}

/// Builds runtime graphs from status documents.
pub struct GraphAssembler {
    options: GraphOptions,
    presenter: Box<dyn StatusPresenter + Send + Sync>,
    labeler: Box<dyn TaskLabeler + Send + Sync>,
    execution_states: Box<dyn ExecutionStateLookup + Send + Sync>,
}

impl Default for GraphAssembler {
    fn default() -> Self {
        Self::new(GraphOptions::default())
    }
}

impl GraphAssembler {
    pub fn new(options: GraphOptions) -> Self {
        Self {
            options,
            presenter: Box::new(DefaultPresenter),
            labeler: Box::new(AnnotationLabeler),
            execution_states: Box::new(NoExecutionStates),
        }
    }

    pub fn with_presenter(mut self, presenter: impl StatusPresenter + Send + Sync + 'static) -> Self {
        self.presenter = Box::new(presenter);
        self
    }

    pub fn with_labeler(mut self, labeler: impl TaskLabeler + Send + Sync + 'static) -> Self {
        self.labeler = Box::new(labeler);
        self
    }

    pub fn with_execution_states(
        mut self,
        lookup: impl ExecutionStateLookup + Send + Sync + 'static,
    ) -> Self {
        self.execution_states = Box::new(lookup);
        self
    }

    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    /// Build the graph for the tasks declared in `document`.
    pub fn build_document(&self, document: &PipelineRunDocument) -> RuntimeGraph {
        let tasks = TaskDecl::from_document(document, &self.options.cache_label);
        self.build(&tasks, document)
    }

    /// Build the graph for `tasks` against the run records of `document`.
    pub fn build(&self, tasks: &[TaskDecl], document: &PipelineRunDocument) -> RuntimeGraph {
        self.assemble(tasks, document).graph
    }

    /// Build the graph and keep the status index used to build it.
    pub fn assemble(&self, tasks: &[TaskDecl], document: &PipelineRunDocument) -> Assembly {
        let Some(status) = document
            .status
            .as_ref()
            .filter(|status| status.has_run_records())
        else {
            tracing::debug!(run = %document.metadata.name, "run has no records yet");
            return Assembly::default();
        };

        let mut index = StatusIndex::from_status(status);
        let mut drafts = {
            let extractor = DependencyExtractor::new(&index, &document.spec.params);
            tasks
                .iter()
                .filter_map(|task| {
                    let skipped = status.is_skipped(&task.name);
                    self.draft(task, &index, &extractor, skipped)
                })
                .collect::<Vec<_>>()
        };
        // identity collisions resolve to the first task name, whatever the declaration order
        drafts.sort_by(|a, b| a.task_name.cmp(&b.task_name));

        let mut graph = RuntimeGraph::new();
        for draft in &drafts {
            if !graph.add_node(draft.node.clone()) {
                tracing::warn!(
                    task = %draft.task_name,
                    node = %draft.node.id,
                    "node identity already taken by another task"
                );
            }
        }

        for draft in drafts {
            if let Some(record) = index.get_mut(&draft.task_name) {
                for param in &draft.extraction.resolved {
                    record.set_param(&param.name, &param.value);
                }
            }
            for dependency in &draft.extraction.edges {
                if !graph.add_edge(&dependency.edge) {
                    tracing::debug!(
                        parent = %dependency.edge.parent,
                        child = %dependency.edge.child,
                        source = ?dependency.source,
                        "dropping edge to a node outside the graph"
                    );
                }
            }
        }

        tracing::debug!(
            run = %document.metadata.name,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "runtime graph assembled"
        );
        Assembly { graph, index }
    }

    fn draft(
        &self,
        task: &TaskDecl,
        index: &StatusIndex,
        extractor: &DependencyExtractor<'_>,
        skipped: bool,
    ) -> Option<NodeDraft> {
        let record = index.get(&task.name);
        let when_only = record.is_none() && task.when_parents().any(|parent| index.contains(&parent));
        if record.is_none() && !when_only {
            return None;
        }

        let node_id = index.node_id_of(&task.name).to_string();
        let status = match record {
            Some(record) => record.reason().to_string(),
            None if skipped => CONDITION_CHECK_FAILED.to_string(),
            None => PENDING_REASON.to_string(),
        };
        let phase = NodePhase::from_reason(&status);
        let color = if task.is_finally {
            self.options.exit_handler_color.clone()
        } else {
            self.presenter.color(phase)
        };
        let execution_state = match self.options.variant {
            PipelineVariant::V2 => self.lookup_execution_state(&node_id),
            PipelineVariant::V1 => None,
        };
        let icon = self.presenter.icon(
            phase,
            record.and_then(|r| r.start_time),
            record.and_then(|r| r.completion_time),
            execution_state.as_deref(),
        );
        let label = self
            .labeler
            .label(task.task_spec.as_ref())
            .unwrap_or_else(|| task.name.clone());

        Some(NodeDraft {
            task_name: task.name.clone(),
            node: GraphNode {
                id: node_id,
                task_name: task.name.clone(),
                label,
                status,
                phase,
                color,
                icon,
                width: self.options.node_width,
                height: self.options.node_height,
                exit_handler: task.is_finally,
            },
            extraction: extractor.edges(task),
        })
    }

    fn lookup_execution_state(&self, node_id: &str) -> Option<String> {
        match self.execution_states.execution_state(node_id) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(node = %node_id, "execution state lookup failed: {}", err);
                None
            }
        }
    }
}
