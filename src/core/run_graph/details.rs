#![allow(clippy::result_large_err)] // Outbound queries return AppError to keep the structured error code.

//! Per-node and per-run queries used by detail panes.

use crate::core::error::AppError;
use crate::core::run_graph::artifacts::{ArtifactLocations, ArtifactResolver};
use crate::core::run_graph::assembler::{Assembly, GraphAssembler};
use crate::core::run_graph::graph::RuntimeGraph;
use crate::core::run_graph::model::TaskDecl;
use crate::core::run_graph::presentation::NodePhase;
use crate::core::run_graph::status_index::{RunRecord, PENDING_REASON};
use chrono::{DateTime, Utc};
use pipegraph_types::{Param, PipelineRunDocument, VolumeMount};
use serde::Serialize;

/// Name of the step whose mounts are reported for a node.
pub const MAIN_STEP: &str = "main";

/// Pipeline-level parameters as a flat list.
pub fn parameters(document: &PipelineRunDocument) -> Vec<Param> {
    document.spec.params.clone()
}

/// Overall state of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub name: String,
    pub reason: String,
    pub phase: NodePhase,
    pub message: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub completion_time: Option<DateTime<Utc>>,
}

pub fn run_summary(document: &PipelineRunDocument) -> RunSummary {
    let status = document.status.as_ref();
    let condition = status.and_then(|s| s.conditions.first());
    let reason = condition
        .map(|c| c.reason.as_str())
        .filter(|reason| !reason.is_empty())
        .unwrap_or(PENDING_REASON)
        .to_string();
    RunSummary {
        name: document.metadata.name.clone(),
        phase: NodePhase::from_reason(&reason),
        reason,
        message: condition
            .map(|c| c.message.clone())
            .filter(|message| !message.is_empty()),
        start_time: status.and_then(|s| s.start_time),
        completion_time: status.and_then(|s| s.completion_time),
    }
}

/// Everything the detail pane shows for one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDetails {
    pub node_id: String,
    pub task_name: String,
    pub status: String,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
    pub artifacts: ArtifactLocations,
    pub volume_mounts: Vec<VolumeMount>,
}

/// Graph of one run plus the queries that need its status index.
pub struct RunInspector {
    assembly: Assembly,
    artifacts: ArtifactResolver,
    parameters: Vec<Param>,
}

impl RunInspector {
    pub fn new(
        document: &PipelineRunDocument,
        assembler: &GraphAssembler,
        annotation_prefix: &str,
    ) -> Self {
        let tasks = TaskDecl::from_document(document, &assembler.options().cache_label);
        let assembly = assembler.assemble(&tasks, document);
        let artifacts = ArtifactResolver::new(&document.metadata, &tasks, annotation_prefix);
        Self {
            assembly,
            artifacts,
            parameters: parameters(document),
        }
    }

    pub fn graph(&self) -> &RuntimeGraph {
        &self.assembly.graph
    }

    pub fn parameters(&self) -> &[Param] {
        &self.parameters
    }

    /// Task name and status of a node, from the graph or, failing that, the index.
    fn resolve_node(&self, node_id: &str) -> Option<(String, String)> {
        if let Some(node) = self.assembly.graph.node(node_id) {
            return Some((node.task_name.clone(), node.status.clone()));
        }
        self.assembly
            .index
            .find_by_node_id(node_id)
            .map(|run| (run.task_name.clone(), run.reason().to_string()))
    }

    fn record(&self, node_id: &str) -> Option<&RunRecord> {
        match self.assembly.graph.node(node_id) {
            Some(node) => self.assembly.index.get(&node.task_name),
            None => self.assembly.index.find_by_node_id(node_id),
        }
    }

    /// Resolved input bindings and produced results of a node.
    pub fn node_io_parameters(&self, node_id: &str) -> (Vec<Param>, Vec<Param>) {
        match self.record(node_id) {
            Some(run) => (run.params.clone(), run.results.clone()),
            None => (Vec::new(), Vec::new()),
        }
    }

    /// Volume mounts of the node's `main` step.
    pub fn node_volume_mounts(&self, node_id: &str) -> Vec<VolumeMount> {
        self.record(node_id)
            .map(|run| {
                run.steps()
                    .iter()
                    .filter(|step| step.name == MAIN_STEP)
                    .flat_map(|step| step.volume_mounts.iter().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn node_artifacts(&self, node_id: &str, cached_run_id: Option<&str>) -> ArtifactLocations {
        match self.resolve_node(node_id) {
            Some((task_name, status)) => self.artifacts.resolve(&task_name, &status, cached_run_id),
            None => ArtifactLocations::default(),
        }
    }

    pub fn node_details(&self, node_id: &str, cached_run_id: Option<&str>) -> Option<NodeDetails> {
        let (task_name, status) = self.resolve_node(node_id)?;
        let (inputs, outputs) = self.node_io_parameters(node_id);
        Some(NodeDetails {
            node_id: node_id.to_string(),
            artifacts: self.artifacts.resolve(&task_name, &status, cached_run_id),
            volume_mounts: self.node_volume_mounts(node_id),
            task_name,
            status,
            inputs,
            outputs,
        })
    }

    pub fn outbound_nodes(&self, node_id: &str) -> Result<Vec<String>, AppError> {
        self.assembly.graph.outbound_nodes(node_id)
    }
}
