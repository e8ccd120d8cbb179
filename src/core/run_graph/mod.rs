//! Runtime dependency graph reconstruction for pipeline runs.

pub mod artifacts;
pub mod assembler;
pub mod dependencies;
pub mod details;
pub mod graph;
pub mod model;
pub mod presentation;
pub mod reference;
pub mod status_index;
pub mod storage_path;

pub use artifacts::{ArtifactLocation, ArtifactLocations, ArtifactResolver};
pub use assembler::{Assembly, GraphAssembler, GraphOptions, PipelineVariant};
pub use dependencies::{DependencyEdge, DependencyExtractor, EdgeSource, Extraction};
pub use details::{parameters, run_summary, NodeDetails, RunInspector, RunSummary};
pub use graph::{Edge, GraphNode, GraphView, RuntimeGraph};
pub use model::{AggregatorStep, StepSpec, TaskDecl};
pub use presentation::{
    ExecutionStateLookup, IconDescriptor, LookupError, NodePhase, StaticExecutionStates,
    StatusPresenter, TaskLabeler,
};
pub use reference::{decode, ParamRef};
pub use status_index::{RunKind, RunRecord, StatusIndex};
pub use storage_path::{StoragePath, StorageService};
