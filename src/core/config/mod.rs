pub mod loader;

pub use loader::ConfigLoader;

use crate::core::run_graph::artifacts::DEFAULT_ANNOTATION_PREFIX;
use crate::core::run_graph::assembler::{GraphOptions, PipelineVariant};
use crate::core::run_graph::model::DEFAULT_CACHE_LABEL;
use serde::{Deserialize, Serialize};

/// Configuration loaded from pipegraph.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GraphConfig {
    /// Node rendering configuration
    #[serde(default)]
    pub graph: GraphSection,

    /// Artifact annotation configuration
    #[serde(default)]
    pub artifacts: ArtifactSection,
}

/// Node rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphSection {
    #[serde(default = "default_node_width")]
    pub node_width: u32,

    #[serde(default = "default_node_height")]
    pub node_height: u32,

    /// Background of tasks in the `finally` group
    #[serde(default = "default_exit_handler_color")]
    pub exit_handler_color: String,

    #[serde(default)]
    pub pipeline_variant: PipelineVariant,
}

/// Artifact annotation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactSection {
    /// Prefix of the `<prefix>/input_artifacts` style annotations
    #[serde(default = "default_annotation_prefix")]
    pub annotation_prefix: String,

    /// Task label marking cache-enabled tasks
    #[serde(default = "default_cache_label")]
    pub cache_label: String,
}

fn default_node_width() -> u32 {
    GraphOptions::default().node_width
}

fn default_node_height() -> u32 {
    GraphOptions::default().node_height
}

fn default_exit_handler_color() -> String {
    GraphOptions::default().exit_handler_color
}

fn default_annotation_prefix() -> String {
    DEFAULT_ANNOTATION_PREFIX.to_string()
}

fn default_cache_label() -> String {
    DEFAULT_CACHE_LABEL.to_string()
}

impl Default for GraphSection {
    fn default() -> Self {
        GraphSection {
            node_width: default_node_width(),
            node_height: default_node_height(),
            exit_handler_color: default_exit_handler_color(),
            pipeline_variant: PipelineVariant::default(),
        }
    }
}

impl Default for ArtifactSection {
    fn default() -> Self {
        ArtifactSection {
            annotation_prefix: default_annotation_prefix(),
            cache_label: default_cache_label(),
        }
    }
}

impl GraphConfig {
    /// Options handed to the graph assembler.
    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            node_width: self.graph.node_width,
            node_height: self.graph.node_height,
            exit_handler_color: self.graph.exit_handler_color.clone(),
            variant: self.graph.pipeline_variant,
            cache_label: self.artifacts.cache_label.clone(),
        }
    }
}
