use crate::{
    cli::args::{GraphArgs, NodeArgs, OutboundArgs, ParamsArgs, StoragePathArgs},
    core::{
        run_graph::{GraphAssembler, RunInspector, StaticExecutionStates, StoragePath},
        types::OutputFormat,
        AppError, ConfigLoader, GraphConfig,
    },
    Result,
};
use anyhow::{anyhow, Context};
use pipegraph_types::PipelineRunDocument;
use serde::Serialize;
use std::path::{Path, PathBuf};

async fn load_document(path: &Path) -> Result<PipelineRunDocument> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read run document {}", path.display()))?;
    let document = PipelineRunDocument::from_json(&text).map_err(AppError::from)?;
    tracing::debug!(run = %document.metadata.name, "loaded run document");
    Ok(document)
}

fn load_config(explicit: Option<PathBuf>) -> Result<GraphConfig> {
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    Ok(ConfigLoader::load(explicit.as_deref(), &cwd)?)
}

async fn load_execution_states(path: &Path) -> Result<StaticExecutionStates> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read execution states {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse execution states {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn inspector(document: &PipelineRunDocument, config: &GraphConfig) -> RunInspector {
    let assembler = GraphAssembler::new(config.graph_options());
    RunInspector::new(document, &assembler, &config.artifacts.annotation_prefix)
}

pub async fn graph(args: GraphArgs, config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config)?;
    let document = load_document(&args.file).await?;
    let mut assembler = GraphAssembler::new(config.graph_options());
    if let Some(path) = &args.execution_states {
        assembler = assembler.with_execution_states(load_execution_states(path).await?);
    }

    let graph = assembler.build_document(&document);
    tracing::info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "rendering runtime graph"
    );
    match args.format {
        OutputFormat::Json => print_json(&graph.view()),
        OutputFormat::Dot => {
            println!("{}", graph.to_dot());
            Ok(())
        }
    }
}

pub async fn node(args: NodeArgs, config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config)?;
    let document = load_document(&args.file).await?;
    let inspector = inspector(&document, &config);
    let details = inspector
        .node_details(&args.node_id, args.cached_run_id.as_deref())
        .ok_or_else(|| anyhow!("node '{}' not found in run", args.node_id))?;
    print_json(&details)
}

pub async fn params(args: ParamsArgs) -> Result<()> {
    let document = load_document(&args.file).await?;
    print_json(&crate::core::run_graph::parameters(&document))
}

pub async fn outbound(args: OutboundArgs, config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config)?;
    let document = load_document(&args.file).await?;
    let inspector = inspector(&document, &config);
    let nodes = inspector.outbound_nodes(&args.node_id)?;
    print_json(&nodes)
}

pub fn storage_path(args: StoragePathArgs) -> Result<()> {
    let path = StoragePath::parse(&args.uri)?;
    print_json(&path)
}
