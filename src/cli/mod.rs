pub mod args;
pub mod commands;

pub use args::{GraphArgs, NodeArgs, OutboundArgs, ParamsArgs, StoragePathArgs};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
COMMANDS:\n{subcommands}\n\
{after-help}";

#[derive(Parser)]
#[command(name = "pipegraph")]
#[command(version = crate::VERSION)]
#[command(about = "Reconstruct runtime dependency graphs from pipeline run status documents")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: render the graph of a run, then inspect individual nodes by id."
)]
pub struct Args {
    /// Path to a config file (default: ./pipegraph.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit debug logs on stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Render the runtime graph of a run",
        long_about = "Graph indexes the run records of a PipelineRun document, infers the dependency edges between tasks and prints the resulting graph.",
        after_help = "Example:\n    pipegraph graph run.json --format dot"
    )]
    Graph(GraphArgs),
    #[command(
        about = "Show parameters, artifacts and mounts of one node",
        long_about = "Node prints the resolved input parameters, results, artifact locations and volume mounts of the node with the given id.",
        after_help = "Example:\n    pipegraph node run.json my-run-train-pod --cached-run-id run-123"
    )]
    Node(NodeArgs),
    #[command(
        about = "List pipeline-level parameters",
        after_help = "Example:\n    pipegraph params run.json"
    )]
    Params(ParamsArgs),
    #[command(
        about = "List the leaf nodes reachable from a node",
        after_help = "Example:\n    pipegraph outbound run.json my-run-train-pod"
    )]
    Outbound(OutboundArgs),
    #[command(
        about = "Parse an artifact storage URI",
        long_about = "Storage-path splits a gs://, s3://, minio://, http://, https:// or volume:// URI into source, bucket and key.",
        after_help = "Example:\n    pipegraph storage-path gs://bucket/path/to/object"
    )]
    StoragePath(StoragePathArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    let config = args.config.clone();
    match args.command {
        Command::Graph(graph_args) => commands::graph(graph_args, config).await,
        Command::Node(node_args) => commands::node(node_args, config).await,
        Command::Params(params_args) => commands::params(params_args).await,
        Command::Outbound(outbound_args) => commands::outbound(outbound_args, config).await,
        Command::StoragePath(path_args) => commands::storage_path(path_args),
    }
}
