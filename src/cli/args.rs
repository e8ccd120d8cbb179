use crate::core::types::OutputFormat;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct GraphArgs {
    /// PipelineRun status document (JSON)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Output format: json or dot (default: json)
    #[arg(long, default_value = "json")]
    pub format: OutputFormat,

    /// JSON map from node id to execution state, consulted for v2 pipelines
    #[arg(long, value_name = "FILE")]
    pub execution_states: Option<PathBuf>,
}

#[derive(Args)]
pub struct NodeArgs {
    /// PipelineRun status document (JSON)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Node id as printed by `pipegraph graph`
    #[arg(value_name = "NODE_ID")]
    pub node_id: String,

    /// Run id whose artifacts cache-enabled tasks were served from
    #[arg(long, value_name = "ID")]
    pub cached_run_id: Option<String>,
}

#[derive(Args)]
pub struct ParamsArgs {
    /// PipelineRun status document (JSON)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Args)]
pub struct OutboundArgs {
    /// PipelineRun status document (JSON)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Node id to start from
    #[arg(value_name = "NODE_ID")]
    pub node_id: String,
}

#[derive(Args)]
pub struct StoragePathArgs {
    /// Storage URI such as gs://bucket/key
    #[arg(value_name = "URI")]
    pub uri: String,
}
