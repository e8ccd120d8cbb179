use clap::Parser;
use pipegraph::cli::{self, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let workspace = std::env::current_dir().ok();
    let _guard = pipegraph::logging::init(workspace.as_deref(), args.verbose)?;
    cli::run(args).await
}
