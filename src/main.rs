//! PlanAI command line
//!
//! Workspace data lives in the platform data directory unless `--data-dir`,
//! `PLANAI_DATA_DIR` or the `data_dir` config key points elsewhere.
//! Set `GOOGLE_API_KEY` to enable the AI assistant.

use clap::Parser;
use planai::cli::{self, Cli};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = cli
        .log_level
        .as_deref()
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    cli::execute(cli).await
}
