use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use api::{telemetry, AppConfig, Metrics, QueryService};

#[derive(Parser)]
#[command(name = "graphrag-server")]
#[command(about = "Serve GraphRAG retrieval over HTTP")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Corpus directory or file, overrides the configured data path
    #[arg(long)]
    data_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(data_path) = args.data_path {
        config.data_path = data_path;
    }
    telemetry::init_logging(&config.logging)?;

    let metrics = Metrics::new();
    let service = QueryService::build(&config, metrics).await?;
    let app = api::router(Arc::new(service));

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .context(format!("Failed to bind {}", config.server.bind_addr))?;

    tracing::info!(addr = %config.server.bind_addr, data_path = ?config.data_path, "Server listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
