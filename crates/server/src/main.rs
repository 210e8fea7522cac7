//! HTTP server triggering presentation generation jobs.

use anyhow::{Context, Result};
use clap::Parser;
use deckgen_server::{build_router, AppState};
use deckgen_service::{GeneratorConfig, JobRunner};
use std::sync::Arc;

const DEFAULT_BIND: &str = "0.0.0.0:8000";

/// Serve `POST /generate-ppt` for the configured data service.
#[derive(Parser, Debug)]
#[command(name = "deckgen-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on (default: $DECKGEN_BIND_ADDR or 0.0.0.0:8000)
    #[arg(short, long)]
    bind: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let config = GeneratorConfig::from_env().context("Failed to load configuration")?;
    log::info!("Using template {}", config.template_path.display());
    let runner = JobRunner::from_config(config).context("Failed to set up job runner")?;

    let bind = args
        .bind
        .or_else(|| std::env::var("DECKGEN_BIND_ADDR").ok())
        .unwrap_or_else(|| DEFAULT_BIND.to_string());

    let app = build_router(AppState {
        generator: Arc::new(runner),
    });

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    log::info!("Listening on {}", bind);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
