use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use schema_curator::config::Config;
use schema_curator::curator_from_config;
use schema_curator::server::{AppState, router};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; RUST_LOG overrides the default level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();

    let curator = curator_from_config(&config).context("failed to build generation pipeline")?;
    let state = AppState {
        curator: Arc::new(curator),
    };

    let bind: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid server.bind (expected host:port): {}", config.server.bind))?;

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(
        %bind,
        model = %config.gemini.model,
        shape = ?config.generation.response_shape,
        "Starting {} HTTP server",
        config.server.name
    );

    axum::serve(listener, router(state)).await?;
    Ok(())
}
