pub mod aggregate;
pub mod cellref;
pub mod cli;
pub mod config;
pub mod context;
pub mod errors;
pub mod matcher;
pub mod model;
pub mod render;
pub mod replace;
pub mod results;
pub mod scan;
pub mod security;
pub mod server;
pub mod state;
pub mod tools;
pub mod uploads;
pub mod utils;

pub use config::{CliArgs, HyperlinkMode, LinkConvention, ServerConfig};
pub use errors::{InvalidInputError, NotFoundError, PayloadTooLargeError};

use anyhow::{Context, Result};
use state::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let config = Arc::new(config);
    config.ensure_directories()?;

    tracing::info!(
        bind = %config.http_bind_address,
        uploads = %config.uploads_dir.display(),
        results = %config.results_dir.display(),
        hyperlinks = ?config.hyperlink_mode,
        links = %config.link_convention,
        "starting workbook search server"
    );

    let state = Arc::new(AppState::new(config.clone()));
    let router = server::router(state);

    let listener = TcpListener::bind(config.http_bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.http_bind_address))?;
    let actual_addr = listener.local_addr()?;
    tracing::info!(addr = %actual_addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::warn!("failed to listen for shutdown signal: {error}");
            }
        })
        .await
        .context("HTTP server terminated")?;

    tracing::info!("server stopped");
    Ok(())
}
