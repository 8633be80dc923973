mod api;
mod config;

use std::sync::Arc;

use anyhow::Context;
use sandbox_fs::FileSystemCapabilities;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    info!("starting catalog-fs server");
    let config = ServerConfig::load().context("failed to load server config")?;

    let filesystem = FileSystemCapabilities::new(&config.sandbox)
        .context("failed to initialize sandboxed filesystem")?;
    for root in filesystem.resolver().roots() {
        info!(root = %root.display(), "sandbox root allowed");
    }

    let app = api::router(Arc::new(AppState::new(filesystem)));
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "server is ready, press Ctrl+C to shut down");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server shutdown complete");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received, stopping server"),
        Err(err) => {
            warn!(error = %err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
