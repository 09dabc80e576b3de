//! Liveness endpoint for hosting platforms.
//!
//! Any HTTP request on the health port, whatever the path or method, gets `200 OK` with
//! body `Bot is running`.
use anyhow::{anyhow, Result};
use axum::Router;
use log::{info, warn};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::HealthConfig;

pub const HEALTH_BODY: &str = "Bot is running";

pub async fn bind(cfg: &HealthConfig) -> Result<TcpListener> {
    let addr = format!("{}:{}", cfg.host, cfg.port);
    TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow!("Failed to bind health endpoint {}: {}", addr, e))
}

pub fn router() -> Router {
    Router::new().fallback(|| async { HEALTH_BODY })
}

/// Serve the health router on `listener` until the task is dropped.
pub async fn serve(listener: TcpListener) {
    if let Ok(addr) = listener.local_addr() {
        info!("Health endpoint listening on {}", addr);
    }
    if let Err(e) = axum::serve(listener, router()).await {
        warn!("Health endpoint stopped: {}", e);
    }
}

/// Bind and serve in a background task.
pub async fn spawn(cfg: &HealthConfig) -> Result<JoinHandle<()>> {
    let listener = bind(cfg).await?;
    Ok(tokio::spawn(serve(listener)))
}
