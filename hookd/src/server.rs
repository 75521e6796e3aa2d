//! Router construction and serving

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router};
use eyre::{Context, Result};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::handler::{AppState, run_completed};

/// Endpoint dbt Cloud posts completion notifications to
pub const WEBHOOK_PATH: &str = "/webhooks/dbt/run-completed";
pub const HEALTHZ_PATH: &str = "/healthz";

#[derive(Debug, Serialize, Copy, Clone)]
struct HealthzResponse {
    status: &'static str,
}

async fn healthz() -> Json<HealthzResponse> {
    Json(HealthzResponse { status: "ok" })
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(run_completed))
        .route(HEALTHZ_PATH, get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C or SIGTERM
pub async fn serve(listen_addr: &str, state: Arc<AppState>) -> Result<()> {
    let addr: SocketAddr = listen_addr
        .parse()
        .context(format!("invalid listen address {listen_addr}"))?;

    let listener = TcpListener::bind(addr)
        .await
        .context(format!("failed to bind {addr}"))?;
    info!(%addr, "hookd listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(wait_for_shutdown())
        .await
        .context("server error")
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "failed to capture Ctrl+C signal");
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(error) => warn!(%error, "failed to capture SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received, shutting down"),
        _ = sigterm => info!("SIGTERM received, shutting down"),
    }
}
