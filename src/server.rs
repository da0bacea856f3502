//! HTTP routes of the exporter.

use crate::health::{self, HealthStatus};
use crate::metrics::MetricsCache;
use crate::vault::ClientFactory;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Body served on `/`.
pub const ROOT_BODY: &str = "😀";

/// Shared state of the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub factory: Arc<dyn ClientFactory>,
    pub cache: Arc<MetricsCache>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serves `router` until Ctrl-C or SIGTERM.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn root() -> &'static str {
    ROOT_BODY
}

async fn status(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match health::probe(state.factory.as_ref()).await {
        HealthStatus::Healthy => (StatusCode::OK, "OK"),
        HealthStatus::Unhealthy => (StatusCode::INTERNAL_SERVER_ERROR, "NOK"),
    }
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.cache.scrape().await {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}
