//! HTTP surface: one POST route per feature, permissive CORS, request tracing.

pub mod error;
pub mod routes;
pub mod state;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderName, Method, Request},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::llm::client::LlmClient;
use state::AppState;

/// Headers browsers may send on cross-origin calls.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
}

pub fn build_app(state: AppState) -> Router {
    routes::routes()
        .layer(cors_layer())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .with_state(state)
}

pub async fn serve(host: &str, client: Arc<dyn LlmClient>) -> Result<()> {
    let app = build_app(AppState::new(client));
    let listener = TcpListener::bind(host)
        .await
        .with_context(|| format!("failed to bind {}", host))?;
    info!("http listening on {}", host);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server error")?;
    info!("http server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
