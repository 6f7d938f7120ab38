// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    chat_handler, extract_handler, health_handler, history_handler, ingest_handler,
    version_handler,
};
use crate::assistant::DocumentAssistant;

#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<DocumentAssistant>,
    /// Limit on decoded upload size
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(assistant: Arc<DocumentAssistant>, max_upload_bytes: usize) -> Self {
        Self {
            assistant,
            max_upload_bytes,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // Uploads arrive base64-encoded inside JSON
    let body_limit = state.max_upload_bytes / 3 * 4 + 64 * 1024;

    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/v1/ingest", post(ingest_handler))
        .route("/v1/extract", post(extract_handler))
        .route("/v1/chat", post(chat_handler))
        .route("/v1/sessions/:session_id/history", get(history_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API server to {}", addr))?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
