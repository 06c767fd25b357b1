// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::detect::{detect_handler, detect_live_handler};
use super::handlers::{health_handler, root_handler};
use super::uploads::get_upload_handler;
use crate::storage::UploadStore;
use crate::vision::DetectionModelManager;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Loaded (or failed) detection model
    pub detection_models: Arc<DetectionModelManager>,
    /// Stored originals and annotated results
    pub uploads: Arc<UploadStore>,
    /// Request body limit for the detection endpoints
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        detection_models: Arc<DetectionModelManager>,
        uploads: Arc<UploadStore>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            detection_models,
            uploads,
            max_upload_bytes,
        }
    }
}

/// Build the router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let detection_routes = Router::new()
        .route("/detect", post(detect_handler))
        .route("/detect/live", post(detect_live_handler))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/uploads/:filename", get(get_upload_handler))
        .merge(detection_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve the API on `bind_address` until Ctrl-C
pub async fn start_server(bind_address: &str, state: AppState) -> anyhow::Result<()> {
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(bind_address).await?;

    tracing::info!("API server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping API server");
}
