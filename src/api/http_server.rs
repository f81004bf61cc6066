// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::fmt::Display;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::detect::detect_handler;
use super::errors::{ApiError, GENERIC_PROCESSING_DETAIL};
use super::home::home_handler;
use crate::config::server::DEFAULT_MAX_UPLOAD_BYTES;
use crate::vision::Detector;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    /// The single detector instance, constructed once at startup
    pub detector: Arc<dyn Detector>,
    /// Include internal error text in 500 responses
    pub expose_error_detail: bool,
    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(detector: Arc<dyn Detector>) -> Self {
        Self {
            detector,
            expose_error_detail: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_expose_error_detail(mut self, expose: bool) -> Self {
        self.expose_error_detail = expose;
        self
    }

    pub fn with_max_upload_bytes(mut self, max: usize) -> Self {
        self.max_upload_bytes = max;
        self
    }

    /// Log a processing failure and turn it into the 500 response
    pub fn processing_error(&self, detail: impl Display) -> ApiError {
        let detail = detail.to_string();
        tracing::error!("Processing failed: {}", detail);
        if self.expose_error_detail {
            ApiError::Processing(detail)
        } else {
            ApiError::Processing(GENERIC_PROCESSING_DETAIL.to_string())
        }
    }
}

/// Build the router: GET / and POST /detect
pub fn create_app(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/", get(home_handler))
        .route("/detect", post(detect_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until Ctrl-C
pub async fn start_server(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = create_app(state);

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received, stopping server");
        })
        .await?;

    Ok(())
}
