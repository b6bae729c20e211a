//! Churn inference service.
//!
//! Serves the pipeline written by the `train` command:
//! - `GET /health`
//! - `GET /schema` returns the request schema artifact
//! - `POST /predict` scores one customer record
//!
//! The pipeline is loaded on the first prediction and shared read-only
//! afterwards.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use config::Settings;
use tower_http::trace::TraceLayer;
use tracing::info;

mod error;
mod handlers;
mod state;

pub use error::ApiError;
pub use state::AppState;

/// Builds the service router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/schema", get(handlers::schema))
        .route("/predict", post(handlers::predict))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `serving.bind` and serves until the process stops.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(settings: &Settings) -> Result<()> {
    let state = Arc::new(AppState::from_settings(settings));
    let listener = tokio::net::TcpListener::bind(&settings.serving.bind)
        .await
        .with_context(|| format!("Failed to bind {}", settings.serving.bind))?;

    info!(
        addr = %settings.serving.bind,
        model_path = %state.model_path().display(),
        threshold = state.threshold(),
        "Inference service listening"
    );
    axum::serve(listener, router(state))
        .await
        .context("Inference service stopped")
}
