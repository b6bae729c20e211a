//! HTML frontend for the churn inference service.
//!
//! Renders a form generated from the service's `/schema` and forwards
//! submissions to its `/predict` endpoint.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use config::Settings;
use tower_http::trace::TraceLayer;
use tracing::info;

mod client;
mod error;
mod handlers;
mod render;

pub use client::ApiClient;
pub use error::FrontendError;
pub use handlers::build_payload;
pub use render::escape_html;

/// Builds the frontend router around `client`.
pub fn router(client: Arc<ApiClient>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/predict", post(handlers::predict))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(client)
}

/// Binds `frontend.bind` and serves until the process stops.
///
/// # Errors
///
/// Returns an error if the client cannot be built, the address cannot be
/// bound, or the server fails.
pub async fn serve(settings: &Settings) -> Result<()> {
    let client = Arc::new(ApiClient::new(&settings.frontend.api_url)?);
    let listener = tokio::net::TcpListener::bind(&settings.frontend.bind)
        .await
        .with_context(|| format!("Failed to bind {}", settings.frontend.bind))?;

    info!(
        addr = %settings.frontend.bind,
        api_url = client.base_url(),
        "Frontend listening"
    );
    axum::serve(listener, router(client))
        .await
        .context("Frontend stopped")
}
