//! Frontend errors, rendered as HTML pages.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::warn;

use crate::render::error_page;

#[derive(Debug, thiserror::Error)]
pub enum FrontendError {
    #[error("Field '{field}' must be a number, got '{value}'")]
    InvalidNumber { field: String, value: String },

    #[error("Prediction service unavailable: {0}")]
    Upstream(String),
}

impl FrontendError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidNumber { .. } => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for FrontendError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(%status, error = %self, "Request failed");
        (status, Html(error_page(status, &self.to_string()))).into_response()
    }
}
