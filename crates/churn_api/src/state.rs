//! Shared service state: artifact locations and the lazily loaded artifacts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use churn_structs::SchemaArtifact;
use config::Settings;
use ml_model::Pipeline;
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::ApiError;

pub struct AppState {
    model_path: PathBuf,
    schema_path: PathBuf,
    threshold: f64,
    model: OnceCell<Arc<Pipeline>>,
    schema: OnceCell<Arc<SchemaArtifact>>,
}

impl AppState {
    #[must_use]
    pub fn new(model_path: PathBuf, schema_path: PathBuf, threshold: f64) -> Self {
        Self {
            model_path,
            schema_path,
            threshold,
            model: OnceCell::new(),
            schema: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.project.model_path(),
            settings.project.schema_path(),
            settings.serving.threshold,
        )
    }

    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns the cached pipeline, loading it on first use.
    ///
    /// A failed load leaves the cache empty so a later call retries.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if the file does not exist, [`ApiError::Internal`]
    /// if it cannot be decoded.
    pub async fn model(&self) -> Result<Arc<Pipeline>, ApiError> {
        self.model
            .get_or_try_init(|| async {
                let path = self.model_path.clone();
                if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    return Err(ApiError::NotFound(format!(
                        "Model not found at {}. Train first.",
                        path.display()
                    )));
                }

                let pipeline = tokio::task::spawn_blocking(move || Pipeline::load(&path))
                    .await
                    .map_err(|e| ApiError::Internal(e.to_string()))?
                    .map_err(|e| ApiError::Internal(format!("Failed to load model: {e}")))?;

                info!(kind = %pipeline.kind(), "Model loaded");
                Ok::<_, ApiError>(Arc::new(pipeline))
            })
            .await
            .cloned()
    }

    /// Returns the cached schema artifact, reading it on first use.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if the file does not exist, [`ApiError::Internal`]
    /// if it is not a valid schema.
    pub async fn schema(&self) -> Result<Arc<SchemaArtifact>, ApiError> {
        self.schema
            .get_or_try_init(|| async {
                let raw = match tokio::fs::read_to_string(&self.schema_path).await {
                    Ok(raw) => raw,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        return Err(ApiError::NotFound("Schema not found. Train first.".into()));
                    }
                    Err(e) => return Err(ApiError::Internal(e.to_string())),
                };
                let schema: SchemaArtifact = serde_json::from_str(&raw)
                    .map_err(|e| ApiError::Internal(format!("Invalid schema file: {e}")))?;
                Ok::<_, ApiError>(Arc::new(schema))
            })
            .await
            .cloned()
    }
}
