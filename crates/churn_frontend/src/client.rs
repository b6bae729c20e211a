//! HTTP client for the inference service.

use core::time::Duration;

use anyhow::{Context, Result};
use churn_structs::SchemaArtifact;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::FrontendError;

const SCHEMA_TIMEOUT: Duration = Duration::from_secs(5);
const PREDICT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the churn API at a fixed base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches `GET /schema`.
    ///
    /// # Errors
    ///
    /// [`FrontendError::Upstream`] on transport failure, a non-success status
    /// or an unreadable body.
    pub async fn schema(&self) -> Result<SchemaArtifact, FrontendError> {
        let url = format!("{}/schema", self.base_url);
        debug!(%url, "Fetching schema");

        let response = self
            .client
            .get(&url)
            .timeout(SCHEMA_TIMEOUT)
            .send()
            .await
            .map_err(|e| FrontendError::Upstream(format!("Failed to reach {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FrontendError::Upstream(format!(
                "Schema request failed with status {status}: {body}"
            )));
        }

        response
            .json::<SchemaArtifact>()
            .await
            .map_err(|e| FrontendError::Upstream(format!("Invalid schema response: {e}")))
    }

    /// Posts `payload` to `POST /predict` and returns the JSON body, whatever
    /// the status.
    ///
    /// # Errors
    ///
    /// [`FrontendError::Upstream`] on transport failure or a non-JSON body.
    pub async fn predict(&self, payload: &Map<String, Value>) -> Result<Value, FrontendError> {
        let url = format!("{}/predict", self.base_url);

        let response = self
            .client
            .post(&url)
            .timeout(PREDICT_TIMEOUT)
            .json(payload)
            .send()
            .await
            .map_err(|e| FrontendError::Upstream(format!("Failed to reach {url}: {e}")))?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| FrontendError::Upstream(format!("Invalid prediction response: {e}")))?;

        info!(%status, "Prediction proxied");
        Ok(body)
    }
}
