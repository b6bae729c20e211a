//! HTTP request handlers

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use churn_structs::{ChurnRequest, ChurnResponse, SchemaArtifact, TARGET_COLUMN};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn schema(State(state): State<Arc<AppState>>) -> Result<Json<SchemaArtifact>, ApiError> {
    let schema = state.schema().await?;
    Ok(Json(schema.as_ref().clone()))
}

/// Scores one customer record with the persisted pipeline.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChurnRequest>,
) -> Result<Json<ChurnResponse>, ApiError> {
    let pipeline = state.model().await?;

    let mut table = request.to_table();
    table.drop_column(TARGET_COLUMN);

    let probability = pipeline
        .predict_proba(&table)?
        .first()
        .copied()
        .ok_or_else(|| ApiError::Internal("Pipeline returned no prediction".into()))?;
    let churn_pred = u8::from(probability >= state.threshold());

    debug!(customer_id = %request.customer_id, probability, churn_pred, "Scored request");

    Ok(Json(ChurnResponse {
        customer_id: request.customer_id,
        churn_probability: probability,
        churn_pred,
        model: Some(pipeline.estimator_name().to_string()),
    }))
}
