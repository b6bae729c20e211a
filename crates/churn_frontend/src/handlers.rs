//! HTTP request handlers

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::{Form, Json};
use churn_structs::{SchemaArtifact, ID_COLUMN};
use serde_json::{json, Map, Number, Value};

use crate::client::ApiClient;
use crate::error::FrontendError;
use crate::render::{form_page, result_page};

const DEFAULT_CUSTOMER_ID: &str = "web-user";

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn index(State(client): State<Arc<ApiClient>>) -> Result<Html<String>, FrontendError> {
    let schema = client.schema().await?;
    Ok(Html(form_page(&schema)))
}

pub async fn predict(
    State(client): State<Arc<ApiClient>>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Html<String>, FrontendError> {
    let schema = client.schema().await?;
    let payload = build_payload(&schema, &form)?;
    let result = client.predict(&payload).await?;
    Ok(Html(result_page(&result)))
}

/// Builds the prediction request from submitted form fields, reading only
/// the fields the schema declares.
///
/// Numeric fields that are absent or empty become `null`; categorical fields
/// that are absent become `null`.
///
/// # Errors
///
/// [`FrontendError::InvalidNumber`] if a numeric field does not parse.
pub fn build_payload(
    schema: &SchemaArtifact,
    form: &HashMap<String, String>,
) -> Result<Map<String, Value>, FrontendError> {
    let mut payload = Map::new();

    let customer_id = form
        .get(ID_COLUMN)
        .map_or(DEFAULT_CUSTOMER_ID, String::as_str);
    payload.insert(ID_COLUMN.to_string(), Value::from(customer_id));

    for feature in &schema.numeric_features {
        let value = match form.get(feature).map(|raw| raw.trim()) {
            None | Some("") => Value::Null,
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| FrontendError::InvalidNumber {
                    field: feature.clone(),
                    value: raw.to_string(),
                })?,
        };
        payload.insert(feature.clone(), value);
    }

    for feature in schema.categorical_features.keys() {
        let value = form.get(feature).map_or(Value::Null, |v| Value::from(v.as_str()));
        payload.insert(feature.clone(), value);
    }

    Ok(payload)
}
