//! JSON artifacts written by training and read by serving.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Request shape derived from a fitted pipeline.
///
/// `categorical_features` maps each categorical feature to the categories its
/// one-hot encoder saw during training.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaArtifact {
    pub categorical_features: BTreeMap<String, Vec<String>>,
    pub numeric_features: Vec<String>,
}

/// Test-split scores of one candidate after its hyperparameter search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub best_params: serde_json::Map<String, serde_json::Value>,
    pub roc_auc: f64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Report covering every candidate of a training run, in configuration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub best_model: String,
    pub best_roc_auc: f64,
    pub all_models: IndexMap<String, ModelMetrics>,
}
