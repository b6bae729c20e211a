//! ML model crate for churn prediction.
//!
//! Provides the pieces a training run composes into a [`Pipeline`]:
//! column preprocessing, a small set of binary classifiers, evaluation
//! metrics, stratified splitting and cross-validated grid search.

use churn_structs::ModelKind;

mod dataset;
mod estimator;
mod forest;
mod linear;
pub mod metrics;
mod pipeline;
mod preprocess;
pub mod registry;
pub mod selection;
mod training;
mod tree;

#[cfg(any(feature = "xgboost", feature = "lightgbm"))]
mod boosting;

#[cfg(any(feature = "xgboost", feature = "lightgbm"))]
pub use boosting::{BoostingParams, GradientBoosting};
pub use dataset::LabelledTable;
pub use estimator::{EstimatorParams, FittedEstimator, ProbabilisticClassifier};
pub use forest::{ForestParams, RandomForest};
pub use linear::{LogisticParams, LogisticRegression};
pub use pipeline::Pipeline;
pub use preprocess::{CategoricalColumn, FittedPreprocessor, NumericColumn, Preprocessor};
pub use registry::{is_available, resolve_estimator, CandidateSpec, ParamGrid};
pub use training::{grid_search, SearchOutcome};
pub use tree::{DecisionTree, TreeParams};

/// Errors raised while building, fitting, scoring or persisting models.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Unknown or unavailable estimator: {0}")]
    UnknownEstimator(String),

    #[error("invalid hyperparameters for {kind}: {message}")]
    InvalidParams { kind: ModelKind, message: String },

    #[error("column '{0}' required by the pipeline is missing")]
    MissingColumn(String),

    #[error("cannot fit on an empty dataset")]
    EmptyDataset,

    #[error("expected {expected} labels, got {got}")]
    LabelCount { expected: usize, got: usize },

    #[error("training labels must contain both classes")]
    SingleClass,

    #[error("invalid split: {0}")]
    InvalidSplit(String),

    #[error("failed to access pipeline file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode or decode pipeline: {0}")]
    Encoding(#[from] bincode::Error),
}
