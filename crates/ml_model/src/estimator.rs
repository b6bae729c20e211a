//! Closed set of estimators behind one fit/predict interface.

use churn_structs::ModelKind;
use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

#[cfg(any(feature = "xgboost", feature = "lightgbm"))]
use crate::boosting::{BoostingParams, GradientBoosting};
use crate::forest::{ForestParams, RandomForest};
use crate::linear::{LogisticParams, LogisticRegression};

/// A fitted model that scores rows with the probability of the positive class.
pub trait ProbabilisticClassifier {
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Array1<f64>;
}

/// One concrete hyperparameter combination for a given estimator family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EstimatorParams {
    Logistic(LogisticParams),
    Forest(ForestParams),
    #[cfg(any(feature = "xgboost", feature = "lightgbm"))]
    Boosting(BoostingParams),
}

impl EstimatorParams {
    /// Default hyperparameters for `kind`, or `None` if the kind is not compiled in.
    #[must_use]
    pub fn default_for(kind: ModelKind) -> Option<Self> {
        match kind {
            ModelKind::LogisticRegression => Some(Self::Logistic(LogisticParams::default())),
            ModelKind::RandomForest => Some(Self::Forest(ForestParams::default())),
            #[cfg(feature = "xgboost")]
            ModelKind::XGBoost => Some(Self::Boosting(BoostingParams::default())),
            #[cfg(feature = "lightgbm")]
            ModelKind::LightGbm => Some(Self::Boosting(BoostingParams {
                max_depth: 6,
                min_samples_leaf: 20,
                ..BoostingParams::default()
            })),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// Fits the estimator on a preprocessed design matrix and 0/1 labels.
    #[must_use]
    pub fn fit(&self, x: ArrayView2<'_, f64>, y: &[u8], seed: u64) -> FittedEstimator {
        let y: Vec<f64> = y.iter().map(|&v| f64::from(v)).collect();
        match self {
            Self::Logistic(p) => FittedEstimator::Logistic(LogisticRegression::fit(x, &y, p)),
            Self::Forest(p) => FittedEstimator::Forest(RandomForest::fit(x, &y, p, seed)),
            #[cfg(any(feature = "xgboost", feature = "lightgbm"))]
            Self::Boosting(p) => FittedEstimator::Boosting(GradientBoosting::fit(x, &y, p, seed)),
        }
    }

    /// Parameters as a flat JSON object, as reported in `metrics.json`.
    #[must_use]
    pub fn to_json_map(&self) -> serde_json::Map<String, serde_json::Value> {
        let value = match self {
            Self::Logistic(p) => serde_json::to_value(p),
            Self::Forest(p) => serde_json::to_value(p),
            #[cfg(any(feature = "xgboost", feature = "lightgbm"))]
            Self::Boosting(p) => serde_json::to_value(p),
        };
        value
            .ok()
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default()
    }
}

/// A fitted estimator of any supported family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FittedEstimator {
    Logistic(LogisticRegression),
    Forest(RandomForest),
    #[cfg(any(feature = "xgboost", feature = "lightgbm"))]
    Boosting(GradientBoosting),
}

impl ProbabilisticClassifier for FittedEstimator {
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        match self {
            Self::Logistic(m) => m.predict_proba(x),
            Self::Forest(m) => m.predict_proba(x),
            #[cfg(any(feature = "xgboost", feature = "lightgbm"))]
            Self::Boosting(m) => m.predict_proba(x),
        }
    }
}
