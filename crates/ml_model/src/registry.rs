//! Maps configured estimator names to model kinds and typed hyperparameter
//! grids.

use churn_structs::ModelKind;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

#[cfg(any(feature = "xgboost", feature = "lightgbm"))]
use crate::boosting::BoostingParams;
use crate::estimator::EstimatorParams;
use crate::forest::ForestParams;
use crate::linear::LogisticParams;
use crate::ModelError;

/// Whether `kind` was compiled into this build.
#[must_use]
pub const fn is_available(kind: ModelKind) -> bool {
    match kind {
        ModelKind::LogisticRegression | ModelKind::RandomForest => true,
        ModelKind::XGBoost => cfg!(feature = "xgboost"),
        ModelKind::LightGbm => cfg!(feature = "lightgbm"),
    }
}

/// Resolves a configured estimator name (case-insensitive).
///
/// # Errors
///
/// Returns [`ModelError::UnknownEstimator`] if the name is not recognised or
/// names a model this build does not include.
pub fn resolve_estimator(name: &str) -> Result<ModelKind, ModelError> {
    name.parse::<ModelKind>()
        .ok()
        .filter(|kind| is_available(*kind))
        .ok_or_else(|| ModelError::UnknownEstimator(name.to_string()))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogisticGrid {
    #[serde(default = "LogisticGrid::default_c", alias = "C")]
    pub c: Vec<f64>,
    #[serde(default = "LogisticGrid::default_max_iter")]
    pub max_iter: Vec<usize>,
}

impl LogisticGrid {
    fn default_c() -> Vec<f64> {
        vec![1.0]
    }

    fn default_max_iter() -> Vec<usize> {
        vec![100]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForestGrid {
    #[serde(default = "ForestGrid::default_n_estimators")]
    pub n_estimators: Vec<usize>,
    #[serde(default = "ForestGrid::default_max_depth")]
    pub max_depth: Vec<Option<usize>>,
    #[serde(default = "ForestGrid::default_min_samples_split")]
    pub min_samples_split: Vec<usize>,
    #[serde(default = "ForestGrid::default_min_samples_leaf")]
    pub min_samples_leaf: Vec<usize>,
}

impl ForestGrid {
    fn default_n_estimators() -> Vec<usize> {
        vec![100]
    }

    fn default_max_depth() -> Vec<Option<usize>> {
        vec![None]
    }

    fn default_min_samples_split() -> Vec<usize> {
        vec![2]
    }

    fn default_min_samples_leaf() -> Vec<usize> {
        vec![1]
    }
}

/// Boosting grid. Tree limits left unset take the defaults of the
/// configured kind.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoostingGrid {
    #[serde(default = "BoostingGrid::default_n_estimators")]
    pub n_estimators: Vec<usize>,
    #[serde(default = "BoostingGrid::default_learning_rate")]
    pub learning_rate: Vec<f64>,
    #[serde(default)]
    pub max_depth: Option<Vec<usize>>,
    #[serde(default)]
    pub min_samples_leaf: Option<Vec<usize>>,
}

impl BoostingGrid {
    fn default_n_estimators() -> Vec<usize> {
        vec![100]
    }

    fn default_learning_rate() -> Vec<f64> {
        vec![0.1]
    }
}

/// Typed hyperparameter grid for one model kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamGrid {
    Logistic(LogisticGrid),
    Forest(ForestGrid),
    Boosting { kind: ModelKind, grid: BoostingGrid },
}

impl ParamGrid {
    /// Parses and validates the `params` mapping of a configured candidate.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidParams`] for unknown keys, wrongly typed
    /// values, empty value lists or out-of-range values.
    pub fn from_params(kind: ModelKind, params: &Map<String, Value>) -> Result<Self, ModelError> {
        let grid = match kind {
            ModelKind::LogisticRegression => Self::Logistic(parse(kind, params)?),
            ModelKind::RandomForest => Self::Forest(parse(kind, params)?),
            ModelKind::XGBoost | ModelKind::LightGbm => Self::Boosting {
                kind,
                grid: parse(kind, params)?,
            },
        };
        grid.validate()?;
        Ok(grid)
    }

    #[must_use]
    pub const fn kind(&self) -> ModelKind {
        match self {
            Self::Logistic(_) => ModelKind::LogisticRegression,
            Self::Forest(_) => ModelKind::RandomForest,
            Self::Boosting { kind, .. } => *kind,
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        let kind = self.kind();
        let invalid = |message: String| ModelError::InvalidParams { kind, message };

        match self {
            Self::Logistic(g) => {
                non_empty(&g.c, "c").map_err(invalid)?;
                non_empty(&g.max_iter, "max_iter").map_err(invalid)?;
                if g.c.iter().any(|c| !(c.is_finite() && *c > 0.0)) {
                    return Err(invalid("c must be positive".into()));
                }
                if g.max_iter.contains(&0) {
                    return Err(invalid("max_iter must be at least 1".into()));
                }
            }
            Self::Forest(g) => {
                non_empty(&g.n_estimators, "n_estimators").map_err(invalid)?;
                non_empty(&g.max_depth, "max_depth").map_err(invalid)?;
                non_empty(&g.min_samples_split, "min_samples_split").map_err(invalid)?;
                non_empty(&g.min_samples_leaf, "min_samples_leaf").map_err(invalid)?;
                if g.n_estimators.contains(&0) {
                    return Err(invalid("n_estimators must be at least 1".into()));
                }
                if g.min_samples_split.iter().any(|&v| v < 2) {
                    return Err(invalid("min_samples_split must be at least 2".into()));
                }
                if g.min_samples_leaf.contains(&0) {
                    return Err(invalid("min_samples_leaf must be at least 1".into()));
                }
            }
            Self::Boosting { grid: g, .. } => {
                non_empty(&g.n_estimators, "n_estimators").map_err(invalid)?;
                non_empty(&g.learning_rate, "learning_rate").map_err(invalid)?;
                if let Some(v) = &g.max_depth {
                    non_empty(v, "max_depth").map_err(invalid)?;
                }
                if let Some(v) = &g.min_samples_leaf {
                    non_empty(v, "min_samples_leaf").map_err(invalid)?;
                    if v.contains(&0) {
                        return Err(invalid("min_samples_leaf must be at least 1".into()));
                    }
                }
                if g.n_estimators.contains(&0) {
                    return Err(invalid("n_estimators must be at least 1".into()));
                }
                if g.learning_rate.iter().any(|r| !(r.is_finite() && *r > 0.0)) {
                    return Err(invalid("learning_rate must be positive".into()));
                }
            }
        }
        Ok(())
    }

    /// Every parameter combination, as the cartesian product of the value
    /// lists in field order (the last field varies fastest).
    #[must_use]
    pub fn candidates(&self) -> Vec<EstimatorParams> {
        let mut out = Vec::new();
        match self {
            Self::Logistic(g) => {
                for &c in &g.c {
                    for &max_iter in &g.max_iter {
                        out.push(EstimatorParams::Logistic(LogisticParams { c, max_iter }));
                    }
                }
            }
            Self::Forest(g) => {
                for &n_estimators in &g.n_estimators {
                    for &max_depth in &g.max_depth {
                        for &min_samples_split in &g.min_samples_split {
                            for &min_samples_leaf in &g.min_samples_leaf {
                                out.push(EstimatorParams::Forest(ForestParams {
                                    n_estimators,
                                    max_depth,
                                    min_samples_split,
                                    min_samples_leaf,
                                }));
                            }
                        }
                    }
                }
            }
            Self::Boosting { kind, grid } => boosting_candidates(*kind, grid, &mut out),
        }
        out
    }
}

#[cfg(any(feature = "xgboost", feature = "lightgbm"))]
fn boosting_candidates(kind: ModelKind, grid: &BoostingGrid, out: &mut Vec<EstimatorParams>) {
    let defaults = match EstimatorParams::default_for(kind) {
        Some(EstimatorParams::Boosting(params)) => params,
        _ => BoostingParams::default(),
    };
    let max_depth = grid
        .max_depth
        .clone()
        .unwrap_or_else(|| vec![defaults.max_depth]);
    let min_samples_leaf = grid
        .min_samples_leaf
        .clone()
        .unwrap_or_else(|| vec![defaults.min_samples_leaf]);

    for &n_estimators in &grid.n_estimators {
        for &learning_rate in &grid.learning_rate {
            for &max_depth in &max_depth {
                for &min_samples_leaf in &min_samples_leaf {
                    out.push(EstimatorParams::Boosting(BoostingParams {
                        n_estimators,
                        learning_rate,
                        max_depth,
                        min_samples_leaf,
                    }));
                }
            }
        }
    }
}

// Boosted kinds never resolve without their feature, so no grid reaches here.
#[cfg(not(any(feature = "xgboost", feature = "lightgbm")))]
fn boosting_candidates(_kind: ModelKind, _grid: &BoostingGrid, _out: &mut Vec<EstimatorParams>) {}

fn parse<T: DeserializeOwned>(kind: ModelKind, params: &Map<String, Value>) -> Result<T, ModelError> {
    serde_json::from_value(Value::Object(params.clone())).map_err(|e| ModelError::InvalidParams {
        kind,
        message: e.to_string(),
    })
}

fn non_empty<T>(values: &[T], field: &str) -> Result<(), String> {
    if values.is_empty() {
        Err(format!("{field} must list at least one value"))
    } else {
        Ok(())
    }
}

/// A validated training candidate: config name, model kind and grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSpec {
    pub name: String,
    pub kind: ModelKind,
    pub grid: ParamGrid,
}

impl CandidateSpec {
    /// # Errors
    ///
    /// Fails if `estimator` does not resolve or `params` is not a valid grid
    /// for it.
    pub fn new(name: &str, estimator: &str, params: &Map<String, Value>) -> Result<Self, ModelError> {
        let kind = resolve_estimator(estimator)?;
        let grid = ParamGrid::from_params(kind, params)?;
        Ok(Self {
            name: name.to_string(),
            kind,
            grid,
        })
    }
}
