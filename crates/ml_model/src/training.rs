//! Cross-validated grid search over one candidate's hyperparameters.

use tracing::{debug, info, warn};

use crate::dataset::LabelledTable;
use crate::estimator::EstimatorParams;
use crate::metrics::roc_auc;
use crate::pipeline::Pipeline;
use crate::preprocess::Preprocessor;
use crate::registry::CandidateSpec;
use crate::selection::StratifiedKFold;
use crate::ModelError;

/// Winning parameters of a grid search and the pipeline refit with them.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub params: EstimatorParams,
    /// Mean ROC AUC over the validation folds.
    pub cv_score: f64,
    /// Pipeline refit on all of `train`.
    pub pipeline: Pipeline,
}

/// Scores every parameter combination of `spec` by mean fold ROC AUC and
/// refits the best one on the whole training set.
///
/// Each fold fits a fresh preprocessor and estimator on its training part.
/// Exact ties keep the combination seen first.
///
/// # Arguments
///
/// * `spec` - The candidate whose grid is searched.
/// * `preprocessor` - Unfitted column transform shared by every fit.
/// * `train` - Training split, target already removed.
/// * `folds` - Splitter used for the cross-validation.
/// * `seed` - Seed handed to the estimators.
///
/// # Errors
///
/// Fails if folds cannot be formed or no combination can be fitted.
pub fn grid_search(
    spec: &CandidateSpec,
    preprocessor: &Preprocessor,
    train: &LabelledTable,
    folds: &StratifiedKFold,
    seed: u64,
) -> Result<SearchOutcome, ModelError> {
    let splits = folds.split(&train.labels)?;
    let combinations = spec.grid.candidates();
    info!(
        candidate = %spec.name,
        combinations = combinations.len(),
        folds = splits.len(),
        "Starting grid search"
    );

    let mut best: Option<(EstimatorParams, f64)> = None;
    let mut last_error = None;

    for params in combinations {
        let mut scores = Vec::with_capacity(splits.len());
        for split in &splits {
            let fit_part = train.take(&split.train);
            let held_out = train.take(&split.test);

            let score = Pipeline::fit(
                spec.kind,
                &params,
                preprocessor,
                &fit_part.features,
                &fit_part.labels,
                seed,
            )
            .and_then(|pipeline| pipeline.predict_proba(&held_out.features))
            .map(|proba| roc_auc(&held_out.labels, &proba));

            match score {
                Ok(Some(auc)) => scores.push(auc),
                Ok(None) => {}
                Err(e) => {
                    warn!(candidate = %spec.name, error = %e, "Fold fit failed");
                    last_error = Some(e);
                    scores.clear();
                    break;
                }
            }
        }

        if scores.is_empty() {
            continue;
        }
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        debug!(candidate = %spec.name, ?params, cv_auc = mean, "Scored combination");

        if best.as_ref().map_or(true, |(_, score)| mean > *score) {
            best = Some((params, mean));
        }
    }

    let Some((params, cv_score)) = best else {
        return Err(last_error.unwrap_or_else(|| {
            ModelError::InvalidSplit(format!("no scorable folds for candidate {}", spec.name))
        }));
    };

    let pipeline = Pipeline::fit(
        spec.kind,
        &params,
        preprocessor,
        &train.features,
        &train.labels,
        seed,
    )?;

    info!(candidate = %spec.name, cv_auc = cv_score, "Grid search finished");

    Ok(SearchOutcome {
        params,
        cv_score,
        pipeline,
    })
}

#[cfg(test)]
mod tests {
    use churn_structs::{FeatureSchema, Table, Value};
    use serde_json::json;

    use super::*;

    fn schema() -> FeatureSchema {
        FeatureSchema {
            categorical: vec!["Contract".into()],
            numeric: vec!["tenure".into()],
            ..FeatureSchema::default()
        }
    }

    fn train_set() -> LabelledTable {
        let mut features = Table::new(vec!["tenure".into(), "Contract".into()]);
        let mut labels = Vec::new();
        for i in 0..40 {
            let churned = i % 2 == 0;
            // Tenure carries no signal; the contract gives the label away.
            let tenure = f64::from(i % 5);
            let contract = if churned { "Month-to-month" } else { "Two year" };
            features
                .push_row(vec![Value::from(tenure), contract.into()])
                .expect("row fits");
            labels.push(u8::from(churned));
        }
        LabelledTable { features, labels }
    }

    #[test]
    fn test_grid_search_picks_a_combination() {
        let params = json!({ "c": [0.01, 1.0] });
        let spec = CandidateSpec::new(
            "lr",
            "logistic_regression",
            params.as_object().expect("object"),
        )
        .unwrap();

        let outcome = grid_search(
            &spec,
            &Preprocessor::new(&schema()),
            &train_set(),
            &StratifiedKFold::new(5, 42),
            42,
        )
        .unwrap();

        assert!((0.0..=1.0).contains(&outcome.cv_score));
        assert!(outcome.cv_score > 0.9);
        assert!(matches!(outcome.params, EstimatorParams::Logistic(_)));
    }

    #[test]
    fn test_equal_scores_keep_first_combination() {
        // Perfectly separable data scores AUC 1.0 for every C.
        let params = json!({ "c": [0.5, 2.0] });
        let spec = CandidateSpec::new(
            "lr",
            "logistic_regression",
            params.as_object().expect("object"),
        )
        .unwrap();

        let outcome = grid_search(
            &spec,
            &Preprocessor::new(&schema()),
            &train_set(),
            &StratifiedKFold::new(4, 0),
            0,
        )
        .unwrap();
        assert!(matches!(outcome.params, EstimatorParams::Logistic(ref p) if p.c == 0.5));
    }

    #[test]
    fn test_too_many_folds_fails() {
        let spec = CandidateSpec::new("lr", "logistic_regression", &serde_json::Map::new()).unwrap();
        let err = grid_search(
            &spec,
            &Preprocessor::new(&schema()),
            &train_set(),
            &StratifiedKFold::new(50, 0),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidSplit(_)));
    }
}
