//! Train command - searches every configured candidate and persists the best.

use core::fmt::Display;

use anyhow::{Context, Result};
use churn_structs::{FeatureSchema, MetricsReport, ModelMetrics};
use config::Settings;
use data_loader::load_churn_csv;
use indexmap::IndexMap;
use ml_model::metrics::{roc_auc, threshold_predictions, ClassificationReport};
use ml_model::selection::{stratified_split, StratifiedKFold};
use ml_model::{grid_search, CandidateSpec, LabelledTable, Preprocessor};
use tracing::{info, warn};

use super::{delimiter_byte, write_json};

/// Runs the train command.
///
/// Writes the best pipeline, its request schema and a metrics report for
/// every candidate that trained successfully.
///
/// # Errors
///
/// Returns an error if a candidate is misconfigured, the dataset cannot be
/// loaded or split, no candidate can be trained, or an artifact cannot be
/// written.
pub fn run(settings: &Settings) -> Result<MetricsReport> {
    let specs = settings
        .training
        .models
        .iter()
        .map(|candidate| {
            CandidateSpec::new(&candidate.name, &candidate.estimator, &candidate.params)
                .with_context(|| format!("Invalid training candidate '{}'", candidate.name))
        })
        .collect::<Result<Vec<_>>>()?;

    let schema = FeatureSchema {
        target_column: settings.data.target.clone(),
        ..FeatureSchema::default()
    };

    let table = load_churn_csv(&settings.data.path, delimiter_byte(settings.data.delimiter)?)
        .with_context(|| format!("Failed to load {}", settings.data.path.display()))?;
    let dataset = LabelledTable::from_table(table, &schema)
        .with_context(|| format!("Target column '{}' not found", schema.target_column))?;

    info!(
        rows = dataset.len(),
        positives = dataset.positives(),
        "Prepared labelled dataset"
    );

    let seed = settings.data.random_state;
    let split = stratified_split(&dataset.labels, settings.data.test_size, seed)?;
    let train = dataset.take(&split.train);
    let test = dataset.take(&split.test);
    info!(train = train.len(), test = test.len(), "Split dataset");

    let preprocessor = Preprocessor::new(&schema);
    let folds = StratifiedKFold::new(settings.training.cv_folds, seed);
    let threshold = settings.serving.threshold;

    let mut leaderboard = Leaderboard::default();
    for spec in &specs {
        let evaluation = grid_search(spec, &preprocessor, &train, &folds, seed).and_then(|outcome| {
            let proba = outcome.pipeline.predict_proba(&test.features)?;
            let auc = roc_auc(&test.labels, &proba).unwrap_or(0.5);
            let report =
                ClassificationReport::new(&test.labels, &threshold_predictions(&proba, threshold));

            info!(
                candidate = %spec.name,
                cv_auc = outcome.cv_score,
                roc_auc = auc,
                accuracy = report.accuracy,
                f1 = report.f1,
                "Evaluated candidate"
            );

            let metrics = ModelMetrics {
                best_params: outcome.params.to_json_map(),
                roc_auc: auc,
                accuracy: report.accuracy,
                precision: report.precision,
                recall: report.recall,
                f1: report.f1,
            };
            Ok((metrics, outcome.pipeline))
        });
        leaderboard.record(&spec.name, evaluation);
    }

    let (all_models, best) = leaderboard.finish();
    let Some((best_model, best_roc_auc, pipeline)) = best else {
        anyhow::bail!("No candidate could be trained");
    };

    let project = &settings.project;
    pipeline
        .save(&project.model_path())
        .with_context(|| format!("Failed to save {}", project.model_path().display()))?;
    write_json(&project.schema_path(), &pipeline.schema_artifact())?;

    let report = MetricsReport {
        best_model,
        best_roc_auc,
        all_models,
    };
    write_json(&project.metrics_path(), &report)?;

    info!(
        best_model = %report.best_model,
        roc_auc = report.best_roc_auc,
        model_path = %project.model_path().display(),
        "Training complete"
    );
    Ok(report)
}

/// Test-split results in candidate order, tracking the best by ROC AUC.
///
/// Failed candidates are logged and left out. Exact ties keep the candidate
/// recorded first.
#[derive(Debug)]
struct Leaderboard<T> {
    all_models: IndexMap<String, ModelMetrics>,
    best: Option<(String, f64, T)>,
}

impl<T> Default for Leaderboard<T> {
    fn default() -> Self {
        Self {
            all_models: IndexMap::new(),
            best: None,
        }
    }
}

impl<T> Leaderboard<T> {
    fn record<E: Display>(&mut self, name: &str, evaluation: Result<(ModelMetrics, T), E>) {
        let (metrics, artifact) = match evaluation {
            Ok(evaluation) => evaluation,
            Err(e) => {
                warn!(candidate = %name, error = %e, "Skipping candidate");
                return;
            }
        };

        let auc = metrics.roc_auc;
        self.all_models.insert(name.to_string(), metrics);
        if self.best.as_ref().map_or(true, |(_, best_auc, _)| auc > *best_auc) {
            self.best = Some((name.to_string(), auc, artifact));
        }
    }

    fn finish(self) -> (IndexMap<String, ModelMetrics>, Option<(String, f64, T)>) {
        (self.all_models, self.best)
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;
    use std::path::Path;

    use churn_structs::{SchemaArtifact, CATEGORICAL_FEATURES, NUMERIC_FEATURES};
    use config::CandidateConfig;
    use ml_model::{ModelError, Pipeline};
    use tempfile::tempdir;

    use super::*;

    /// 100 balanced rows where contract and tenure carry the signal, plus
    /// one row without a customer id and one with a blank `TotalCharges`.
    fn write_synthetic_csv(path: &Path) {
        let mut csv = String::new();
        let header: Vec<&str> = std::iter::once("customerID")
            .chain(CATEGORICAL_FEATURES)
            .chain(NUMERIC_FEATURES)
            .chain(["Churn"])
            .collect();
        csv.push_str(&header.join(","));
        csv.push('\n');

        for i in 0..101_u32 {
            let churned = i % 2 == 0;
            let id = if i == 100 { String::new() } else { format!("C{i:04}") };
            let contract = match (churned, i % 5) {
                (true, 0) => "One year",
                (true, _) => "Month-to-month",
                (false, 0) => "Month-to-month",
                (false, _) => "Two year",
            };
            let tenure = if churned { i % 12 } else { 12 + i % 48 };
            let monthly = 20.0 + f64::from(i % 7) * 10.0;
            let total = if i == 3 {
                " ".to_string()
            } else {
                format!("{:.2}", monthly * f64::from(tenure))
            };
            let _ = writeln!(
                csv,
                "{id},{gender},{senior},No,No,Yes,No,Fiber optic,No,Yes,No,No,No,No,{contract},Yes,Electronic check,{tenure},{monthly},{total},{churn}",
                gender = if i % 3 == 0 { "Female" } else { "Male" },
                senior = i % 2,
                churn = if churned { "Yes" } else { "No" },
            );
        }
        std::fs::write(path, csv).unwrap();
    }

    fn settings(dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.data.path = dir.join("telco.csv");
        settings.project.artifacts_dir = dir.join("artifacts");
        settings.project.reports_dir = dir.join("reports");
        settings.training.models = vec![CandidateConfig::new("logistic_regression", "logistic_regression")];
        settings
    }

    #[test]
    fn test_train_end_to_end() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        write_synthetic_csv(&settings.data.path);

        let report = run(&settings).unwrap();
        assert_eq!(report.best_model, "logistic_regression");
        assert!((0.0..=1.0).contains(&report.best_roc_auc));

        let schema: SchemaArtifact = serde_json::from_str(
            &std::fs::read_to_string(settings.project.schema_path()).unwrap(),
        )
        .unwrap();
        for feature in CATEGORICAL_FEATURES {
            assert!(schema.categorical_features.contains_key(feature), "{feature}");
        }
        assert_eq!(schema.numeric_features, NUMERIC_FEATURES);
        assert_eq!(
            schema.categorical_features["Contract"],
            vec!["Month-to-month", "One year", "Two year"]
        );

        let metrics: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(settings.project.metrics_path()).unwrap(),
        )
        .unwrap();
        assert_eq!(metrics["best_model"], "logistic_regression");
        assert!(metrics["all_models"]["logistic_regression"]["best_params"].is_object());

        assert!(Pipeline::load(&settings.project.model_path()).is_ok());
    }

    #[test]
    fn test_unknown_estimator_fails_before_loading_data() {
        let dir = tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.training.models = vec![CandidateConfig::new("bad", "made_up_model")];

        let err = run(&settings).unwrap_err();
        assert!(format!("{err:#}").contains("made_up_model"));
    }

    #[test]
    fn test_missing_target_column_fails() {
        let dir = tempdir().unwrap();
        let mut settings = settings(dir.path());
        write_synthetic_csv(&settings.data.path);
        settings.data.target = "Cancelled".to_string();

        let err = run(&settings).unwrap_err();
        assert!(format!("{err:#}").contains("Cancelled"));
    }

    fn metrics(roc_auc: f64) -> ModelMetrics {
        ModelMetrics {
            best_params: serde_json::Map::new(),
            roc_auc,
            accuracy: 0.5,
            precision: 0.5,
            recall: 0.5,
            f1: 0.5,
        }
    }

    #[test]
    fn test_leaderboard_keeps_highest_auc() {
        let mut board = Leaderboard::default();
        board.record::<ModelError>("lr", Ok((metrics(0.7), 1)));
        board.record::<ModelError>("rf", Ok((metrics(0.9), 2)));
        board.record::<ModelError>("gb", Ok((metrics(0.8), 3)));

        let (all_models, best) = board.finish();
        assert_eq!(best, Some(("rf".to_string(), 0.9, 2)));
        assert_eq!(all_models.keys().collect::<Vec<_>>(), ["lr", "rf", "gb"]);
    }

    #[test]
    fn test_leaderboard_first_candidate_wins_ties() {
        let mut board = Leaderboard::default();
        board.record::<ModelError>("zeta", Ok((metrics(0.8), 1)));
        board.record::<ModelError>("alpha", Ok((metrics(0.8), 2)));

        let (_, best) = board.finish();
        assert_eq!(best, Some(("zeta".to_string(), 0.8, 1)));
    }

    #[test]
    fn test_leaderboard_skips_failed_candidates() {
        let mut board = Leaderboard::default();
        board.record("broken", Err(ModelError::SingleClass));
        board.record::<ModelError>("lr", Ok((metrics(0.6), 1)));

        let (all_models, best) = board.finish();
        assert_eq!(best, Some(("lr".to_string(), 0.6, 1)));
        assert!(!all_models.contains_key("broken"));
        assert_eq!(all_models.len(), 1);
    }

    #[test]
    fn test_leaderboard_without_successes_has_no_best() {
        let mut board = Leaderboard::<()>::default();
        board.record("broken", Err(ModelError::SingleClass));
        let (all_models, best) = board.finish();
        assert!(all_models.is_empty());
        assert!(best.is_none());
    }

    #[test]
    fn test_identical_candidates_keep_config_order() {
        let dir = tempdir().unwrap();
        let mut settings = settings(dir.path());
        write_synthetic_csv(&settings.data.path);
        settings.training.models = vec![
            CandidateConfig::new("zeta", "logistic_regression"),
            CandidateConfig::new("alpha", "logistic_regression"),
        ];

        let report = run(&settings).unwrap();
        assert_eq!(report.best_model, "zeta");
        assert_eq!(report.all_models.keys().collect::<Vec<_>>(), ["zeta", "alpha"]);

        let written = std::fs::read_to_string(settings.project.metrics_path()).unwrap();
        let zeta = written.find("\"zeta\": {").unwrap();
        let alpha = written.find("\"alpha\": {").unwrap();
        assert!(zeta < alpha);
    }
}
