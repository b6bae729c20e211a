//! Fitted preprocessing plus estimator, persisted as one bincode artifact.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use churn_structs::{ModelKind, SchemaArtifact, Table};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::estimator::{EstimatorParams, FittedEstimator, ProbabilisticClassifier};
use crate::preprocess::{FittedPreprocessor, Preprocessor};
use crate::ModelError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    kind: ModelKind,
    params: EstimatorParams,
    preprocessor: FittedPreprocessor,
    estimator: FittedEstimator,
}

impl Pipeline {
    /// Fits a fresh preprocessor on `features`, then the estimator on the
    /// transformed matrix.
    ///
    /// # Errors
    ///
    /// Fails on an empty table, a label count mismatch, labels with a single
    /// class, or a missing feature column.
    pub fn fit(
        kind: ModelKind,
        params: &EstimatorParams,
        preprocessor: &Preprocessor,
        features: &Table,
        labels: &[u8],
        seed: u64,
    ) -> Result<Self, ModelError> {
        if features.is_empty() {
            return Err(ModelError::EmptyDataset);
        }
        if features.height() != labels.len() {
            return Err(ModelError::LabelCount {
                expected: features.height(),
                got: labels.len(),
            });
        }
        let positives = labels.iter().filter(|&&l| l == 1).count();
        if positives == 0 || positives == labels.len() {
            return Err(ModelError::SingleClass);
        }

        let preprocessor = preprocessor.fit(features)?;
        let x = preprocessor.transform(features)?;
        let estimator = params.fit(x.view(), labels, seed);

        Ok(Self {
            kind,
            params: params.clone(),
            preprocessor,
            estimator,
        })
    }

    /// Probability of churn for every row of `features`.
    ///
    /// # Errors
    ///
    /// Fails if a column seen at fit time is missing.
    pub fn predict_proba(&self, features: &Table) -> Result<Vec<f64>, ModelError> {
        let x = self.preprocessor.transform(features)?;
        Ok(self.estimator.predict_proba(x.view()).to_vec())
    }

    #[must_use]
    pub const fn kind(&self) -> ModelKind {
        self.kind
    }

    #[must_use]
    pub const fn params(&self) -> &EstimatorParams {
        &self.params
    }

    /// Class name of the underlying estimator, as reported by the API.
    #[must_use]
    pub const fn estimator_name(&self) -> &'static str {
        self.kind.estimator_name()
    }

    #[must_use]
    pub fn schema_artifact(&self) -> SchemaArtifact {
        self.preprocessor.schema_artifact()
    }

    /// Writes the pipeline to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be created or encoding fails.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;
        info!(path = %path.display(), kind = %self.kind, "Saved pipeline");
        Ok(())
    }

    /// # Errors
    ///
    /// Fails if the file cannot be opened or does not decode as a pipeline.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let reader = BufReader::new(File::open(path)?);
        let pipeline: Self = bincode::deserialize_from(reader)?;
        info!(path = %path.display(), kind = %pipeline.kind, "Loaded pipeline");
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use churn_structs::{FeatureSchema, Value};
    use tempfile::tempdir;

    use super::*;
    use crate::linear::LogisticParams;

    fn schema() -> FeatureSchema {
        FeatureSchema {
            categorical: vec!["Contract".into()],
            numeric: vec!["tenure".into()],
            ..FeatureSchema::default()
        }
    }

    fn data() -> (Table, Vec<u8>) {
        let mut table = Table::new(vec!["tenure".into(), "Contract".into()]);
        let mut labels = Vec::new();
        for i in 0..20 {
            let churned = i % 2 == 0;
            let contract = if churned { "Month-to-month" } else { "Two year" };
            table
                .push_row(vec![Value::from(f64::from(i)), contract.into()])
                .expect("row fits");
            labels.push(u8::from(churned));
        }
        (table, labels)
    }

    fn fit() -> Pipeline {
        let (table, labels) = data();
        Pipeline::fit(
            ModelKind::LogisticRegression,
            &EstimatorParams::Logistic(LogisticParams::default()),
            &Preprocessor::new(&schema()),
            &table,
            &labels,
            0,
        )
        .expect("fits")
    }

    #[test]
    fn test_predictions_are_probabilities() {
        let pipeline = fit();
        let (table, _) = data();
        let proba = pipeline.predict_proba(&table).unwrap();
        assert_eq!(proba.len(), 20);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(proba[0] > 0.5 && proba[1] < 0.5);
        assert_eq!(pipeline.estimator_name(), "LogisticRegression");
    }

    #[test]
    fn test_save_and_load_score_identically() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("models").join("best_model.bin");
        let pipeline = fit();
        pipeline.save(&path).unwrap();

        let first = Pipeline::load(&path).unwrap();
        let second = Pipeline::load(&path).unwrap();
        let (table, _) = data();
        assert_eq!(first.predict_proba(&table).unwrap(), second.predict_proba(&table).unwrap());
        assert_eq!(first, pipeline);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_save_reports_flush_failure() {
        let err = fit().save(Path::new("/dev/full")).unwrap_err();
        assert!(matches!(err, ModelError::Io(_) | ModelError::Encoding(_)));
    }

    #[test]
    fn test_single_class_rejected() {
        let (table, _) = data();
        let err = Pipeline::fit(
            ModelKind::LogisticRegression,
            &EstimatorParams::Logistic(LogisticParams::default()),
            &Preprocessor::new(&schema()),
            &table,
            &[0; 20],
            0,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::SingleClass));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = Pipeline::load(&dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, ModelError::Io(_)));
    }
}
