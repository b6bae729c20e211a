//! Settings loaded from a YAML file, with a few environment overrides.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default location of the settings file.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Resolves which settings file to read.
///
/// Precedence: explicit path, then `CHURN_CONFIG`, then [`DEFAULT_CONFIG_PATH`].
#[must_use]
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    dotenvy::dotenv().ok();

    explicit.map_or_else(
        || {
            std::env::var("CHURN_CONFIG")
                .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
        },
        Path::to_path_buf,
    )
}

/// Complete application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub project: ProjectSettings,
    pub data: DataSettings,
    pub training: TrainingSettings,
    pub serving: ServingSettings,
    pub frontend: FrontendSettings,
}

/// Where artifacts and reports are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectSettings {
    pub artifacts_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from("artifacts"),
            reports_dir: PathBuf::from("reports"),
        }
    }
}

impl ProjectSettings {
    #[must_use]
    pub fn models_dir(&self) -> PathBuf {
        self.artifacts_dir.join("models")
    }

    /// Path of the persisted best pipeline.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.models_dir().join("best_model.bin")
    }

    /// Path of the derived request schema.
    #[must_use]
    pub fn schema_path(&self) -> PathBuf {
        self.models_dir().join("schema.json")
    }

    /// Path of the training metrics report.
    #[must_use]
    pub fn metrics_path(&self) -> PathBuf {
        self.reports_dir.join("metrics.json")
    }

    /// Path of the dataset summary report.
    #[must_use]
    pub fn describe_path(&self) -> PathBuf {
        self.reports_dir.join("describe.json")
    }
}

/// Input dataset and split settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataSettings {
    pub path: PathBuf,
    pub target: String,
    pub test_size: f64,
    pub random_state: u64,
    pub delimiter: char,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/telco.csv"),
            target: String::from("Churn"),
            test_size: 0.2,
            random_state: 42,
            delimiter: ',',
        }
    }
}

/// One training candidate as written in the settings file.
///
/// `params` stays untyped here; the model registry turns it into a typed
/// grid for the estimator before training starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CandidateConfig {
    pub name: String,
    pub estimator: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl CandidateConfig {
    #[must_use]
    pub fn new(name: &str, estimator: &str) -> Self {
        Self {
            name: name.to_string(),
            estimator: estimator.to_string(),
            params: serde_json::Map::new(),
        }
    }
}

/// Model search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingSettings {
    pub cv_folds: usize,
    pub models: Vec<CandidateConfig>,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            cv_folds: 5,
            models: vec![
                CandidateConfig::new("logistic_regression", "logistic_regression"),
                CandidateConfig::new("random_forest", "random_forest"),
            ],
        }
    }
}

/// Inference service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServingSettings {
    pub bind: String,
    /// Probability at or above which a customer is predicted to churn.
    pub threshold: f64,
}

impl Default for ServingSettings {
    fn default() -> Self {
        Self {
            bind: String::from("0.0.0.0:8000"),
            threshold: 0.5,
        }
    }
}

/// Web frontend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrontendSettings {
    pub bind: String,
    pub api_url: String,
}

impl Default for FrontendSettings {
    fn default() -> Self {
        Self {
            bind: String::from("0.0.0.0:5000"),
            api_url: String::from("http://localhost:8000"),
        }
    }
}

impl Settings {
    /// Reads, overrides from the environment and validates a settings file.
    ///
    /// Optional environment variables:
    /// - `API_URL`: replaces `frontend.api_url`
    /// - `ARTIFACTS_DIR`: replaces `project.artifacts_dir`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting settings are invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;

        let mut settings = Self::from_yaml(&raw)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings.validate()?;

        info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Like [`Settings::load`], but falls back to defaults when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file is invalid.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        warn!(path = %path.display(), "Settings file not found, using defaults");
        let mut settings = Self::default();
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    /// Parses settings from YAML text without validating them.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML does not match the settings layout.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).context("Failed to parse settings YAML")
    }

    /// Applies environment-style overrides through `lookup`.
    pub fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(api_url) = lookup("API_URL") {
            self.frontend.api_url = api_url;
        }
        if let Some(dir) = lookup("ARTIFACTS_DIR") {
            self.project.artifacts_dir = PathBuf::from(dir);
        }
    }

    /// Checks value ranges and candidate list consistency.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        let test_size = self.data.test_size;
        if !(test_size > 0.0 && test_size < 1.0) {
            anyhow::bail!("data.test_size must be in (0, 1), got {test_size}");
        }

        if self.training.cv_folds < 2 {
            anyhow::bail!(
                "training.cv_folds must be at least 2, got {}",
                self.training.cv_folds
            );
        }

        let threshold = self.serving.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("serving.threshold must be in [0, 1], got {threshold}");
        }

        if self.training.models.is_empty() {
            anyhow::bail!("training.models must list at least one candidate");
        }

        let mut seen = HashSet::new();
        for candidate in &self.training.models {
            if !seen.insert(candidate.name.as_str()) {
                anyhow::bail!("Duplicate candidate name: {}", candidate.name);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
project:
  artifacts_dir: out/artifacts
data:
  path: data/sample.csv
  test_size: 0.25
  random_state: 7
training:
  cv_folds: 3
  models:
    - name: lr
      estimator: logistic_regression
      params:
        c: [0.1, 1.0]
    - name: rf
      estimator: Random_Forest
serving:
  threshold: 0.4
"#;

    #[test]
    fn test_parse_sample() {
        let settings = Settings::from_yaml(SAMPLE).expect("valid yaml");
        settings.validate().expect("valid settings");

        assert_eq!(settings.project.artifacts_dir, PathBuf::from("out/artifacts"));
        assert_eq!(settings.project.reports_dir, PathBuf::from("reports"));
        assert_eq!(settings.data.target, "Churn");
        assert_eq!(settings.data.random_state, 7);
        assert_eq!(settings.training.cv_folds, 3);
        assert_eq!(settings.training.models.len(), 2);
        assert_eq!(settings.training.models[0].params["c"][1], 1.0);
        assert!(settings.training.models[1].params.is_empty());
        assert!((settings.serving.threshold - 0.4).abs() < f64::EPSILON);
        assert_eq!(settings.frontend.api_url, "http://localhost:8000");
    }

    #[test]
    fn test_artifact_paths() {
        let settings = Settings::from_yaml(SAMPLE).expect("valid yaml");
        assert_eq!(
            settings.project.model_path(),
            PathBuf::from("out/artifacts/models/best_model.bin")
        );
        assert_eq!(
            settings.project.schema_path(),
            PathBuf::from("out/artifacts/models/schema.json")
        );
        assert_eq!(
            settings.project.metrics_path(),
            PathBuf::from("reports/metrics.json")
        );
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = Settings::from_yaml("data:\n  pth: typo.csv\n").unwrap_err();
        assert!(format!("{err:#}").contains("pth"));
    }

    #[test]
    fn test_validation_errors() {
        let mut settings = Settings::default();
        settings.data.test_size = 1.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.training.cv_folds = 1;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.serving.threshold = 1.5;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.training.models.clear();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings
            .training
            .models
            .push(CandidateConfig::new("random_forest", "random_forest"));
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_overrides() {
        let mut settings = Settings::default();
        settings.apply_overrides(|key| match key {
            "API_URL" => Some("http://api:8000".to_string()),
            "ARTIFACTS_DIR" => Some("/tmp/artifacts".to_string()),
            _ => None,
        });
        assert_eq!(settings.frontend.api_url, "http://api:8000");
        assert_eq!(settings.project.artifacts_dir, PathBuf::from("/tmp/artifacts"));
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, SAMPLE).expect("write settings");

        let settings = Settings::load(&path).expect("loads");
        assert_eq!(settings.training.models[0].name, "lr");

        let missing = dir.path().join("nope.yaml");
        assert!(Settings::load(&missing).is_err());
        assert!(Settings::load_or_default(&missing).is_ok());
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let path = config_path(Some(Path::new("custom.yaml")));
        assert_eq!(path, PathBuf::from("custom.yaml"));
    }
}
