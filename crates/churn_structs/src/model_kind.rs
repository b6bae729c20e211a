use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of estimator families a training candidate can use.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum ModelKind {
    #[serde(rename = "logistic_regression")]
    #[strum(serialize = "logistic_regression")]
    LogisticRegression,

    #[serde(rename = "random_forest")]
    #[strum(serialize = "random_forest")]
    RandomForest,

    #[serde(rename = "xgboost")]
    #[strum(serialize = "xgboost")]
    XGBoost,

    #[serde(rename = "lightgbm")]
    #[strum(serialize = "lightgbm")]
    LightGbm,
}

impl ModelKind {
    /// Returns the configuration key for this kind.
    #[must_use]
    pub const fn as_config_str(self) -> &'static str {
        match self {
            Self::LogisticRegression => "logistic_regression",
            Self::RandomForest => "random_forest",
            Self::XGBoost => "xgboost",
            Self::LightGbm => "lightgbm",
        }
    }

    /// Class name reported to API clients as the `model` field.
    #[must_use]
    pub const fn estimator_name(self) -> &'static str {
        match self {
            Self::LogisticRegression => "LogisticRegression",
            Self::RandomForest => "RandomForestClassifier",
            Self::XGBoost => "XGBClassifier",
            Self::LightGbm => "LGBMClassifier",
        }
    }
}

impl FromStr for ModelKind {
    type Err = anyhow::Error;

    /// Parses a configuration key, ignoring case.
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "logistic_regression" => Ok(Self::LogisticRegression),
            "random_forest" => Ok(Self::RandomForest),
            "xgboost" => Ok(Self::XGBoost),
            "lightgbm" => Ok(Self::LightGbm),
            _ => Err(anyhow::anyhow!("Invalid model kind: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            "Logistic_Regression".parse::<ModelKind>().expect("valid"),
            ModelKind::LogisticRegression
        );
        assert_eq!("XGBOOST".parse::<ModelKind>().expect("valid"), ModelKind::XGBoost);
        assert!("made_up_model".parse::<ModelKind>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for kind in ModelKind::iter() {
            assert_eq!(kind.to_string(), kind.as_config_str());
            assert_eq!(kind.to_string().parse::<ModelKind>().expect("valid"), kind);
        }
    }

    #[test]
    fn test_serde_uses_config_keys() {
        let json = serde_json::to_string(&ModelKind::RandomForest).expect("serializes");
        assert_eq!(json, "\"random_forest\"");
    }
}
