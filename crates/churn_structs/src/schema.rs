//! Static feature schema of the telco churn dataset.

/// Column holding the customer identifier.
pub const ID_COLUMN: &str = "customerID";

/// Column holding the churn label.
pub const TARGET_COLUMN: &str = "Churn";

/// Target value of the positive (churned) class.
pub const POSITIVE_LABEL: &str = "Yes";

/// Target value of the negative class.
pub const NEGATIVE_LABEL: &str = "No";

/// Numeric column that may contain blank strings in the raw export.
pub const TOTAL_CHARGES_COLUMN: &str = "TotalCharges";

/// Category-valued features, in request/table order.
pub const CATEGORICAL_FEATURES: [&str; 16] = [
    "gender",
    "SeniorCitizen",
    "Partner",
    "Dependents",
    "PhoneService",
    "MultipleLines",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
    "Contract",
    "PaperlessBilling",
    "PaymentMethod",
];

/// Numeric features, in request/table order.
pub const NUMERIC_FEATURES: [&str; 3] = ["tenure", "MonthlyCharges", "TotalCharges"];

/// Immutable description of the features a pipeline consumes.
///
/// The default instance is the telco schema above; other instances exist
/// mostly for tests that work on narrower tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    pub categorical: Vec<String>,
    pub numeric: Vec<String>,
    pub id_column: String,
    pub target_column: String,
    pub positive_label: String,
    pub negative_label: String,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            categorical: CATEGORICAL_FEATURES.iter().map(ToString::to_string).collect(),
            numeric: NUMERIC_FEATURES.iter().map(ToString::to_string).collect(),
            id_column: ID_COLUMN.to_string(),
            target_column: TARGET_COLUMN.to_string(),
            positive_label: POSITIVE_LABEL.to_string(),
            negative_label: NEGATIVE_LABEL.to_string(),
        }
    }
}

impl FeatureSchema {
    /// Returns every feature column: categorical first, then numeric.
    pub fn all_features(&self) -> impl Iterator<Item = &str> {
        self.categorical
            .iter()
            .chain(self.numeric.iter())
            .map(String::as_str)
    }

    /// Maps a raw target value to the binary label (1 = churned).
    #[must_use]
    pub fn encode_label(&self, raw: &str) -> u8 {
        u8::from(raw == self.positive_label)
    }
}
