//! Wire types of the prediction endpoint.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Table, Value, CATEGORICAL_FEATURES, ID_COLUMN, NUMERIC_FEATURES};

/// One customer record submitted for scoring.
///
/// Every feature is required. `SeniorCitizen` is categorical but arrives as
/// either `"1"` or `1`; `tenure` accepts an integer or an integral float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnRequest {
    #[serde(rename = "customerID")]
    pub customer_id: String,
    pub gender: String,
    #[serde(rename = "SeniorCitizen", deserialize_with = "string_or_integer")]
    pub senior_citizen: String,
    #[serde(rename = "Partner")]
    pub partner: String,
    #[serde(rename = "Dependents")]
    pub dependents: String,
    #[serde(rename = "PhoneService")]
    pub phone_service: String,
    #[serde(rename = "MultipleLines")]
    pub multiple_lines: String,
    #[serde(rename = "InternetService")]
    pub internet_service: String,
    #[serde(rename = "OnlineSecurity")]
    pub online_security: String,
    #[serde(rename = "OnlineBackup")]
    pub online_backup: String,
    #[serde(rename = "DeviceProtection")]
    pub device_protection: String,
    #[serde(rename = "TechSupport")]
    pub tech_support: String,
    #[serde(rename = "StreamingTV")]
    pub streaming_tv: String,
    #[serde(rename = "StreamingMovies")]
    pub streaming_movies: String,
    #[serde(rename = "Contract")]
    pub contract: String,
    #[serde(rename = "PaperlessBilling")]
    pub paperless_billing: String,
    #[serde(rename = "PaymentMethod")]
    pub payment_method: String,
    #[serde(deserialize_with = "integral")]
    pub tenure: i64,
    #[serde(rename = "MonthlyCharges")]
    pub monthly_charges: f64,
    #[serde(rename = "TotalCharges")]
    pub total_charges: f64,
}

impl ChurnRequest {
    /// Categorical values in [`CATEGORICAL_FEATURES`] order.
    fn categorical_values(&self) -> [&str; 16] {
        [
            &self.gender,
            &self.senior_citizen,
            &self.partner,
            &self.dependents,
            &self.phone_service,
            &self.multiple_lines,
            &self.internet_service,
            &self.online_security,
            &self.online_backup,
            &self.device_protection,
            &self.tech_support,
            &self.streaming_tv,
            &self.streaming_movies,
            &self.contract,
            &self.paperless_billing,
            &self.payment_method,
        ]
    }

    /// Converts the record into a single-row table keyed by schema column names.
    #[must_use]
    pub fn to_table(&self) -> Table {
        let numeric = [
            Value::Number(self.tenure as f64),
            Value::Number(self.monthly_charges),
            Value::Number(self.total_charges),
        ];

        let values = std::iter::once(Value::from(self.customer_id.as_str()))
            .chain(self.categorical_values().into_iter().map(Value::from))
            .chain(numeric);
        let columns = std::iter::once(ID_COLUMN)
            .chain(CATEGORICAL_FEATURES)
            .chain(NUMERIC_FEATURES);

        Table::from_record(columns.zip(values))
    }
}

/// Scoring result for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnResponse {
    #[serde(rename = "customerID")]
    pub customer_id: String,
    pub churn_probability: f64,
    pub churn_pred: u8,
    pub model: Option<String>,
}

fn string_or_integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Integer(i) => i.to_string(),
    })
}

fn integral<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Integer(i64),
        Float(f64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Integer(i) => Ok(i),
        Raw::Float(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
        Raw::Float(f) => Err(D::Error::custom(format!("expected an integer, got {f}"))),
    }
}
