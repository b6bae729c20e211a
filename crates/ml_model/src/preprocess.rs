//! Column-wise preprocessing: impute and scale numeric columns, impute and
//! one-hot encode categorical columns, ignore everything else.

use std::collections::{BTreeMap, BTreeSet};

use churn_structs::{FeatureSchema, SchemaArtifact, Table};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Unfitted preprocessing spec. Cheap to clone; fitting returns a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessor {
    numeric: Vec<String>,
    categorical: Vec<String>,
}

impl Preprocessor {
    /// Builds the standard transform over the schema's feature lists.
    #[must_use]
    pub fn new(schema: &FeatureSchema) -> Self {
        Self {
            numeric: schema.numeric.clone(),
            categorical: schema.categorical.clone(),
        }
    }

    /// Learns imputation values, scaling factors and category vocabularies.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is empty or lacks a configured column.
    pub fn fit(&self, table: &Table) -> Result<FittedPreprocessor, ModelError> {
        if table.is_empty() {
            return Err(ModelError::EmptyDataset);
        }

        let numeric = self
            .numeric
            .iter()
            .map(|name| fit_numeric(name, table))
            .collect::<Result<_, _>>()?;

        let categorical = self
            .categorical
            .iter()
            .map(|name| fit_categorical(name, table))
            .collect::<Result<_, _>>()?;

        Ok(FittedPreprocessor {
            numeric,
            categorical,
        })
    }
}

/// Median imputation followed by standardization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub name: String,
    pub median: f64,
    pub mean: f64,
    pub scale: f64,
}

/// Most-frequent imputation followed by one-hot encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    /// `None` when the column had no values at fit time.
    pub fill: Option<String>,
    /// Sorted vocabulary; one output indicator per entry.
    pub categories: Vec<String>,
}

/// Preprocessing state learned from training data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    numeric: Vec<NumericColumn>,
    categorical: Vec<CategoricalColumn>,
}

impl FittedPreprocessor {
    #[must_use]
    pub fn numeric(&self) -> &[NumericColumn] {
        &self.numeric
    }

    #[must_use]
    pub fn categorical(&self) -> &[CategoricalColumn] {
        &self.categorical
    }

    /// Width of the transformed matrix.
    #[must_use]
    pub fn n_features_out(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|c| c.categories.len())
                .sum::<usize>()
    }

    /// Produces the dense design matrix for `table`.
    ///
    /// Unknown categories encode as all zeros; missing or unparsable numbers
    /// take the fitted median.
    ///
    /// # Errors
    ///
    /// Returns an error if a fitted column is missing from `table`.
    pub fn transform(&self, table: &Table) -> Result<Array2<f64>, ModelError> {
        let mut out = Array2::zeros((table.height(), self.n_features_out()));

        for (j, col) in self.numeric.iter().enumerate() {
            let idx = column_index(table, &col.name)?;
            for (i, row) in table.rows().iter().enumerate() {
                let value = row[idx].as_f64().unwrap_or(col.median);
                out[[i, j]] = (value - col.mean) / col.scale;
            }
        }

        let mut offset = self.numeric.len();
        for col in &self.categorical {
            let idx = column_index(table, &col.name)?;
            for (i, row) in table.rows().iter().enumerate() {
                let category = row[idx]
                    .as_category()
                    .map(|c| c.into_owned())
                    .or_else(|| col.fill.clone());
                let position = category.and_then(|c| {
                    col.categories
                        .binary_search_by(|known| known.as_str().cmp(c.as_str()))
                        .ok()
                });
                if let Some(k) = position {
                    out[[i, offset + k]] = 1.0;
                }
            }
            offset += col.categories.len();
        }

        Ok(out)
    }

    /// Request schema implied by this fit: the encoder vocabularies and the
    /// numeric feature names.
    #[must_use]
    pub fn schema_artifact(&self) -> SchemaArtifact {
        SchemaArtifact {
            categorical_features: self
                .categorical
                .iter()
                .map(|c| (c.name.clone(), c.categories.clone()))
                .collect::<BTreeMap<_, _>>(),
            numeric_features: self.numeric.iter().map(|c| c.name.clone()).collect(),
        }
    }
}

fn column_index(table: &Table, name: &str) -> Result<usize, ModelError> {
    table
        .column_index(name)
        .ok_or_else(|| ModelError::MissingColumn(name.to_string()))
}

fn fit_numeric(name: &str, table: &Table) -> Result<NumericColumn, ModelError> {
    let idx = column_index(table, name)?;
    let mut observed: Vec<f64> = table
        .rows()
        .iter()
        .filter_map(|row| row[idx].as_f64())
        .collect();

    let median = median(&mut observed).unwrap_or(0.0);

    let n = table.height() as f64;
    let imputed = || {
        table
            .rows()
            .iter()
            .map(move |row| row[idx].as_f64().unwrap_or(median))
    };
    let mean = imputed().sum::<f64>() / n;
    let var = imputed().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    let scale = if std > f64::EPSILON { std } else { 1.0 };

    Ok(NumericColumn {
        name: name.to_string(),
        median,
        mean,
        scale,
    })
}

fn fit_categorical(name: &str, table: &Table) -> Result<CategoricalColumn, ModelError> {
    let idx = column_index(table, name)?;
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in table.rows() {
        if let Some(category) = row[idx].as_category() {
            *counts.entry(category.into_owned()).or_insert(0) += 1;
        }
    }

    // BTreeMap iterates in sorted order, so `max_by_key` over reversed
    // entries keeps the smallest value among equally frequent ones.
    let fill = counts
        .iter()
        .rev()
        .max_by_key(|&(_, count)| *count)
        .map(|(value, _)| value.clone());

    let categories: BTreeSet<String> = counts.into_keys().collect();

    Ok(CategoricalColumn {
        name: name.to_string(),
        fill,
        categories: categories.into_iter().collect(),
    })
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use churn_structs::Value;

    use super::*;

    fn schema() -> FeatureSchema {
        FeatureSchema {
            categorical: vec!["Contract".into()],
            numeric: vec!["tenure".into()],
            ..FeatureSchema::default()
        }
    }

    fn table(rows: &[(Value, Value)]) -> Table {
        let mut table = Table::new(vec!["tenure".into(), "Contract".into(), "extra".into()]);
        for (tenure, contract) in rows {
            table
                .push_row(vec![tenure.clone(), contract.clone(), "ignored".into()])
                .expect("row fits");
        }
        table
    }

    fn training_table() -> Table {
        table(&[
            (1.0.into(), "Month-to-month".into()),
            (3.0.into(), "Two year".into()),
            (Value::Null, "Month-to-month".into()),
            ("5".into(), Value::Null),
        ])
    }

    #[test]
    fn test_fit_learns_median_and_scale() {
        let fitted = Preprocessor::new(&schema())
            .fit(&training_table())
            .expect("fits");
        let tenure = &fitted.numeric()[0];
        assert_abs_diff_eq!(tenure.median, 3.0);
        // Imputed column is [1, 3, 3, 5].
        assert_abs_diff_eq!(tenure.mean, 3.0);
        assert_abs_diff_eq!(tenure.scale, 2.0_f64.sqrt());
    }

    #[test]
    fn test_fit_learns_sorted_vocabulary_and_mode() {
        let fitted = Preprocessor::new(&schema())
            .fit(&training_table())
            .expect("fits");
        let contract = &fitted.categorical()[0];
        assert_eq!(contract.categories, vec!["Month-to-month", "Two year"]);
        assert_eq!(contract.fill.as_deref(), Some("Month-to-month"));
        assert_eq!(fitted.n_features_out(), 3);
    }

    #[test]
    fn test_mode_tie_prefers_smallest_value() {
        let t = table(&[(1.0.into(), "b".into()), (1.0.into(), "a".into())]);
        let fitted = Preprocessor::new(&schema()).fit(&t).expect("fits");
        assert_eq!(fitted.categorical()[0].fill.as_deref(), Some("a"));
    }

    #[test]
    fn test_transform_imputes_and_encodes() {
        let fitted = Preprocessor::new(&schema())
            .fit(&training_table())
            .expect("fits");
        let x = fitted.transform(&training_table()).expect("transforms");

        assert_eq!(x.dim(), (4, 3));
        assert_abs_diff_eq!(x[[0, 0]], -2.0 / 2.0_f64.sqrt());
        assert_abs_diff_eq!(x[[2, 0]], 0.0);
        // Missing category imputes to the mode.
        assert_eq!(x.row(3).to_vec()[1..], [1.0, 0.0]);
        assert_eq!(x.row(1).to_vec()[1..], [0.0, 1.0]);
    }

    #[test]
    fn test_unknown_category_is_all_zero() {
        let fitted = Preprocessor::new(&schema())
            .fit(&training_table())
            .expect("fits");
        let x = fitted
            .transform(&table(&[(2.0.into(), "One year".into())]))
            .expect("unknown categories never fail");
        assert_eq!(x.row(0).to_vec()[1..], [0.0, 0.0]);
    }

    #[test]
    fn test_missing_column_fails() {
        let mut t = training_table();
        t.drop_column("Contract");
        let err = Preprocessor::new(&schema()).fit(&t).unwrap_err();
        assert!(matches!(err, ModelError::MissingColumn(ref c) if c == "Contract"));
    }

    #[test]
    fn test_constant_column_scales_by_one() {
        let t = table(&[(4.0.into(), "a".into()), (4.0.into(), "a".into())]);
        let fitted = Preprocessor::new(&schema()).fit(&t).expect("fits");
        assert_abs_diff_eq!(fitted.numeric()[0].scale, 1.0);
        let x = fitted.transform(&t).expect("transforms");
        assert_abs_diff_eq!(x[[0, 0]], 0.0);
    }

    #[test]
    fn test_schema_artifact_lists_vocabulary() {
        let fitted = Preprocessor::new(&schema())
            .fit(&training_table())
            .expect("fits");
        let artifact = fitted.schema_artifact();
        assert_eq!(artifact.numeric_features, vec!["tenure"]);
        assert_eq!(
            artifact.categorical_features["Contract"],
            vec!["Month-to-month", "Two year"]
        );
    }
}
