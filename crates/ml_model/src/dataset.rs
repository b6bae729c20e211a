//! Feature table paired with binary labels.

use churn_structs::{FeatureSchema, Table};

use crate::ModelError;

/// Features with the target column removed, plus one label per row.
#[derive(Debug, Clone)]
pub struct LabelledTable {
    pub features: Table,
    pub labels: Vec<u8>,
}

impl LabelledTable {
    /// Splits the target column off `table`, encoding it with the schema's
    /// positive label (missing targets count as negative).
    ///
    /// # Errors
    ///
    /// Returns an error if the target column is absent.
    pub fn from_table(mut table: Table, schema: &FeatureSchema) -> Result<Self, ModelError> {
        let labels = table
            .column(&schema.target_column)
            .map_err(|_| ModelError::MissingColumn(schema.target_column.clone()))?
            .map(|value| {
                value
                    .as_category()
                    .map_or(0, |raw| schema.encode_label(&raw))
            })
            .collect();

        table.drop_column(&schema.target_column);

        Ok(Self {
            features: table,
            labels,
        })
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of positive labels.
    #[must_use]
    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }

    /// Selects rows by index, keeping features and labels aligned.
    #[must_use]
    pub fn take(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.take(indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}
