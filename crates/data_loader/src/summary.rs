//! Column statistics and label distribution for a loaded dataset.

use std::collections::{BTreeMap, HashSet};

use churn_structs::{FeatureSchema, Table, Value};
use serde::Serialize;

/// Per-column statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub missing: usize,
    pub distinct: usize,
    /// Only set for numeric schema features with at least one value.
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Summary of a whole dataset, written as `describe.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
    /// Count of each target value; empty if the target column is absent.
    pub target_distribution: BTreeMap<String, usize>,
    /// Share of rows with the positive label.
    pub churn_rate: Option<f64>,
}

/// Computes a [`DatasetSummary`] for `table`.
#[must_use]
pub fn summarize(table: &Table, schema: &FeatureSchema) -> DatasetSummary {
    let columns = table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let numeric = schema.numeric.contains(name);
            summarize_column(name, table.rows().iter().map(|row| &row[idx]), numeric)
        })
        .collect();

    let mut target_distribution = BTreeMap::new();
    if let Ok(target) = table.column(&schema.target_column) {
        for value in target.filter_map(Value::as_category) {
            *target_distribution.entry(value.into_owned()).or_insert(0) += 1;
        }
    }

    let labelled: usize = target_distribution.values().sum();
    let churn_rate = (labelled > 0).then(|| {
        let positives = target_distribution
            .get(&schema.positive_label)
            .copied()
            .unwrap_or(0);
        positives as f64 / labelled as f64
    });

    DatasetSummary {
        rows: table.height(),
        columns,
        target_distribution,
        churn_rate,
    }
}

fn summarize_column<'a, I>(name: &str, cells: I, numeric: bool) -> ColumnSummary
where
    I: Iterator<Item = &'a Value>,
{
    let mut missing = 0;
    let mut distinct = HashSet::new();
    let mut numbers = Vec::new();

    for cell in cells {
        let Some(category) = cell.as_category() else {
            missing += 1;
            continue;
        };
        distinct.insert(category.into_owned());

        if numeric {
            if let Some(n) = cell.as_f64() {
                numbers.push(n);
            }
        }
    }

    let mut summary = ColumnSummary {
        name: name.to_string(),
        missing,
        distinct: distinct.len(),
        mean: None,
        std: None,
        min: None,
        max: None,
    };

    if !numbers.is_empty() {
        let n = numbers.len() as f64;
        let mean = numbers.iter().sum::<f64>() / n;
        let var = numbers.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        summary.mean = Some(mean);
        summary.std = Some(var.sqrt());
        summary.min = numbers.iter().copied().reduce(f64::min);
        summary.max = numbers.iter().copied().reduce(f64::max);
    }

    summary
}
