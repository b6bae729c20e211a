//! Describe command - writes dataset statistics as JSON.

use anyhow::{Context, Result};
use churn_structs::FeatureSchema;
use config::Settings;
use data_loader::{load_churn_csv, summarize, DatasetSummary};
use tracing::info;

use super::{delimiter_byte, write_json};

/// Runs the describe command.
///
/// # Errors
///
/// Returns an error if the dataset cannot be loaded or the report cannot be
/// written.
pub fn run(settings: &Settings) -> Result<DatasetSummary> {
    let table = load_churn_csv(&settings.data.path, delimiter_byte(settings.data.delimiter)?)
        .with_context(|| format!("Failed to load {}", settings.data.path.display()))?;

    let schema = FeatureSchema {
        target_column: settings.data.target.clone(),
        ..FeatureSchema::default()
    };
    let summary = summarize(&table, &schema);

    let path = settings.project.describe_path();
    write_json(&path, &summary)?;

    info!(
        rows = summary.rows,
        churn_rate = ?summary.churn_rate,
        path = %path.display(),
        "Wrote dataset summary"
    );
    Ok(summary)
}
