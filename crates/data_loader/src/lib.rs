//! Loader for the telco churn CSV export.
//!
//! Wraps the `csv` crate to read delimited files into a [`Table`], coercing
//! the total-charges column to numbers and dropping rows without a customer
//! identifier.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use churn_structs::{Table, TableError, Value, ID_COLUMN, TOTAL_CHARGES_COLUMN};
use csv::{ReaderBuilder, Trim};
use tracing::info;

pub mod summary;

pub use summary::{summarize, ColumnSummary, DatasetSummary};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("required column '{0}' is missing")]
    MissingColumn(String),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Parsing options for [`load_table`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub delimiter: u8,
    /// Rows where this column is empty are dropped.
    pub id_column: String,
    /// Columns whose cells are coerced to numbers; unparsable cells become `Null`.
    pub numeric_columns: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            id_column: ID_COLUMN.to_string(),
            numeric_columns: vec![TOTAL_CHARGES_COLUMN.to_string()],
        }
    }
}

/// Loads the churn CSV with default options and the given delimiter.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is malformed, or has no
/// `customerID` column.
pub fn load_churn_csv(path: &Path, delimiter: u8) -> Result<Table, LoadError> {
    let options = LoadOptions {
        delimiter,
        ..LoadOptions::default()
    };
    load_table(path, &options)
}

/// Loads a delimited file into a [`Table`].
///
/// # Errors
///
/// Returns an error if the file cannot be read, is malformed, or lacks the
/// identifier column.
pub fn load_table(path: &Path, options: &LoadOptions) -> Result<Table, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let table = read_table(BufReader::new(file), options)?;
    info!(
        path = %path.display(),
        rows = table.height(),
        columns = table.width(),
        "Loaded dataset"
    );
    Ok(table)
}

/// Reads delimited text from any reader into a [`Table`].
///
/// # Errors
///
/// Returns an error if the text is malformed or lacks the identifier column.
pub fn read_table<R: Read>(reader: R, options: &LoadOptions) -> Result<Table, LoadError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(ToString::to_string).collect();

    let id_idx = headers
        .iter()
        .position(|h| *h == options.id_column)
        .ok_or_else(|| LoadError::MissingColumn(options.id_column.clone()))?;

    let numeric: Vec<bool> = headers
        .iter()
        .map(|h| options.numeric_columns.contains(h))
        .collect();

    let mut table = Table::new(headers);
    let mut dropped = 0usize;

    for record in reader.records() {
        let record = record?;
        let row: Vec<Value> = record
            .iter()
            .zip(&numeric)
            .map(|(field, &is_numeric)| parse_cell(field, is_numeric))
            .collect();

        if row[id_idx].is_null() {
            dropped += 1;
            continue;
        }

        table.push_row(row)?;
    }

    if dropped > 0 {
        info!(dropped, "Dropped rows without an identifier");
    }

    Ok(table)
}

fn parse_cell(field: &str, is_numeric: bool) -> Value {
    if field.is_empty() {
        return Value::Null;
    }

    if is_numeric {
        return field.parse::<f64>().map_or(Value::Null, Value::Number);
    }

    Value::Text(field.to_string())
}
