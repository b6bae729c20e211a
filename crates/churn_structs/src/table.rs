//! In-memory row-oriented table used between loading, training and serving.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// A single cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Text(String),
    Number(f64),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the cell. Text is parsed; unparsable text and NaN are `None`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Null => None,
            Self::Number(n) if n.is_nan() => None,
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
        }
    }

    /// Categorical view of the cell. Integral numbers render without a fraction.
    #[must_use]
    pub fn as_category(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Null => None,
            Self::Text(s) => Some(Cow::Borrowed(s.as_str())),
            Self::Number(n) if n.is_nan() => None,
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(Cow::Owned(format!("{}", *n as i64)))
            }
            Self::Number(n) => Some(Cow::Owned(n.to_string())),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<Option<f64>> for Value {
    fn from(n: Option<f64>) -> Self {
        n.map_or(Self::Null, Self::Number)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("row has {got} cells but the table has {expected} columns")]
    RowWidth { expected: usize, got: usize },

    #[error("column '{0}' not found")]
    MissingColumn(String),
}

/// Named columns over rows of [`Value`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// One-row table from `(column, value)` pairs.
    #[must_use]
    pub fn from_record<I, S>(record: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let (columns, row): (Vec<String>, Vec<Value>) = record
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .unzip();
        Self {
            columns,
            rows: vec![row],
        }
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row width differs from the column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Iterates the cells of one column.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist.
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value> + '_, TableError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Removes a column if present. Returns whether anything was removed.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        true
    }

    /// Keeps only the rows for which `keep` returns true.
    pub fn retain_rows<F: FnMut(&[Value]) -> bool>(&mut self, mut keep: F) {
        self.rows.retain(|row| keep(row));
    }

    /// Builds a new table from the given row indices, in that order.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds.
    #[must_use]
    pub fn take(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new(vec!["id".into(), "x".into(), "label".into()]);
        table
            .push_row(vec!["a".into(), 1.0.into(), "Yes".into()])
            .expect("row fits");
        table
            .push_row(vec!["b".into(), Value::Null, "No".into()])
            .expect("row fits");
        table
    }

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut table = sample();
        let err = table.push_row(vec!["c".into()]).unwrap_err();
        assert!(matches!(err, TableError::RowWidth { expected: 3, got: 1 }));
    }

    #[test]
    fn test_from_record_builds_single_row() {
        let table = Table::from_record([("id", Value::from("a")), ("x", Value::Number(2.0))]);
        assert_eq!(table.columns(), ["id", "x"]);
        assert_eq!(table.height(), 1);
        assert_eq!(table.rows()[0][1], Value::Number(2.0));
    }

    #[test]
    fn test_column_access() {
        let table = sample();
        let xs: Vec<_> = table.column("x").expect("exists").map(Value::as_f64).collect();
        assert_eq!(xs, vec![Some(1.0), None]);
        assert!(table.column("missing").is_err());
    }

    #[test]
    fn test_drop_column() {
        let mut table = sample();
        assert!(table.drop_column("label"));
        assert!(!table.drop_column("label"));
        assert_eq!(table.width(), 2);
        assert!(table.rows().iter().all(|r| r.len() == 2));
    }

    #[test]
    fn test_take_and_retain() {
        let mut table = sample();
        let picked = table.take(&[1, 0]);
        assert_eq!(picked.rows()[0][0], Value::from("b"));

        table.retain_rows(|row| !row[1].is_null());
        assert_eq!(table.height(), 1);
    }

    #[test]
    fn test_value_views() {
        assert_eq!(Value::from(" 3.5 ").as_f64(), Some(3.5));
        assert_eq!(Value::from(" ").as_f64(), None);
        assert_eq!(Value::Number(f64::NAN).as_f64(), None);
        assert_eq!(Value::Number(1.0).as_category().as_deref(), Some("1"));
        assert_eq!(Value::Number(1.5).as_category().as_deref(), Some("1.5"));
        assert_eq!(Value::Null.as_category(), None);
    }
}
