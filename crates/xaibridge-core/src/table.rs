//! Named-column tables handed over by the host platform.

use std::collections::HashSet;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One table cell. Reads from JSON as a bare number or string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Number(f64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(f64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Ordered named columns of equal length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Vec<Value>>,
    rows: usize,
}

impl Table {
    /// Frames a numeric matrix with the given column names.
    pub fn from_array<S: AsRef<str>>(values: &Array2<f64>, names: &[S]) -> Result<Self> {
        if names.len() != values.ncols() {
            return Err(Error::Configuration(format!(
                "{} column names given for a matrix with {} columns",
                names.len(),
                values.ncols()
            )));
        }
        Self::from_columns(names.iter().zip(values.columns()).map(|(name, column)| {
            (
                name.as_ref().to_string(),
                column.iter().map(|v| Value::Number(*v)).collect::<Vec<_>>(),
            )
        }))
    }

    /// Builds a table from `(name, values)` pairs, keeping their order.
    ///
    /// Accepts anything iterable as pairs, including `BTreeMap`/`HashMap`
    /// (whose iteration order then decides the column order).
    pub fn from_columns<I, K, V>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Vec<V>)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut table = Table::default();
        let mut seen = HashSet::new();
        for (idx, (name, values)) in columns.into_iter().enumerate() {
            let name = name.into();
            if !seen.insert(name.clone()) {
                return Err(Error::Configuration(format!("duplicate column `{name}`")));
            }
            if idx == 0 {
                table.rows = values.len();
            } else if values.len() != table.rows {
                return Err(Error::ShapeMismatch {
                    tensor: name,
                    shape: vec![table.rows],
                    expected: table.rows,
                    actual: values.len(),
                });
            }
            table.names.push(name);
            table.columns.push(values.into_iter().map(Into::into).collect());
        }
        Ok(table)
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.column_index(name).map(|idx| self.columns[idx].as_slice())
    }

    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        let column = self
            .column(name)
            .ok_or_else(|| Error::Configuration(format!("missing column `{name}`")))?;
        column
            .iter()
            .enumerate()
            .map(|(row, value)| {
                value.as_f64().ok_or_else(|| {
                    Error::UnsupportedType(format!("non-numeric value in column `{name}` at row {row}"))
                })
            })
            .collect()
    }

    /// Keeps only `names`, in the order given.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let column = self
                .column(name)
                .ok_or_else(|| Error::Configuration(format!("missing column `{name}`")))?;
            columns.push((name.to_string(), column.to_vec()));
        }
        Table::from_columns(columns)
    }

    /// Drops `name` if present.
    pub fn without(&self, name: &str) -> Table {
        let mut table = self.clone();
        if let Some(idx) = table.column_index(name) {
            table.names.remove(idx);
            table.columns.remove(idx);
        }
        if table.names.is_empty() {
            table.rows = 0;
        }
        table
    }

    /// Last `n` rows (all rows if the table is shorter).
    pub fn tail(&self, n: usize) -> Table {
        let start = self.rows.saturating_sub(n);
        Table {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c[start..].to_vec()).collect(),
            rows: self.rows - start,
        }
    }

    /// Row-major numeric matrix of every column.
    pub fn to_array(&self) -> Result<Array2<f64>> {
        let mut flat = Vec::with_capacity(self.rows * self.n_cols());
        for row in 0..self.rows {
            for (name, column) in self.names.iter().zip(&self.columns) {
                let value = column[row].as_f64().ok_or_else(|| {
                    Error::UnsupportedType(format!("non-numeric value in column `{name}` at row {row}"))
                })?;
                flat.push(value);
            }
        }
        Array2::from_shape_vec((self.rows, self.n_cols()), flat).map_err(|e| {
            Error::UnsupportedType(format!("table cannot be laid out as a matrix: {e}"))
        })
    }
}
