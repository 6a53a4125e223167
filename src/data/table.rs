//! Table: ordered, named, equal-length columns

use super::{Column, ColumnKind};
use crate::error::{BenchError, Result};
use ndarray::{Array1, Array2};
use std::collections::HashSet;

/// Ordered collection of equal-length, uniquely named columns
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table, validating names and column lengths
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        let mut seen = HashSet::with_capacity(columns.len());

        for col in &columns {
            if col.name().is_empty() {
                return Err(BenchError::Validation(
                    "column names must be non-empty".to_string(),
                ));
            }
            if !seen.insert(col.name()) {
                return Err(BenchError::Validation(format!(
                    "duplicate column name '{}'",
                    col.name()
                )));
            }
            if col.len() != n_rows {
                return Err(BenchError::ShapeError {
                    expected: format!("{} rows in column '{}'", n_rows, col.name()),
                    actual: format!("{} rows", col.len()),
                });
            }
        }

        Ok(Self { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.position(name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| BenchError::ColumnNotFound(name.to_string()))
    }

    /// New table without `name`
    pub fn drop_column(&self, name: &str) -> Result<Table> {
        let idx = self
            .position(name)
            .ok_or_else(|| BenchError::ColumnNotFound(name.to_string()))?;
        let mut columns = self.columns.clone();
        columns.remove(idx);
        Ok(Table {
            columns,
            n_rows: self.n_rows,
        })
    }

    /// New table without any column of the given kind
    pub fn drop_kind(&self, kind: ColumnKind) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .filter(|c| c.kind() != kind)
                .cloned()
                .collect(),
            n_rows: self.n_rows,
        }
    }

    /// Append columns after the existing ones
    pub fn with_columns(self, extra: Vec<Column>) -> Result<Table> {
        let n_rows = self.n_rows;
        let was_empty = self.columns.is_empty();
        let mut columns = self.columns;
        columns.extend(extra);
        let table = Table::new(columns)?;
        if !was_empty && table.n_rows != n_rows {
            return Err(BenchError::ShapeError {
                expected: format!("{} rows", n_rows),
                actual: format!("{} rows", table.n_rows),
            });
        }
        Ok(table)
    }

    /// Insert a column at `index`, shifting later columns right
    pub fn insert_column(self, index: usize, column: Column) -> Result<Table> {
        let mut columns = self.columns;
        let index = index.min(columns.len());
        columns.insert(index, column);
        Table::new(columns)
    }

    /// Move `name` to the first position
    pub fn move_to_front(&self, name: &str) -> Result<Table> {
        let column = self.column(name)?.clone();
        self.drop_column(name)?.insert_column(0, column)
    }

    /// Rows at `indices`, in that order
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            n_rows: indices.len(),
        }
    }

    /// Separate the label column from the features
    ///
    /// The label must be numeric or indicator-typed.
    pub fn split_off_label(&self, name: &str) -> Result<(Table, Array1<f64>)> {
        let column = self.column(name)?;
        let labels = column.as_f64().ok_or_else(|| {
            BenchError::Validation(format!(
                "label column '{}' must be numeric, found {:?}",
                name,
                column.kind()
            ))
        })?;
        let labels = Array1::from_vec(labels.to_vec());
        Ok((self.drop_column(name)?, labels))
    }

    /// Row-major feature matrix
    ///
    /// Fails if any column is categorical or an identifier: those must be
    /// encoded or dropped first.
    pub fn to_matrix(&self) -> Result<Array2<f64>> {
        if let Some(col) = self.columns.iter().find(|c| !c.is_feature()) {
            return Err(BenchError::Validation(format!(
                "column '{}' is {:?}; only numeric and indicator columns can form a feature matrix",
                col.name(),
                col.kind()
            )));
        }

        let n_cols = self.columns.len();
        let mut data = Vec::with_capacity(self.n_rows * n_cols);
        for row in 0..self.n_rows {
            for col in &self.columns {
                // is_feature() guarantees numeric storage
                if let Some(values) = col.as_f64() {
                    data.push(values[row]);
                }
            }
        }

        Ok(Array2::from_shape_vec((self.n_rows, n_cols), data)?)
    }

    /// Require identical column names in identical order
    pub fn ensure_same_schema(&self, other: &Table) -> Result<()> {
        let ours = self.column_names();
        let theirs = other.column_names();
        if ours == theirs {
            return Ok(());
        }

        let only_ours: Vec<&str> = ours.iter().filter(|n| !theirs.contains(n)).copied().collect();
        let only_theirs: Vec<&str> = theirs.iter().filter(|n| !ours.contains(n)).copied().collect();

        Err(BenchError::SchemaMismatch(if only_ours.is_empty() && only_theirs.is_empty() {
            "tables share columns but in a different order".to_string()
        } else {
            format!(
                "columns only in first table: {:?}; columns only in second table: {:?}",
                only_ours, only_theirs
            )
        }))
    }
}
