//! Typed tabular data
//!
//! A [`Table`] is an ordered set of named [`Column`]s of equal length. Every
//! component of the harness exchanges tables; nothing downstream of the loader
//! sees untyped cells.

mod table;

pub use table::Table;

use serde::{Deserialize, Serialize};

/// Semantic type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Real-valued feature or label
    Numeric,
    /// Small unordered set of symbols
    Categorical,
    /// Binary 0/1 column
    Indicator,
    /// Row identifier, never used as a feature
    Identifier,
}

/// Storage behind a column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnValues {
    fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
        }
    }

    fn select(&self, indices: &[usize]) -> Self {
        match self {
            ColumnValues::Numeric(v) => {
                ColumnValues::Numeric(indices.iter().map(|&i| v[i]).collect())
            }
            ColumnValues::Text(v) => {
                ColumnValues::Text(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

/// A named, typed column
///
/// Fields are private so that the kind and the storage can never disagree:
/// numeric and indicator columns hold `f64`, categorical and identifier
/// columns hold strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    values: ColumnValues,
}

impl Column {
    /// Create a numeric column
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Numeric,
            values: ColumnValues::Numeric(values),
        }
    }

    /// Create a categorical column
    pub fn categorical(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Categorical,
            values: ColumnValues::Text(values),
        }
    }

    /// Create an indicator column from flags
    pub fn indicator(name: impl Into<String>, flags: Vec<bool>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Indicator,
            values: ColumnValues::Numeric(
                flags.into_iter().map(|f| if f { 1.0 } else { 0.0 }).collect(),
            ),
        }
    }

    /// Create an identifier column
    pub fn identifier(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Identifier,
            values: ColumnValues::Text(values),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric view, `None` for text-backed columns
    pub fn as_f64(&self) -> Option<&[f64]> {
        match &self.values {
            ColumnValues::Numeric(v) => Some(v),
            ColumnValues::Text(_) => None,
        }
    }

    /// Text view, `None` for numeric-backed columns
    pub fn as_str(&self) -> Option<&[String]> {
        match &self.values {
            ColumnValues::Text(v) => Some(v),
            ColumnValues::Numeric(_) => None,
        }
    }

    /// Whether the column can be fed to a model
    pub fn is_feature(&self) -> bool {
        matches!(self.kind, ColumnKind::Numeric | ColumnKind::Indicator)
    }

    /// Copy of the column restricted to the given rows, in the given order
    pub fn take(&self, indices: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            values: self.values.select(indices),
        }
    }

    /// Render the value at `row` for display and export
    pub fn display_value(&self, row: usize) -> String {
        match &self.values {
            ColumnValues::Numeric(v) => match self.kind {
                ColumnKind::Indicator => format!("{}", v[row] as i64),
                _ => format!("{}", v[row]),
            },
            ColumnValues::Text(v) => v[row].clone(),
        }
    }
}
