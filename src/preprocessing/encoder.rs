//! One-hot encoding of a categorical column

use crate::data::{Column, ColumnKind, Table};
use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Ordered set of category symbols
///
/// Derived vocabularies are sorted lexicographically so that two fits on
/// the same symbols always produce the same column layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    symbols: Vec<String>,
}

impl Vocabulary {
    /// Distinct values in lexicographic order
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let distinct: BTreeSet<&str> = values.into_iter().collect();
        Self {
            symbols: distinct.into_iter().map(str::to_string).collect(),
        }
    }

    /// Caller-supplied symbols; order is kept, duplicates are rejected
    pub fn from_symbols(symbols: Vec<String>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for s in &symbols {
            if !seen.insert(s.as_str()) {
                return Err(BenchError::Validation(format!(
                    "vocabulary lists '{}' more than once",
                    s
                )));
            }
        }
        Ok(Self { symbols })
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }
}

/// One-hot encoder bound to a single column and a fixed vocabulary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    column: String,
    vocabulary: Vocabulary,
}

impl OneHotEncoder {
    /// Derive the vocabulary from `table[column]`
    pub fn fit(table: &Table, column: &str) -> Result<Self> {
        let values = Self::categorical_values(table, column)?;
        let vocabulary = Vocabulary::from_values(values.iter().map(String::as_str));
        debug!(column, categories = vocabulary.len(), "Fitted one-hot vocabulary");
        Ok(Self {
            column: column.to_string(),
            vocabulary,
        })
    }

    /// Use an explicitly supplied vocabulary
    pub fn with_vocabulary(column: impl Into<String>, vocabulary: Vocabulary) -> Self {
        Self {
            column: column.into(),
            vocabulary,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Name of the indicator column for `symbol`
    pub fn indicator_name(&self, symbol: &str) -> String {
        format!("{}_{}", self.column, symbol)
    }

    /// Names of all indicator columns, in output order
    pub fn indicator_names(&self) -> Vec<String> {
        self.vocabulary
            .symbols()
            .iter()
            .map(|s| self.indicator_name(s))
            .collect()
    }

    /// Replace the categorical column by one indicator column per symbol
    ///
    /// Untouched columns keep their relative order; the indicator block is
    /// appended after them. A value outside the vocabulary is a schema
    /// mismatch, never a silently dropped row or an extra column.
    pub fn transform(&self, table: &Table) -> Result<Table> {
        let values = Self::categorical_values(table, &self.column)?;

        let lookup: HashMap<&str, usize> = self
            .vocabulary
            .symbols()
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();

        let mut flags = vec![vec![false; table.n_rows()]; self.vocabulary.len()];
        for (row, value) in values.iter().enumerate() {
            let idx = lookup.get(value.as_str()).ok_or_else(|| {
                BenchError::SchemaMismatch(format!(
                    "value '{}' in column '{}' (row {}) is not in the encoder vocabulary {:?}",
                    value,
                    self.column,
                    row,
                    self.vocabulary.symbols()
                ))
            })?;
            flags[*idx][row] = true;
        }

        let remaining = table.drop_column(&self.column)?;

        let mut indicators = Vec::with_capacity(self.vocabulary.len());
        for (name, column_flags) in self.indicator_names().into_iter().zip(flags) {
            if remaining.contains(&name) {
                return Err(BenchError::SchemaMismatch(format!(
                    "indicator column '{}' would overwrite an existing column",
                    name
                )));
            }
            indicators.push(Column::indicator(name, column_flags));
        }

        remaining.with_columns(indicators)
    }

    fn categorical_values<'t>(table: &'t Table, column: &str) -> Result<&'t [String]> {
        let col = table.column(column)?;
        if col.kind() != ColumnKind::Categorical {
            return Err(BenchError::Validation(format!(
                "column '{}' is {:?}; one-hot encoding needs a categorical column",
                column,
                col.kind()
            )));
        }
        col.as_str().ok_or_else(|| {
            BenchError::Validation(format!("column '{}' has no text values", column))
        })
    }
}

/// Fit a vocabulary on `table[column]` and encode the same table
pub fn encode(table: &Table, column: &str) -> Result<Table> {
    OneHotEncoder::fit(table, column)?.transform(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_table() -> Table {
        // 6 rows of "x", 4 rows of "y", interleaved
        let symbols = ["y", "x", "x", "y", "x", "x", "y", "x", "y", "x"];
        Table::new(vec![
            Column::numeric("f1", (0..10).map(|i| i as f64 / 10.0).collect()),
            Column::categorical("c1", symbols.iter().map(|s| s.to_string()).collect()),
            Column::numeric("f2", vec![1.0; 10]),
        ])
        .unwrap()
    }

    #[test]
    fn test_encode_counts() {
        let encoded = encode(&scenario_table(), "c1").unwrap();
        assert_eq!(encoded.n_rows(), 10);
        assert_eq!(encoded.column_names(), vec!["f1", "f2", "c1_x", "c1_y"]);

        let x = encoded.column("c1_x").unwrap().as_f64().unwrap();
        let y = encoded.column("c1_y").unwrap().as_f64().unwrap();
        assert_eq!(x.iter().sum::<f64>(), 6.0);
        assert_eq!(y.iter().sum::<f64>(), 4.0);
        for row in 0..10 {
            assert_eq!(x[row] + y[row], 1.0);
        }
    }

    #[test]
    fn test_vocabulary_is_lexicographic() {
        let vocab = Vocabulary::from_values(["c", "a", "b", "a"]);
        assert_eq!(vocab.symbols(), &["a", "b", "c"]);
    }

    #[test]
    fn test_encode_twice_reports_missing_column() {
        let encoded = encode(&scenario_table(), "c1").unwrap();
        let err = encode(&encoded, "c1").unwrap_err();
        assert!(matches!(err, BenchError::ColumnNotFound(ref c) if c == "c1"));
    }

    #[test]
    fn test_unseen_category_is_schema_mismatch() {
        let train = scenario_table();
        let encoder = OneHotEncoder::fit(&train, "c1").unwrap();

        let holdout = Table::new(vec![
            Column::numeric("f1", vec![0.0, 0.1]),
            Column::categorical("c1", vec!["x".into(), "z".into()]),
            Column::numeric("f2", vec![1.0, 1.0]),
        ])
        .unwrap();

        let err = encoder.transform(&holdout).unwrap_err();
        assert!(matches!(err, BenchError::SchemaMismatch(_)));
        assert!(err.to_string().contains("'z'"));
    }

    #[test]
    fn test_absent_category_keeps_schema() {
        let encoder = OneHotEncoder::fit(&scenario_table(), "c1").unwrap();
        let holdout = Table::new(vec![
            Column::numeric("f1", vec![0.0]),
            Column::categorical("c1", vec!["x".into()]),
            Column::numeric("f2", vec![1.0]),
        ])
        .unwrap();

        let encoded = encoder.transform(&holdout).unwrap();
        assert_eq!(encoded.column_names(), vec!["f1", "f2", "c1_x", "c1_y"]);
        assert_eq!(encoded.column("c1_y").unwrap().as_f64().unwrap(), &[0.0]);
    }

    #[test]
    fn test_caller_vocabulary_keeps_its_order() {
        let vocab = Vocabulary::from_symbols(vec!["z".into(), "x".into(), "y".into()]).unwrap();
        let encoder = OneHotEncoder::with_vocabulary("c1", vocab);

        let encoded = encoder.transform(&scenario_table()).unwrap();
        assert_eq!(encoded.column_names(), vec!["f1", "f2", "c1_z", "c1_x", "c1_y"]);
        assert_eq!(encoded.column("c1_z").unwrap().as_f64().unwrap(), &[0.0; 10]);
        assert_eq!(
            encoded.column("c1_x").unwrap().as_f64().unwrap().iter().sum::<f64>(),
            6.0
        );

        let narrow = OneHotEncoder::with_vocabulary(
            "c1",
            Vocabulary::from_symbols(vec!["x".into()]).unwrap(),
        );
        let err = narrow.transform(&scenario_table()).unwrap_err();
        assert!(matches!(err, BenchError::SchemaMismatch(_)));
    }

    #[test]
    fn test_numeric_column_rejected() {
        let err = encode(&scenario_table(), "f1").unwrap_err();
        assert!(matches!(err, BenchError::Validation(_)));
    }

    #[test]
    fn test_duplicate_vocabulary_rejected() {
        let result = Vocabulary::from_symbols(vec!["a".into(), "a".into()]);
        assert!(result.is_err());
    }
}
