//! Train/holdout partitioning on an indicator column

use crate::data::{ColumnKind, Table};
use crate::error::{BenchError, Result};
use tracing::info;

/// Splits rows on a 0/1 flag column: `1` goes to holdout, `0` to train
#[derive(Debug, Clone)]
pub struct Splitter {
    flag_column: String,
}

impl Splitter {
    pub fn new(flag_column: impl Into<String>) -> Self {
        Self {
            flag_column: flag_column.into(),
        }
    }

    pub fn flag_column(&self) -> &str {
        &self.flag_column
    }

    /// Partition `table` into `(train, holdout)`, both without the flag column
    ///
    /// Every input row lands in exactly one output, and relative row order is
    /// preserved within each output.
    pub fn split(&self, table: &Table) -> Result<(Table, Table)> {
        let invalid = |reason: String| BenchError::InvalidSplitColumn {
            column: self.flag_column.clone(),
            reason,
        };

        let column = table.column(&self.flag_column).map_err(|_| {
            invalid("column is missing; expected a 0/1 column marking holdout rows".to_string())
        })?;

        if !matches!(column.kind(), ColumnKind::Numeric | ColumnKind::Indicator) {
            return Err(invalid(format!(
                "expected a 0/1 column, found {:?} values",
                column.kind()
            )));
        }

        // Numeric and indicator columns always carry f64 storage
        let flags = column
            .as_f64()
            .ok_or_else(|| invalid("column has no numeric values".to_string()))?;

        let mut train_rows = Vec::new();
        let mut holdout_rows = Vec::new();
        for (row, &flag) in flags.iter().enumerate() {
            if flag == 1.0 {
                holdout_rows.push(row);
            } else if flag == 0.0 {
                train_rows.push(row);
            } else {
                return Err(invalid(format!(
                    "row {} has value {}; only 0 and 1 are allowed",
                    row, flag
                )));
            }
        }

        let remaining = table.drop_column(&self.flag_column)?;
        let train = remaining.take_rows(&train_rows);
        let holdout = remaining.take_rows(&holdout_rows);

        info!(
            flag = %self.flag_column,
            train_rows = train.n_rows(),
            holdout_rows = holdout.n_rows(),
            "Split dataset"
        );

        Ok((train, holdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;

    fn table_with_flags(flags: Vec<f64>) -> Table {
        let n = flags.len();
        Table::new(vec![
            Column::numeric("row", (0..n).map(|i| i as f64).collect()),
            Column::numeric("validation", flags),
            Column::numeric("target", vec![0.0; n]),
        ])
        .unwrap()
    }

    #[test]
    fn test_partition_is_complete_and_disjoint() {
        let table = table_with_flags(vec![0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
        let (train, holdout) = Splitter::new("validation").split(&table).unwrap();

        assert_eq!(train.n_rows() + holdout.n_rows(), table.n_rows());

        let train_ids = train.column("row").unwrap().as_f64().unwrap().to_vec();
        let holdout_ids = holdout.column("row").unwrap().as_f64().unwrap().to_vec();
        assert_eq!(train_ids, vec![0.0, 2.0, 5.0, 6.0]);
        assert_eq!(holdout_ids, vec![1.0, 3.0, 4.0]);
        assert!(train_ids.iter().all(|id| !holdout_ids.contains(id)));
    }

    #[test]
    fn test_flag_column_removed() {
        let table = table_with_flags(vec![0.0, 1.0]);
        let (train, holdout) = Splitter::new("validation").split(&table).unwrap();
        assert_eq!(train.column_names(), vec!["row", "target"]);
        assert_eq!(holdout.column_names(), vec!["row", "target"]);
    }

    #[test]
    fn test_missing_flag_column() {
        let table = table_with_flags(vec![0.0]);
        let err = Splitter::new("is_holdout").split(&table).unwrap_err();
        assert!(matches!(err, BenchError::InvalidSplitColumn { .. }));
        assert!(err.to_string().contains("is_holdout"));
    }

    #[test]
    fn test_non_binary_flag() {
        let table = table_with_flags(vec![0.0, 2.0]);
        let err = Splitter::new("validation").split(&table).unwrap_err();
        assert!(err.to_string().contains("row 1 has value 2"));
    }

    #[test]
    fn test_categorical_flag_rejected() {
        let table = Table::new(vec![Column::categorical(
            "validation",
            vec!["yes".into(), "no".into()],
        )])
        .unwrap();
        let err = Splitter::new("validation").split(&table).unwrap_err();
        assert!(matches!(err, BenchError::InvalidSplitColumn { .. }));
    }
}
