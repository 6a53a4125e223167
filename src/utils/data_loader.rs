//! Data loading utilities

use crate::data::{Column, ColumnKind, ColumnValues, Table};
use crate::error::{BenchError, Result};
use polars::prelude::{
    CsvParseOptions, CsvReadOptions, CsvWriter, DataFrame, DataType, SerReader, SerWriter,
    Series,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Configuration for [`DatasetLoader`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Field delimiter
    pub delimiter: char,
    /// Rows sampled for type inference (`None` = whole file)
    pub infer_schema_length: Option<usize>,
    /// Columns loaded as identifiers instead of features
    pub identifier_columns: Vec<String>,
    /// Columns kept as text symbols even when every value parses as a number
    pub categorical_columns: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            infer_schema_length: Some(1000),
            identifier_columns: Vec::new(),
            categorical_columns: Vec::new(),
        }
    }
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the delimiter
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Builder method to mark identifier columns
    pub fn with_identifier_columns(mut self, columns: Vec<String>) -> Self {
        self.identifier_columns = columns;
        self
    }

    /// Builder method to force columns to load as categorical
    pub fn with_categorical_columns(mut self, columns: Vec<String>) -> Self {
        self.categorical_columns = columns;
        self
    }

    fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(BenchError::Config(format!(
                "delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            )))
        }
    }
}

/// Loads delimited files with a header row into a [`Table`]
#[derive(Debug, Clone, Default)]
pub struct DatasetLoader {
    config: LoaderConfig,
}

fn load_error(path: &str, reason: impl Into<String>) -> BenchError {
    BenchError::DataLoad {
        path: path.to_string(),
        reason: reason.into(),
    }
}

impl DatasetLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load a delimited file
    ///
    /// Logs the row count and wall-clock load time.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Table> {
        let path = path.as_ref();
        let shown = path.display().to_string();

        let metadata = std::fs::metadata(path)
            .map_err(|e| load_error(&shown, format!("file is not readable ({})", e)))?;
        if !metadata.is_file() {
            return Err(load_error(&shown, "path is not a regular file"));
        }
        if metadata.len() == 0 {
            return Err(load_error(&shown, "file is empty; a header row is required"));
        }

        let start = Instant::now();
        let parse_opts = CsvParseOptions::default().with_separator(self.config.delimiter_byte()?);

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.config.infer_schema_length)
            .with_parse_options(parse_opts)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .map_err(|e| load_error(&shown, format!("malformed delimited file ({})", e)))?;

        let table = self.table_from_frame(&df, &shown)?;
        let elapsed = start.elapsed().as_secs_f64();

        info!(
            path = %shown,
            rows = table.n_rows(),
            columns = table.n_cols(),
            elapsed_secs = elapsed,
            "Loaded {} entries in {:.0} seconds",
            table.n_rows(),
            elapsed
        );

        Ok(table)
    }

    /// Convert a polars frame into a typed table
    pub fn table_from_frame(&self, df: &DataFrame, path: &str) -> Result<Table> {
        let mut columns = Vec::with_capacity(df.width());

        for column in df.get_columns() {
            let name = column.name().to_string();
            let series = column.as_materialized_series();

            if series.null_count() > 0 {
                let row = series
                    .is_null()
                    .into_iter()
                    .position(|v| v == Some(true))
                    .unwrap_or(0);
                return Err(load_error(
                    path,
                    format!(
                        "column '{}' has no value at data row {}; every row must have as many fields as the header",
                        name,
                        row + 1
                    ),
                ));
            }

            let typed = if self.config.identifier_columns.contains(&name) {
                Column::identifier(name.clone(), Self::text_values(series, path)?)
            } else if self.config.categorical_columns.contains(&name) {
                Column::categorical(name.clone(), Self::text_values(series, path)?)
            } else {
                match series.dtype() {
                    DataType::String => Column::categorical(name.clone(), Self::text_values(series, path)?),
                    DataType::Boolean => {
                        let flags = series
                            .bool()
                            .map_err(|e| load_error(path, e.to_string()))?
                            .into_iter()
                            .map(|v| v.unwrap_or(false))
                            .collect();
                        Column::indicator(name.clone(), flags)
                    }
                    other => {
                        let cast = series.strict_cast(&DataType::Float64).map_err(|_| {
                            load_error(
                                path,
                                format!("column '{}' has unsupported type {:?}", name, other),
                            )
                        })?;
                        let values = cast
                            .f64()
                            .map_err(|e| load_error(path, e.to_string()))?
                            .into_iter()
                            .map(|v| v.unwrap_or(f64::NAN))
                            .collect();
                        Column::numeric(name.clone(), values)
                    }
                }
            };

            debug!(column = %name, kind = ?typed.kind(), "Inferred column type");
            columns.push(typed);
        }

        Table::new(columns).map_err(|e| load_error(path, e.to_string()))
    }

    fn text_values(series: &Series, path: &str) -> Result<Vec<String>> {
        let cast = series
            .cast(&DataType::String)
            .map_err(|e| load_error(path, e.to_string()))?;
        let values = cast
            .str()
            .map_err(|e| load_error(path, e.to_string()))?
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect();
        Ok(values)
    }
}

/// Writes tables back to delimited files
pub struct DataSaver;

impl DataSaver {
    /// Save a table as CSV with a header row
    pub fn save_csv(table: &Table, path: impl AsRef<Path>, delimiter: char) -> Result<()> {
        let path = path.as_ref();
        let separator = LoaderConfig::default()
            .with_delimiter(delimiter)
            .delimiter_byte()?;

        let mut df = Self::to_frame(table)?;
        let mut file = File::create(path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(separator)
            .finish(&mut df)
            .map_err(|e| BenchError::Serialization(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), rows = table.n_rows(), "Exported table");
        Ok(())
    }

    /// Convert a table into a polars frame
    pub fn to_frame(table: &Table) -> Result<DataFrame> {
        let columns: Vec<polars::prelude::Column> = table
            .columns()
            .iter()
            .map(|col| match (col.kind(), col.values()) {
                (ColumnKind::Indicator, ColumnValues::Numeric(v)) => polars::prelude::Column::new(
                    col.name().into(),
                    v.iter().map(|&x| x as i32).collect::<Vec<i32>>(),
                ),
                (_, ColumnValues::Numeric(v)) => {
                    polars::prelude::Column::new(col.name().into(), v.clone())
                }
                (_, ColumnValues::Text(v)) => {
                    polars::prelude::Column::new(col.name().into(), v.clone())
                }
            })
            .collect();

        Ok(DataFrame::new(columns)?)
    }
}
