//! Error types for the benchmarking harness

use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Failed to load dataset '{path}': {reason}")]
    DataLoad { path: String, reason: String },

    #[error("Invalid split column '{column}': {reason}")]
    InvalidSplitColumn { column: String, reason: String },

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Score is undefined: {0}")]
    UndefinedScore(String),

    #[error("Strategy '{strategy}' failed: {reason}")]
    StrategyFailure { strategy: String, reason: String },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Training error: {0}")]
    Training(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BenchError {
    /// Whether this error leaves no valid table to continue with
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BenchError::DataLoad { .. }
                | BenchError::InvalidSplitColumn { .. }
                | BenchError::SchemaMismatch(_)
                | BenchError::ColumnNotFound(_)
                | BenchError::Config(_)
                | BenchError::Io(_)
        )
    }
}

impl From<polars::error::PolarsError> for BenchError {
    fn from(err: polars::error::PolarsError) -> Self {
        BenchError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BenchError {
    fn from(err: toml::de::Error) -> Self {
        BenchError::Config(err.to_string())
    }
}

impl From<ndarray::ShapeError> for BenchError {
    fn from(err: ndarray::ShapeError) -> Self {
        BenchError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
