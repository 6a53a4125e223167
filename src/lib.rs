//! Tabular Bench - data preparation and classifier evaluation
//!
//! This crate loads a labelled table, encodes it, and scores a list of
//! classification strategies against it:
//! - CSV loading into a typed column table
//! - Holdout splitting and one-hot encoding with a fixed vocabulary
//! - K-fold cross-validation scored by ROC AUC
//! - Holdout evaluation with AUC and accuracy
//!
//! # Modules
//!
//! - [`data`] - Column table used by every stage
//! - [`utils`] - Dataset loading and CSV export
//! - [`preprocessing`] - Splitting, encoding and scaling
//! - [`training`] - Strategy interface, built-in classifiers, fold layouts
//! - [`evaluation`] - Evaluation harness and structured reports
//! - [`experiment`] - TOML experiment files and the end-to-end flows
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data handling
pub mod data;
pub mod utils;
pub mod preprocessing;

// Strategies and evaluation
pub mod training;
pub mod evaluation;
pub mod experiment;

// Services
pub mod cli;

pub use error::{BenchError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{BenchError, Result};

    // Data
    pub use crate::data::{Column, ColumnKind, ColumnValues, Table};
    pub use crate::utils::{DataSaver, DatasetLoader, LoaderConfig};

    // Preprocessing
    pub use crate::preprocessing::{encode, OneHotEncoder, ScalerType, Splitter, Vocabulary};

    // Training
    pub use crate::training::{
        default_strategies, strategy_fn, CVStrategy, ModelStrategy, ScoringMetric,
        StrategyConfig, StrategyFactory, StrategyKind,
    };

    // Evaluation
    pub use crate::evaluation::{
        BenchmarkReport, EvaluationHarness, HarnessConfig, ScoreReport, Scores, StrategyOutcome,
    };

    // Experiments
    pub use crate::experiment::{ExperimentConfig, PreparedData, PreparedHoldout};
}
