//! Strategy evaluation
//!
//! - k-fold cross-validation and single holdout scoring
//! - Per-strategy isolation: failures, panics and time budgets
//! - Structured reports with console and JSON rendering

mod config;
pub mod harness;
pub mod report;

pub use config::HarnessConfig;
pub use harness::EvaluationHarness;
pub use report::{BenchmarkReport, ScoreReport, Scores, StrategyOutcome};
