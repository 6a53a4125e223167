//! Structured results and their console / JSON rendering

use crate::error::Result;
use crate::training::{CVResults, ScoringMetric};
use chrono::{DateTime, Utc};
use colored::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Scores produced by one evaluation mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Scores {
    CrossValidation {
        metric: ScoringMetric,
        /// In fold order
        fold_scores: Vec<f64>,
        mean: f64,
        /// Population standard deviation
        std: f64,
        n_folds: usize,
    },
    Holdout {
        auc: f64,
        accuracy: f64,
        n_train: usize,
        n_holdout: usize,
    },
}

/// Result of evaluating one strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub strategy: String,
    pub elapsed_secs: f64,
    pub scores: Scores,
}

impl ScoreReport {
    pub fn cross_validation(
        strategy: impl Into<String>,
        elapsed_secs: f64,
        metric: ScoringMetric,
        results: CVResults,
    ) -> Self {
        Self {
            strategy: strategy.into(),
            elapsed_secs,
            scores: Scores::CrossValidation {
                metric,
                fold_scores: results.scores,
                mean: results.mean_score,
                std: results.std_score,
                n_folds: results.n_folds,
            },
        }
    }

    /// The number used to rank strategies: mean fold score or holdout AUC
    pub fn headline(&self) -> f64 {
        match &self.scores {
            Scores::CrossValidation { mean, .. } => *mean,
            Scores::Holdout { auc, .. } => *auc,
        }
    }
}

/// What happened to one strategy during a benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StrategyOutcome {
    Completed(ScoreReport),
    Failed { strategy: String, error: String },
    TimedOut { strategy: String, budget_secs: f64 },
}

impl StrategyOutcome {
    pub fn strategy(&self) -> &str {
        match self {
            StrategyOutcome::Completed(report) => &report.strategy,
            StrategyOutcome::Failed { strategy, .. } | StrategyOutcome::TimedOut { strategy, .. } => {
                strategy
            }
        }
    }

    pub fn report(&self) -> Option<&ScoreReport> {
        match self {
            StrategyOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, StrategyOutcome::Completed(_))
    }
}

/// All outcomes of a run, in configured strategy order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub outcomes: Vec<StrategyOutcome>,
    pub generated_at: DateTime<Utc>,
}

impl BenchmarkReport {
    pub fn new(outcomes: Vec<StrategyOutcome>) -> Self {
        Self {
            outcomes,
            generated_at: Utc::now(),
        }
    }

    pub fn completed(&self) -> impl Iterator<Item = &ScoreReport> {
        self.outcomes.iter().filter_map(StrategyOutcome::report)
    }

    pub fn n_failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_completed()).count()
    }

    /// Completed strategy with the highest headline score
    pub fn best(&self) -> Option<&ScoreReport> {
        self.completed()
            .filter(|r| r.headline().is_finite())
            .max_by(|a, b| {
                a.headline()
                    .partial_cmp(&b.headline())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Print a colored table to stdout
    pub fn print(&self) {
        print!("{}", self.render());
    }

    /// Render as a plain table; `colored` drops the styling when stdout
    /// is not a terminal
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = format!("  {}\n", "─".repeat(78).truecolor(100, 100, 100));

        let holdout = self
            .completed()
            .any(|r| matches!(r.scores, Scores::Holdout { .. }));

        if holdout {
            out.push_str(&format!(
                "  {:<40} {:>8} {:>10} {:>8} {:>8}\n",
                "Strategy".truecolor(140, 140, 140),
                "AUC".truecolor(140, 140, 140),
                "Accuracy".truecolor(140, 140, 140),
                "Holdout".truecolor(140, 140, 140),
                "Time".truecolor(140, 140, 140),
            ));
        } else {
            out.push_str(&format!(
                "  {:<40} {:>6} {:>8} {:>10} {:>8}\n",
                "Strategy".truecolor(140, 140, 140),
                "Folds".truecolor(140, 140, 140),
                "Time".truecolor(140, 140, 140),
                "Mean".truecolor(140, 140, 140),
                "Std".truecolor(140, 140, 140),
            ));
        }
        out.push_str(&rule);

        for outcome in &self.outcomes {
            let name = truncate(outcome.strategy(), 40);
            match outcome {
                StrategyOutcome::Completed(report) => match &report.scores {
                    Scores::CrossValidation { mean, std, n_folds, .. } => {
                        out.push_str(&format!(
                            "  {:<40} {:>6} {:>7.1}s {:>10.4} {:>8.4}\n",
                            name, n_folds, report.elapsed_secs, mean, std
                        ));
                    }
                    Scores::Holdout { auc, accuracy, n_holdout, .. } => {
                        out.push_str(&format!(
                            "  {:<40} {:>8.4} {:>10.4} {:>8} {:>7.1}s\n",
                            name, auc, accuracy, n_holdout, report.elapsed_secs
                        ));
                    }
                },
                StrategyOutcome::Failed { error, .. } => {
                    out.push_str(&format!("  {:<40} {}\n", name, format!("err: {}", error).red()));
                }
                StrategyOutcome::TimedOut { budget_secs, .. } => {
                    out.push_str(&format!(
                        "  {:<40} {}\n",
                        name,
                        format!("timed out after {:.1}s", budget_secs).yellow()
                    ));
                }
            }
        }
        out.push_str(&rule);

        if let Some(best) = self.best() {
            out.push_str(&format!(
                "\n  {} {} {:.4}\n",
                "best".truecolor(100, 210, 120),
                best.strategy.white().bold(),
                best.headline()
            ));
        }
        out
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let cut: String = s.chars().take(width - 1).collect();
        format!("{}…", cut)
    }
}
