//! Harness configuration

use crate::error::{BenchError, Result};
use crate::training::{CVStrategy, ScoringMetric, DEFAULT_SEED};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How strategies are evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Fold layout for cross-validation
    pub cv_strategy: CVStrategy,
    /// Seed for fold shuffling
    pub random_state: u64,
    /// Per-fold score
    pub scoring: ScoringMetric,
    /// Evaluate the folds of one strategy concurrently
    pub parallel_folds: bool,
    /// Wall-clock budget per strategy, in seconds
    pub strategy_timeout_secs: Option<f64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            cv_strategy: CVStrategy::default(),
            random_state: DEFAULT_SEED,
            scoring: ScoringMetric::RocAuc,
            parallel_folds: false,
            strategy_timeout_secs: None,
        }
    }
}

impl HarnessConfig {
    pub fn with_cv_strategy(mut self, cv_strategy: CVStrategy) -> Self {
        self.cv_strategy = cv_strategy;
        self
    }

    /// Keep the fold layout, change the fold count
    pub fn with_folds(mut self, k: usize) -> Self {
        self.cv_strategy = self.cv_strategy.with_n_splits(k);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringMetric) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_parallel_folds(mut self, parallel: bool) -> Self {
        self.parallel_folds = parallel;
        self
    }

    pub fn with_timeout(mut self, budget: Duration) -> Self {
        self.strategy_timeout_secs = Some(budget.as_secs_f64());
        self
    }

    /// Budget as a duration; values `validate` rejects give `None`
    pub fn timeout(&self) -> Option<Duration> {
        self.strategy_timeout_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    pub fn validate(&self) -> Result<()> {
        if self.cv_strategy.n_splits() < 2 {
            return Err(BenchError::Config(format!(
                "cross-validation needs at least 2 folds, got {}",
                self.cv_strategy.n_splits()
            )));
        }
        if let Some(secs) = self.strategy_timeout_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(BenchError::Config(format!(
                    "strategy_timeout_secs must be a positive number, got {}",
                    secs
                )));
            }
            if Duration::try_from_secs_f64(secs).is_err() {
                return Err(BenchError::Config(format!(
                    "strategy_timeout_secs {} is too large for a duration",
                    secs
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(
            config.cv_strategy,
            CVStrategy::StratifiedKFold { n_splits: 10, shuffle: false }
        );
        assert_eq!(config.random_state, 42);
        assert_eq!(config.scoring, ScoringMetric::RocAuc);
        assert!(config.timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_folds_keeps_layout() {
        let config = HarnessConfig::default()
            .with_cv_strategy(CVStrategy::StratifiedKFold { n_splits: 5, shuffle: false })
            .with_folds(3);
        assert_eq!(
            config.cv_strategy,
            CVStrategy::StratifiedKFold { n_splits: 3, shuffle: false }
        );
    }

    #[test]
    fn test_invalid_timeout() {
        let config = HarnessConfig {
            strategy_timeout_secs: Some(0.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_timeout_rejected() {
        let config = HarnessConfig {
            strategy_timeout_secs: Some(1e20),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(BenchError::Config(_))));
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_partial_toml() {
        let config: HarnessConfig = toml::from_str(
            r#"
            scoring = "accuracy"
            cv_strategy = { type = "stratified_k_fold", n_splits = 4, shuffle = true }
            "#,
        )
        .unwrap();
        assert_eq!(config.scoring, ScoringMetric::Accuracy);
        assert_eq!(config.cv_strategy.n_splits(), 4);
        assert_eq!(config.random_state, 42);
    }
}
