//! Cross-validation and holdout evaluation of model strategies

use super::config::HarnessConfig;
use super::report::{BenchmarkReport, ScoreReport, Scores, StrategyOutcome};
use crate::data::Table;
use crate::error::{BenchError, Result};
use crate::training::metrics::{accuracy, count_classes, roc_auc};
use crate::training::{CVResults, CVSplit, CrossValidator, ScoringMetric, StrategyFactory};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use std::any::Any;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs strategies against a labelled feature table
#[derive(Debug, Clone, Default)]
pub struct EvaluationHarness {
    config: HarnessConfig,
}

impl EvaluationHarness {
    pub fn new(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// k-fold cross-validation of a single strategy
    ///
    /// Every fold trains a fresh instance from `factory` on the rows outside
    /// the fold and scores the rows inside it.
    pub fn cross_validate(
        &self,
        factory: &dyn StrategyFactory,
        features: &Table,
        labels: &Array1<f64>,
    ) -> Result<ScoreReport> {
        let x = feature_matrix(features, labels)?;
        check_label_classes(labels)?;
        self.cross_validate_matrix(factory, &x, labels)
    }

    /// Train on the full training set, score once on the holdout set
    pub fn evaluate_holdout(
        &self,
        factory: &dyn StrategyFactory,
        train_features: &Table,
        train_labels: &Array1<f64>,
        holdout_features: &Table,
        holdout_labels: &Array1<f64>,
    ) -> Result<ScoreReport> {
        let (x_train, x_holdout) =
            holdout_matrices(train_features, train_labels, holdout_features, holdout_labels)?;
        check_label_classes(train_labels)?;
        check_label_classes(holdout_labels)?;
        self.holdout_matrix(factory, &x_train, train_labels, &x_holdout, holdout_labels)
    }

    /// Cross-validate every strategy in order
    ///
    /// Data problems are returned as `Err` before any strategy runs; a
    /// strategy that errors, panics or overruns its budget becomes a
    /// non-completed outcome and the run moves on.
    pub fn run_cross_validation(
        &self,
        factories: &[Arc<dyn StrategyFactory>],
        features: &Table,
        labels: &Array1<f64>,
    ) -> Result<BenchmarkReport> {
        let x = Arc::new(feature_matrix(features, labels)?);
        check_label_classes(labels)?;
        let y = Arc::new(labels.clone());

        info!(
            strategies = factories.len(),
            rows = x.nrows(),
            features = x.ncols(),
            folds = self.config.cv_strategy.n_splits(),
            "Starting cross-validation run"
        );

        let outcomes = factories
            .iter()
            .map(|factory| {
                let (x, y) = (Arc::clone(&x), Arc::clone(&y));
                self.run_isolated(Arc::clone(factory), move |harness, f| {
                    harness.cross_validate_matrix(f, &x, &y)
                })
            })
            .collect();

        Ok(BenchmarkReport::new(outcomes))
    }

    /// Holdout-evaluate every strategy in order
    pub fn run_holdout(
        &self,
        factories: &[Arc<dyn StrategyFactory>],
        train_features: &Table,
        train_labels: &Array1<f64>,
        holdout_features: &Table,
        holdout_labels: &Array1<f64>,
    ) -> Result<BenchmarkReport> {
        let (x_train, x_holdout) =
            holdout_matrices(train_features, train_labels, holdout_features, holdout_labels)?;
        check_label_classes(train_labels)?;
        check_label_classes(holdout_labels)?;

        info!(
            strategies = factories.len(),
            train_rows = x_train.nrows(),
            holdout_rows = x_holdout.nrows(),
            features = x_train.ncols(),
            "Starting holdout run"
        );

        let x_train = Arc::new(x_train);
        let x_holdout = Arc::new(x_holdout);
        let y_train = Arc::new(train_labels.clone());
        let y_holdout = Arc::new(holdout_labels.clone());

        let outcomes = factories
            .iter()
            .map(|factory| {
                let (xt, yt) = (Arc::clone(&x_train), Arc::clone(&y_train));
                let (xh, yh) = (Arc::clone(&x_holdout), Arc::clone(&y_holdout));
                self.run_isolated(Arc::clone(factory), move |harness, f| {
                    harness.holdout_matrix(f, &xt, &yt, &xh, &yh)
                })
            })
            .collect();

        Ok(BenchmarkReport::new(outcomes))
    }

    fn cross_validate_matrix(
        &self,
        factory: &dyn StrategyFactory,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<ScoreReport> {
        let start = Instant::now();
        let splits = CrossValidator::new(self.config.cv_strategy)
            .with_random_state(self.config.random_state)
            .split(x.nrows(), Some(y))?;

        let mut fold_scores: Vec<(usize, f64)> = if self.config.parallel_folds {
            splits
                .par_iter()
                .map(|split| self.score_fold(factory, x, y, split))
                .collect::<Result<_>>()?
        } else {
            splits
                .iter()
                .map(|split| self.score_fold(factory, x, y, split))
                .collect::<Result<_>>()?
        };

        // Completion order must not change the summary
        fold_scores.sort_by_key(|(fold_idx, _)| *fold_idx);
        let results = CVResults::from_scores(fold_scores.into_iter().map(|(_, s)| s).collect());

        let report = ScoreReport::cross_validation(
            factory.id(),
            start.elapsed().as_secs_f64(),
            self.config.scoring,
            results,
        );

        if let Scores::CrossValidation { mean, std, n_folds, .. } = &report.scores {
            info!(
                strategy = %report.strategy,
                folds = n_folds,
                elapsed_secs = format_args!("{:.2}", report.elapsed_secs),
                mean = format_args!("{:.4}", mean),
                std = format_args!("{:.4}", std),
                "Cross-validation finished"
            );
        }

        Ok(report)
    }

    fn score_fold(
        &self,
        factory: &dyn StrategyFactory,
        x: &Array2<f64>,
        y: &Array1<f64>,
        split: &CVSplit,
    ) -> Result<(usize, f64)> {
        let x_train = x.select(Axis(0), &split.train_indices);
        let y_train = y.select(Axis(0), &split.train_indices);
        let x_test = x.select(Axis(0), &split.test_indices);
        let y_test = y.select(Axis(0), &split.test_indices);

        if self.config.scoring == ScoringMetric::RocAuc && count_classes(&y_test) < 2 {
            return Err(BenchError::UndefinedScore(format!(
                "fold {} holds a single label class; try StratifiedKFold or fewer folds",
                split.fold_idx
            )));
        }

        let strategy_err = |e: BenchError| BenchError::StrategyFailure {
            strategy: factory.id().to_string(),
            reason: format!("fold {}: {}", split.fold_idx, e),
        };

        let mut model = factory.build()?;
        model.fit(&x_train, &y_train).map_err(strategy_err)?;

        let predictions = if self.config.scoring.needs_probabilities() {
            model.predict_proba(&x_test)
        } else {
            model.predict(&x_test)
        }
        .map_err(strategy_err)?;

        let score = self.config.scoring.score(&y_test, &predictions)?;
        debug!(strategy = factory.id(), fold = split.fold_idx, score, "Fold scored");
        Ok((split.fold_idx, score))
    }

    fn holdout_matrix(
        &self,
        factory: &dyn StrategyFactory,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_holdout: &Array2<f64>,
        y_holdout: &Array1<f64>,
    ) -> Result<ScoreReport> {
        let start = Instant::now();
        let strategy_err = |e: BenchError| BenchError::StrategyFailure {
            strategy: factory.id().to_string(),
            reason: e.to_string(),
        };

        let mut model = factory.build()?;
        model.fit(x_train, y_train).map_err(strategy_err)?;

        let labels = model.predict(x_holdout).map_err(strategy_err)?;
        let proba = model.predict_proba(x_holdout).map_err(strategy_err)?;

        let report = ScoreReport {
            strategy: factory.id().to_string(),
            elapsed_secs: start.elapsed().as_secs_f64(),
            scores: Scores::Holdout {
                auc: roc_auc(y_holdout, &proba)?,
                accuracy: accuracy(y_holdout, &labels)?,
                n_train: x_train.nrows(),
                n_holdout: x_holdout.nrows(),
            },
        };

        if let Scores::Holdout { auc, accuracy, .. } = &report.scores {
            info!(
                strategy = %report.strategy,
                elapsed_secs = format_args!("{:.2}", report.elapsed_secs),
                auc = format_args!("{:.4}", auc),
                accuracy = format_args!("{:.4}", accuracy),
                "Holdout evaluation finished"
            );
        }

        Ok(report)
    }

    /// Run `job` on its own thread so a panic or an overrun budget only
    /// affects this strategy
    fn run_isolated<F>(&self, factory: Arc<dyn StrategyFactory>, job: F) -> StrategyOutcome
    where
        F: FnOnce(&EvaluationHarness, &dyn StrategyFactory) -> Result<ScoreReport> + Send + 'static,
    {
        let id = factory.id().to_string();
        let harness = self.clone();
        let (tx, rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name(format!("strategy-{}", id))
            .spawn(move || {
                let result = job(&harness, factory.as_ref());
                // Receiver is gone once the budget expired
                let _ = tx.send(result);
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                return failed(id, format!("could not start worker thread: {}", e));
            }
        };

        let received = match self.config.timeout() {
            Some(budget) => rx.recv_timeout(budget),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(Ok(report)) => {
                let _ = handle.join();
                StrategyOutcome::Completed(report)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                failed(id, e.to_string())
            }
            Err(RecvTimeoutError::Timeout) => {
                let budget_secs = self.config.strategy_timeout_secs.unwrap_or_default();
                warn!(strategy = %id, budget_secs, "Strategy exceeded its time budget");
                // The worker is detached and its result discarded
                StrategyOutcome::TimedOut {
                    strategy: id,
                    budget_secs,
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                let reason = match handle.join() {
                    Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
                    Ok(()) => "worker exited without a result".to_string(),
                };
                failed(id, reason)
            }
        }
    }
}

fn failed(strategy: String, error: String) -> StrategyOutcome {
    warn!(strategy = %strategy, error = %error, "Strategy failed");
    StrategyOutcome::Failed { strategy, error }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn feature_matrix(features: &Table, labels: &Array1<f64>) -> Result<Array2<f64>> {
    if features.n_rows() != labels.len() {
        return Err(BenchError::ShapeError {
            expected: format!("{} labels", features.n_rows()),
            actual: format!("{} labels", labels.len()),
        });
    }
    features.to_matrix()
}

fn holdout_matrices(
    train_features: &Table,
    train_labels: &Array1<f64>,
    holdout_features: &Table,
    holdout_labels: &Array1<f64>,
) -> Result<(Array2<f64>, Array2<f64>)> {
    train_features.ensure_same_schema(holdout_features)?;
    Ok((
        feature_matrix(train_features, train_labels)?,
        feature_matrix(holdout_features, holdout_labels)?,
    ))
}

fn check_label_classes(labels: &Array1<f64>) -> Result<()> {
    let classes = count_classes(labels);
    if classes < 2 {
        return Err(BenchError::UndefinedScore(format!(
            "labels contain {} distinct class(es); at least 2 are needed",
            classes
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;
    use crate::training::{strategy_fn, CVStrategy, ModelStrategy};
    use std::time::Duration;

    /// Scores rows by their first feature
    struct FirstFeature;

    impl ModelStrategy for FirstFeature {
        fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
            Ok(())
        }

        fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
            Ok(x.column(0).mapv(|v| if v >= 0.5 { 1.0 } else { 0.0 }))
        }

        fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
            Ok(x.column(0).to_owned())
        }
    }

    fn first_feature() -> Arc<dyn StrategyFactory> {
        Arc::new(strategy_fn("first_feature", || {
            Ok(Box::new(FirstFeature) as Box<dyn ModelStrategy>)
        }))
    }

    fn table(n: usize) -> (Table, Array1<f64>) {
        let y: Vec<f64> = (0..n).map(|i| (i % 2) as f64).collect();
        let f1 = y.iter().map(|&v| v * 0.8 + 0.1).collect();
        let t = Table::new(vec![Column::numeric("f1", f1)]).unwrap();
        (t, Array1::from_vec(y))
    }

    #[test]
    fn test_cross_validate_perfect_scorer() {
        let (x, y) = table(40);
        let harness = EvaluationHarness::new(HarnessConfig::default().with_folds(4)).unwrap();
        let report = harness.cross_validate(first_feature().as_ref(), &x, &y).unwrap();

        match report.scores {
            Scores::CrossValidation { fold_scores, mean, std, n_folds, .. } => {
                assert_eq!(n_folds, 4);
                assert_eq!(fold_scores.len(), 4);
                assert!((mean - 1.0).abs() < 1e-12);
                assert!(std.abs() < 1e-12);
            }
            other => panic!("unexpected scores {:?}", other),
        }
    }

    #[test]
    fn test_parallel_folds_match_sequential() {
        let (x, y) = table(60);
        let base = HarnessConfig::default()
            .with_cv_strategy(CVStrategy::StratifiedKFold { n_splits: 5, shuffle: true });
        let seq = EvaluationHarness::new(base.clone()).unwrap();
        let par = EvaluationHarness::new(base.with_parallel_folds(true)).unwrap();

        let a = seq.cross_validate(first_feature().as_ref(), &x, &y).unwrap();
        let b = par.cross_validate(first_feature().as_ref(), &x, &y).unwrap();
        assert_eq!(a.scores, b.scores);
    }

    #[test]
    fn test_single_class_is_undefined() {
        let (x, _) = table(20);
        let y = Array1::from_elem(20, 1.0);
        let harness = EvaluationHarness::default();
        let err = harness.cross_validate(first_feature().as_ref(), &x, &y).unwrap_err();
        assert!(matches!(err, BenchError::UndefinedScore(_)));
    }

    #[test]
    fn test_failure_panic_and_timeout_are_isolated() {
        let (x, y) = table(20);
        let failing: Arc<dyn StrategyFactory> =
            Arc::new(strategy_fn("failing", || Err(BenchError::Training("no".into()))));
        let panicking: Arc<dyn StrategyFactory> = Arc::new(strategy_fn("panicking", || {
            panic!("strategy exploded");
        }));
        let sleeping: Arc<dyn StrategyFactory> = Arc::new(strategy_fn("sleeping", || {
            thread::sleep(Duration::from_secs(5));
            Ok(Box::new(FirstFeature) as Box<dyn ModelStrategy>)
        }));

        let harness = EvaluationHarness::new(
            HarnessConfig::default()
                .with_folds(2)
                .with_timeout(Duration::from_millis(300)),
        )
        .unwrap();

        let report = harness
            .run_cross_validation(
                &[failing, first_feature(), panicking, sleeping, first_feature()],
                &x,
                &y,
            )
            .unwrap();

        let statuses: Vec<&str> = report
            .outcomes
            .iter()
            .map(|o| match o {
                StrategyOutcome::Completed(_) => "completed",
                StrategyOutcome::Failed { .. } => "failed",
                StrategyOutcome::TimedOut { .. } => "timed_out",
            })
            .collect();
        assert_eq!(
            statuses,
            vec!["failed", "completed", "failed", "timed_out", "completed"]
        );

        match &report.outcomes[2] {
            StrategyOutcome::Failed { error, .. } => assert!(error.contains("strategy exploded")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_holdout_schema_mismatch() {
        let (train, y) = table(10);
        let holdout = Table::new(vec![Column::numeric("f2", vec![0.0; 4])]).unwrap();
        let y_holdout = Array1::from_vec(vec![0.0, 1.0, 0.0, 1.0]);

        let err = EvaluationHarness::default()
            .evaluate_holdout(first_feature().as_ref(), &train, &y, &holdout, &y_holdout)
            .unwrap_err();
        assert!(matches!(err, BenchError::SchemaMismatch(_)));
    }

    #[test]
    fn test_holdout_scores() {
        let (train, y) = table(10);
        let (holdout, y_holdout) = table(6);
        let report = EvaluationHarness::default()
            .evaluate_holdout(first_feature().as_ref(), &train, &y, &holdout, &y_holdout)
            .unwrap();

        match report.scores {
            Scores::Holdout { auc, accuracy, n_train, n_holdout } => {
                assert!((auc - 1.0).abs() < 1e-12);
                assert!((accuracy - 1.0).abs() < 1e-12);
                assert_eq!((n_train, n_holdout), (10, 6));
            }
            other => panic!("unexpected scores {:?}", other),
        }
    }
}
