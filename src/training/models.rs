//! Model strategy traits

use crate::error::{BenchError, Result};
use ndarray::{Array1, Array2};

/// A pluggable binary classifier
///
/// The harness only ever talks to this trait. Labels are `0.0` / `1.0`;
/// `predict` returns hard labels and `predict_proba` returns a class-1
/// score where higher means "more likely positive".
pub trait ModelStrategy: Send {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Hard 0/1 predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Class-1 probability (or a monotone score for margin classifiers)
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Produces fresh, untrained strategies
///
/// Every fold and every holdout run asks the factory for a new instance, so
/// no fit state can leak from one evaluation into the next.
pub trait StrategyFactory: Send + Sync {
    /// Stable identifier used in logs and reports
    fn id(&self) -> &str;

    /// A new untrained strategy
    fn build(&self) -> Result<Box<dyn ModelStrategy>>;
}

/// Factory backed by a closure
pub struct FnFactory<F> {
    id: String,
    build: F,
}

impl<F> StrategyFactory for FnFactory<F>
where
    F: Fn() -> Result<Box<dyn ModelStrategy>> + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn build(&self) -> Result<Box<dyn ModelStrategy>> {
        (self.build)()
    }
}

/// Wrap a closure as a [`StrategyFactory`]
pub fn strategy_fn<F>(id: impl Into<String>, build: F) -> FnFactory<F>
where
    F: Fn() -> Result<Box<dyn ModelStrategy>> + Send + Sync,
{
    FnFactory {
        id: id.into(),
        build,
    }
}

/// Shared shape check for `fit`
pub(crate) fn check_fit_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(BenchError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(BenchError::Training("empty training set".to_string()));
    }
    Ok(())
}

/// Shared feature-count check for prediction
pub(crate) fn check_n_features(expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(BenchError::ShapeError {
            expected: format!("{} features", expected),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}
