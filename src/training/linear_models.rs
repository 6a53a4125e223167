//! Linear classifiers

use super::models::{check_fit_input, check_n_features, ModelStrategy};
use crate::error::{BenchError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
    z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
}

/// Fitted weights shared by the linear models
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LinearWeights {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LinearWeights {
    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_n_features(self.coefficients.len(), x)?;
        Ok(x.dot(&self.coefficients) + self.intercept)
    }
}

/// Logistic regression for binary classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Whether to fit intercept
    pub fit_intercept: bool,
    /// Regularization strength (L2)
    pub alpha: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
    weights: Option<LinearWeights>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            fit_intercept: true,
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            weights: None,
        }
    }

    /// Set regularization strength
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.weights.is_some()
    }
}

impl ModelStrategy for LogisticRegression {
    /// Fit the model using batch gradient descent
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let n_samples = x.nrows() as f64;

        let mut weights = Array1::zeros(x.ncols());
        let mut bias = 0.0;

        let lr = self.learning_rate;
        let alpha = self.alpha;

        for _iter in 0..self.max_iter {
            let linear = x.dot(&weights) + bias;
            let predictions = sigmoid(&linear);

            let errors = &predictions - y;
            let dw = (x.t().dot(&errors) / n_samples) + (alpha * &weights);
            let db = if self.fit_intercept {
                errors.mean().unwrap_or(0.0)
            } else {
                0.0
            };

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - lr * dw;
            bias -= lr * db;
        }

        if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
            return Err(BenchError::Training(
                "logistic regression diverged; try a smaller learning_rate".to_string(),
            ));
        }

        self.weights = Some(LinearWeights {
            coefficients: weights,
            intercept: bias,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let weights = self.weights.as_ref().ok_or(BenchError::ModelNotFitted)?;
        Ok(sigmoid(&weights.decision_function(x)?))
    }
}

/// Linear support vector classifier
///
/// Minimizes `||w||^2 / (2 C n) + mean(hinge)` by subgradient descent.
/// `predict_proba` is the logistic transform of the margin: it is not a
/// calibrated probability but it ranks rows exactly like the margin does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSvc {
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub learning_rate: f64,
    pub fit_intercept: bool,
    weights: Option<LinearWeights>,
}

impl Default for LinearSvc {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearSvc {
    pub fn new() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-4,
            learning_rate: 0.1,
            fit_intercept: true,
            weights: None,
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Signed distance to the separating hyperplane
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.weights
            .as_ref()
            .ok_or(BenchError::ModelNotFitted)?
            .decision_function(x)
    }
}

impl ModelStrategy for LinearSvc {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        if self.c <= 0.0 {
            return Err(BenchError::Config(format!("C must be positive, got {}", self.c)));
        }

        let n_samples = x.nrows() as f64;
        let lambda = 1.0 / (self.c * n_samples);
        // {0, 1} -> {-1, +1}
        let signs = y.mapv(|v| if v > 0.5 { 1.0 } else { -1.0 });

        let mut weights: Array1<f64> = Array1::zeros(x.ncols());
        let mut bias = 0.0;

        for iter in 0..self.max_iter {
            let margins = (x.dot(&weights) + bias) * &signs;
            // Rows inside the margin contribute -y_i to the subgradient
            let active = margins.mapv(|m| if m < 1.0 { 1.0 } else { 0.0 }) * &signs;

            let dw = lambda * &weights - x.t().dot(&active) / n_samples;
            let db = if self.fit_intercept {
                -active.sum() / n_samples
            } else {
                0.0
            };

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            let lr = self.learning_rate / (1.0 + iter as f64 * 0.01);
            weights = weights - lr * dw;
            bias -= lr * db;
        }

        self.weights = Some(LinearWeights {
            coefficients: weights,
            intercept: bias,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let decision = self.decision_function(x)?;
        Ok(decision.mapv(|d| if d >= 0.0 { 1.0 } else { 0.0 }))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(sigmoid(&self.decision_function(x)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::metrics::{accuracy, roc_auc};
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [1.0, 1.0],
            [1.5, 1.5],
            [2.0, 2.0],
            [5.0, 5.0],
            [5.5, 5.5],
            [6.0, 6.0],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_logistic_regression() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new()
            .with_max_iter(1000)
            .with_learning_rate(0.5);

        model.fit(&x, &y).unwrap();
        assert!(model.is_fitted());

        let acc = accuracy(&y, &model.predict(&x).unwrap()).unwrap();
        assert!(acc >= 0.8, "Accuracy should be >= 0.8, got {}", acc);
    }

    #[test]
    fn test_predict_proba() {
        let x = array![[0.0, 0.0], [10.0, 10.0]];
        let y = array![0.0, 1.0];

        let mut model = LogisticRegression::new().with_max_iter(500);
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba[0] < 0.5);
        assert!(proba[1] > 0.5);
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LogisticRegression::new();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(BenchError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_linear_svc_separates() {
        let (x, y) = separable();
        let mut model = LinearSvc::new().with_max_iter(2000);
        model.fit(&x, &y).unwrap();

        let scores = model.predict_proba(&x).unwrap();
        assert!((roc_auc(&y, &scores).unwrap() - 1.0).abs() < 1e-12);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_linear_svc_rejects_bad_c() {
        let (x, y) = separable();
        let mut model = LinearSvc::new().with_c(0.0);
        assert!(matches!(model.fit(&x, &y), Err(BenchError::Config(_))));
    }

    #[test]
    fn test_wrong_feature_count() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();
        assert!(matches!(
            model.predict_proba(&array![[1.0]]),
            Err(BenchError::ShapeError { .. })
        ));
    }
}
