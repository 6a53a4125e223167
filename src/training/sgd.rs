//! Stochastic Gradient Descent (SGD) classifier
//!
//! Supports several convex losses and learning rate schedules.
//! Processes one sample at a time, so it stays cheap on wide frames.

use super::models::{check_fit_input, check_n_features, ModelStrategy};
use crate::error::{BenchError, Result};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SGDLoss {
    Hinge,         // SVM-like
    Log,           // Logistic regression
    ModifiedHuber, // Smooth hinge
}

impl std::str::FromStr for SGDLoss {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hinge" => Ok(SGDLoss::Hinge),
            "log" | "log_loss" => Ok(SGDLoss::Log),
            "modified_huber" => Ok(SGDLoss::ModifiedHuber),
            other => Err(BenchError::Config(format!("unknown SGD loss '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningRateSchedule {
    Constant,
    Optimal,    // 1 / (alpha * (t + t0))
    InvScaling, // eta0 / t^power_t
    Adaptive,   // Halve when loss stops improving
}

impl std::str::FromStr for LearningRateSchedule {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "constant" => Ok(LearningRateSchedule::Constant),
            "optimal" => Ok(LearningRateSchedule::Optimal),
            "invscaling" | "inv_scaling" => Ok(LearningRateSchedule::InvScaling),
            "adaptive" => Ok(LearningRateSchedule::Adaptive),
            other => Err(BenchError::Config(format!(
                "unknown learning rate schedule '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SGDConfig {
    pub loss: SGDLoss,
    pub learning_rate: LearningRateSchedule,
    pub eta0: f64,
    pub alpha: f64,    // L2 regularization
    pub l1_ratio: f64, // ElasticNet mixing (0 = L2, 1 = L1)
    pub max_iter: usize,
    pub tol: f64,
    pub power_t: f64, // For InvScaling schedule
    pub random_state: u64,
}

impl Default for SGDConfig {
    fn default() -> Self {
        Self {
            loss: SGDLoss::Hinge,
            learning_rate: LearningRateSchedule::Optimal,
            eta0: 0.01,
            alpha: 0.0001,
            l1_ratio: 0.0,
            max_iter: 1000,
            tol: 1e-3,
            power_t: 0.5,
            random_state: 42,
        }
    }
}

/// Step size for one update
struct StepSize {
    schedule: LearningRateSchedule,
    eta0: f64,
    alpha: f64,
    power_t: f64,
    /// Current rate for the adaptive schedule
    adaptive_eta: f64,
}

impl StepSize {
    fn new(config: &SGDConfig) -> Self {
        Self {
            schedule: config.learning_rate,
            eta0: config.eta0,
            alpha: config.alpha,
            power_t: config.power_t,
            adaptive_eta: config.eta0,
        }
    }

    /// Rate for the `t`-th update, counting from 1
    fn at(&self, t: usize) -> f64 {
        let t = t as f64;
        match self.schedule {
            LearningRateSchedule::Constant => self.eta0,
            LearningRateSchedule::Optimal => {
                let offset = 1.0 / (self.alpha * self.eta0);
                1.0 / (self.alpha * (t + offset))
            }
            LearningRateSchedule::InvScaling => self.eta0 / t.powf(self.power_t),
            LearningRateSchedule::Adaptive => self.adaptive_eta,
        }
    }

    /// Halve the adaptive rate; false once it has become negligible
    fn decay(&mut self) -> bool {
        self.adaptive_eta /= 2.0;
        self.adaptive_eta >= 1e-10
    }
}

/// Loss and its derivative w.r.t. the margin, for a label in {-1, +1}
fn loss_and_slope(loss: SGDLoss, label: f64, margin: f64) -> (f64, f64) {
    let z = label * margin;
    match loss {
        SGDLoss::Hinge if z < 1.0 => (1.0 - z, -label),
        SGDLoss::Hinge => (0.0, 0.0),
        SGDLoss::Log => {
            let p = sigmoid(margin);
            let positive = label > 0.0;
            let nll = if positive { -p.max(1e-15).ln() } else { -(1.0 - p).max(1e-15).ln() };
            (nll, p - if positive { 1.0 } else { 0.0 })
        }
        SGDLoss::ModifiedHuber if z >= 1.0 => (0.0, 0.0),
        SGDLoss::ModifiedHuber if z >= -1.0 => ((1.0 - z).powi(2), -2.0 * (1.0 - z) * label),
        SGDLoss::ModifiedHuber => (-4.0 * z, -4.0 * label),
    }
}

/// Proximal step for the L1 part of the penalty
fn shrink(value: f64, amount: f64) -> f64 {
    value.signum() * (value.abs() - amount).max(0.0)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SGDClassifier {
    pub config: SGDConfig,
    weights: Option<Array1<f64>>,
    bias: f64,
}

impl Default for SGDClassifier {
    fn default() -> Self {
        Self::new(SGDConfig::default())
    }
}

impl SGDClassifier {
    pub fn new(config: SGDConfig) -> Self {
        Self {
            config,
            weights: None,
            bias: 0.0,
        }
    }

    /// Raw margin `w.x + b`
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let w = self.weights.as_ref().ok_or(BenchError::ModelNotFitted)?;
        check_n_features(w.len(), x)?;
        Ok(x.dot(w) + self.bias)
    }
}

impl ModelStrategy for SGDClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        if self.config.alpha <= 0.0 && self.config.learning_rate == LearningRateSchedule::Optimal {
            return Err(BenchError::Config(
                "the optimal learning rate schedule needs alpha > 0".to_string(),
            ));
        }

        let n_rows = x.nrows();
        let signed: Vec<f64> = y.iter().map(|&v| if v > 0.5 { 1.0 } else { -1.0 }).collect();

        let ridge = self.config.alpha * (1.0 - self.config.l1_ratio);
        let lasso = self.config.alpha * self.config.l1_ratio;

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let mut order: Vec<usize> = (0..n_rows).collect();
        let mut step = StepSize::new(&self.config);
        let mut w: Array1<f64> = Array1::zeros(x.ncols());
        let mut b = 0.0;
        let mut updates = 0usize;
        let mut last_loss: Option<f64> = None;

        for _ in 0..self.config.max_iter {
            order.shuffle(&mut rng);
            let mut total = 0.0;

            for &row in &order {
                updates += 1;
                let eta = step.at(updates);
                let xi = x.row(row);
                let (loss, slope) = loss_and_slope(self.config.loss, signed[row], xi.dot(&w) + b);
                total += loss;

                w.zip_mut_with(&xi, |wj, &xj| {
                    *wj = shrink(*wj - eta * (slope * xj + ridge * *wj), eta * lasso);
                });
                b -= eta * slope;
            }

            let mean_loss = total / n_rows as f64;
            if let Some(prev) = last_loss {
                if self.config.learning_rate == LearningRateSchedule::Adaptive
                    && mean_loss > prev - self.config.tol
                    && !step.decay()
                {
                    break;
                }
                if (prev - mean_loss).abs() < self.config.tol {
                    break;
                }
            }
            last_loss = Some(mean_loss);
        }

        if w.iter().any(|v| !v.is_finite()) || !b.is_finite() {
            return Err(BenchError::Training("SGD diverged".to_string()));
        }

        self.weights = Some(w);
        self.bias = b;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let margin = self.decision_function(x)?;
        Ok(margin.mapv(|m| if m >= 0.0 { 1.0 } else { 0.0 }))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let margin = self.decision_function(x)?;
        Ok(match self.config.loss {
            // Clipped linear mapping, still monotone in the margin
            SGDLoss::ModifiedHuber => margin.mapv(|z| ((z + 1.0) / 2.0).clamp(0.0, 1.0)),
            SGDLoss::Hinge | SGDLoss::Log => margin.mapv(sigmoid),
        })
    }
}
