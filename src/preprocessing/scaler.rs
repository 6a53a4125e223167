//! Feature scaling implementations

use crate::error::{BenchError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
    /// Row-wise scaling to unit L1 norm
    NormalizerL1,
    /// Row-wise scaling to unit L2 norm
    NormalizerL2,
}

impl ScalerType {
    pub fn name(&self) -> &'static str {
        match self {
            ScalerType::Standard => "standard",
            ScalerType::MinMax => "min_max",
            ScalerType::NormalizerL1 => "normalizer_l1",
            ScalerType::NormalizerL2 => "normalizer_l2",
        }
    }
}

/// Per-column parameters for a fitted scaler
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    center: Array1<f64>,
    scale: Array1<f64>,
}

/// Feature scaler over dense matrices
///
/// Column scalers learn their parameters in `fit`; normalizers are
/// stateless and rescale each row independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: Option<ScalerParams>,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            params: None,
        }
    }

    pub fn scaler_type(&self) -> ScalerType {
        self.scaler_type
    }

    /// Fit the scaler to the data
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(BenchError::Validation(
                "cannot fit a scaler on zero rows".to_string(),
            ));
        }

        let params = match self.scaler_type {
            ScalerType::Standard => {
                let center = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
                // Population std, same as the usual z-score scaler
                let scale = x.std_axis(Axis(0), 0.0).mapv(|s| if s == 0.0 { 1.0 } else { s });
                ScalerParams { center, scale }
            }
            ScalerType::MinMax => {
                let min = x.fold_axis(Axis(0), f64::INFINITY, |&acc, &v| acc.min(v));
                let max = x.fold_axis(Axis(0), f64::NEG_INFINITY, |&acc, &v| acc.max(v));
                let scale = (&max - &min).mapv(|r| if r == 0.0 { 1.0 } else { r });
                ScalerParams { center: min, scale }
            }
            ScalerType::NormalizerL1 | ScalerType::NormalizerL2 => ScalerParams {
                center: Array1::zeros(x.ncols()),
                scale: Array1::ones(x.ncols()),
            },
        };

        self.params = Some(params);
        Ok(self)
    }

    /// Transform the data
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let params = self.params.as_ref().ok_or(BenchError::ModelNotFitted)?;

        if x.ncols() != params.center.len() {
            return Err(BenchError::ShapeError {
                expected: format!("{} columns", params.center.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        match self.scaler_type {
            ScalerType::Standard | ScalerType::MinMax => {
                Ok((x - &params.center) / &params.scale)
            }
            ScalerType::NormalizerL1 => Ok(Self::normalize_rows(x, |row| {
                row.iter().map(|v| v.abs()).sum::<f64>()
            })),
            ScalerType::NormalizerL2 => Ok(Self::normalize_rows(x, |row| {
                row.iter().map(|v| v * v).sum::<f64>().sqrt()
            })),
        }
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    fn normalize_rows(x: &Array2<f64>, norm: impl Fn(&[f64]) -> f64) -> Array2<f64> {
        let mut out = x.to_owned();
        for mut row in out.rows_mut() {
            let values: Vec<f64> = row.to_vec();
            let n = norm(&values);
            if n > 0.0 {
                row.mapv_inplace(|v| v / n);
            }
        }
        out
    }
}
