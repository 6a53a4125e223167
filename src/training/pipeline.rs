//! Scaler followed by a classifier

use super::models::ModelStrategy;
use crate::error::Result;
use crate::preprocessing::{Scaler, ScalerType};
use ndarray::{Array1, Array2};

/// Fits a scaler on the training rows, then the inner strategy on the
/// scaled rows. Prediction reuses the training-time scaling parameters.
pub struct ScaledStrategy {
    scaler: Scaler,
    inner: Box<dyn ModelStrategy>,
}

impl ScaledStrategy {
    pub fn new(scaler_type: ScalerType, inner: Box<dyn ModelStrategy>) -> Self {
        Self {
            scaler: Scaler::new(scaler_type),
            inner,
        }
    }

    pub fn scaler_type(&self) -> ScalerType {
        self.scaler.scaler_type()
    }
}

impl ModelStrategy for ScaledStrategy {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let scaled = self.scaler.fit_transform(x)?;
        self.inner.fit(&scaled, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner.predict(&self.scaler.transform(x)?)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner.predict_proba(&self.scaler.transform(x)?)
    }
}
