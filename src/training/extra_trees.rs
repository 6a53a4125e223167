//! Extra Trees (Extremely Randomized Trees)
//!
//! Unlike Random Forest, which searches for the best threshold on each
//! candidate feature, Extra Trees draws the threshold at random and grows
//! every tree on the full training set.

use super::decision_tree::{Criterion, MaxFeatures, SplitStrategy};
use super::models::ModelStrategy;
use super::random_forest::RandomForest;
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraTrees {
    forest: RandomForest,
}

impl Default for ExtraTrees {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ExtraTrees {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            forest: RandomForest::new(n_estimators)
                .with_bootstrap(false)
                .with_splitter(SplitStrategy::Random),
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.forest = self.forest.with_max_depth(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.forest = self.forest.with_min_samples_split(min_samples);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.forest = self.forest.with_min_samples_leaf(min_samples);
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.forest = self.forest.with_max_features(max_features);
        self
    }

    /// Opt back into bootstrap resampling
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.forest = self.forest.with_bootstrap(bootstrap);
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.forest = self.forest.with_criterion(criterion);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.forest = self.forest.with_random_state(seed);
        self
    }

    pub fn n_trees(&self) -> usize {
        self.forest.n_trees()
    }
}

impl ModelStrategy for ExtraTrees {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.forest.fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.forest.predict(x)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.forest.predict_proba(x)
    }
}
