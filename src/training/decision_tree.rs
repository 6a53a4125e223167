//! Binary classification tree
//!
//! Leaves store the fraction of positive samples that reached them, so the
//! tree yields a class-1 probability directly. The same builder serves the
//! random forest (best splits on bootstrap samples) and extra trees
//! (random thresholds on the full sample).

use super::models::{check_fit_input, check_n_features, ModelStrategy};
use crate::error::{BenchError, Result};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with the positive-class fraction
    Leaf { value: f64, n_samples: usize },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Gini,
    Entropy,
}

/// How split thresholds are chosen
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// Scan every midpoint between sorted distinct values
    Best,
    /// One uniformly drawn threshold per candidate feature
    Random,
}

/// Number of features examined at each split
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    All,
    Sqrt,
    Log2,
    Count(usize),
    Fraction(f64),
}

impl MaxFeatures {
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = match *self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2() as usize,
            MaxFeatures::Count(k) => k,
            MaxFeatures::Fraction(f) => (f * n_features as f64) as usize,
        };
        n.clamp(1, n_features.max(1))
    }
}

impl std::str::FromStr for MaxFeatures {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" | "none" => Ok(MaxFeatures::All),
            "sqrt" | "auto" => Ok(MaxFeatures::Sqrt),
            "log2" => Ok(MaxFeatures::Log2),
            other => Err(BenchError::Config(format!(
                "unknown max_features '{}'; expected sqrt, log2, all, an integer or a fraction",
                other
            ))),
        }
    }
}

/// Decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub criterion: Criterion,
    pub splitter: SplitStrategy,
    pub random_state: u64,
    n_features: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            criterion: Criterion::Gini,
            splitter: SplitStrategy::Best,
            random_state: 0,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_splitter(mut self, splitter: SplitStrategy) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit on the rows listed in `indices` (duplicates allowed)
    pub fn fit_indices(&mut self, x: &Array2<f64>, y: &Array1<f64>, indices: &[usize]) -> Result<()> {
        check_fit_input(x, y)?;
        if indices.is_empty() {
            return Err(BenchError::Training("tree fitted on zero rows".to_string()));
        }

        self.n_features = x.ncols();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        self.root = Some(self.build_tree(x, y, indices, 0, &mut rng));
        Ok(())
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let n_pos = indices.iter().filter(|&&i| y[i] > 0.5).count();
        let leaf = TreeNode::Leaf {
            value: n_pos as f64 / n_samples as f64,
            n_samples,
        };

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || n_pos == 0
            || n_pos == n_samples;

        if should_stop {
            return leaf;
        }

        let Some((feature_idx, threshold)) = self.find_split(x, y, indices, n_pos, rng) else {
            return leaf;
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature_idx]] <= threshold);

        if left_indices.len() < self.min_samples_leaf || right_indices.len() < self.min_samples_leaf {
            return leaf;
        }

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, rng));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
        }
    }

    fn find_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        n_pos: usize,
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64)> {
        let n_features = x.ncols();
        let k = self.max_features.resolve(n_features);
        let mut features: Vec<usize> = (0..n_features).collect();
        if k < n_features {
            features.shuffle(rng);
            features.truncate(k);
        }

        let parent_impurity = self.impurity(n_pos, indices.len());

        let candidates: Vec<Option<(usize, f64, f64)>> = match self.splitter {
            // Each feature independently finds its best threshold
            SplitStrategy::Best => features
                .par_iter()
                .map(|&f| self.best_threshold(x, y, indices, f, parent_impurity))
                .collect(),
            SplitStrategy::Random => {
                // Thresholds drawn sequentially to keep the rng stream fixed
                let draws: Vec<(usize, Option<f64>)> = features
                    .iter()
                    .map(|&f| (f, Self::random_threshold(x, indices, f, rng)))
                    .collect();
                draws
                    .into_iter()
                    .map(|(f, t)| t.and_then(|t| self.gain_at(x, y, indices, f, t, parent_impurity)))
                    .collect()
            }
        };

        candidates
            .into_iter()
            .flatten()
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(f, t, _)| (f, t))
    }

    /// Sorted sweep over one feature
    fn best_threshold(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature_idx: usize,
        parent_impurity: f64,
    ) -> Option<(usize, f64, f64)> {
        let mut rows: Vec<(f64, bool)> = indices
            .iter()
            .map(|&i| (x[[i, feature_idx]], y[i] > 0.5))
            .collect();
        rows.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let n = rows.len();
        let total_pos = rows.iter().filter(|r| r.1).count();
        let mut left_pos = 0usize;
        let mut best: Option<(f64, f64)> = None;

        for i in 0..n - 1 {
            if rows[i].1 {
                left_pos += 1;
            }
            if rows[i].0 == rows[i + 1].0 {
                continue;
            }

            let left_n = i + 1;
            let right_n = n - left_n;
            if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                continue;
            }

            let weighted = (left_n as f64 * self.impurity(left_pos, left_n)
                + right_n as f64 * self.impurity(total_pos - left_pos, right_n))
                / n as f64;
            let gain = parent_impurity - weighted;

            if gain > best.map_or(0.0, |b| b.1) {
                best = Some(((rows[i].0 + rows[i + 1].0) / 2.0, gain));
            }
        }

        best.map(|(threshold, gain)| (feature_idx, threshold, gain))
    }

    fn random_threshold(
        x: &Array2<f64>,
        indices: &[usize],
        feature_idx: usize,
        rng: &mut ChaCha8Rng,
    ) -> Option<f64> {
        let (min, max) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
            let v = x[[i, feature_idx]];
            (lo.min(v), hi.max(v))
        });
        if !(max > min) {
            return None;
        }
        Some(rng.gen_range(min..max))
    }

    fn gain_at(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature_idx: usize,
        threshold: f64,
        parent_impurity: f64,
    ) -> Option<(usize, f64, f64)> {
        let mut left_n = 0usize;
        let mut left_pos = 0usize;
        let mut right_pos = 0usize;
        for &i in indices {
            let positive = y[i] > 0.5;
            if x[[i, feature_idx]] <= threshold {
                left_n += 1;
                left_pos += positive as usize;
            } else {
                right_pos += positive as usize;
            }
        }

        let n = indices.len();
        let right_n = n - left_n;
        if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
            return None;
        }

        let weighted = (left_n as f64 * self.impurity(left_pos, left_n)
            + right_n as f64 * self.impurity(right_pos, right_n))
            / n as f64;
        let gain = parent_impurity - weighted;
        (gain > 0.0).then_some((feature_idx, threshold, gain))
    }

    fn impurity(&self, n_pos: usize, n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let p = n_pos as f64 / n as f64;
        let q = 1.0 - p;
        match self.criterion {
            Criterion::Gini => 1.0 - p * p - q * q,
            Criterion::Entropy => {
                let h = |v: f64| if v > 0.0 { -v * v.ln() } else { 0.0 };
                h(p) + h(q)
            }
        }
    }

    fn predict_sample(node: &TreeNode, sample: &[f64]) -> f64 {
        match node {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if sample[*feature_idx] <= *threshold {
                    Self::predict_sample(left, sample)
                } else {
                    Self::predict_sample(right, sample)
                }
            }
        }
    }

    /// Number of split levels on the longest root-to-leaf path
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }
}

impl ModelStrategy for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.fit_indices(x, y, &indices)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(BenchError::ModelNotFitted)?;
        check_n_features(self.n_features, x)?;

        let predictions: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| Self::predict_sample(root, &row.to_vec()))
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_simple() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.get_depth(), 1);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::new().with_max_depth(Some(2));
        tree.fit(&x, &y).unwrap();

        assert!(tree.get_depth() <= 2);

        let mut stump = DecisionTree::new().with_max_depth(Some(1));
        stump.fit(&x, &y).unwrap();
        assert_eq!(stump.get_depth(), 1);
    }

    #[test]
    fn test_leaf_probabilities() {
        // A stump over a feature that cannot separate the classes
        let x = array![[1.0], [1.0], [1.0], [2.0]];
        let y = array![0.0, 1.0, 1.0, 0.0];

        let mut tree = DecisionTree::new().with_max_depth(Some(1));
        tree.fit(&x, &y).unwrap();

        let proba = tree.predict_proba(&array![[1.0], [2.0]]).unwrap();
        assert!((proba[0] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(proba[1], 0.0);
    }

    #[test]
    fn test_random_splitter_is_seeded() {
        let x = Array2::from_shape_fn((40, 3), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
        let y = Array1::from_shape_fn(40, |i| if (i * 7) % 11 > 5 { 1.0 } else { 0.0 });

        let build = || {
            let mut t = DecisionTree::new()
                .with_splitter(SplitStrategy::Random)
                .with_random_state(3);
            t.fit(&x, &y).unwrap();
            t.predict_proba(&x).unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_max_features_resolve() {
        assert_eq!(MaxFeatures::Sqrt.resolve(16), 4);
        assert_eq!(MaxFeatures::Log2.resolve(1), 1);
        assert_eq!(MaxFeatures::Count(50).resolve(10), 10);
        assert_eq!(MaxFeatures::Fraction(0.5).resolve(10), 5);
    }
}
