//! Scoring functions

use crate::error::{BenchError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Metric used to score a fold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMetric {
    /// Area under the ROC curve, computed from class-1 scores
    #[default]
    RocAuc,
    /// Fraction of correct hard predictions
    Accuracy,
}

impl ScoringMetric {
    /// Whether the metric consumes probability scores rather than hard labels
    pub fn needs_probabilities(&self) -> bool {
        matches!(self, ScoringMetric::RocAuc)
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            ScoringMetric::RocAuc => "ROC AUC",
            ScoringMetric::Accuracy => "accuracy",
        }
    }

    /// Score predictions against the truth
    ///
    /// `predictions` are class-1 scores for [`ScoringMetric::RocAuc`] and
    /// hard labels for [`ScoringMetric::Accuracy`].
    pub fn score(&self, y_true: &Array1<f64>, predictions: &Array1<f64>) -> Result<f64> {
        match self {
            ScoringMetric::RocAuc => roc_auc(y_true, predictions),
            ScoringMetric::Accuracy => accuracy(y_true, predictions),
        }
    }
}

/// Number of distinct label values
pub fn count_classes(y: &Array1<f64>) -> usize {
    let mut values: Vec<f64> = y.iter().copied().collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values.dedup();
    values.len()
}

fn check_lengths(y_true: &Array1<f64>, y_other: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_other.len() {
        return Err(BenchError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_other.len()),
        });
    }
    Ok(())
}

/// Fraction of predictions matching the truth
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    if y_true.is_empty() {
        return Err(BenchError::UndefinedScore(
            "accuracy of an empty prediction set".to_string(),
        ));
    }

    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();

    Ok(correct as f64 / y_true.len() as f64)
}

/// Area under the ROC curve
///
/// Uses the rank-sum (Mann-Whitney) form; tied scores share their average
/// rank, so a constant scorer gets exactly 0.5. Labels must be 0/1 and both
/// classes must be present.
pub fn roc_auc(y_true: &Array1<f64>, scores: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, scores)?;

    if let Some(v) = y_true.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(BenchError::UndefinedScore(format!(
            "ROC AUC needs binary 0/1 labels, found {}",
            v
        )));
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(BenchError::Validation(
            "ROC AUC received a non-finite score".to_string(),
        ));
    }

    let n_pos = y_true.iter().filter(|&&v| v == 1.0).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(BenchError::UndefinedScore(format!(
            "ROC AUC needs both classes, got {} positive and {} negative labels",
            n_pos, n_neg
        )));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Average 1-based ranks over tie groups
    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(&t, _)| t == 1.0)
        .map(|(_, &r)| r)
        .sum();

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_auc_perfect_ranking() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        let s = array![0.1, 0.2, 0.8, 0.9];
        assert!((roc_auc(&y, &s).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_auc_inverted_ranking() {
        let y = array![1.0, 1.0, 0.0, 0.0];
        let s = array![0.1, 0.2, 0.8, 0.9];
        assert!(roc_auc(&y, &s).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_auc_constant_scores() {
        let y = array![0.0, 1.0, 0.0, 1.0, 1.0];
        let s = array![0.5, 0.5, 0.5, 0.5, 0.5];
        assert!((roc_auc(&y, &s).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_auc_partial_ties() {
        // Pairs (pos, neg): (0.35 vs 0.1) win, (0.35 vs 0.4) loss,
        // (0.8 vs 0.1) win, (0.8 vs 0.4) win => 3/4
        let y = array![0.0, 0.0, 1.0, 1.0];
        let s = array![0.1, 0.4, 0.35, 0.8];
        assert!((roc_auc(&y, &s).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_auc_single_class_undefined() {
        let y = array![1.0, 1.0, 1.0];
        let s = array![0.1, 0.2, 0.3];
        assert!(matches!(roc_auc(&y, &s), Err(BenchError::UndefinedScore(_))));
    }

    #[test]
    fn test_accuracy() {
        let y = array![1.0, 0.0, 1.0, 0.0];
        let p = array![1.0, 0.0, 0.0, 0.0];
        assert!((accuracy(&y, &p).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_count_classes() {
        assert_eq!(count_classes(&array![0.0, 1.0, 1.0, 0.0]), 2);
        assert_eq!(count_classes(&array![1.0, 1.0]), 1);
    }
}
