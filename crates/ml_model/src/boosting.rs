//! Gradient-boosted trees under logistic loss.
//!
//! Backs both the `xgboost` and `lightgbm` registry names; they differ only in
//! their default tree limits.

use std::collections::HashMap;

use ndarray::{Array1, ArrayView2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::estimator::ProbabilisticClassifier;
use crate::linear::sigmoid;
use crate::tree::{DecisionTree, TreeParams};

/// Hyperparameters of [`GradientBoosting`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<DecisionTree>,
}

impl GradientBoosting {
    /// Starts from the training log-odds and adds one Newton-step tree per
    /// round, fitted to the residuals `y - p`.
    #[must_use]
    pub fn fit(x: ArrayView2<'_, f64>, y: &[f64], params: &BoostingParams, seed: u64) -> Self {
        let n = x.nrows();
        let rate = (y.iter().sum::<f64>() / n.max(1) as f64).clamp(1e-6, 1.0 - 1e-6);
        let base_score = (rate / (1.0 - rate)).ln();

        let tree_params = TreeParams {
            max_depth: Some(params.max_depth),
            min_samples_split: 2,
            min_samples_leaf: params.min_samples_leaf,
            max_features: None,
        };
        let samples: Vec<usize> = (0..n).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut scores = vec![base_score; n];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            let probs: Vec<f64> = scores.iter().map(|&s| sigmoid(s)).collect();
            let residuals: Vec<f64> = y.iter().zip(&probs).map(|(yi, p)| yi - p).collect();

            let mut tree = DecisionTree::fit(x, &residuals, &samples, &tree_params, &mut rng);

            // Newton step per leaf: sum(r) / sum(p * (1 - p)).
            let leaves: Vec<usize> = x.rows().into_iter().map(|row| tree.leaf_index(row)).collect();
            let mut numerators = HashMap::<usize, (f64, f64)>::new();
            for (i, &leaf) in leaves.iter().enumerate() {
                let entry = numerators.entry(leaf).or_insert((0.0, 0.0));
                entry.0 += residuals[i];
                entry.1 += probs[i] * (1.0 - probs[i]);
            }
            for (&leaf, &(num, den)) in &numerators {
                tree.set_leaf_value(leaf, num / den.max(1e-12));
            }

            for (score, &leaf) in scores.iter_mut().zip(&leaves) {
                let (num, den) = numerators[&leaf];
                *score += params.learning_rate * num / den.max(1e-12);
            }
            trees.push(tree);
        }

        debug!(rounds = trees.len(), base_score, "Fitted gradient boosting");
        Self {
            base_score,
            learning_rate: params.learning_rate,
            trees,
        }
    }
}

impl ProbabilisticClassifier for GradientBoosting {
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.rows()
            .into_iter()
            .map(|row| {
                let margin = self.base_score
                    + self.learning_rate
                        * self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>();
                sigmoid(margin)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    use super::*;

    #[test]
    fn test_zero_rounds_predicts_base_rate() {
        let x = Array2::<f64>::zeros((4, 1));
        let y = [1.0, 0.0, 0.0, 0.0];
        let params = BoostingParams {
            n_estimators: 0,
            ..BoostingParams::default()
        };
        let model = GradientBoosting::fit(x.view(), &y, &params, 0);
        assert_abs_diff_eq!(model.predict_proba(x.view())[0], 0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_boosting_separates_classes() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let params = BoostingParams {
            n_estimators: 20,
            ..BoostingParams::default()
        };
        let model = GradientBoosting::fit(x.view(), &y, &params, 0);
        let proba = model.predict_proba(x.view());
        assert!(proba[0] < 0.2);
        assert!(proba[5] > 0.8);
    }
}
