//! Bagged ensemble of decision trees.

use ndarray::{Array1, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::estimator::ProbabilisticClassifier;
use crate::tree::{DecisionTree, TreeParams};

/// Hyperparameters of [`RandomForest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// Trees grown on bootstrap samples, each split drawing `sqrt(d)` features.
/// The predicted probability is the mean of the trees' leaf frequencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    #[must_use]
    pub fn fit(x: ArrayView2<'_, f64>, y: &[f64], params: &ForestParams, seed: u64) -> Self {
        let n = x.nrows();
        let d = x.ncols();
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: Some(((d as f64).sqrt().round() as usize).max(1)),
        };

        let trees = (0..params.n_estimators)
            .map(|t| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(t as u64));
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit(x, y, &bootstrap, &tree_params, &mut rng)
            })
            .collect::<Vec<_>>();

        debug!(n_trees = trees.len(), "Fitted random forest");
        Self { trees }
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl ProbabilisticClassifier for RandomForest {
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        if self.trees.is_empty() {
            return Array1::zeros(x.nrows());
        }
        let count = self.trees.len() as f64;
        x.rows()
            .into_iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / count)
            .collect()
    }
}
