//! CART regression tree used by the forest and boosting ensembles.
//!
//! Splits minimize the summed squared error of the children, which for 0/1
//! targets ranks splits the same way as Gini impurity. Leaves hold the mean
//! target of their rows, so a tree grown on labels predicts a probability.

use ndarray::{ArrayView1, ArrayView2};
use rand::{seq::index, Rng};
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` considers all of them.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A fitted tree stored as a flat node arena; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct Builder<'x, 'a, 'r, R> {
    x: ArrayView2<'x, f64>,
    y: &'a [f64],
    params: &'a TreeParams,
    rng: &'r mut R,
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    score: f64,
}

impl DecisionTree {
    /// Grows a tree on the rows listed in `samples` (duplicates allowed).
    #[must_use]
    pub fn fit<R: Rng>(
        x: ArrayView2<'_, f64>,
        y: &[f64],
        samples: &[usize],
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let mut builder = Builder {
            x,
            y,
            params,
            rng,
            nodes: Vec::new(),
        };
        let mut samples = samples.to_vec();
        builder.grow(&mut samples, 0);
        Self {
            nodes: builder.nodes,
        }
    }

    /// Index of the leaf `row` falls into.
    #[must_use]
    pub fn leaf_index(&self, row: ArrayView1<'_, f64>) -> usize {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { .. } => return idx,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    #[must_use]
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        match self.nodes[self.leaf_index(row)] {
            Node::Leaf { value } => value,
            Node::Split { .. } => unreachable!("leaf_index always stops at a leaf"),
        }
    }

    /// Replaces the output of the leaf at `idx`. Non-leaf indices are ignored.
    pub fn set_leaf_value(&mut self, idx: usize, new_value: f64) {
        if let Some(Node::Leaf { value }) = self.nodes.get_mut(idx) {
            *value = new_value;
        }
    }

    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

impl<R: Rng> Builder<'_, '_, '_, R> {
    fn grow(&mut self, samples: &mut [usize], depth: usize) -> usize {
        let n = samples.len();
        let sum: f64 = samples.iter().map(|&i| self.y[i]).sum();
        let mean = if n == 0 { 0.0 } else { sum / n as f64 };

        let pure = samples.iter().all(|&i| self.y[i] == mean);
        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        let too_small = n < self.params.min_samples_split.max(2 * self.params.min_samples_leaf);

        let split = if pure || depth_reached || too_small {
            None
        } else {
            self.best_split(samples, sum)
        };

        let Some(split) = split else {
            self.nodes.push(Node::Leaf { value: mean });
            return self.nodes.len() - 1;
        };

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        let mid = partition(samples, |&i| self.x[[i, split.feature]] <= split.threshold);
        let (left_samples, right_samples) = samples.split_at_mut(mid);
        let left = self.grow(left_samples, depth + 1);
        let right = self.grow(right_samples, depth + 1);

        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    fn best_split(&mut self, samples: &[usize], total: f64) -> Option<BestSplit> {
        let n_features = self.x.ncols();
        let features: Vec<usize> = match self.params.max_features {
            Some(k) if k < n_features => index::sample(&mut *self.rng, n_features, k.max(1)).into_vec(),
            _ => (0..n_features).collect(),
        };

        let n = samples.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let parent_score = total * total / n as f64;
        let mut best: Option<BestSplit> = None;
        let mut sorted: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature in features {
            sorted.clear();
            sorted.extend(samples.iter().map(|&i| (self.x[[i, feature]], self.y[i])));
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for k in 1..n {
                left_sum += sorted[k - 1].1;
                if sorted[k - 1].0 == sorted[k].0 || k < min_leaf || n - k < min_leaf {
                    continue;
                }
                let right_sum = total - left_sum;
                let score =
                    left_sum * left_sum / k as f64 + right_sum * right_sum / (n - k) as f64;
                if score > parent_score + 1e-12 && best.as_ref().map_or(true, |b| score > b.score) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (sorted[k - 1].0 + sorted[k].0) / 2.0,
                        score,
                    });
                }
            }
        }

        best
    }
}

/// Moves elements matching `pred` to the front; returns how many matched.
fn partition<F: Fn(&usize) -> bool>(items: &mut [usize], pred: F) -> usize {
    let mut mid = 0;
    for i in 0..items.len() {
        if pred(&items[i]) {
            items.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn all(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn test_single_split_separates_classes() {
        let x = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0], [4.0, 5.0]];
        let y = [0.0, 0.0, 1.0, 1.0];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let tree = DecisionTree::fit(x.view(), &y, &all(4), &TreeParams::default(), &mut rng);

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);
        assert_abs_diff_eq!(tree.predict_row(array![2.4, 0.0].view()), 0.0);
        assert_abs_diff_eq!(tree.predict_row(array![2.6, 0.0].view()), 1.0);
    }

    #[test]
    fn test_max_depth_zero_is_a_stump_of_the_mean() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = [0.0, 0.0, 0.0, 1.0];
        let params = TreeParams {
            max_depth: Some(0),
            ..TreeParams::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let tree = DecisionTree::fit(x.view(), &y, &all(4), &params, &mut rng);
        assert_eq!(tree.n_leaves(), 1);
        assert_abs_diff_eq!(tree.predict_row(array![9.0].view()), 0.25);
    }

    #[test]
    fn test_min_samples_leaf_limits_splits() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = [1.0, 0.0, 0.0, 0.0];
        let params = TreeParams {
            min_samples_leaf: 2,
            ..TreeParams::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let tree = DecisionTree::fit(x.view(), &y, &all(4), &params, &mut rng);
        // The only legal split puts two rows on each side.
        assert_eq!(tree.n_leaves(), 2);
        assert_abs_diff_eq!(tree.predict_row(array![1.0].view()), 0.5);
    }

    #[test]
    fn test_constant_features_make_a_leaf() {
        let x = array![[1.0], [1.0], [1.0]];
        let y = [0.0, 1.0, 1.0];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let tree = DecisionTree::fit(x.view(), &y, &all(3), &TreeParams::default(), &mut rng);
        assert_eq!(tree.n_leaves(), 1);
    }

    #[test]
    fn test_set_leaf_value() {
        let x = array![[1.0], [2.0]];
        let y = [0.0, 1.0];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut tree = DecisionTree::fit(x.view(), &y, &all(2), &TreeParams::default(), &mut rng);
        let leaf = tree.leaf_index(array![2.0].view());
        tree.set_leaf_value(leaf, -3.0);
        assert_abs_diff_eq!(tree.predict_row(array![2.0].view()), -3.0);
        assert_abs_diff_eq!(tree.predict_row(array![1.0].view()), 0.0);
    }
}
