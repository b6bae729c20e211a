//! Class-stratified train/test splits and k-fold cross-validation.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::ModelError;

/// Row indices of one split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffled row indices per class (index 0 holds the negatives).
fn shuffled_by_class(labels: &[u8], rng: &mut ChaCha8Rng) -> [Vec<usize>; 2] {
    let mut classes: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (i, &label) in labels.iter().enumerate() {
        classes[usize::from(label == 1)].push(i);
    }
    for class in &mut classes {
        class.shuffle(rng);
    }
    classes
}

/// Splits rows into train and test sets that keep the class ratio. Each class
/// contributes `round(test_size * class_count)` rows to the test set.
///
/// # Errors
///
/// Fails if a class has fewer than two rows or if either side would be empty.
pub fn stratified_split(labels: &[u8], test_size: f64, seed: u64) -> Result<Split, ModelError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let classes = shuffled_by_class(labels, &mut rng);

    let mut split = Split {
        train: Vec::new(),
        test: Vec::new(),
    };
    for (class, rows) in classes.iter().enumerate() {
        if rows.len() < 2 {
            return Err(ModelError::InvalidSplit(format!(
                "class {class} has {} rows; stratification needs at least 2",
                rows.len()
            )));
        }
        let n_test = (test_size * rows.len() as f64).round() as usize;
        split.test.extend_from_slice(&rows[..n_test.min(rows.len())]);
        split.train.extend_from_slice(&rows[n_test.min(rows.len())..]);
    }

    if split.train.is_empty() || split.test.is_empty() {
        return Err(ModelError::InvalidSplit(format!(
            "test_size {test_size} leaves an empty train or test set"
        )));
    }

    split.train.sort_unstable();
    split.test.sort_unstable();
    Ok(split)
}

/// Stratified k-fold splitter; rows of each class are shuffled with the seed
/// and dealt round-robin into the folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StratifiedKFold {
    pub n_splits: usize,
    pub seed: u64,
}

impl StratifiedKFold {
    #[must_use]
    pub const fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    /// # Errors
    ///
    /// Fails if `n_splits < 2` or a class has fewer rows than folds.
    pub fn split(&self, labels: &[u8]) -> Result<Vec<Split>, ModelError> {
        if self.n_splits < 2 {
            return Err(ModelError::InvalidSplit(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let classes = shuffled_by_class(labels, &mut rng);

        let mut fold_of = vec![0usize; labels.len()];
        for (class, rows) in classes.iter().enumerate() {
            if rows.len() < self.n_splits {
                return Err(ModelError::InvalidSplit(format!(
                    "class {class} has {} rows, fewer than {} folds",
                    rows.len(),
                    self.n_splits
                )));
            }
            for (position, &row) in rows.iter().enumerate() {
                fold_of[row] = position % self.n_splits;
            }
        }

        Ok((0..self.n_splits)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..labels.len()).partition(|&i| fold_of[i] == fold);
                Split { train, test }
            })
            .collect())
    }
}
