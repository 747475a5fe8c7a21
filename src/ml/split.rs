//! Seeded row splits. The same seed always yields the same partition.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Number of test rows for `n` rows: `ceil(n * test_fraction)`.
pub fn test_size(n: usize, test_fraction: f64) -> usize {
    (n as f64 * test_fraction).ceil() as usize
}

/// Shuffle `0..n` and take the first `test_size` indices as the test split.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> TrainTestSplit {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    let n_test = test_size(n, test_fraction).min(n);
    let train = order.split_off(n_test);
    TrainTestSplit { train, test: order }
}

/// Shuffled K-fold splitter. The first `n % k` folds get one extra row.
#[derive(Debug, Clone, Copy)]
pub struct KFold {
    pub n_splits: usize,
    pub seed: u64,
}

impl KFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        KFold { n_splits, seed }
    }

    /// `(train, validation)` positions into `0..n` for each fold.
    pub fn split(&self, n: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut ChaCha8Rng::seed_from_u64(self.seed));

        let base = n / self.n_splits;
        let extra = n % self.n_splits;
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for fold in 0..self.n_splits {
            let size = base + usize::from(fold < extra);
            let validation = order[start..start + size].to_vec();
            let train = order[..start]
                .iter()
                .chain(&order[start + size..])
                .copied()
                .collect();
            folds.push((train, validation));
            start += size;
        }
        folds
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn split_sizes_follow_the_fraction() {
        let split = train_test_split(11, 0.2, 42);
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 8);
        let all: BTreeSet<usize> = split.train.iter().chain(&split.test).copied().collect();
        assert_eq!(all.len(), 11);
    }

    #[test]
    fn split_is_seed_deterministic() {
        assert_eq!(train_test_split(50, 0.2, 7), train_test_split(50, 0.2, 7));
        assert_ne!(train_test_split(50, 0.2, 7), train_test_split(50, 0.2, 8));
    }

    #[test]
    fn folds_partition_the_rows() {
        let folds = KFold::new(5, 3).split(12);
        assert_eq!(folds.len(), 5);
        let sizes: Vec<usize> = folds.iter().map(|(_, v)| v.len()).collect();
        assert_eq!(sizes, vec![3, 3, 2, 2, 2]);

        let mut seen = BTreeSet::new();
        for (train, validation) in &folds {
            assert_eq!(train.len() + validation.len(), 12);
            assert!(validation.iter().all(|v| !train.contains(v)));
            seen.extend(validation.iter().copied());
        }
        assert_eq!(seen.len(), 12);
    }
}
