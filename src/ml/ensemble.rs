//! Tree ensembles.
//!
//! Per-tree seeds are drawn up front from the model seed, so trees can be
//! grown on the rayon pool in any order and still produce the same model.

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::estimator::Regressor;
use super::tree::{RegressionTree, Splitter, TreeParams};

fn tree_seeds(seed: u64, n: usize) -> Vec<u64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen()).collect()
}

fn average(trees: &[RegressionTree], x: &Array2<f64>) -> Array1<f64> {
    if trees.is_empty() {
        return Array1::zeros(x.nrows());
    }
    let predictions: Vec<Array1<f64>> = trees.par_iter().map(|t| t.predict(x)).collect();
    let mut sum = Array1::zeros(x.nrows());
    for p in &predictions {
        sum += p;
    }
    sum / trees.len() as f64
}

// ---------------------------------------------------------------------------
// Random forest
// ---------------------------------------------------------------------------

/// Bagged fully grown CART trees over all features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_estimators: usize,
    seed: u64,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn new(n_estimators: usize, seed: u64) -> Self {
        RandomForest {
            n_estimators,
            seed,
            trees: Vec::new(),
        }
    }
}

impl Regressor for RandomForest {
    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) {
        let n = x.nrows();
        let params = TreeParams::unbounded(Splitter::Best);
        self.trees = tree_seeds(self.seed, self.n_estimators)
            .into_par_iter()
            .map(|seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, &bootstrap, &params, &mut rng)
            })
            .collect();
    }

    fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        average(&self.trees, x)
    }
}

// ---------------------------------------------------------------------------
// Extra trees
// ---------------------------------------------------------------------------

/// Fully grown trees with random thresholds, each on the full sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraTrees {
    n_estimators: usize,
    seed: u64,
    trees: Vec<RegressionTree>,
}

impl ExtraTrees {
    pub fn new(n_estimators: usize, seed: u64) -> Self {
        ExtraTrees {
            n_estimators,
            seed,
            trees: Vec::new(),
        }
    }
}

impl Regressor for ExtraTrees {
    fn name(&self) -> &'static str {
        "extra_trees"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) {
        let all: Vec<usize> = (0..x.nrows()).collect();
        let params = TreeParams::unbounded(Splitter::Random);
        self.trees = tree_seeds(self.seed, self.n_estimators)
            .into_par_iter()
            .map(|seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                RegressionTree::fit(x, y, &all, &params, &mut rng)
            })
            .collect();
    }

    fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        average(&self.trees, x)
    }
}

// ---------------------------------------------------------------------------
// Gradient boosting
// ---------------------------------------------------------------------------

/// Least-squares boosting of shallow trees, starting from the target mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    n_estimators: usize,
    learning_rate: f64,
    max_depth: usize,
    seed: u64,
    init: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn new(seed: u64) -> Self {
        GradientBoosting {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            seed,
            init: 0.0,
            trees: Vec::new(),
        }
    }
}

impl Regressor for GradientBoosting {
    fn name(&self) -> &'static str {
        "gradient_boosting"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) {
        let all: Vec<usize> = (0..x.nrows()).collect();
        let params = TreeParams::unbounded(Splitter::Best).with_max_depth(self.max_depth);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        self.init = y.mean().unwrap_or(0.0);
        let mut current = Array1::from_elem(x.nrows(), self.init);
        self.trees = Vec::with_capacity(self.n_estimators);
        for _ in 0..self.n_estimators {
            let residual = y - &current;
            let tree = RegressionTree::fit(x, &residual, &all, &params, &mut rng);
            current = current + tree.predict(x) * self.learning_rate;
            self.trees.push(tree);
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        let mut out = Array1::from_elem(x.nrows(), self.init);
        for tree in &self.trees {
            out = out + tree.predict(x) * self.learning_rate;
        }
        out
    }
}
