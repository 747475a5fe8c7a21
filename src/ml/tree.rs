//! CART regression tree with squared-error splits.
//!
//! `Splitter::Best` scans every threshold between distinct sorted values;
//! `Splitter::Random` draws one threshold per feature uniformly between the
//! node's min and max (the extremely randomised variant). Samples with
//! `x <= threshold` go left.

use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Splitter {
    Best,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Unlimited when `None`.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub splitter: Splitter,
}

impl TreeParams {
    /// Fully grown tree.
    pub fn unbounded(splitter: Splitter) -> Self {
        TreeParams {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            splitter,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct Candidate {
    feature: usize,
    threshold: f64,
    score: f64,
}

impl RegressionTree {
    /// Grow a tree on the rows listed in `samples` (repeats allowed, which is
    /// how bootstrap resampling is expressed).
    pub fn fit<R: Rng>(
        x: &Array2<f64>,
        y: &Array1<f64>,
        samples: &[usize],
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let mut indices = samples.to_vec();
        // (start, end, depth, node slot)
        let mut stack = vec![(0usize, indices.len(), 0usize, 0usize)];

        while let Some((start, end, depth, slot)) = stack.pop() {
            let node_samples = &indices[start..end];
            let value = mean_of(y, node_samples);

            let can_split = node_samples.len() >= params.min_samples_split
                && node_samples.len() >= 2 * params.min_samples_leaf
                && params.max_depth.map_or(true, |d| depth < d)
                && !is_constant(y, node_samples);

            let split = if can_split {
                match params.splitter {
                    Splitter::Best => best_split(x, y, node_samples, params.min_samples_leaf),
                    Splitter::Random => {
                        random_split(x, y, node_samples, params.min_samples_leaf, rng)
                    }
                }
            } else {
                None
            };

            let Some(split) = split else {
                nodes[slot] = Node::Leaf { value };
                continue;
            };

            let mid = partition(x, &mut indices[start..end], split.feature, split.threshold) + start;
            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { value: 0.0 });
            nodes.push(Node::Leaf { value: 0.0 });
            nodes[slot] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            stack.push((mid, end, depth + 1, right));
            stack.push((start, mid, depth + 1, left));
        }

        RegressionTree { nodes }
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

fn mean_of(y: &Array1<f64>, samples: &[usize]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&i| y[i]).sum::<f64>() / samples.len() as f64
}

fn is_constant(y: &Array1<f64>, samples: &[usize]) -> bool {
    let first = y[samples[0]];
    samples.iter().all(|&i| y[i] == first)
}

/// Move rows with `x[feature] <= threshold` to the front; returns their count.
fn partition(x: &Array2<f64>, samples: &mut [usize], feature: usize, threshold: f64) -> usize {
    let mut left = 0;
    for k in 0..samples.len() {
        if x[[samples[k], feature]] <= threshold {
            samples.swap(left, k);
            left += 1;
        }
    }
    left
}

/// Proxy for SSE reduction: `sum_l²/n_l + sum_r²/n_r`, higher is better.
fn proxy_score(left_sum: f64, left_n: usize, right_sum: f64, right_n: usize) -> f64 {
    left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64
}

fn best_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    samples: &[usize],
    min_leaf: usize,
) -> Option<Candidate> {
    let n = samples.len();
    let total: f64 = samples.iter().map(|&i| y[i]).sum();
    let mut best: Option<Candidate> = None;
    let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

    for feature in 0..x.ncols() {
        pairs.clear();
        pairs.extend(samples.iter().map(|&i| (x[[i, feature]], y[i])));
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        if pairs[0].0 == pairs[n - 1].0 {
            continue;
        }

        let mut left_sum = 0.0;
        for k in 1..n {
            left_sum += pairs[k - 1].1;
            if pairs[k - 1].0 == pairs[k].0 || k < min_leaf || n - k < min_leaf {
                continue;
            }
            let score = proxy_score(left_sum, k, total - left_sum, n - k);
            if best.as_ref().map_or(true, |b| score > b.score) {
                let (lo, hi) = (pairs[k - 1].0, pairs[k].0);
                let mut threshold = lo + (hi - lo) / 2.0;
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some(Candidate {
                    feature,
                    threshold,
                    score,
                });
            }
        }
    }
    best
}

fn random_split<R: Rng>(
    x: &Array2<f64>,
    y: &Array1<f64>,
    samples: &[usize],
    min_leaf: usize,
    rng: &mut R,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;

    for feature in 0..x.ncols() {
        let (lo, hi) = samples.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
            let v = x[[i, feature]];
            (lo.min(v), hi.max(v))
        });
        if !(hi > lo) {
            continue;
        }
        let threshold = rng.gen_range(lo..hi);

        let (mut left_sum, mut left_n, mut right_sum, mut right_n) = (0.0, 0, 0.0, 0);
        for &i in samples {
            if x[[i, feature]] <= threshold {
                left_sum += y[i];
                left_n += 1;
            } else {
                right_sum += y[i];
                right_n += 1;
            }
        }
        if left_n < min_leaf.max(1) || right_n < min_leaf.max(1) {
            continue;
        }
        let score = proxy_score(left_sum, left_n, right_sum, right_n);
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(Candidate {
                feature,
                threshold,
                score,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn step_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((20, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 3) as f64 });
        let y = x.column(0).mapv(|v| if v < 10.0 { 1.0 } else { 5.0 });
        (x, y)
    }

    #[test]
    fn best_split_finds_the_step() {
        let (x, y) = step_data();
        let samples: Vec<usize> = (0..20).collect();
        let params = TreeParams::unbounded(Splitter::Best);
        let tree = RegressionTree::fit(&x, &y, &samples, &params, &mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict_row(array![9.4, 0.0].view()), 1.0);
        assert_eq!(tree.predict_row(array![9.6, 0.0].view()), 5.0);
    }

    #[test]
    fn fully_grown_tree_interpolates_training_data() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![4.0, -1.0, 7.0, 2.0];
        let samples: Vec<usize> = (0..4).collect();
        for splitter in [Splitter::Best, Splitter::Random] {
            let tree = RegressionTree::fit(
                &x,
                &y,
                &samples,
                &TreeParams::unbounded(splitter),
                &mut ChaCha8Rng::seed_from_u64(7),
            );
            assert_eq!(tree.predict(&x), y);
        }
    }

    #[test]
    fn depth_limit_is_respected() {
        let (x, y) = step_data();
        let y = y + x.column(0).mapv(|v| v * 0.01);
        let samples: Vec<usize> = (0..20).collect();
        let params = TreeParams::unbounded(Splitter::Best).with_max_depth(1);
        let tree = RegressionTree::fit(&x, &y, &samples, &params, &mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn constant_target_is_a_single_leaf() {
        let (x, _) = step_data();
        let y = Array1::from_elem(20, 3.0);
        let samples: Vec<usize> = (0..20).collect();
        let tree = RegressionTree::fit(
            &x,
            &y,
            &samples,
            &TreeParams::unbounded(Splitter::Random),
            &mut ChaCha8Rng::seed_from_u64(1),
        );
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict_row(array![100.0, 1.0].view()), 3.0);
    }
}
