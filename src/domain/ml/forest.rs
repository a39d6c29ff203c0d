//! Bagged ensemble of CART regression trees.
//!
//! Every tree sees a bootstrap sample of the training rows and considers all features at
//! each split (squared-error criterion). Trees grow until a node is pure or cannot be split.

use super::metrics::population_std;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
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

#[derive(Debug, Clone)]
struct RegressionTree {
    nodes: Vec<Node>,
    /// Total squared-error decrease attributed to each feature.
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    children_sse: f64,
}

impl RegressionTree {
    fn fit(x: &[Vec<f64>], y: &[f64], sample: Vec<usize>, n_features: usize) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };
        tree.grow(x, y, sample);
        tree
    }

    fn grow(&mut self, x: &[Vec<f64>], y: &[f64], sample: Vec<usize>) -> usize {
        let n = sample.len() as f64;
        let sum: f64 = sample.iter().map(|&i| y[i]).sum();
        let sq: f64 = sample.iter().map(|&i| y[i] * y[i]).sum();
        let sse = (sq - sum * sum / n).max(0.0);

        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf { value: sum / n });

        if sample.len() < 2 || sse <= 1e-12 * sq.max(1.0) {
            return node_id;
        }
        let Some(best) = best_split(x, y, &sample, self.importances.len()) else {
            return node_id;
        };

        self.importances[best.feature] += (sse - best.children_sse).max(0.0);
        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| x[i][best.feature] <= best.threshold);

        let left_id = self.grow(x, y, left);
        let right_id = self.grow(x, y, right);
        self.nodes[node_id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: left_id,
            right: right_id,
        };
        node_id
    }

    fn predict(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

fn best_split(x: &[Vec<f64>], y: &[f64], sample: &[usize], n_features: usize) -> Option<BestSplit> {
    let n = sample.len();
    let total_sum: f64 = sample.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = sample.iter().map(|&i| y[i] * y[i]).sum();

    let mut best: Option<BestSplit> = None;
    let mut order = sample.to_vec();
    for feature in 0..n_features {
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for k in 1..n {
            let prev = order[k - 1];
            left_sum += y[prev];
            left_sq += y[prev] * y[prev];

            let lo = x[prev][feature];
            let hi = x[order[k]][feature];
            if lo >= hi {
                continue;
            }

            let left_n = k as f64;
            let right_n = (n - k) as f64;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let children_sse = (left_sq - left_sum * left_sum / left_n).max(0.0)
                + (right_sq - right_sum * right_sum / right_n).max(0.0);

            if best.as_ref().map_or(true, |b| children_sse < b.children_sse) {
                let mid = lo + (hi - lo) / 2.0;
                let threshold = if mid < hi { mid } else { lo };
                best = Some(BestSplit {
                    feature,
                    threshold,
                    children_sse,
                });
            }
        }
    }
    best
}

/// A fitted forest. Predictions are the mean of the per-tree predictions.
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    params: ForestParams,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForestRegressor {
    /// Fits the ensemble. `x` must be non-empty and rectangular, with one target per row.
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: ForestParams) -> Self {
        let n_rows = x.len();
        let n_features = x.first().map_or(0, Vec::len);
        let mut rng = StdRng::seed_from_u64(params.seed);

        let trees = (0..params.n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
                RegressionTree::fit(x, y, sample, n_features)
            })
            .collect();

        Self {
            params,
            trees,
            n_features,
        }
    }

    pub fn params(&self) -> ForestParams {
        self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter()
            .map(|row| {
                let per_tree = self.tree_predictions(row);
                per_tree.iter().sum::<f64>() / per_tree.len().max(1) as f64
            })
            .collect()
    }

    pub fn tree_predictions(&self, row: &[f64]) -> Vec<f64> {
        self.trees.iter().map(|t| t.predict(row)).collect()
    }

    /// Mean prediction and the population standard deviation across trees, per row.
    pub fn predict_with_spread(&self, rows: &[Vec<f64>]) -> Vec<(f64, f64)> {
        rows.iter()
            .map(|row| {
                let per_tree = self.tree_predictions(row);
                let mean = per_tree.iter().sum::<f64>() / per_tree.len().max(1) as f64;
                (mean, population_std(&per_tree))
            })
            .collect()
    }

    /// Normalized impurity-decrease importances; they sum to 1 unless no tree ever split.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            let tree_sum: f64 = tree.importances.iter().sum();
            if tree_sum <= 0.0 {
                continue;
            }
            for (acc, imp) in total.iter_mut().zip(&tree.importances) {
                *acc += imp / tree_sum;
            }
        }
        let grand: f64 = total.iter().sum();
        if grand > 0.0 {
            total.iter_mut().for_each(|v| *v /= grand);
        }
        total
    }
}
