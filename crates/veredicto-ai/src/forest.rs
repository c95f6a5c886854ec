//! Seeded random-forest classifier.
//!
//! Gini-split decision trees grown on bootstrap samples with per-split
//! feature subsampling. Every stochastic step draws from a `StdRng`
//! seeded by the caller, so training is reproducible. Probabilities are
//! the mean of per-tree leaf class distributions; feature importances
//! are normalized impurity decreases accumulated across all splits.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use veredicto_core::ForestParams;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        probs: Vec<f32>,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn probs<'a>(&'a self, row: &[f32]) -> &'a [f32] {
        match self {
            Node::Leaf { probs } => probs,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    left.probs(row)
                } else {
                    right.probs(row)
                }
            }
        }
    }
}

/// Trained ensemble of gini decision trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    n_classes: usize,
    n_features: usize,
    trees: Vec<Node>,
    importances: Vec<f32>,
}

impl RandomForest {
    /// Fit an ensemble on a dense feature matrix and integer labels in
    /// `0..n_classes`.
    pub fn fit(
        x: &[Vec<f32>],
        y: &[usize],
        n_classes: usize,
        params: &ForestParams,
        seed: u64,
    ) -> Self {
        assert_eq!(x.len(), y.len(), "feature/label row count mismatch");
        assert!(!x.is_empty(), "cannot fit a forest on zero samples");

        let n = x.len();
        let n_features = x[0].len();
        let mut importance = vec![0.0f64; n_features];
        let mut trees = Vec::with_capacity(params.n_trees);

        for t in 0..params.n_trees {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            trees.push(grow(
                x,
                y,
                n_classes,
                &sample,
                0,
                params,
                &mut rng,
                n as f64,
                &mut importance,
            ));
        }

        let total: f64 = importance.iter().sum();
        let importances = if total > 0.0 {
            importance.iter().map(|&v| (v / total) as f32).collect()
        } else {
            vec![0.0; n_features]
        };

        Self {
            n_classes,
            n_features,
            trees,
            importances,
        }
    }

    /// Mean per-class probability across trees.
    pub fn predict_proba(&self, row: &[f32]) -> Vec<f32> {
        let mut probs = vec![0.0f32; self.n_classes];
        for tree in &self.trees {
            for (p, &q) in probs.iter_mut().zip(tree.probs(row)) {
                *p += q;
            }
        }
        let n = self.trees.len() as f32;
        for p in &mut probs {
            *p /= n;
        }
        probs
    }

    /// Arg-max class; ties resolve to the lowest class index.
    pub fn predict(&self, row: &[f32]) -> usize {
        let probs = self.predict_proba(row);
        let mut best = 0;
        for (i, &p) in probs.iter().enumerate() {
            if p > probs[best] {
                best = i;
            }
        }
        best
    }

    /// Normalized impurity-decrease importance per feature dimension.
    pub fn importances(&self) -> &[f32] {
        &self.importances
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

fn class_counts(y: &[usize], indices: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &i in indices {
        counts[y[i]] += 1;
    }
    counts
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let mut g = 1.0;
    for &c in counts {
        let p = c as f64 / total as f64;
        g -= p * p;
    }
    g
}

fn leaf(counts: &[usize], total: usize) -> Node {
    let probs = counts
        .iter()
        .map(|&c| if total > 0 { c as f32 / total as f32 } else { 0.0 })
        .collect();
    Node::Leaf { probs }
}

#[allow(clippy::too_many_arguments)]
fn grow(
    x: &[Vec<f32>],
    y: &[usize],
    n_classes: usize,
    indices: &[usize],
    depth: usize,
    params: &ForestParams,
    rng: &mut StdRng,
    n_total: f64,
    importance: &mut [f64],
) -> Node {
    let counts = class_counts(y, indices, n_classes);
    let node_size = indices.len();
    let parent_gini = gini(&counts, node_size);

    let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
    if depth >= params.max_depth || node_size < params.min_samples_split || is_pure {
        return leaf(&counts, node_size);
    }

    let n_features = x[0].len();
    let k = ((n_features as f64).sqrt().ceil() as usize).clamp(1, n_features);
    let candidates = rand::seq::index::sample(rng, n_features, k);

    let mut best: Option<(usize, f32, f64)> = None; // (feature, threshold, gain)

    for feature in candidates {
        let mut values: Vec<(f32, usize)> =
            indices.iter().map(|&i| (x[i][feature], y[i])).collect();
        values.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut left_counts = vec![0usize; n_classes];
        for split_at in 1..node_size {
            left_counts[values[split_at - 1].1] += 1;

            // Only split between distinct feature values.
            if values[split_at].0 <= values[split_at - 1].0 {
                continue;
            }

            let right_counts: Vec<usize> = counts
                .iter()
                .zip(&left_counts)
                .map(|(&c, &l)| c - l)
                .collect();

            let weighted = (split_at as f64 / node_size as f64)
                * gini(&left_counts, split_at)
                + ((node_size - split_at) as f64 / node_size as f64)
                    * gini(&right_counts, node_size - split_at);
            let gain = parent_gini - weighted;

            if gain > 1e-7 && best.map_or(true, |(_, _, g)| gain > g) {
                let threshold = (values[split_at - 1].0 + values[split_at].0) / 2.0;
                best = Some((feature, threshold, gain));
            }
        }
    }

    let Some((feature, threshold, gain)) = best else {
        return leaf(&counts, node_size);
    };

    importance[feature] += (node_size as f64 / n_total) * gain;

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| x[i][feature] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(
            x, y, n_classes, &left_idx, depth + 1, params, rng, n_total, importance,
        )),
        right: Box::new(grow(
            x, y, n_classes, &right_idx, depth + 1, params, rng, n_total, importance,
        )),
    }
}
