//! Random forest regressor predicting delay hours.
//!
//! Each tree is a CART regression tree grown on a bootstrap sample of the
//! corpus, splitting on squared-error reduction over every feature until its
//! leaves are pure. Tree seeds are drawn up front from one seeded generator,
//! so the fitted forest does not depend on how trees are spread across threads.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::thread;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("{rows} feature rows but {targets} targets")]
    LengthMismatch { rows: usize, targets: usize },
    #[error("expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("forest needs at least one estimator")]
    NoEstimators,
    #[error("non-finite value in training row {row}")]
    NonFiniteTrainingValue { row: usize },
    #[error("feature {index} is not finite")]
    NonFiniteFeature { index: usize },
    #[error("model produced a non-finite estimate")]
    NonFinitePrediction,
    #[error("tree {tree} is malformed: {reason}")]
    MalformedTree { tree: usize, reason: String },
    #[error("{feature} encoder has {found} classes, model was trained with {trained}")]
    EncoderMismatch {
        feature: &'static str,
        trained: usize,
        found: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub seed: u64,
    pub min_samples_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            seed: 42,
            min_samples_split: 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Flat node arena; node 0 is the root and children always follow their parent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn fit<R: AsRef<[f64]>>(
        features: &[R],
        targets: &[f64],
        sample: Vec<usize>,
        n_features: usize,
        min_samples_split: usize,
    ) -> Self {
        let mut nodes = vec![Node::Leaf(0.0)];
        let mut pending = vec![(0usize, sample)];

        while let Some((slot, indices)) = pending.pop() {
            let split = if indices.len() >= min_samples_split.max(2) {
                best_split(features, targets, &indices, n_features)
            } else {
                None
            };

            match split {
                None => nodes[slot] = Node::Leaf(mean_target(targets, &indices)),
                Some((feature, threshold)) => {
                    let (left, right): (Vec<usize>, Vec<usize>) = indices
                        .into_iter()
                        .partition(|&i| features[i].as_ref()[feature] <= threshold);

                    let left_slot = nodes.len();
                    let right_slot = left_slot + 1;
                    nodes.push(Node::Leaf(0.0));
                    nodes.push(Node::Leaf(0.0));
                    nodes[slot] = Node::Split {
                        feature,
                        threshold,
                        left: left_slot,
                        right: right_slot,
                    };
                    pending.push((right_slot, right));
                    pending.push((left_slot, left));
                }
            }
        }

        Self { nodes }
    }

    fn predict(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(Node::Leaf(value)) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
                None => return f64::NAN,
            }
        }
    }

    fn check(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf(value) if !value.is_finite() => {
                    return Err(format!("leaf {} is not finite", index));
                }
                Node::Leaf(_) => {}
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features || !threshold.is_finite() {
                        return Err(format!("split {} has an invalid test", index));
                    }
                    // children after parent keeps traversal finite
                    for child in [*left, *right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(format!("split {} points at node {}", index, child));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn mean_target(targets: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| targets[i]).sum::<f64>() / indices.len() as f64
}

/// Best (feature, threshold) by squared-error reduction, or `None` when the
/// node is pure or no feature separates its samples.
fn best_split<R: AsRef<[f64]>>(
    features: &[R],
    targets: &[f64],
    indices: &[usize],
    n_features: usize,
) -> Option<(usize, f64)> {
    let first = targets[indices[0]];
    if indices.iter().all(|&i| targets[i] == first) {
        return None;
    }

    let n = indices.len() as f64;
    let total: f64 = indices.iter().map(|&i| targets[i]).sum();
    let mut best: Option<(f64, usize, f64)> = None;
    let mut column: Vec<(f64, f64)> = Vec::with_capacity(indices.len());

    for feature in 0..n_features {
        column.clear();
        column.extend(indices.iter().map(|&i| (features[i].as_ref()[feature], targets[i])));
        column.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        for k in 0..column.len() - 1 {
            left_sum += column[k].1;
            let (here, next) = (column[k].0, column[k + 1].0);
            if here >= next {
                continue;
            }
            let left_n = (k + 1) as f64;
            let right_sum = total - left_sum;
            // maximising this minimises the children's summed squared error
            let score = left_sum * left_sum / left_n + right_sum * right_sum / (n - left_n);
            if best.map_or(true, |(best_score, _, _)| score > best_score) {
                best = Some((score, feature, midpoint(here, next)));
            }
        }
    }

    best.map(|(_, feature, threshold)| (feature, threshold))
}

fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low + (high - low) / 2.0;
    if mid < high {
        mid
    } else {
        low
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DelayModel {
    params: ForestParams,
    n_features: usize,
    training_rows: usize,
    trees: Vec<RegressionTree>,
}

impl DelayModel {
    pub fn fit<R>(params: ForestParams, features: &[R], targets: &[f64]) -> Result<Self, ModelError>
    where
        R: AsRef<[f64]> + Sync,
    {
        if params.n_estimators == 0 {
            return Err(ModelError::NoEstimators);
        }
        if features.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if features.len() != targets.len() {
            return Err(ModelError::LengthMismatch {
                rows: features.len(),
                targets: targets.len(),
            });
        }

        let n_features = features[0].as_ref().len();
        for (row, (x, y)) in features.iter().zip(targets).enumerate() {
            let x = x.as_ref();
            if x.len() != n_features {
                return Err(ModelError::ShapeMismatch {
                    expected: n_features,
                    actual: x.len(),
                });
            }
            if !y.is_finite() || x.iter().any(|v| !v.is_finite()) {
                return Err(ModelError::NonFiniteTrainingValue { row });
            }
        }

        let mut master = StdRng::seed_from_u64(params.seed);
        let tree_seeds: Vec<u64> = (0..params.n_estimators).map(|_| master.gen()).collect();

        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(tree_seeds.len());
        let per_worker = (tree_seeds.len() + workers - 1) / workers;

        let trees = thread::scope(|scope| {
            let handles: Vec<_> = tree_seeds
                .chunks(per_worker)
                .map(|seeds| {
                    scope.spawn(move || {
                        seeds
                            .iter()
                            .map(|&seed| grow_tree(features, targets, n_features, seed, params))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect::<Vec<_>>()
        });

        Ok(Self {
            params,
            n_features,
            training_rows: features.len(),
            trees,
        })
    }

    /// Estimate for exactly one row, which must match the training arity.
    pub fn predict(&self, row: &[f64]) -> Result<f64, ModelError> {
        if row.len() != self.n_features {
            return Err(ModelError::ShapeMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        if let Some(index) = row.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteFeature { index });
        }

        let total: f64 = self.trees.iter().map(|tree| tree.predict(row)).sum();
        let estimate = total / self.trees.len() as f64;
        if !estimate.is_finite() {
            return Err(ModelError::NonFinitePrediction);
        }
        Ok(estimate)
    }

    /// Structural check for models that did not come from [`DelayModel::fit`].
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NoEstimators);
        }
        for (tree, t) in self.trees.iter().enumerate() {
            t.check(self.n_features)
                .map_err(|reason| ModelError::MalformedTree { tree, reason })?;
        }
        Ok(())
    }

    pub fn params(&self) -> ForestParams {
        self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    pub fn training_rows(&self) -> usize {
        self.training_rows
    }
}

fn grow_tree<R: AsRef<[f64]>>(
    features: &[R],
    targets: &[f64],
    n_features: usize,
    seed: u64,
    params: ForestParams,
) -> RegressionTree {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = features.len();
    let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
    RegressionTree::fit(features, targets, sample, n_features, params.min_samples_split)
}
