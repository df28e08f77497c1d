//! Decision tree and random forest regressors
//!
//! Trees split on the threshold that maximises the reduction of the summed
//! squared error (variance reduction), trying the midpoints between
//! consecutive distinct feature values. Rows with `x <= threshold` go left.
//! The forest fits each tree on a bootstrap sample drawn from its own seeded
//! generator so that fits are reproducible with or without the `parallel`
//! feature.

use super::SupervisedModel;
use crate::core::cancel::CancellationToken;
use crate::core::error::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const MIN_NODE_VARIANCE: f64 = 1e-10;

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

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Checks a training matrix and returns its width
fn validate_training_data(x: &[Vec<f64>], y: &[f64]) -> Result<usize> {
    let Some(first) = x.first() else {
        return Err(Error::EmptyData("Cannot fit a model on zero rows".into()));
    };
    if x.len() != y.len() {
        return Err(Error::DimensionMismatch(format!(
            "{} feature rows but {} targets",
            x.len(),
            y.len()
        )));
    }
    let width = first.len();
    if width == 0 {
        return Err(Error::InvalidInput("At least one feature is required".into()));
    }
    for row in x {
        if row.len() != width {
            return Err(Error::DimensionMismatch(format!(
                "expected {} features per row, found {}",
                width,
                row.len()
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput("Features contain non-finite values".into()));
        }
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidInput("Targets contain non-finite values".into()));
    }
    Ok(width)
}

fn check_prediction_width(x: &[Vec<f64>], width: usize) -> Result<()> {
    match x.iter().find(|row| row.len() != width) {
        Some(row) => Err(Error::DimensionMismatch(format!(
            "expected {} features per row, found {}",
            width,
            row.len()
        ))),
        None => Ok(()),
    }
}

/// Draw `n_samples` row indices uniformly with replacement
pub fn bootstrap_sample(n_samples: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_samples)
        .map(|_| rng.random_range(0..n_samples))
        .collect()
}

/// CART regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    nodes: Vec<Node>,
    n_features: usize,
    /// Summed squared-error reduction per feature
    impurity_decrease: Vec<f64>,
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTreeRegressor {
    /// Create an unlimited-depth tree that splits nodes with at least two rows
    pub fn new() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            nodes: Vec::new(),
            n_features: 0,
            impurity_decrease: Vec::new(),
        }
    }

    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split.max(2);
        self
    }

    pub fn min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf.max(1);
        self
    }

    pub fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Number of leaves in the fitted tree
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Depth of the fitted tree; a single leaf has depth 0
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Fit on the given row positions; positions may repeat
    pub fn fit_samples(&mut self, x: &[Vec<f64>], y: &[f64], samples: &[usize]) -> Result<()> {
        let width = validate_training_data(x, y)?;
        if samples.is_empty() {
            return Err(Error::EmptyData("Cannot fit a tree on zero samples".into()));
        }
        if let Some(&bad) = samples.iter().find(|&&i| i >= x.len()) {
            return Err(Error::InvalidInput(format!(
                "sample index {} out of bounds for {} rows",
                bad,
                x.len()
            )));
        }

        self.n_features = width;
        self.nodes.clear();
        self.impurity_decrease = vec![0.0; width];
        self.build(x, y, samples.to_vec(), 0);
        Ok(())
    }

    fn build(&mut self, x: &[Vec<f64>], y: &[f64], samples: Vec<usize>, depth: usize) -> usize {
        let n = samples.len() as f64;
        let mean = samples.iter().map(|&i| y[i]).sum::<f64>() / n;
        let sse: f64 = samples.iter().map(|&i| (y[i] - mean).powi(2)).sum();

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        let depth_reached = self.max_depth.is_some_and(|max| depth >= max);
        if depth_reached
            || samples.len() < self.min_samples_split
            || samples.len() < 2 * self.min_samples_leaf
            || sse / n < MIN_NODE_VARIANCE
        {
            return id;
        }

        let Some(split) = self.best_split(x, y, &samples, mean, sse) else {
            return id;
        };

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| x[i][split.feature] <= split.threshold);

        self.impurity_decrease[split.feature] += split.gain;
        let left = self.build(x, y, left_samples, depth + 1);
        let right = self.build(x, y, right_samples, depth + 1);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    fn best_split(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        samples: &[usize],
        mean: f64,
        parent_sse: f64,
    ) -> Option<SplitCandidate> {
        let n = samples.len();
        let min_leaf = self.min_samples_leaf;
        let mut best: Option<SplitCandidate> = None;
        let mut best_gain = parent_sse * 1e-12;

        let mut order = samples.to_vec();
        for feature in 0..self.n_features {
            order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

            // Centred targets keep the running sums well conditioned
            let total_sum: f64 = order.iter().map(|&i| y[i] - mean).sum();
            let total_sq: f64 = order.iter().map(|&i| (y[i] - mean).powi(2)).sum();
            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for k in 0..n - 1 {
                let centred = y[order[k]] - mean;
                left_sum += centred;
                left_sq += centred * centred;

                let current = x[order[k]][feature];
                let next = x[order[k + 1]][feature];
                let left_n = k + 1;
                let right_n = n - left_n;
                if next <= current || left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let left_sse = left_sq - left_sum * left_sum / left_n as f64;
                let right_sse = (total_sq - left_sq) - right_sum * right_sum / right_n as f64;
                let gain = parent_sse - left_sse - right_sse;

                if gain > best_gain {
                    let mut threshold = current + (next - current) / 2.0;
                    if threshold >= next {
                        threshold = current;
                    }
                    best_gain = gain;
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }
        best
    }

    /// Predict a single row
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if self.nodes.is_empty() {
            return Err(Error::Analysis("Decision tree has not been fitted".into()));
        }
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return Ok(*value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Impurity decreases normalised to sum to one; all zeros for a single leaf
    fn normalized_importances(&self) -> Vec<f64> {
        let total: f64 = self.impurity_decrease.iter().sum();
        if total > 0.0 {
            self.impurity_decrease.iter().map(|v| v / total).collect()
        } else {
            vec![0.0; self.impurity_decrease.len()]
        }
    }
}

impl SupervisedModel for DecisionTreeRegressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64], cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        let samples: Vec<usize> = (0..x.len()).collect();
        self.fit_samples(x, y, &samples)
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(Error::Analysis("Decision tree has not been fitted".into()));
        }
        check_prediction_width(x, self.n_features)?;
        x.iter().map(|row| self.predict_row(row)).collect()
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.is_fitted().then(|| self.normalized_importances())
    }
}

/// Bagged ensemble of regression trees
///
/// # Example
/// ```
/// use predictrs::ml::models::{RandomForestRegressor, SupervisedModel};
/// use predictrs::CancellationToken;
///
/// let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
/// let y: Vec<f64> = (0..20).map(|i| 2.0 * i as f64).collect();
///
/// let mut forest = RandomForestRegressor::new(10).random_seed(42);
/// forest.fit(&x, &y, &CancellationToken::new()).unwrap();
/// assert_eq!(forest.predict(&[vec![5.0]]).unwrap().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    n_estimators: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    random_seed: Option<u64>,
    trees: Vec<DecisionTreeRegressor>,
    n_features: usize,
    feature_importances: Option<Vec<f64>>,
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            random_seed: None,
            trees: Vec::new(),
            n_features: 0,
            feature_importances: None,
        }
    }

    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    pub fn min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn trees(&self) -> &[DecisionTreeRegressor] {
        &self.trees
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn tree_template(&self) -> DecisionTreeRegressor {
        DecisionTreeRegressor::new()
            .max_depth(self.max_depth)
            .min_samples_split(self.min_samples_split)
            .min_samples_leaf(self.min_samples_leaf)
    }

    fn grow_tree(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        tree_idx: usize,
        base_seed: u64,
        cancel: &CancellationToken,
    ) -> Result<DecisionTreeRegressor> {
        cancel.check()?;
        let samples = bootstrap_sample(x.len(), base_seed.wrapping_add(tree_idx as u64));
        let mut tree = self.tree_template();
        tree.fit_samples(x, y, &samples)?;
        Ok(tree)
    }

    #[cfg(not(feature = "parallel"))]
    fn grow_trees(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        base_seed: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<DecisionTreeRegressor>> {
        (0..self.n_estimators)
            .map(|i| self.grow_tree(x, y, i, base_seed, cancel))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn grow_trees(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        base_seed: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<DecisionTreeRegressor>> {
        (0..self.n_estimators)
            .into_par_iter()
            .map(|i| self.grow_tree(x, y, i, base_seed, cancel))
            .collect()
    }

    fn aggregate_importances(trees: &[DecisionTreeRegressor], width: usize) -> Vec<f64> {
        let mut summed = vec![0.0; width];
        for tree in trees {
            for (acc, v) in summed.iter_mut().zip(tree.normalized_importances()) {
                *acc += v;
            }
        }
        let total: f64 = summed.iter().sum();
        if total > 0.0 {
            summed.iter().map(|v| v / total).collect()
        } else {
            log::warn!(
                features = width;
                "no tree found a useful split, reporting uniform feature importances"
            );
            vec![1.0 / width as f64; width]
        }
    }
}

impl SupervisedModel for RandomForestRegressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64], cancel: &CancellationToken) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(Error::InvalidInput(
                "n_estimators must be greater than 0".into(),
            ));
        }
        let width = validate_training_data(x, y)?;
        let base_seed = self.random_seed.unwrap_or_else(|| rand::rng().random());

        let trees = self.grow_trees(x, y, base_seed, cancel)?;
        log::debug!(trees = trees.len(), rows = x.len(), features = width; "random forest fitted");

        self.feature_importances = Some(Self::aggregate_importances(&trees, width));
        self.n_features = width;
        self.trees = trees;
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(Error::Analysis("Random forest has not been fitted".into()));
        }
        check_prediction_width(x, self.n_features)?;

        let n_trees = self.trees.len() as f64;
        x.iter()
            .map(|row| {
                let mut total = 0.0;
                for tree in &self.trees {
                    total += tree.predict_row(row)?;
                }
                Ok(total / n_trees)
            })
            .collect()
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.feature_importances.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // y depends only on the first feature
        let x: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![i as f64, ((i * 7) % 11) as f64])
            .collect();
        let y = x
            .iter()
            .map(|r| if r[0] < 20.0 { 1.0 } else { 5.0 })
            .collect();
        (x, y)
    }

    #[test]
    fn test_bootstrap_is_seeded() {
        let a = bootstrap_sample(50, 3);
        assert_eq!(a, bootstrap_sample(50, 3));
        assert_eq!(a.len(), 50);
        assert!(a.iter().all(|&i| i < 50));
    }

    #[test]
    fn test_tree_fits_step_function() {
        let (x, y) = step_data();
        let mut tree = DecisionTreeRegressor::new();
        tree.fit(&x, &y, &CancellationToken::new()).unwrap();

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict(&[vec![3.0, 0.0], vec![30.0, 0.0]]).unwrap(), vec![1.0, 5.0]);
        assert_eq!(tree.feature_importances().unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_tree_threshold_is_midpoint() {
        let x = vec![vec![1.0], vec![2.0], vec![4.0], vec![8.0]];
        let y = vec![0.0, 0.0, 10.0, 10.0];
        let mut tree = DecisionTreeRegressor::new();
        tree.fit(&x, &y, &CancellationToken::new()).unwrap();
        assert_eq!(tree.predict_row(&[3.0]).unwrap(), 0.0);
        assert_eq!(tree.predict_row(&[3.01]).unwrap(), 10.0);
    }

    #[test]
    fn test_tree_respects_max_depth() {
        let x: Vec<Vec<f64>> = (0..16).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..16).map(|i| (i * i) as f64).collect();
        let mut tree = DecisionTreeRegressor::new().max_depth(Some(2));
        tree.fit(&x, &y, &CancellationToken::new()).unwrap();
        assert!(tree.depth() <= 2);
        assert!(tree.n_leaves() <= 4);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64]).collect();
        let mut tree = DecisionTreeRegressor::new();
        tree.fit(&x, &[3.0; 5], &CancellationToken::new()).unwrap();
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.feature_importances().unwrap(), vec![0.0]);
    }

    #[test]
    fn test_forest_is_reproducible() {
        let (x, y) = step_data();
        let mut a = RandomForestRegressor::new(15).random_seed(42);
        let mut b = RandomForestRegressor::new(15).random_seed(42);
        a.fit(&x, &y, &CancellationToken::new()).unwrap();
        b.fit(&x, &y, &CancellationToken::new()).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn test_forest_importances_sum_to_one() {
        let (x, y) = step_data();
        let mut forest = RandomForestRegressor::new(20).random_seed(1);
        forest.fit(&x, &y, &CancellationToken::new()).unwrap();

        let importances = forest.feature_importances().unwrap();
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances[0] > importances[1]);

        let predictions = forest.predict(&[vec![2.0, 3.0], vec![35.0, 3.0]]).unwrap();
        assert!(predictions[0] < 3.0);
        assert!(predictions[1] > 3.0);
    }

    #[test]
    fn test_forest_uniform_importances_for_constant_target() {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64, 1.0]).collect();
        let mut forest = RandomForestRegressor::new(5).random_seed(0);
        forest.fit(&x, &[2.0; 6], &CancellationToken::new()).unwrap();
        assert_eq!(forest.feature_importances().unwrap(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_forest_cancelled() {
        let (x, y) = step_data();
        let token = CancellationToken::new();
        token.cancel();
        let mut forest = RandomForestRegressor::new(5).random_seed(0);
        assert!(matches!(forest.fit(&x, &y, &token), Err(Error::Cancelled(_))));
        assert!(!forest.is_fitted());
        assert!(forest.predict(&x).is_err());
    }

    #[test]
    fn test_forest_input_validation() {
        let mut forest = RandomForestRegressor::new(5);
        let token = CancellationToken::new();
        assert!(matches!(forest.fit(&[], &[], &token), Err(Error::EmptyData(_))));
        assert!(matches!(
            forest.fit(&[vec![1.0], vec![2.0]], &[1.0], &token),
            Err(Error::DimensionMismatch(_))
        ));

        forest.fit(&[vec![1.0], vec![2.0]], &[1.0, 2.0], &token).unwrap();
        assert!(matches!(
            forest.predict(&[vec![1.0, 2.0]]),
            Err(Error::DimensionMismatch(_))
        ));
        assert!(matches!(
            RandomForestRegressor::new(0).fit(&[vec![1.0]], &[1.0], &token),
            Err(Error::InvalidInput(_))
        ));
    }
}
