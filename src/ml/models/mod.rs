//! Machine learning models
//!
//! This module provides the interface shared by the supervised models and the
//! seeded train/test split used to evaluate them.

pub mod forest;

use crate::core::cancel::CancellationToken;
use crate::core::error::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

pub use forest::{DecisionTreeRegressor, RandomForestRegressor};

/// Trait for supervised machine learning models over numeric feature matrices
pub trait SupervisedModel {
    /// Fit model to training rows and targets
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64], cancel: &CancellationToken) -> Result<()>;

    /// Predict using the fitted model, one value per row
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Relative feature importances in fit order (if applicable)
    fn feature_importances(&self) -> Option<Vec<f64>>;
}

/// Split row positions into shuffled training and test sets
///
/// # Arguments
/// * `n_samples` - Number of rows
/// * `test_size` - Fraction of rows to use for testing (between 0 and 1); the
///   test set holds `ceil(test_size * n_samples)` rows
/// * `random_seed` - Optional random seed for reproducibility
///
/// # Returns
/// * Tuple of (train_indices, test_indices)
pub fn train_test_split(
    n_samples: usize,
    test_size: f64,
    random_seed: Option<u64>,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(Error::InvalidInput(
            "test_size must be between 0 and 1".into(),
        ));
    }

    let n_test = (n_samples as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(Error::InsufficientData(format!(
            "{} rows cannot be split into non-empty train and test sets",
            n_samples
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = match random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok((train, indices))
}
