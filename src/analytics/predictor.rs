//! Supervised predictor
//!
//! Training imputes and standardizes the features (both fitted on the training
//! split only), grows a random forest and scores it on the held-out rows. The
//! forest, imputer and scaler are bundled into one [`TrainedModel`], so a
//! registered model always carries its preprocessing.

use crate::config::PredictorConfig;
use crate::core::cancel::CancellationToken;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::ml::metrics::regression::{mean_absolute_error, r2_score, root_mean_squared_error};
use crate::ml::models::{train_test_split, RandomForestRegressor, SupervisedModel};
use crate::ml::preprocessing::{MeanImputer, StandardScaler};
use crate::ml::serving::{Imputation, ModelMetadata, TrainedModel};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Held-out evaluation of a freshly trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub model_id: String,
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
    /// Relative importance per feature, in feature order, summing to 1
    pub feature_importance: Vec<(String, f64)>,
    pub n_train: usize,
    pub n_test: usize,
}

impl TrainingReport {
    /// Metrics keyed by `mae`, `rmse` and `r2`
    pub fn metrics(&self) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        map.insert("mae".to_string(), self.mae);
        map.insert("rmse".to_string(), self.rmse);
        map.insert("r2".to_string(), self.r2);
        map
    }

    pub fn importance_of(&self, feature: &str) -> Option<f64> {
        self.feature_importance
            .iter()
            .find(|(name, _)| name == feature)
            .map(|(_, value)| *value)
    }
}

impl PredictorConfig {
    pub fn imputation(&self) -> Imputation {
        if self.impute_with_training_means {
            Imputation::TrainingMeans
        } else {
            Imputation::BatchMeans
        }
    }
}

pub(crate) fn check_features(features: &[String]) -> Result<()> {
    if features.is_empty() {
        return Err(Error::InvalidInput("at least one feature column is required".into()));
    }
    let mut seen = HashSet::new();
    if let Some(duplicate) = features.iter().find(|name| !seen.insert(name.as_str())) {
        return Err(Error::InvalidInput(format!(
            "feature '{}' is listed more than once",
            duplicate
        )));
    }
    Ok(())
}

/// Fit a model on `df` without registering it
pub(crate) fn train(
    df: &DataFrame,
    target: &str,
    features: &[String],
    model_id: &str,
    config: &PredictorConfig,
    cancel: &CancellationToken,
) -> Result<(TrainedModel, TrainingReport)> {
    check_features(features)?;
    if features.iter().any(|name| name == target) {
        return Err(Error::InvalidInput(format!(
            "target '{}' cannot also be a feature",
            target
        )));
    }

    let targets = df.numeric_values(target)?;
    let matrix = df.numeric_matrix(features)?;

    // Rows without a target cannot be learned from
    let (rows, y): (Vec<Vec<Option<f64>>>, Vec<f64>) = matrix
        .into_iter()
        .zip(targets)
        .filter_map(|(row, target)| target.map(|t| (row, t)))
        .unzip();
    let dropped = df.nrows() - y.len();
    if dropped > 0 {
        log::warn!(target = target, dropped = dropped; "rows without a target value were dropped");
    }
    if y.len() < 2 {
        return Err(Error::InsufficientData(format!(
            "{} labelled rows are not enough to train and evaluate a model",
            y.len()
        )));
    }

    let (train_idx, test_idx) =
        train_test_split(y.len(), config.test_fraction, Some(config.random_seed))?;
    let gather_rows = |idx: &[usize]| idx.iter().map(|&i| rows[i].clone()).collect::<Vec<_>>();
    let gather_y = |idx: &[usize]| idx.iter().map(|&i| y[i]).collect::<Vec<_>>();

    let mut imputer = MeanImputer::new();
    let train_filled = imputer.fit_transform(features, &gather_rows(&train_idx))?;
    let test_filled = imputer.transform(&gather_rows(&test_idx))?;

    let mut scaler = StandardScaler::new();
    let train_x = scaler.fit_transform(&train_filled)?;
    let test_x = scaler.transform(&test_filled)?;
    let train_y = gather_y(&train_idx);
    let test_y = gather_y(&test_idx);

    let mut forest = RandomForestRegressor::new(config.n_estimators)
        .max_depth(config.max_depth)
        .random_seed(config.random_seed);
    forest.fit(&train_x, &train_y, cancel)?;

    let predicted = forest.predict(&test_x)?;
    let mae = mean_absolute_error(&test_y, &predicted)?;
    let rmse = root_mean_squared_error(&test_y, &predicted)?;
    let r2 = r2_score(&test_y, &predicted)?;

    let importances = forest
        .feature_importances()
        .ok_or_else(|| Error::Analysis("forest has no feature importances".into()))?;
    let feature_importance: Vec<(String, f64)> =
        features.iter().cloned().zip(importances).collect();

    let report = TrainingReport {
        model_id: model_id.to_string(),
        mae,
        rmse,
        r2,
        feature_importance,
        n_train: train_idx.len(),
        n_test: test_idx.len(),
    };

    let metadata = ModelMetadata {
        model_id: model_id.to_string(),
        model_type: "random_forest".to_string(),
        feature_names: features.to_vec(),
        target_name: target.to_string(),
        created_at: Utc::now(),
        metrics: report.metrics(),
    };
    let model = TrainedModel::new(metadata, forest, imputer, scaler)?;
    Ok((model, report))
}
