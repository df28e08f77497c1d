//! Model serving
//!
//! A trained supervised model bundles the fitted estimator with the imputer
//! and scaler that produced its inputs. The bundle is immutable once built
//! and is shared through the [`ModelRegistry`].

pub mod registry;

use crate::core::error::{Error, Result};
use crate::ml::models::{RandomForestRegressor, SupervisedModel};
use crate::ml::preprocessing::{MeanImputer, StandardScaler};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use registry::ModelRegistry;

/// Model metadata for serving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Caller-supplied model identifier
    pub model_id: String,
    /// Model type (e.g., "random_forest")
    pub model_type: String,
    /// Feature names expected by the model, in order
    pub feature_names: Vec<String>,
    /// Target column name
    pub target_name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Held-out evaluation metrics
    pub metrics: BTreeMap<String, f64>,
}

/// Where missing feature values are filled from at prediction time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Imputation {
    /// Means learned from the training rows
    TrainingMeans,
    /// Means of the batch being predicted
    BatchMeans,
}

/// Fitted estimator together with its preprocessing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    metadata: ModelMetadata,
    estimator: RandomForestRegressor,
    imputer: MeanImputer,
    scaler: StandardScaler,
}

impl TrainedModel {
    /// Bundle fitted parts; every part must already be fitted
    pub fn new(
        metadata: ModelMetadata,
        estimator: RandomForestRegressor,
        imputer: MeanImputer,
        scaler: StandardScaler,
    ) -> Result<Self> {
        if !estimator.is_fitted() || imputer.means().is_none() || scaler.means().is_none() {
            return Err(Error::Analysis(format!(
                "model '{}' cannot be stored without a fitted estimator, imputer and scaler",
                metadata.model_id
            )));
        }
        if estimator.n_features() != metadata.feature_names.len() {
            return Err(Error::DimensionMismatch(format!(
                "estimator has {} features, metadata lists {}",
                estimator.n_features(),
                metadata.feature_names.len()
            )));
        }
        Ok(Self {
            metadata,
            estimator,
            imputer,
            scaler,
        })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn feature_names(&self) -> &[String] {
        &self.metadata.feature_names
    }

    pub fn estimator(&self) -> &RandomForestRegressor {
        &self.estimator
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Serialize the whole bundle to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore a bundle written by [`TrainedModel::to_json`]; the parts are
    /// checked again as in [`TrainedModel::new`]
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: TrainedModel = serde_json::from_str(json)?;
        Self::new(raw.metadata, raw.estimator, raw.imputer, raw.scaler)
    }

    /// Predict raw feature rows given in `feature_names` order
    pub fn predict(
        &self,
        feature_names: &[String],
        rows: &[Vec<Option<f64>>],
        imputation: Imputation,
    ) -> Result<Vec<f64>> {
        if feature_names != self.metadata.feature_names.as_slice() {
            return Err(Error::FeatureMismatch {
                expected: self.metadata.feature_names.clone(),
                found: feature_names.to_vec(),
            });
        }
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let filled = match imputation {
            Imputation::TrainingMeans => self.imputer.transform(rows)?,
            Imputation::BatchMeans => MeanImputer::new().fit_transform(feature_names, rows)?,
        };
        let scaled = self.scaler.transform(&filled)?;
        self.estimator.predict(&scaled)
    }
}
