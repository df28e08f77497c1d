//! Machine Learning Module
//!
//! This module provides the learning algorithms behind the analytics engine:
//! preprocessing, regression metrics, tree ensembles, clustering, anomaly
//! scoring, association rule mining and the registry of trained models.

pub mod anomaly;
pub mod association;
pub mod clustering;
pub mod metrics;
pub mod models;
pub mod preprocessing;
pub mod serving;

// Re-export preprocessing tools
pub use preprocessing::{MeanImputer, StandardScaler};

// Re-export metrics
pub use metrics::regression::{
    mean_absolute_error, mean_absolute_percentage_error, mean_squared_error, r2_score,
    root_mean_squared_error,
};

pub use anomaly::{AnomalyMethod, AnomalyScores};
pub use clustering::{KMeans, KMeansInit};
pub use models::{
    train_test_split, DecisionTreeRegressor, RandomForestRegressor, SupervisedModel,
};
pub use serving::{Imputation, ModelMetadata, ModelRegistry, TrainedModel};

#[cfg(feature = "association-rules")]
pub use association::Apriori;
pub use association::{association_rules, AssociationRule, FrequentItemset, OneHotTransactions};
