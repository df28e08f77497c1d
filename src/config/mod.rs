//! Configuration management for predictrs
//!
//! This module provides centralized configuration management with support for:
//! - Environment variables (`PREDICTRS_*`)
//! - YAML/TOML configuration files
//! - Configuration validation
//!
//! Every section carries `#[serde(default)]`, so a file only needs the keys it
//! changes.

use crate::core::error::{Error, Result};
use crate::ml::anomaly::AnomalyMethod;
use crate::time_series::{ArimaOrder, Frequency};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod loader;
pub mod validation;

/// Main configuration structure for the analytics engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Time series forecasting
    pub forecast: ForecastConfig,
    /// Trend and seasonality analysis
    pub trend: TrendConfig,
    /// Anomaly detection defaults
    pub anomaly: AnomalyConfig,
    /// Supervised predictor training
    pub predictor: PredictorConfig,
    /// Customer segmentation
    pub segmentation: SegmentationConfig,
    /// Market basket analysis
    pub basket: BasketConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Forecasting configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// ARIMA (p, d, q) order
    pub arima_order: ArimaOrder,
    /// Share of history held out for backtesting
    pub holdout_fraction: f64,
    /// Horizon used when the caller does not pass one
    pub default_horizon: usize,
    /// Frequency code (`D`, `W`, `M`, `Q`, `Y`, ...)
    pub default_frequency: String,
}

/// Trend analysis configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Rolling mean window (capped at the series length)
    pub rolling_window: usize,
    /// Number of trailing points classified for the direction
    pub direction_window: usize,
}

/// Anomaly detection configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// `zscore` or `iqr`
    pub default_method: String,
    pub default_threshold: f64,
}

/// Supervised predictor configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Number of trees in the forest
    pub n_estimators: usize,
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    /// Seed for the split and the bootstrap samples
    pub random_seed: u64,
    /// Maximum tree depth (unlimited when absent)
    pub max_depth: Option<usize>,
    /// Fill missing prediction inputs with training means instead of batch means
    pub impute_with_training_means: bool,
}

/// Segmentation configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub default_clusters: usize,
    pub random_seed: u64,
    pub max_iter: usize,
    pub tol: f64,
}

/// Market basket configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasketConfig {
    pub min_support: f64,
    /// Rules below this lift are discarded
    pub min_lift: f64,
    /// Number of rules in the summary
    pub top_n: usize,
    /// Largest itemset size to mine (unlimited when absent)
    pub max_len: Option<usize>,
}

/// Logging configuration section
///
/// The crate only emits events through the `log` facade and never installs a
/// logger. The level is meant for the host's logger setup, see
/// [`LoggingConfig::level_filter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl LoggingConfig {
    /// The configured level as a `log` filter, e.g. for
    /// `env_logger::Builder::filter_level`
    pub fn level_filter(&self) -> Result<log::LevelFilter> {
        self.level.parse().map_err(|_| {
            Error::ConfigurationError(format!("Invalid log level '{}'", self.level))
        })
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            arima_order: ArimaOrder::default(),
            holdout_fraction: 0.2,
            default_horizon: 12,
            default_frequency: "M".to_string(),
        }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            rolling_window: 6,
            direction_window: 3,
        }
    }
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            default_method: "zscore".to_string(),
            default_threshold: 3.0,
        }
    }
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            test_fraction: 0.2,
            random_seed: 42,
            max_depth: None,
            impute_with_training_means: true,
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            default_clusters: 3,
            random_seed: 42,
            max_iter: 300,
            tol: 1e-4,
        }
    }
}

impl Default for BasketConfig {
    fn default() -> Self {
        Self {
            min_support: 0.01,
            min_lift: 1.0,
            top_n: 10,
            max_len: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Copies every listed field of `$other` that differs from `$defaults`
macro_rules! merge_fields {
    ($target:expr, $other:expr, $defaults:expr; $($($field:ident).+),+ $(,)?) => {
        $(
            if $other.$($field).+ != $defaults.$($field).+ {
                $target.$($field).+ = $other.$($field).+.clone();
            }
        )+
    };
}

impl AnalyticsConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        loader::load_from_env()
    }

    /// Load configuration from a file (YAML or TOML)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        loader::load_from_file(path.as_ref())
    }

    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        loader::load_from_yaml(yaml)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml: &str) -> Result<Self> {
        loader::load_from_toml(toml)
    }

    /// Load configuration with precedence: defaults -> file -> env
    pub fn load_with_precedence<P: AsRef<Path>>(config_file: Option<P>) -> Result<Self> {
        loader::load_with_precedence(config_file)
    }

    /// Validate configuration and return errors if invalid
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        loader::save_to_file(self, path.as_ref())
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            Error::ConfigurationError(format!("Failed to serialize config to YAML: {}", e))
        })
    }

    /// Convert to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| {
            Error::ConfigurationError(format!("Failed to serialize config to TOML: {}", e))
        })
    }

    /// Merge another configuration into this one; only settings of `other`
    /// that differ from the defaults are taken over
    pub fn merge(&mut self, other: &Self) {
        let defaults = Self::default();
        merge_fields!(self, other, defaults;
            forecast.arima_order,
            forecast.holdout_fraction,
            forecast.default_horizon,
            forecast.default_frequency,
            trend.rolling_window,
            trend.direction_window,
            anomaly.default_method,
            anomaly.default_threshold,
            predictor.n_estimators,
            predictor.test_fraction,
            predictor.random_seed,
            predictor.max_depth,
            predictor.impute_with_training_means,
            segmentation.default_clusters,
            segmentation.random_seed,
            segmentation.max_iter,
            segmentation.tol,
            basket.min_support,
            basket.min_lift,
            basket.top_n,
            basket.max_len,
            logging.level,
        );
    }

    /// Parsed default forecast frequency
    pub fn forecast_frequency(&self) -> Result<Frequency> {
        self.forecast.default_frequency.parse().map_err(|e| {
            Error::ConfigurationError(format!("Invalid forecast.default_frequency: {}", e))
        })
    }

    /// Parsed default anomaly method
    pub fn anomaly_method(&self) -> Result<AnomalyMethod> {
        self.anomaly.default_method.parse().map_err(|e| {
            Error::ConfigurationError(format!("Invalid anomaly.default_method: {}", e))
        })
    }
}
