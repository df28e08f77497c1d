//! Configuration loading utilities
//!
//! This module handles loading configuration from various sources with proper
//! precedence and validation.

use super::*;
use crate::core::error::{Error, Result};
use std::env;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Read and parse one environment variable; unset variables yield `None`
fn env_value<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::ConfigurationError(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(None),
    }
}

/// Apply `PREDICTRS_*` environment variables on top of `config`
pub fn apply_env_overrides(config: &mut AnalyticsConfig) -> Result<()> {
    // Forecasting
    if let Some(order) = env_value::<ArimaOrder>("PREDICTRS_ARIMA_ORDER")? {
        config.forecast.arima_order = order;
    }
    if let Some(fraction) = env_value("PREDICTRS_HOLDOUT_FRACTION")? {
        config.forecast.holdout_fraction = fraction;
    }
    if let Some(horizon) = env_value("PREDICTRS_FORECAST_HORIZON")? {
        config.forecast.default_horizon = horizon;
    }
    if let Ok(frequency) = env::var("PREDICTRS_FORECAST_FREQUENCY") {
        config.forecast.default_frequency = frequency;
    }

    // Trend
    if let Some(window) = env_value("PREDICTRS_ROLLING_WINDOW")? {
        config.trend.rolling_window = window;
    }

    // Anomaly detection
    if let Ok(method) = env::var("PREDICTRS_ANOMALY_METHOD") {
        config.anomaly.default_method = method;
    }
    if let Some(threshold) = env_value("PREDICTRS_ANOMALY_THRESHOLD")? {
        config.anomaly.default_threshold = threshold;
    }

    // Supervised predictor
    if let Some(n_estimators) = env_value("PREDICTRS_N_ESTIMATORS")? {
        config.predictor.n_estimators = n_estimators;
    }
    if let Some(fraction) = env_value("PREDICTRS_TEST_FRACTION")? {
        config.predictor.test_fraction = fraction;
    }
    if let Some(depth) = env_value("PREDICTRS_MAX_DEPTH")? {
        config.predictor.max_depth = Some(depth);
    }
    if let Some(flag) = env_value("PREDICTRS_IMPUTE_WITH_TRAINING_MEANS")? {
        config.predictor.impute_with_training_means = flag;
    }

    // One seed drives both the predictor and the segmenter
    if let Some(seed) = env_value::<u64>("PREDICTRS_RANDOM_SEED")? {
        config.predictor.random_seed = seed;
        config.segmentation.random_seed = seed;
    }

    // Segmentation
    if let Some(clusters) = env_value("PREDICTRS_CLUSTERS")? {
        config.segmentation.default_clusters = clusters;
    }

    // Market basket
    if let Some(support) = env_value("PREDICTRS_MIN_SUPPORT")? {
        config.basket.min_support = support;
    }
    if let Some(lift) = env_value("PREDICTRS_MIN_LIFT")? {
        config.basket.min_lift = lift;
    }

    // Logging configuration
    if let Ok(log_level) = env::var("PREDICTRS_LOG_LEVEL") {
        config.logging.level = log_level;
    }

    Ok(())
}

/// Load configuration from environment variables
pub fn load_from_env() -> Result<AnalyticsConfig> {
    let mut config = AnalyticsConfig::default();
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Load configuration from a file (YAML or TOML based on extension)
pub fn load_from_file(path: &Path) -> Result<AnalyticsConfig> {
    if !path.exists() {
        return Err(Error::ConfigurationError(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        Error::ConfigurationError(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => load_from_yaml(&contents),
        Some("toml") => load_from_toml(&contents),
        Some(ext) => Err(Error::ConfigurationError(format!(
            "Unsupported config file format: {}",
            ext
        ))),
        None => {
            // Try to parse as YAML first, then TOML
            load_from_yaml(&contents).or_else(|_| load_from_toml(&contents))
        }
    }
}

/// Load configuration from YAML string
pub fn load_from_yaml(yaml: &str) -> Result<AnalyticsConfig> {
    serde_yaml::from_str(yaml)
        .map_err(|e| Error::ConfigurationError(format!("Failed to parse YAML config: {}", e)))
}

/// Load configuration from TOML string
pub fn load_from_toml(toml: &str) -> Result<AnalyticsConfig> {
    toml::from_str(toml)
        .map_err(|e| Error::ConfigurationError(format!("Failed to parse TOML config: {}", e)))
}

/// Load configuration with precedence: defaults -> file -> environment
pub fn load_with_precedence<P: AsRef<Path>>(config_file: Option<P>) -> Result<AnalyticsConfig> {
    // Start with defaults
    let mut config = AnalyticsConfig::default();

    // Load from file if provided
    if let Some(file_path) = config_file {
        let file_config = load_from_file(file_path.as_ref())?;
        config.merge(&file_config);
    }

    // Environment has the highest precedence
    apply_env_overrides(&mut config)?;

    // Validate final configuration
    config.validate()?;

    Ok(config)
}

/// Save configuration to a file
pub fn save_to_file(config: &AnalyticsConfig, path: &Path) -> Result<()> {
    let contents = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => config.to_yaml()?,
        Some("toml") => config.to_toml()?,
        Some(ext) => {
            return Err(Error::ConfigurationError(format!(
                "Unsupported config file format: {}",
                ext
            )))
        }
        None => config.to_yaml()?, // Default to YAML
    };

    // Create parent directory if it doesn't exist
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigurationError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    fs::write(path, contents).map_err(|e| {
        Error::ConfigurationError(format!(
            "Failed to write config file {}: {}",
            path.display(),
            e
        ))
    })
}
