//! Configuration validation utilities
//!
//! This module provides validation for the analytics configuration, ensuring
//! that every setting is usable by the engine before it is built.

use super::*;
use crate::core::error::{Error, Result};

/// Validate the entire configuration
pub fn validate_config(config: &AnalyticsConfig) -> Result<()> {
    validate_forecast_config(&config.forecast)?;
    validate_trend_config(&config.trend)?;
    validate_anomaly_config(&config.anomaly)?;
    validate_predictor_config(&config.predictor)?;
    validate_segmentation_config(&config.segmentation)?;
    validate_basket_config(&config.basket)?;
    validate_logging_config(&config.logging)?;

    Ok(())
}

fn validate_open_fraction(value: f64, name: &str) -> Result<()> {
    if !(value > 0.0 && value < 1.0) {
        return Err(Error::ConfigurationError(format!(
            "{} must be between 0 and 1 (exclusive), got {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_non_negative(value: f64, name: &str) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::ConfigurationError(format!(
            "{} must be a finite non-negative number, got {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_positive(value: usize, name: &str) -> Result<()> {
    if value == 0 {
        return Err(Error::ConfigurationError(format!(
            "{} must be greater than 0",
            name
        )));
    }
    Ok(())
}

/// Validate forecasting configuration
pub fn validate_forecast_config(config: &ForecastConfig) -> Result<()> {
    validate_open_fraction(config.holdout_fraction, "forecast.holdout_fraction")?;
    validate_positive(config.default_horizon, "forecast.default_horizon")?;

    config
        .default_frequency
        .parse::<Frequency>()
        .map_err(|e| {
            Error::ConfigurationError(format!("Invalid forecast.default_frequency: {}", e))
        })?;

    if config.arima_order.d > 2 {
        log::warn!(order:% = config.arima_order; "differencing order above 2 is rarely useful");
    }

    Ok(())
}

/// Validate trend configuration
pub fn validate_trend_config(config: &TrendConfig) -> Result<()> {
    validate_positive(config.rolling_window, "trend.rolling_window")?;

    if config.direction_window < 2 {
        return Err(Error::ConfigurationError(
            "trend.direction_window must be at least 2".to_string(),
        ));
    }

    Ok(())
}

/// Validate anomaly configuration
pub fn validate_anomaly_config(config: &AnomalyConfig) -> Result<()> {
    config
        .default_method
        .parse::<AnomalyMethod>()
        .map_err(|e| Error::ConfigurationError(format!("Invalid anomaly.default_method: {}", e)))?;
    validate_non_negative(config.default_threshold, "anomaly.default_threshold")
}

/// Validate predictor configuration
pub fn validate_predictor_config(config: &PredictorConfig) -> Result<()> {
    validate_positive(config.n_estimators, "predictor.n_estimators")?;
    validate_open_fraction(config.test_fraction, "predictor.test_fraction")?;

    if config.max_depth == Some(0) {
        return Err(Error::ConfigurationError(
            "predictor.max_depth must be greater than 0 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validate segmentation configuration
pub fn validate_segmentation_config(config: &SegmentationConfig) -> Result<()> {
    validate_positive(config.default_clusters, "segmentation.default_clusters")?;
    validate_positive(config.max_iter, "segmentation.max_iter")?;
    validate_non_negative(config.tol, "segmentation.tol")
}

/// Validate market basket configuration
pub fn validate_basket_config(config: &BasketConfig) -> Result<()> {
    if !(config.min_support > 0.0 && config.min_support <= 1.0) {
        return Err(Error::ConfigurationError(format!(
            "basket.min_support must be in (0, 1], got {}",
            config.min_support
        )));
    }
    if !(config.min_lift.is_finite() && config.min_lift >= 1.0) {
        return Err(Error::ConfigurationError(format!(
            "basket.min_lift must be a finite number of at least 1.0, got {}",
            config.min_lift
        )));
    }
    validate_positive(config.top_n, "basket.top_n")?;

    if config.max_len == Some(0) {
        return Err(Error::ConfigurationError(
            "basket.max_len must be greater than 0 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validate logging configuration
pub fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];

    if !valid_levels.contains(&config.level.as_str()) {
        return Err(Error::ConfigurationError(format!(
            "Invalid log level '{}'. Valid levels: {}",
            config.level,
            valid_levels.join(", ")
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AnalyticsConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_bad_fractions() {
        let mut config = AnalyticsConfig::default();
        config.forecast.holdout_fraction = 1.0;
        assert!(validate_config(&config).is_err());

        let mut config = AnalyticsConfig::default();
        config.predictor.test_fraction = 0.0;
        assert!(validate_config(&config).is_err());

        let mut config = AnalyticsConfig::default();
        config.basket.min_support = 1.0;
        assert!(validate_config(&config).is_ok());
        config.basket.min_support = 0.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_counts() {
        let mut config = AnalyticsConfig::default();
        config.segmentation.default_clusters = 0;
        assert!(matches!(
            validate_config(&config),
            Err(Error::ConfigurationError(msg)) if msg.contains("default_clusters")
        ));

        let mut config = AnalyticsConfig::default();
        config.predictor.n_estimators = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_unknown_names() {
        let mut config = AnalyticsConfig::default();
        config.anomaly.default_method = "lof".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = AnalyticsConfig::default();
        config.forecast.default_frequency = "fortnightly".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = AnalyticsConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_lift_below_one() {
        let mut config = AnalyticsConfig::default();
        config.basket.min_lift = 0.5;
        assert!(matches!(
            validate_config(&config),
            Err(Error::ConfigurationError(msg)) if msg.contains("min_lift")
        ));
        config.basket.min_lift = f64::INFINITY;
        assert!(validate_config(&config).is_err());
        config.basket.min_lift = 1.5;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_negative_threshold() {
        let mut config = AnalyticsConfig::default();
        config.anomaly.default_threshold = -0.5;
        assert!(validate_config(&config).is_err());
        config.anomaly.default_threshold = f64::INFINITY;
        assert!(validate_config(&config).is_err());
    }
}
