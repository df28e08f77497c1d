//! Configuration system tests
//!
//! Loading from files and the environment, validation and precedence

use predictrs::config::loader::*;
use predictrs::config::validation::*;
use predictrs::config::*;
use predictrs::{ArimaOrder, ErrorKind, Frequency};
use std::env;
use std::sync::Mutex;
use tempfile::tempdir;

// Environment variables are process wide
static ENV_LOCK: Mutex<()> = Mutex::new(());

const ENV_VARS: &[&str] = &[
    "PREDICTRS_ARIMA_ORDER",
    "PREDICTRS_N_ESTIMATORS",
    "PREDICTRS_RANDOM_SEED",
    "PREDICTRS_MIN_SUPPORT",
    "PREDICTRS_LOG_LEVEL",
    "PREDICTRS_MAX_DEPTH",
];

fn clear_env() {
    for name in ENV_VARS {
        env::remove_var(name);
    }
}

#[test]
fn test_default_config() {
    let config = AnalyticsConfig::default();

    assert_eq!(config.forecast.arima_order, ArimaOrder::new(5, 1, 0));
    assert_eq!(config.forecast.default_horizon, 12);
    assert_eq!(config.trend.rolling_window, 6);
    assert_eq!(config.anomaly.default_method, "zscore");
    assert_eq!(config.predictor.n_estimators, 100);
    assert_eq!(config.predictor.random_seed, 42);
    assert_eq!(config.segmentation.default_clusters, 3);
    assert_eq!(config.basket.min_support, 0.01);
    assert_eq!(config.logging.level, "info");

    assert!(validate_config(&config).is_ok());
    assert_eq!(config.forecast_frequency().unwrap(), Frequency::Monthly);
}

#[test]
fn test_config_serialization() {
    let config = AnalyticsConfig::default();

    let yaml = config.to_yaml().unwrap();
    assert!(yaml.contains("forecast:"));
    assert!(yaml.contains("predictor:"));
    assert!(yaml.contains("basket:"));

    let toml = config.to_toml().unwrap();
    assert!(toml.contains("[forecast"));
    assert!(toml.contains("[segmentation]"));
    assert!(toml.contains("[logging]"));
}

#[test]
fn test_config_validation() {
    let mut config = AnalyticsConfig::default();
    assert!(validate_config(&config).is_ok());

    config.predictor.n_estimators = 0;
    assert!(validate_config(&config).is_err());
    config.predictor.n_estimators = 10;

    config.forecast.holdout_fraction = 1.0;
    assert!(validate_config(&config).is_err());
    config.forecast.holdout_fraction = 0.25;

    config.basket.min_support = 1.5;
    assert!(validate_config(&config).is_err());
    config.basket.min_support = 1.0;

    config.anomaly.default_method = "isolation_forest".to_string();
    assert!(validate_config(&config).is_err());
    config.anomaly.default_method = "iqr".to_string();

    config.forecast.default_frequency = "fortnightly".to_string();
    let err = validate_config(&config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    config.forecast.default_frequency = "W".to_string();

    config.logging.level = "verbose".to_string();
    assert!(validate_config(&config).is_err());
    config.logging.level = "debug".to_string();

    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_environment_config_loading() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    env::set_var("PREDICTRS_ARIMA_ORDER", "(2, 1, 1)");
    env::set_var("PREDICTRS_N_ESTIMATORS", "25");
    env::set_var("PREDICTRS_RANDOM_SEED", "7");
    env::set_var("PREDICTRS_MAX_DEPTH", "4");
    env::set_var("PREDICTRS_LOG_LEVEL", "debug");

    let config = load_from_env();
    clear_env();
    let config = config.unwrap();

    assert_eq!(config.forecast.arima_order, ArimaOrder::new(2, 1, 1));
    assert_eq!(config.predictor.n_estimators, 25);
    assert_eq!(config.predictor.max_depth, Some(4));
    // One seed drives both seeded components
    assert_eq!(config.predictor.random_seed, 7);
    assert_eq!(config.segmentation.random_seed, 7);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_invalid_environment_value() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    env::set_var("PREDICTRS_N_ESTIMATORS", "many");
    let result = load_from_env();
    clear_env();

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("PREDICTRS_N_ESTIMATORS"));
}

#[test]
fn test_yaml_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("analytics.yaml");

    let mut config = AnalyticsConfig::default();
    config.forecast.arima_order = ArimaOrder::new(1, 1, 0);
    config.segmentation.default_clusters = 5;
    config.basket.max_len = Some(3);
    config.save_to_file(&path).unwrap();

    let loaded = AnalyticsConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_toml_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("analytics.toml");

    let mut config = AnalyticsConfig::default();
    config.predictor.test_fraction = 0.3;
    config.predictor.impute_with_training_means = false;
    config.anomaly.default_method = "iqr".to_string();
    save_to_file(&config, &path).unwrap();

    let loaded = load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_documents_keep_defaults() {
    let yaml = "predictor:\n  n_estimators: 20\n";
    let config = load_from_yaml(yaml).unwrap();
    assert_eq!(config.predictor.n_estimators, 20);
    assert_eq!(config.predictor.test_fraction, 0.2);
    assert_eq!(config.basket, BasketConfig::default());

    let toml = "[basket]\nmin_support = 0.05\n";
    let config = load_from_toml(toml).unwrap();
    assert_eq!(config.basket.min_support, 0.05);
    assert_eq!(config.basket.top_n, 10);
}

#[test]
fn test_missing_and_unsupported_files() {
    let dir = tempdir().unwrap();

    let err = load_from_file(&dir.path().join("absent.yaml")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let path = dir.path().join("analytics.ini");
    std::fs::write(&path, "[predictor]").unwrap();
    assert!(load_from_file(&path).is_err());
    assert!(save_to_file(&AnalyticsConfig::default(), &path).is_err());
}

#[test]
fn test_environment_overrides_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let dir = tempdir().unwrap();
    let path = dir.path().join("analytics.yaml");
    std::fs::write(
        &path,
        "predictor:\n  n_estimators: 50\nbasket:\n  min_support: 0.1\n",
    )
    .unwrap();

    env::set_var("PREDICTRS_N_ESTIMATORS", "75");
    let result = load_with_precedence(Some(&path));
    clear_env();
    let config = result.unwrap();

    // environment wins over the file, the file wins over defaults
    assert_eq!(config.predictor.n_estimators, 75);
    assert_eq!(config.basket.min_support, 0.1);
    assert_eq!(config.segmentation.default_clusters, 3);
}

#[test]
fn test_precedence_validates_result() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    env::set_var("PREDICTRS_MIN_SUPPORT", "0");
    let result = AnalyticsConfig::load_with_precedence(None::<&str>);
    clear_env();

    assert_eq!(result.unwrap_err().kind(), ErrorKind::Configuration);
}

#[test]
fn test_merge_takes_non_default_fields() {
    let mut base = AnalyticsConfig::default();
    base.trend.rolling_window = 4;

    let mut other = AnalyticsConfig::default();
    other.basket.top_n = 3;

    base.merge(&other);
    assert_eq!(base.trend.rolling_window, 4);
    assert_eq!(base.basket.top_n, 3);
}
