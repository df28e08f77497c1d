//! Anomaly detection tests

use predictrs::{AnalyticsConfig, Column, DataFrame, Error, ErrorKind, PredictiveAnalytics};

fn frame(values: Vec<Option<f64>>) -> DataFrame {
    let ids: Vec<i64> = (0..values.len() as i64).collect();
    DataFrame::from_columns(vec![("id", Column::from(ids)), ("amount", Column::from(values))])
        .unwrap()
}

fn flags(df: &DataFrame) -> Vec<bool> {
    df.column("is_anomaly")
        .unwrap()
        .as_boolean()
        .unwrap()
        .to_options()
        .into_iter()
        .map(|v| v.unwrap_or(false))
        .collect()
}

#[test]
fn test_constant_column_zscore() {
    let engine = PredictiveAnalytics::new();
    let df = frame(vec![Some(42.0); 10]);
    let annotated = engine.detect_anomalies(&df, "amount", "zscore", 3.0).unwrap();

    assert!(flags(&annotated).iter().all(|flag| !flag));
    let scores = annotated.numeric_values("anomaly_score").unwrap();
    assert!(scores.iter().all(|s| *s == Some(0.0)));
}

#[test]
fn test_zscore_flags_spike() {
    let engine = PredictiveAnalytics::new();
    let mut values: Vec<Option<f64>> = (0..20).map(|i| Some(10.0 + (i % 3) as f64)).collect();
    values[7] = Some(100.0);
    let annotated = engine
        .detect_anomalies(&frame(values), "amount", "zscore", 3.0)
        .unwrap();

    let flags = flags(&annotated);
    assert_eq!(flags.iter().filter(|f| **f).count(), 1);
    assert!(flags[7]);
    let scores = annotated.numeric_values("anomaly_score").unwrap();
    assert!(scores[7].unwrap() > 3.0);
}

#[test]
fn test_iqr_method() {
    let engine = PredictiveAnalytics::new();
    let values = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(40.0)];
    let annotated = engine
        .detect_anomalies(&frame(values), "amount", "iqr", 1.5)
        .unwrap();
    assert_eq!(flags(&annotated), vec![false, false, false, false, false, true]);

    let scores = annotated.numeric_values("anomaly_score").unwrap();
    assert_eq!(scores[0], Some(0.0));
    assert!(scores[5].unwrap() > 0.0);
}

#[test]
fn test_input_is_untouched_and_columns_appended() {
    let engine = PredictiveAnalytics::new();
    let df = frame(vec![Some(1.0), None, Some(3.0), Some(2.0)]);
    let annotated = engine.detect_anomalies(&df, "amount", "std", 2.0).unwrap();

    assert_eq!(df.column_names(), &["id", "amount"]);
    assert_eq!(annotated.column_names(), &["id", "amount", "is_anomaly", "anomaly_score"]);
    assert_eq!(annotated.nrows(), 4);
    assert_eq!(annotated.numeric_values("anomaly_score").unwrap()[1], None);
}

#[test]
fn test_idempotent() {
    let engine = PredictiveAnalytics::new();
    let values: Vec<Option<f64>> = [3.0, 4.0, 5.0, 4.0, 30.0, 4.5, 3.5]
        .iter()
        .copied()
        .map(Some)
        .collect();
    let df = frame(values);

    let first = engine.detect_anomalies(&df, "amount", "iqr", 1.5).unwrap();
    let second = engine.detect_anomalies(&df, "amount", "iqr", 1.5).unwrap();
    assert_eq!(first, second);

    // Running on annotated output replaces the columns instead of duplicating them
    let again = engine.detect_anomalies(&first, "amount", "iqr", 1.5).unwrap();
    assert_eq!(again, first);
}

#[test]
fn test_unsupported_method() {
    let engine = PredictiveAnalytics::new();
    let df = frame(vec![Some(1.0), Some(2.0)]);
    let err = engine
        .detect_anomalies(&df, "amount", "isolation_forest", 3.0)
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedMethod(_)));
    assert_eq!(err.kind(), ErrorKind::UnsupportedMethod);
    assert_eq!(df.ncols(), 2);
}

#[test]
fn test_non_numeric_and_empty_columns() {
    let engine = PredictiveAnalytics::new();
    let df = DataFrame::from_columns(vec![
        ("name", Column::from(vec!["a", "b"])),
        ("amount", Column::from(vec![None::<f64>, None])),
    ])
    .unwrap();

    let err = engine.detect_anomalies(&df, "name", "zscore", 3.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = engine.detect_anomalies(&df, "amount", "zscore", 3.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientData);
}

#[test]
fn test_defaults_from_config() {
    let mut config = AnalyticsConfig::default();
    config.anomaly.default_method = "iqr".to_string();
    config.anomaly.default_threshold = 0.5;
    let engine = PredictiveAnalytics::with_config(config).unwrap();

    let values = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(9.0)];
    let annotated = engine.detect_anomalies_with_defaults(&frame(values), "amount").unwrap();
    // Q1 = 2, Q3 = 4, upper fence at 5
    assert_eq!(flags(&annotated), vec![false, false, false, false, true]);
}

#[test]
fn test_infinite_values_are_left_unscored() {
    let engine = PredictiveAnalytics::new();
    let df = frame(vec![Some(1.0), Some(2.0), Some(f64::INFINITY)]);
    let annotated = engine.detect_anomalies(&df, "amount", "zscore", 3.0).unwrap();

    let scores = annotated.numeric_values("anomaly_score").unwrap();
    assert_eq!(scores[2], None);
    assert!(scores[..2].iter().all(|s| s.is_some_and(f64::is_finite)));
    assert_eq!(flags(&annotated), vec![false, false, false]);
}
