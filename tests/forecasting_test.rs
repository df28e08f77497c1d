//! Forecasting tests through the analytics engine

use chrono::{TimeZone, Utc};
use predictrs::{
    AnalyticsConfig, ArimaOrder, Column, DataFrame, Error, ErrorKind, Frequency, PointKind,
    PredictiveAnalytics,
};

fn monthly(values: Vec<Option<f64>>) -> DataFrame {
    let dates: Vec<String> = (0..values.len())
        .map(|i| format!("{}-{:02}-01", 2023 + i / 12, i % 12 + 1))
        .collect();
    DataFrame::from_columns(vec![
        ("date", Column::from(dates)),
        ("sales", Column::from(values)),
    ])
    .unwrap()
}

fn observed(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}

#[test]
fn test_six_month_scenario() {
    let engine = PredictiveAnalytics::new();
    let df = monthly(observed(&[100.0, 110.0, 105.0, 120.0, 130.0, 125.0]));

    let result = engine
        .forecast(&df, "date", "sales", 3, Frequency::Monthly, "arima")
        .unwrap();

    assert_eq!(result.points.len(), 9);
    assert_eq!(result.historical().count(), 6);
    assert_eq!(result.forecasts().count(), 3);
    assert!(result.points[..6].iter().all(|p| p.kind == PointKind::Historical));
    assert!(result.points[6..].iter().all(|p| p.kind == PointKind::Forecast));
    assert_eq!(result.points[5].value, Some(125.0));

    let metrics = result.metrics.to_map();
    for key in ["mae", "rmse", "mape"] {
        let value = metrics[key];
        assert!(value >= 0.0 && value.is_finite(), "{} = {}", key, value);
    }
}

#[test]
fn test_forecast_timestamps_follow_history() {
    let engine = PredictiveAnalytics::new();
    let values: Vec<f64> = (0..24).map(|i| 50.0 + 2.0 * i as f64).collect();
    let df = monthly(observed(&values));

    let result = engine
        .forecast(&df, "date", "sales", 4, Frequency::Monthly, "arima")
        .unwrap();
    let dates: Vec<_> = result.forecasts().map(|p| p.timestamp).collect();
    assert_eq!(
        dates,
        vec![
            Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).unwrap(),
        ]
    );

    // A steady linear trend is continued
    let last_forecast = result.forecasts().last().unwrap().value.unwrap();
    assert!((last_forecast - (50.0 + 2.0 * 27.0)).abs() < 1.0);
}

#[test]
fn test_leading_gap_is_kept_and_internal_gap_filled() {
    let engine = PredictiveAnalytics::new();
    let mut values = observed(&[0.0, 0.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0, 22.0, 24.0]);
    values[0] = None;
    values[1] = None;
    values[5] = None;
    let df = monthly(values);

    let result = engine
        .forecast(&df, "date", "sales", 2, Frequency::Monthly, "arima")
        .unwrap();
    let historical: Vec<_> = result.historical().map(|p| p.value).collect();
    assert_eq!(historical[0], None);
    assert_eq!(historical[1], None);
    assert_eq!(historical[5], Some(16.0));
}

#[test]
fn test_unsupported_model() {
    let engine = PredictiveAnalytics::new();
    let df = monthly(observed(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
    let err = engine
        .forecast(&df, "date", "sales", 3, Frequency::Monthly, "prophet")
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedModel(ref name) if name == "prophet"));
    assert_eq!(err.kind(), ErrorKind::UnsupportedModel);
}

#[test]
fn test_too_short_for_backtest() {
    let engine = PredictiveAnalytics::new();
    let df = monthly(observed(&[10.0, 11.0]));
    let err = engine
        .forecast(&df, "date", "sales", 1, Frequency::Monthly, "arima")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientData);
}

#[test]
fn test_all_zero_holdout_has_no_mape() {
    let engine = PredictiveAnalytics::new();
    let mut values = vec![5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
    values.extend([0.0, 0.0]);
    let df = monthly(observed(&values));

    let result = engine
        .forecast(&df, "date", "sales", 1, Frequency::Monthly, "arima")
        .unwrap();
    assert!(result.metrics.mape.is_none());
    assert!(!result.metrics.to_map().contains_key("mape"));
}

#[test]
fn test_configured_order_and_frame_output() {
    let mut config = AnalyticsConfig::default();
    config.forecast.arima_order = ArimaOrder::new(1, 1, 0);
    let engine = PredictiveAnalytics::with_config(config).unwrap();

    let values: Vec<f64> = (0..12).map(|i| 20.0 + i as f64).collect();
    let df = monthly(observed(&values));
    let result = engine
        .forecast(&df, "date", "sales", 3, Frequency::Quarterly, "ARIMA")
        .unwrap();
    assert_eq!(result.order, ArimaOrder::new(1, 1, 0));

    let frame = result.to_frame().unwrap();
    assert_eq!(frame.column_names(), &["date", "value", "kind"]);
    assert_eq!(frame.nrows(), 15);
    let kinds = frame.string_values("kind").unwrap();
    assert_eq!(kinds[12].as_deref(), Some("forecast"));
}

#[test]
fn test_defaults_come_from_config() {
    let mut config = AnalyticsConfig::default();
    config.forecast.default_horizon = 2;
    config.forecast.default_frequency = "Q".to_string();
    let engine = PredictiveAnalytics::with_config(config).unwrap();

    let values: Vec<f64> = (0..10).map(|i| 100.0 + 5.0 * i as f64).collect();
    let df = monthly(observed(&values));
    let result = engine.forecast_with_defaults(&df, "date", "sales").unwrap();
    let dates: Vec<_> = result.forecasts().map(|p| p.timestamp).collect();
    // last observation is 2023-10-01, quarter ends follow
    assert_eq!(
        dates,
        vec![
            Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap(),
        ]
    );
}

#[test]
fn test_missing_columns() {
    let engine = PredictiveAnalytics::new();
    let df = monthly(observed(&[1.0, 2.0, 3.0, 4.0, 5.0]));
    assert!(matches!(
        engine.forecast(&df, "when", "sales", 1, Frequency::Monthly, "arima"),
        Err(Error::ColumnNotFound(_))
    ));
}
