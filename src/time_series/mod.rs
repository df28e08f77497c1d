//! Time series analysis
//!
//! Series construction from tabular data, ARIMA forecasting, classical
//! decomposition and trend analysis.

pub mod core;
pub mod decomposition;
pub mod forecasting;
pub mod trend;

pub use self::core::{coerce_datetimes, parse_datetime, DateTimeIndex, Frequency, TimeSeries};
pub use decomposition::{DecompositionResult, SeasonalDecomposition};
pub use forecasting::{
    evaluate_holdout, AccuracyMetrics, ArimaForecaster, ArimaOrder, ForecastModel, ForecastPoint,
    ForecastResult, Forecaster, PointKind,
};
pub use trend::{analyze_trend, SeasonalComponents, TrendAnalysis, TrendDirection};
