//! # predictrs
//!
//! Predictive analytics over tabular data.
//!
//! A [`DataFrame`] of typed, nullable columns feeds the
//! [`PredictiveAnalytics`] engine, which offers time series forecasting,
//! trend and seasonality analysis, anomaly detection, supervised prediction
//! with a model registry, customer segmentation and market basket mining.
//!
//! ```no_run
//! use predictrs::{Column, DataFrame, Frequency, PredictiveAnalytics};
//!
//! # fn main() -> predictrs::Result<()> {
//! let df = DataFrame::from_columns(vec![
//!     (
//!         "date",
//!         Column::from(vec![
//!             "2024-01-01", "2024-02-01", "2024-03-01", "2024-04-01", "2024-05-01", "2024-06-01",
//!         ]),
//!     ),
//!     ("sales", Column::from(vec![100.0, 110.0, 105.0, 120.0, 130.0, 125.0])),
//! ])?;
//!
//! let engine = PredictiveAnalytics::new();
//! let forecast = engine.forecast(&df, "date", "sales", 3, Frequency::Monthly, "arima")?;
//! println!("{:?}", forecast.metrics.to_map());
//! # Ok(())
//! # }
//! ```

#![allow(clippy::needless_range_loop)]

// Core module with fundamental types: errors and cancellation
pub mod core;

// Tabular data
pub mod column;
pub mod dataframe;

pub mod analytics;
pub mod config;
pub mod ml;
pub mod stats;
pub mod time_series;

// Re-export core types
pub use core::cancel::CancellationToken;
pub use core::error::{Error, ErrorKind, Result};

pub use column::{BitMask, Column, ColumnType};
pub use dataframe::DataFrame;

pub use analytics::{
    BasketAnalysis, BasketSummary, FeatureStats, OrdinalLabeler, PredictiveAnalytics,
    RfmLabeler, SegmentLabeler, SegmentProfile, SegmentationResult, TrainingReport,
};
pub use config::AnalyticsConfig;
pub use ml::{AnomalyMethod, AssociationRule, Imputation, ModelRegistry, TrainedModel};
pub use time_series::{
    AccuracyMetrics, ArimaOrder, ForecastModel, ForecastPoint, ForecastResult, Frequency,
    PointKind, TimeSeries, TrendAnalysis, TrendDirection,
};
