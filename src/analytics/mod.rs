//! Predictive analytics engine
//!
//! [`PredictiveAnalytics`] is the public face of the crate. It exposes six
//! independent operations over a [`DataFrame`]:
//!
//! * [`forecast`](PredictiveAnalytics::forecast): ARIMA projection with a
//!   chronological holdout backtest
//! * [`analyze_trend`](PredictiveAnalytics::analyze_trend): growth, direction
//!   and seasonal decomposition
//! * [`detect_anomalies`](PredictiveAnalytics::detect_anomalies): z-score or IQR
//!   flags appended to the rows
//! * [`train_model`](PredictiveAnalytics::train_model) and
//!   [`predict`](PredictiveAnalytics::predict): random forest regression backed
//!   by a [`ModelRegistry`]
//! * [`segment_customers`](PredictiveAnalytics::segment_customers): K-means
//!   segmentation with labeled profiles
//! * [`mine_associations`](PredictiveAnalytics::mine_associations): market
//!   basket rules
//!
//! Every operation returns a complete result or an error, never both, and logs
//! exactly one outcome event. Each has a `*_with_cancel` variant taking a
//! [`CancellationToken`].

pub mod market_basket;
pub mod predictor;
pub mod segmentation;

use crate::column::Column;
use crate::config::AnalyticsConfig;
use crate::core::cancel::CancellationToken;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::ml::anomaly::{self, AnomalyMethod};
use crate::ml::serving::ModelRegistry;
use crate::time_series::{
    self, evaluate_holdout, ArimaForecaster, DateTimeIndex, ForecastModel, ForecastPoint,
    ForecastResult, Forecaster, Frequency, PointKind, TimeSeries, TrendAnalysis,
};
use chrono::Duration;
use std::sync::Arc;

pub use market_basket::{BasketAnalysis, BasketSummary};
pub use predictor::TrainingReport;
pub use segmentation::{
    FeatureStats, OrdinalLabeler, RfmLabeler, SegmentLabeler, SegmentProfile, SegmentationResult,
};

/// Engine facade holding configuration, the model registry and the segment
/// labeling strategy
#[derive(Debug, Clone)]
pub struct PredictiveAnalytics {
    config: AnalyticsConfig,
    registry: Arc<ModelRegistry>,
    labeler: Option<Arc<dyn SegmentLabeler>>,
}

impl Default for PredictiveAnalytics {
    fn default() -> Self {
        Self::new()
    }
}

fn log_failure(operation: &'static str, error: &Error) {
    log::error!(
        operation = operation,
        outcome = "failure",
        error_kind = error.kind().as_str(),
        error:% = error;
        "analytics operation failed"
    );
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl PredictiveAnalytics {
    /// Engine with default configuration and a private registry
    pub fn new() -> Self {
        Self {
            config: AnalyticsConfig::default(),
            registry: Arc::new(ModelRegistry::new()),
            labeler: None,
        }
    }

    /// Engine from a configuration, which is validated first
    pub fn with_config(config: AnalyticsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Share a registry with other engines
    pub fn with_registry(mut self, registry: Arc<ModelRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the segment naming strategy.
    ///
    /// Without one, RFM features get [`RfmLabeler`] names and anything else
    /// gets [`OrdinalLabeler`] names.
    pub fn with_labeler<L: SegmentLabeler + 'static>(mut self, labeler: L) -> Self {
        self.labeler = Some(Arc::new(labeler));
        self
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Forecast `horizon` periods of `value_column` after the last date.
    ///
    /// `model` names the model family; only `"arima"` is supported. Forecast
    /// dates start the day after the last observation and are anchored to
    /// `frequency` (month end for monthly, and so on).
    pub fn forecast(
        &self,
        df: &DataFrame,
        date_column: &str,
        value_column: &str,
        horizon: usize,
        frequency: Frequency,
        model: &str,
    ) -> Result<ForecastResult> {
        self.forecast_with_cancel(
            df,
            date_column,
            value_column,
            horizon,
            frequency,
            model,
            &CancellationToken::new(),
        )
    }

    /// Forecast with the configured horizon and frequency
    pub fn forecast_with_defaults(
        &self,
        df: &DataFrame,
        date_column: &str,
        value_column: &str,
    ) -> Result<ForecastResult> {
        let frequency = self.config.forecast_frequency()?;
        self.forecast(
            df,
            date_column,
            value_column,
            self.config.forecast.default_horizon,
            frequency,
            ForecastModel::Arima.name(),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn forecast_with_cancel(
        &self,
        df: &DataFrame,
        date_column: &str,
        value_column: &str,
        horizon: usize,
        frequency: Frequency,
        model: &str,
        cancel: &CancellationToken,
    ) -> Result<ForecastResult> {
        let outcome =
            self.run_forecast(df, date_column, value_column, horizon, frequency, model, cancel);
        match &outcome {
            Ok(result) => log::info!(
                operation = "forecast",
                outcome = "success",
                model:% = result.model,
                order:% = result.order,
                horizon = horizon,
                mae = result.metrics.mae,
                rmse = result.metrics.rmse,
                mape:? = result.metrics.mape;
                "forecast completed"
            ),
            Err(e) => log_failure("forecast", e),
        }
        outcome
    }

    #[allow(clippy::too_many_arguments)]
    fn run_forecast(
        &self,
        df: &DataFrame,
        date_column: &str,
        value_column: &str,
        horizon: usize,
        frequency: Frequency,
        model: &str,
        cancel: &CancellationToken,
    ) -> Result<ForecastResult> {
        let model: ForecastModel = model.parse()?;
        if horizon == 0 {
            return Err(Error::InvalidInput("forecast horizon must be positive".into()));
        }

        let series = TimeSeries::from_frame(df, date_column, value_column)?;
        let filled = series.interpolate_linear();
        let values = filled.modeled_values()?;
        let order = self.config.forecast.arima_order;

        let (predicted, fitted_order) = match model {
            ForecastModel::Arima => {
                let mut forecaster = ArimaForecaster::new(order);
                forecaster.fit(&values, cancel)?;
                let predicted = forecaster.forecast(horizon)?;
                (predicted, forecaster.fitted_order().unwrap_or(order))
            }
        };
        if predicted.iter().any(|v| !v.is_finite()) {
            return Err(Error::Analysis("forecast diverged to a non-finite value".into()));
        }

        cancel.check()?;
        let metrics = evaluate_holdout(
            &values,
            model,
            order,
            self.config.forecast.holdout_fraction,
            cancel,
        )?;

        let last = filled
            .index
            .end()
            .ok_or_else(|| Error::InsufficientData("series has no dates".into()))?;
        let future = DateTimeIndex::date_range(*last + Duration::days(1), horizon, frequency)?;

        let historical = filled
            .index
            .values
            .iter()
            .zip(&filled.values)
            .map(|(timestamp, value)| ForecastPoint {
                timestamp: *timestamp,
                value: *value,
                kind: PointKind::Historical,
            });
        let projected = future
            .values
            .iter()
            .zip(predicted)
            .map(|(timestamp, value)| ForecastPoint {
                timestamp: *timestamp,
                value: Some(value),
                kind: PointKind::Forecast,
            });

        Ok(ForecastResult {
            points: historical.chain(projected).collect(),
            metrics,
            model,
            order: fitted_order,
        })
    }

    /// Growth, direction, rolling mean and (given two full cycles) seasonality
    pub fn analyze_trend(
        &self,
        df: &DataFrame,
        date_column: &str,
        value_column: &str,
        frequency: Frequency,
    ) -> Result<TrendAnalysis> {
        self.analyze_trend_with_cancel(
            df,
            date_column,
            value_column,
            frequency,
            &CancellationToken::new(),
        )
    }

    pub fn analyze_trend_with_cancel(
        &self,
        df: &DataFrame,
        date_column: &str,
        value_column: &str,
        frequency: Frequency,
        cancel: &CancellationToken,
    ) -> Result<TrendAnalysis> {
        let outcome = cancel.check().and_then(|_| {
            let series = TimeSeries::from_frame(df, date_column, value_column)?;
            let analysis = time_series::analyze_trend(&series, frequency, &self.config.trend)?;
            cancel.check()?;
            Ok(analysis)
        });
        match &outcome {
            Ok(analysis) => log::info!(
                operation = "analyze_trend",
                outcome = "success",
                observations = analysis.observations,
                total_growth_pct = analysis.total_growth_pct,
                direction = analysis.direction.as_str(),
                seasonality = analysis.seasonality.is_some();
                "trend analysis completed"
            ),
            Err(e) => log_failure("analyze_trend", e),
        }
        outcome
    }

    /// Copy of `df` with `is_anomaly` and `anomaly_score` columns.
    ///
    /// `method` is `zscore` (alias `std`) or `iqr`. Missing values are never
    /// flagged and have no score. The input frame is left untouched.
    pub fn detect_anomalies(
        &self,
        df: &DataFrame,
        column: &str,
        method: &str,
        threshold: f64,
    ) -> Result<DataFrame> {
        self.detect_anomalies_with_cancel(df, column, method, threshold, &CancellationToken::new())
    }

    /// Anomaly detection with the configured method and threshold
    pub fn detect_anomalies_with_defaults(
        &self,
        df: &DataFrame,
        column: &str,
    ) -> Result<DataFrame> {
        self.detect_anomalies(
            df,
            column,
            &self.config.anomaly.default_method,
            self.config.anomaly.default_threshold,
        )
    }

    pub fn detect_anomalies_with_cancel(
        &self,
        df: &DataFrame,
        column: &str,
        method: &str,
        threshold: f64,
        cancel: &CancellationToken,
    ) -> Result<DataFrame> {
        let outcome = cancel.check().and_then(|_| {
            let method: AnomalyMethod = method.parse()?;
            let values = df.numeric_values(column)?;
            let scores = anomaly::detect(&values, method, threshold)?;
            let anomalies = scores.anomaly_count();

            let mut annotated = df.clone();
            annotated.set_column("is_anomaly", Column::from(scores.is_anomaly))?;
            annotated.set_column("anomaly_score", Column::from(scores.scores))?;
            Ok((annotated, method, anomalies))
        });
        match outcome {
            Ok((annotated, method, anomalies)) => {
                log::info!(
                    operation = "detect_anomalies",
                    outcome = "success",
                    column = column,
                    method = method.name(),
                    threshold = threshold,
                    anomalies = anomalies;
                    "anomaly detection completed"
                );
                Ok(annotated)
            }
            Err(e) => {
                log_failure("detect_anomalies", &e);
                Err(e)
            }
        }
    }

    /// Train a random forest on `features` to predict `target` and register it
    /// under `model_id`, replacing any earlier model with that id
    pub fn train_model(
        &self,
        df: &DataFrame,
        target: &str,
        features: &[&str],
        model_id: &str,
    ) -> Result<TrainingReport> {
        self.train_model_with_cancel(df, target, features, model_id, &CancellationToken::new())
    }

    /// A cancelled run leaves the registry unchanged
    pub fn train_model_with_cancel(
        &self,
        df: &DataFrame,
        target: &str,
        features: &[&str],
        model_id: &str,
        cancel: &CancellationToken,
    ) -> Result<TrainingReport> {
        let outcome = cancel.check().and_then(|_| {
            let features = to_strings(features);
            let (model, report) = predictor::train(
                df,
                target,
                &features,
                model_id,
                &self.config.predictor,
                cancel,
            )?;
            cancel.check()?;
            self.registry.insert(model_id, model)?;
            Ok(report)
        });
        match &outcome {
            Ok(report) => log::info!(
                operation = "train_model",
                outcome = "success",
                model_id = model_id,
                n_train = report.n_train,
                n_test = report.n_test,
                mae = report.mae,
                rmse = report.rmse,
                r2 = report.r2;
                "model trained"
            ),
            Err(e) => log_failure("train_model", e),
        }
        outcome
    }

    /// Predict with a registered model, one value per row of `df`.
    ///
    /// `features` must name the training features in the training order.
    pub fn predict(&self, df: &DataFrame, model_id: &str, features: &[&str]) -> Result<Vec<f64>> {
        self.predict_with_cancel(df, model_id, features, &CancellationToken::new())
    }

    pub fn predict_with_cancel(
        &self,
        df: &DataFrame,
        model_id: &str,
        features: &[&str],
        cancel: &CancellationToken,
    ) -> Result<Vec<f64>> {
        let outcome = cancel.check().and_then(|_| {
            let features = to_strings(features);
            let model = self.registry.get(model_id)?;
            if features != model.feature_names() {
                return Err(Error::FeatureMismatch {
                    expected: model.feature_names().to_vec(),
                    found: features,
                });
            }
            let rows = df.numeric_matrix(&features)?;
            model.predict(&features, &rows, self.config.predictor.imputation())
        });
        match &outcome {
            Ok(predictions) => log::info!(
                operation = "predict",
                outcome = "success",
                model_id = model_id,
                rows = predictions.len();
                "prediction completed"
            ),
            Err(e) => log_failure("predict", e),
        }
        outcome
    }

    /// Cluster rows into `k` segments and profile them.
    ///
    /// The returned frame is `df` plus `segment` (cluster id) and
    /// `segment_name` columns.
    pub fn segment_customers(
        &self,
        df: &DataFrame,
        features: &[&str],
        k: usize,
    ) -> Result<SegmentationResult> {
        self.segment_customers_with_cancel(df, features, k, &CancellationToken::new())
    }

    /// Segmentation with the configured number of segments
    pub fn segment_customers_with_defaults(
        &self,
        df: &DataFrame,
        features: &[&str],
    ) -> Result<SegmentationResult> {
        self.segment_customers(df, features, self.config.segmentation.default_clusters)
    }

    pub fn segment_customers_with_cancel(
        &self,
        df: &DataFrame,
        features: &[&str],
        k: usize,
        cancel: &CancellationToken,
    ) -> Result<SegmentationResult> {
        let outcome = cancel.check().and_then(|_| {
            let features = to_strings(features);
            let raw = df.numeric_matrix(&features)?;

            let fallback;
            let labeler: &dyn SegmentLabeler = match &self.labeler {
                Some(labeler) => labeler.as_ref(),
                None => {
                    fallback = segmentation::default_labeler(&features);
                    fallback.as_ref()
                }
            };
            let clustering = segmentation::cluster_rows(
                &features,
                &raw,
                k,
                &self.config.segmentation,
                labeler,
                cancel,
            )?;

            let ids: Vec<i64> = clustering.labels.iter().map(|&l| l as i64).collect();
            let names: Vec<String> = clustering
                .labels
                .iter()
                .map(|&l| clustering.profiles[l].name.clone())
                .collect();
            let mut frame = df.clone();
            frame.set_column("segment", Column::from(ids))?;
            frame.set_column("segment_name", Column::from(names))?;

            Ok(SegmentationResult {
                frame,
                profiles: clustering.profiles,
                inertia: clustering.inertia,
                n_iter: clustering.n_iter,
            })
        });
        match &outcome {
            Ok(result) => log::info!(
                operation = "segment_customers",
                outcome = "success",
                segments = k,
                rows = result.frame.nrows(),
                inertia = result.inertia,
                iterations = result.n_iter;
                "segmentation completed"
            ),
            Err(e) => log_failure("segment_customers", e),
        }
        outcome
    }

    /// Association rules between items bought together.
    ///
    /// Rows are grouped into transactions by `transaction_column`; rules with
    /// lift below the configured minimum are dropped and the rest are sorted by
    /// descending lift.
    pub fn mine_associations(
        &self,
        df: &DataFrame,
        item_column: &str,
        transaction_column: &str,
        min_support: f64,
    ) -> Result<BasketAnalysis> {
        self.mine_associations_with_cancel(
            df,
            item_column,
            transaction_column,
            min_support,
            &CancellationToken::new(),
        )
    }

    /// Mining with the configured minimum support
    pub fn mine_associations_with_defaults(
        &self,
        df: &DataFrame,
        item_column: &str,
        transaction_column: &str,
    ) -> Result<BasketAnalysis> {
        self.mine_associations(
            df,
            item_column,
            transaction_column,
            self.config.basket.min_support,
        )
    }

    pub fn mine_associations_with_cancel(
        &self,
        df: &DataFrame,
        item_column: &str,
        transaction_column: &str,
        min_support: f64,
        cancel: &CancellationToken,
    ) -> Result<BasketAnalysis> {
        let outcome = cancel.check().and_then(|_| {
            market_basket::check_min_support(min_support)?;
            let baskets = market_basket::group_transactions(df, item_column, transaction_column)?;
            if baskets.is_empty() {
                return Err(Error::InsufficientData("no transactions to analyse".into()));
            }
            market_basket::mine(&baskets, min_support, &self.config.basket, cancel)
        });
        match &outcome {
            Ok(analysis) => log::info!(
                operation = "mine_associations",
                outcome = "success",
                transactions = analysis.n_transactions,
                items = analysis.n_items,
                rules = analysis.summary.total_rules,
                avg_lift = analysis.summary.avg_lift;
                "association mining completed"
            ),
            Err(e) => log_failure("mine_associations", e),
        }
        outcome
    }
}
