//! Forecasting Module
//!
//! ARIMA(p, d, q) forecasting. The series is differenced `d` times, the
//! ARMA part is estimated by conditional least squares (Hannan-Rissanen when
//! `q > 0`: a long autoregression supplies residual estimates that then serve
//! as the moving-average regressors) and forecasts are integrated back to the
//! original level.
//!
//! Short series cannot identify the full lag structure. The fitter lowers the
//! orders until there are at least as many equations as coefficients and
//! reports the orders it actually used.

use crate::core::cancel::CancellationToken;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::column::Column;
use crate::ml::metrics::regression::{
    mean_absolute_error, mean_absolute_percentage_error, root_mean_squared_error,
};
use crate::stats::least_squares;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// ARIMA order `(p, d, q)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    /// Autoregressive order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// Moving-average order
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self::new(5, 1, 0)
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

/// Parses `p,d,q`, optionally wrapped in parentheses
impl FromStr for ArimaOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let inner = s.trim().trim_start_matches('(').trim_end_matches(')');
        let parts = inner
            .split(',')
            .map(|part| part.trim().parse::<usize>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::InvalidInput(format!("invalid ARIMA order '{}': {}", s, e)))?;
        match parts.as_slice() {
            [p, d, q] => Ok(ArimaOrder::new(*p, *d, *q)),
            _ => Err(Error::InvalidInput(format!(
                "ARIMA order '{}' must have three components",
                s
            ))),
        }
    }
}

/// Supported forecasting model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastModel {
    Arima,
}

impl ForecastModel {
    pub fn name(&self) -> &'static str {
        match self {
            ForecastModel::Arima => "arima",
        }
    }

    /// Create an unfitted forecaster of this family
    pub fn build(&self, order: ArimaOrder) -> Box<dyn Forecaster + Send> {
        match self {
            ForecastModel::Arima => Box::new(ArimaForecaster::new(order)),
        }
    }
}

impl FromStr for ForecastModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "arima" => Ok(ForecastModel::Arima),
            other => Err(Error::UnsupportedModel(other.to_string())),
        }
    }
}

impl fmt::Display for ForecastModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Generic forecaster trait
pub trait Forecaster {
    /// Fit the model to a gap-free sequence of observations
    fn fit(&mut self, values: &[f64], cancel: &CancellationToken) -> Result<()>;

    /// Forecast the next `periods` values after the fitted sequence
    fn forecast(&self, periods: usize) -> Result<Vec<f64>>;

    /// Get model name
    fn name(&self) -> &str;
}

#[derive(Debug, Clone)]
struct ArimaFit {
    intercept: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    /// The differenced series the ARMA part was fitted on
    differenced: Vec<f64>,
    /// In-sample innovations aligned with `differenced`
    residuals: Vec<f64>,
    /// Last value of the series differenced 0..d times
    last_levels: Vec<f64>,
}

/// ARIMA forecaster estimated by conditional least squares
#[derive(Debug, Clone)]
pub struct ArimaForecaster {
    order: ArimaOrder,
    fitted_order: Option<ArimaOrder>,
    fit: Option<ArimaFit>,
}

impl ArimaForecaster {
    pub fn new(order: ArimaOrder) -> Self {
        Self {
            order,
            fitted_order: None,
            fit: None,
        }
    }

    /// Requested order
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// Order actually estimated by the last fit
    pub fn fitted_order(&self) -> Option<ArimaOrder> {
        self.fitted_order
    }

    /// Autoregressive coefficients of the last fit
    pub fn ar_coefficients(&self) -> Option<&[f64]> {
        self.fit.as_ref().map(|f| f.ar.as_slice())
    }
}

impl Forecaster for ArimaForecaster {
    fn fit(&mut self, values: &[f64], cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        self.fit = None;
        self.fitted_order = None;

        let d = self.order.d;
        if values.len() <= d {
            return Err(Error::InsufficientData(format!(
                "ARIMA with d={} needs more than {} observations, got {}",
                d,
                d,
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput("Series contains non-finite values".into()));
        }

        let mut last_levels = Vec::with_capacity(d);
        let mut differenced = values.to_vec();
        for _ in 0..d {
            last_levels.push(differenced[differenced.len() - 1]);
            differenced = difference(&differenced);
        }

        let m = differenced.len();
        let (p, q) = identifiable_orders(self.order.p, self.order.q, m);
        if p != self.order.p || q != self.order.q {
            log::warn!(
                requested:% = self.order,
                p = p,
                q = q,
                observations = values.len();
                "series too short for the requested ARIMA order, using reduced lags"
            );
        }

        // Stage 1: long autoregression for innovation estimates (MA part only)
        let mut innovations = vec![0.0; m];
        let long_order = if q > 0 { (p + q).min((m - 1) / 2) } else { 0 };
        if q > 0 {
            let (c, phi) = fit_autoregression(&differenced, long_order)?;
            for t in long_order..m {
                innovations[t] = differenced[t] - predict_step(&differenced, &[], t, c, &phi, &[]);
            }
            cancel.check()?;
        }

        // Stage 2: regress on own lags and lagged innovations
        let start = p.max(if q > 0 { long_order + q } else { 0 });
        let mut rows = Vec::with_capacity(m - start);
        let mut targets = Vec::with_capacity(m - start);
        for t in start..m {
            let mut row = Vec::with_capacity(1 + p + q);
            row.push(1.0);
            row.extend((1..=p).map(|lag| differenced[t - lag]));
            row.extend((1..=q).map(|lag| innovations[t - lag]));
            rows.push(row);
            targets.push(differenced[t]);
        }
        let beta = least_squares(&rows, &targets)?;
        let intercept = beta[0];
        let ar = beta[1..=p].to_vec();
        let ma = beta[p + 1..].to_vec();

        let mut residuals = innovations;
        for t in start..m {
            residuals[t] =
                differenced[t] - predict_step(&differenced, &residuals, t, intercept, &ar, &ma);
        }

        self.fitted_order = Some(ArimaOrder::new(p, d, q));
        self.fit = Some(ArimaFit {
            intercept,
            ar,
            ma,
            differenced,
            residuals,
            last_levels,
        });
        Ok(())
    }

    fn forecast(&self, periods: usize) -> Result<Vec<f64>> {
        let fit = self
            .fit
            .as_ref()
            .ok_or_else(|| Error::Analysis("ARIMA model has not been fitted".into()))?;

        let mut history = fit.differenced.clone();
        let mut innovations = fit.residuals.clone();
        let mut steps = Vec::with_capacity(periods);
        for _ in 0..periods {
            let t = history.len();
            let next = predict_step(&history, &innovations, t, fit.intercept, &fit.ar, &fit.ma);
            history.push(next);
            innovations.push(0.0);
            steps.push(next);
        }

        // Undo differencing, innermost level first
        for &last in fit.last_levels.iter().rev() {
            let mut level = last;
            for value in steps.iter_mut() {
                level += *value;
                *value = level;
            }
        }

        if steps.iter().any(|v| !v.is_finite()) {
            return Err(Error::Analysis("ARIMA forecast diverged".into()));
        }
        Ok(steps)
    }

    fn name(&self) -> &str {
        "arima"
    }
}

fn difference(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Largest (p, q), lowered q first, that leaves at least as many equations
/// as coefficients for `m` differenced observations
fn identifiable_orders(mut p: usize, mut q: usize, m: usize) -> (usize, usize) {
    loop {
        let long_order = if q > 0 { (p + q).min(m.saturating_sub(1) / 2) } else { 0 };
        let start = p.max(if q > 0 { long_order + q } else { 0 });
        let equations = m.saturating_sub(start);
        if equations >= 1 + p + q {
            return (p, q);
        }
        if q > 0 {
            q -= 1;
        } else if p > 0 {
            p -= 1;
        } else {
            return (0, 0);
        }
    }
}

fn fit_autoregression(values: &[f64], order: usize) -> Result<(f64, Vec<f64>)> {
    let rows: Vec<Vec<f64>> = (order..values.len())
        .map(|t| {
            let mut row = vec![1.0];
            row.extend((1..=order).map(|lag| values[t - lag]));
            row
        })
        .collect();
    let targets = values[order..].to_vec();
    let beta = least_squares(&rows, &targets)?;
    Ok((beta[0], beta[1..].to_vec()))
}

/// One-step prediction of position `t` from the values before it
fn predict_step(
    values: &[f64],
    innovations: &[f64],
    t: usize,
    intercept: f64,
    ar: &[f64],
    ma: &[f64],
) -> f64 {
    let ar_part: f64 = ar
        .iter()
        .enumerate()
        .map(|(i, phi)| phi * values[t - i - 1])
        .sum();
    let ma_part: f64 = ma
        .iter()
        .enumerate()
        .map(|(j, theta)| theta * innovations[t - j - 1])
        .sum();
    intercept + ar_part + ma_part
}

/// Backtest accuracy of a forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub mae: f64,
    pub rmse: f64,
    /// Percent; `None` when every held-out actual is zero
    pub mape: Option<f64>,
}

impl AccuracyMetrics {
    /// Metrics keyed by `mae`, `rmse` and (when defined) `mape`
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        map.insert("mae".to_string(), self.mae);
        map.insert("rmse".to_string(), self.rmse);
        if let Some(mape) = self.mape {
            map.insert("mape".to_string(), mape);
        }
        map
    }
}

/// Chronological holdout evaluation.
///
/// The first `floor(n * (1 - holdout_fraction))` values train a fresh model of
/// the same family and order, the remaining tail is forecast and scored.
pub fn evaluate_holdout(
    values: &[f64],
    model: ForecastModel,
    order: ArimaOrder,
    holdout_fraction: f64,
    cancel: &CancellationToken,
) -> Result<AccuracyMetrics> {
    if !(holdout_fraction > 0.0 && holdout_fraction < 1.0) {
        return Err(Error::InvalidInput(format!(
            "holdout fraction must be in (0, 1), got {}",
            holdout_fraction
        )));
    }
    let n = values.len();
    let train_size = (n as f64 * (1.0 - holdout_fraction) + 1e-9).floor() as usize;
    if train_size == 0 || train_size >= n {
        return Err(Error::InsufficientData(format!(
            "{} observations leave no usable train/holdout split",
            n
        )));
    }

    let (train, test) = values.split_at(train_size);
    let mut forecaster = model.build(order);
    forecaster.fit(train, cancel)?;
    let predicted = forecaster.forecast(test.len())?;

    let mape = mean_absolute_percentage_error(test, &predicted)?;
    if mape.is_none() {
        log::warn!(holdout = test.len(); "every held-out actual is zero, MAPE is undefined");
    } else if test.iter().any(|&v| v == 0.0) {
        log::warn!(holdout = test.len(); "held-out actuals equal to zero were skipped in MAPE");
    }

    Ok(AccuracyMetrics {
        mae: mean_absolute_error(test, &predicted)?,
        rmse: root_mean_squared_error(test, &predicted)?,
        mape,
    })
}

/// Whether a point is an observation or a projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Historical,
    Forecast,
}

impl PointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointKind::Historical => "historical",
            PointKind::Forecast => "forecast",
        }
    }
}

/// One row of a forecast result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    /// `None` only for historical points before the first observation
    pub value: Option<f64>,
    pub kind: PointKind,
}

/// Historical observations followed by forecast points, plus backtest metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub points: Vec<ForecastPoint>,
    pub metrics: AccuracyMetrics,
    pub model: ForecastModel,
    /// Order actually estimated on the full history
    pub order: ArimaOrder,
}

impl ForecastResult {
    pub fn historical(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| p.kind == PointKind::Historical)
    }

    pub fn forecasts(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| p.kind == PointKind::Forecast)
    }

    /// Tabular form with `date`, `value` and `kind` columns
    pub fn to_frame(&self) -> Result<DataFrame> {
        DataFrame::from_columns(vec![
            (
                "date",
                Column::from(self.points.iter().map(|p| p.timestamp).collect::<Vec<_>>()),
            ),
            (
                "value",
                Column::from(self.points.iter().map(|p| p.value).collect::<Vec<_>>()),
            ),
            (
                "kind",
                Column::from(
                    self.points
                        .iter()
                        .map(|p| p.kind.as_str())
                        .collect::<Vec<_>>(),
                ),
            ),
        ])
    }
}
