//! Trend and seasonality analysis
//!
//! Growth figures, a rolling mean, a short-horizon direction and, when the
//! series spans two seasonal cycles, an additive decomposition. A failed
//! decomposition degrades to "seasonality unavailable" instead of failing
//! the whole analysis.

use crate::config::TrendConfig;
use crate::core::error::{Error, Result};
use crate::time_series::core::{DateTimeIndex, Frequency, TimeSeries};
use crate::time_series::decomposition::SeasonalDecomposition;
use serde::{Deserialize, Serialize};

/// Direction of the most recent movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    /// Fewer than two points
    Indeterminate,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
            TrendDirection::Indeterminate => "indeterminate",
        }
    }

    /// Compare the last value of `recent` with its first
    pub fn classify(recent: &[f64]) -> Self {
        match (recent.first(), recent.last()) {
            (Some(first), Some(last)) if recent.len() >= 2 => {
                if last > first {
                    TrendDirection::Increasing
                } else if last < first {
                    TrendDirection::Decreasing
                } else {
                    TrendDirection::Stable
                }
            }
            _ => TrendDirection::Indeterminate,
        }
    }
}

/// Additive components with undefined edge values dropped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalComponents {
    pub period: usize,
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
}

/// Result of [`analyze_trend`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    /// `(last / first - 1) * 100`; 0 for a single observation
    pub total_growth_pct: f64,
    /// Geometric per-period growth in percent; `None` when the first and last
    /// values differ in sign
    pub avg_growth_rate_pct: Option<f64>,
    pub direction: TrendDirection,
    /// Rolling mean without its warm-up entries
    pub rolling_mean: TimeSeries,
    /// `None` when the series is too short or decomposition failed
    pub seasonality: Option<SeasonalComponents>,
    /// Number of observations analysed
    pub observations: usize,
}

/// Analyse growth, direction and seasonality of a series.
///
/// Gaps are interpolated first; missing values before the first observation
/// are excluded from the analysis.
pub fn analyze_trend(
    ts: &TimeSeries,
    frequency: Frequency,
    config: &TrendConfig,
) -> Result<TrendAnalysis> {
    let filled = ts.interpolate_linear();
    let start = filled
        .first_valid_index()
        .ok_or_else(|| Error::InsufficientData("Series has no observations".into()))?;
    let series = TimeSeries::new(
        DateTimeIndex::new(filled.index.values[start..].to_vec())?,
        filled.values[start..].to_vec(),
    )?;
    let values = series.modeled_values()?;
    let n = values.len();

    let (total_growth_pct, avg_growth_rate_pct) = growth_rates(&values)?;

    let window = config.rolling_window.min(n).max(1);
    let rolled = series.rolling_mean(window)?;
    let rolling_mean = drop_missing(&rolled)?;

    let recent = config.direction_window.min(n);
    let direction = TrendDirection::classify(&values[n - recent..]);

    let period = frequency.seasonal_period();
    let seasonality = if n >= 2 * period {
        match SeasonalDecomposition::new(period).decompose(&series) {
            Ok(result) => Some(SeasonalComponents {
                period,
                trend: result.trend.values.iter().flatten().copied().collect(),
                seasonal: result.seasonal.values.iter().flatten().copied().collect(),
                residual: result.residual.values.iter().flatten().copied().collect(),
            }),
            Err(e) => {
                log::warn!(
                    period = period,
                    observations = n,
                    error:% = e;
                    "seasonal decomposition unavailable"
                );
                None
            }
        }
    } else {
        None
    };

    Ok(TrendAnalysis {
        total_growth_pct,
        avg_growth_rate_pct,
        direction,
        rolling_mean,
        seasonality,
        observations: n,
    })
}

/// Total and geometric average growth between the first and last value
fn growth_rates(values: &[f64]) -> Result<(f64, Option<f64>)> {
    let (first, last) = match (values.first(), values.last()) {
        (Some(&first), Some(&last)) if values.len() > 1 => (first, last),
        _ => return Ok((0.0, Some(0.0))),
    };
    if first == 0.0 {
        return Err(Error::Analysis(
            "Growth rate is undefined when the first value is zero".into(),
        ));
    }

    let ratio = last / first;
    let total = (ratio - 1.0) * 100.0;
    let periods = (values.len() - 1) as f64;
    let average = if ratio >= 0.0 {
        Some((ratio.powf(1.0 / periods) - 1.0) * 100.0)
    } else {
        log::warn!(first = first, last = last; "average growth undefined across a sign change");
        None
    };
    Ok((total, average))
}

fn drop_missing(ts: &TimeSeries) -> Result<TimeSeries> {
    let (timestamps, values): (Vec<_>, Vec<_>) = ts
        .index
        .values
        .iter()
        .zip(&ts.values)
        .filter_map(|(t, v)| v.map(|v| (*t, Some(v))))
        .unzip();
    TimeSeries::new(DateTimeIndex::new(timestamps)?, values)
}
