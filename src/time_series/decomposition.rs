//! Seasonal Decomposition Module
//!
//! Additive classical decomposition, `Y(t) = Trend(t) + Seasonal(t) + Residual(t)`.
//! A centred moving average of one seasonal period estimates the trend, the
//! per-position averages of the detrended series estimate the seasonal pattern
//! and the remainder is the residual. The first and last `period / 2` trend
//! (and residual) values are undefined and left missing.

use crate::core::error::{Error, Result};
use crate::time_series::core::TimeSeries;
use serde::{Deserialize, Serialize};

/// Result of seasonal decomposition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompositionResult {
    /// Trend component
    pub trend: TimeSeries,
    /// Seasonal component (defined at every position)
    pub seasonal: TimeSeries,
    /// Residual/irregular component
    pub residual: TimeSeries,
    /// Seasonal period
    pub period: usize,
}

/// Seasonal decomposition builder
#[derive(Debug, Clone)]
pub struct SeasonalDecomposition {
    period: usize,
}

impl SeasonalDecomposition {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    /// Decompose a gap-free series holding at least two full cycles
    pub fn decompose(&self, ts: &TimeSeries) -> Result<DecompositionResult> {
        let period = self.period;
        if period < 2 {
            return Err(Error::InsufficientData(format!(
                "Seasonal period must be at least 2, got {}",
                period
            )));
        }
        if ts.len() < 2 * period {
            return Err(Error::InsufficientData(format!(
                "Decomposition needs two complete cycles ({} observations), got {}",
                2 * period,
                ts.len()
            )));
        }
        let values: Vec<f64> = ts
            .values
            .iter()
            .map(|v| {
                v.ok_or_else(|| {
                    Error::InvalidInput("Decomposition requires a series without gaps".into())
                })
            })
            .collect::<Result<_>>()?;

        let trend = centered_moving_average(&values, period);
        let detrended: Vec<Option<f64>> = values
            .iter()
            .zip(&trend)
            .map(|(&x, t)| t.map(|t| x - t))
            .collect();
        let pattern = seasonal_pattern(&detrended, period);
        let seasonal: Vec<f64> = (0..values.len()).map(|i| pattern[i % period]).collect();
        let residual: Vec<Option<f64>> = detrended
            .iter()
            .zip(&seasonal)
            .map(|(d, &s)| d.map(|d| d - s))
            .collect();

        Ok(DecompositionResult {
            trend: TimeSeries::new(ts.index.clone(), trend)?,
            seasonal: TimeSeries::new(ts.index.clone(), seasonal.into_iter().map(Some).collect())?,
            residual: TimeSeries::new(ts.index.clone(), residual)?,
            period,
        })
    }
}

/// Per-position averages, normalised to sum to zero
fn seasonal_pattern(detrended: &[Option<f64>], period: usize) -> Vec<f64> {
    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, value) in detrended.iter().enumerate() {
        if let Some(v) = value {
            sums[i % period] += v;
            counts[i % period] += 1;
        }
    }
    let mut pattern: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(&s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();

    let centre = pattern.iter().sum::<f64>() / period as f64;
    for value in &mut pattern {
        *value -= centre;
    }
    pattern
}

/// Centred moving average over one period.
///
/// Even periods use the 2×period filter with half weights on both ends, odd
/// periods an equal-weight window.
fn centered_moving_average(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let half = period / 2;
    let weights: Vec<f64> = if period % 2 == 0 {
        let mut w = vec![1.0 / period as f64; period + 1];
        w[0] = 0.5 / period as f64;
        w[period] = 0.5 / period as f64;
        w
    } else {
        vec![1.0 / period as f64; period]
    };

    (0..n)
        .map(|i| {
            if i < half || i + half >= n {
                return None;
            }
            let start = i - half;
            Some(
                weights
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * values[start + k])
                    .sum(),
            )
        })
        .collect()
}

impl DecompositionResult {
    /// Reconstruct the observed values where all components are defined
    pub fn reconstruct(&self) -> Vec<Option<f64>> {
        self.trend
            .values
            .iter()
            .zip(&self.seasonal.values)
            .zip(&self.residual.values)
            .map(|((t, s), r)| match (t, s, r) {
                (Some(t), Some(s), Some(r)) => Some(t + s + r),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn seasonal_series(n: usize, period: usize) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..n).map(|i| start + Duration::days(i as i64)).collect();
        let values = (0..n)
            .map(|i| 100.0 + 2.0 * i as f64 + [5.0, -3.0, 1.0, -3.0][i % period])
            .collect();
        TimeSeries::from_vecs(timestamps, values).unwrap()
    }

    #[test]
    fn test_additive_recovers_pattern() {
        let ts = seasonal_series(16, 4);
        let result = SeasonalDecomposition::new(4)
            .decompose(&ts)
            .unwrap();

        // Linear trend passes through the centred average exactly
        assert_eq!(result.trend.values[0], None);
        assert_eq!(result.trend.values[1], None);
        assert!((result.trend.values[2].unwrap() - 104.0).abs() < 1e-9);
        assert_eq!(result.trend.values[14], None);

        let first_cycle: Vec<f64> =
            result.seasonal.values[..4].iter().map(|v| v.unwrap()).collect();
        for (got, want) in first_cycle.iter().zip([5.0, -3.0, 1.0, -3.0]) {
            assert!((got - want).abs() < 1e-9);
        }
        assert!(first_cycle.iter().sum::<f64>().abs() < 1e-9);

        for (rebuilt, original) in result.reconstruct().iter().zip(&ts.values) {
            if let Some(r) = rebuilt {
                assert!((r - original.unwrap()).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_needs_two_cycles() {
        let ts = seasonal_series(7, 4);
        let err = SeasonalDecomposition::new(4).decompose(&ts);
        assert!(matches!(err, Err(Error::InsufficientData(_))));
    }

    #[test]
    fn test_period_one_rejected() {
        let ts = seasonal_series(8, 4);
        let err = SeasonalDecomposition::new(1).decompose(&ts);
        assert!(matches!(err, Err(Error::InsufficientData(_))));
    }
}
