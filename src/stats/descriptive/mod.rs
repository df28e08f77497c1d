//! Descriptive statistics module

use crate::core::error::{Error, Result};
use crate::stats::DescriptiveStats;

/// Internal implementation for calculating descriptive statistics
///
/// `ddof` is the delta degrees of freedom of the standard deviation:
/// 0 for the population estimator, 1 for the unbiased one.
pub(crate) fn describe_impl(data: &[f64], ddof: usize) -> Result<DescriptiveStats> {
    if data.is_empty() {
        return Err(Error::EmptyData(
            "At least one data point is required for descriptive statistics".into(),
        ));
    }

    let count = data.len();
    let mean = mean_impl(data)?;
    let std = std_impl(data, ddof)?;

    let sorted = sorted_copy(data);
    let min = sorted[0];
    let max = sorted[count - 1];

    Ok(DescriptiveStats {
        count,
        mean,
        std,
        min,
        q1: percentile(&sorted, 0.25),
        median: percentile(&sorted, 0.5),
        q3: percentile(&sorted, 0.75),
        max,
    })
}

pub(crate) fn mean_impl(data: &[f64]) -> Result<f64> {
    if data.is_empty() {
        return Err(Error::EmptyData("Mean of empty data is undefined".into()));
    }
    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

pub(crate) fn std_impl(data: &[f64], ddof: usize) -> Result<f64> {
    if data.len() <= ddof {
        return Err(Error::InsufficientData(format!(
            "Standard deviation with ddof={} needs more than {} data points",
            ddof, ddof
        )));
    }
    let mean = mean_impl(data)?;
    let sum_squared_diff = data.iter().map(|&x| (x - mean).powi(2)).sum::<f64>();
    Ok((sum_squared_diff / (data.len() - ddof) as f64).sqrt())
}

pub(crate) fn quantile_impl(data: &[f64], q: f64) -> Result<f64> {
    if data.is_empty() {
        return Err(Error::EmptyData("Quantile of empty data is undefined".into()));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(Error::InvalidInput(format!(
            "Quantile must be within [0, 1], got {}",
            q
        )));
    }
    Ok(percentile(&sorted_copy(data), q))
}

fn sorted_copy(data: &[f64]) -> Vec<f64> {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Linear-interpolated percentile of already sorted data, `p` in [0, 1]
fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    let idx = p * (n - 1) as f64;
    let idx_floor = idx.floor() as usize;
    let idx_ceil = idx.ceil() as usize;

    if idx_floor == idx_ceil {
        return sorted_data[idx_floor];
    }

    let weight_ceil = idx - idx_floor as f64;
    let weight_floor = 1.0 - weight_ceil;

    sorted_data[idx_floor] * weight_floor + sorted_data[idx_ceil] * weight_ceil
}
