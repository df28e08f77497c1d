//! Statistics module
//!
//! Descriptive statistics over plain `f64` slices and the least squares solver
//! shared by the time series models.

pub mod descriptive;
pub mod regression;

use crate::core::error::Result;

pub use regression::least_squares;

/// Structure holding descriptive statistics results
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveStats {
    /// Number of data points
    pub count: usize,
    /// Mean value
    pub mean: f64,
    /// Standard deviation (estimator chosen by `ddof`)
    pub std: f64,
    /// Minimum value
    pub min: f64,
    /// 25% quantile
    pub q1: f64,
    /// Median (50% quantile)
    pub median: f64,
    /// 75% quantile
    pub q3: f64,
    /// Maximum value
    pub max: f64,
}

/// Calculate descriptive statistics (`ddof` 0 = population std, 1 = sample std)
pub fn describe(data: &[f64], ddof: usize) -> Result<DescriptiveStats> {
    descriptive::describe_impl(data, ddof)
}

/// Arithmetic mean
pub fn mean(data: &[f64]) -> Result<f64> {
    descriptive::mean_impl(data)
}

/// Standard deviation with `ddof` delta degrees of freedom
pub fn std(data: &[f64], ddof: usize) -> Result<f64> {
    descriptive::std_impl(data, ddof)
}

/// Linear-interpolated quantile, `q` in [0, 1]
pub fn quantile(data: &[f64], q: f64) -> Result<f64> {
    descriptive::quantile_impl(data, q)
}

pub fn median(data: &[f64]) -> Result<f64> {
    descriptive::quantile_impl(data, 0.5)
}
