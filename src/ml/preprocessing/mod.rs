//! Data preprocessing for the ml models
//!
//! Both transformers work on row-major feature matrices whose column order is
//! fixed at fit time.

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};

fn check_width(row: &[impl Sized], expected: usize) -> Result<()> {
    if row.len() != expected {
        return Err(Error::DimensionMismatch(format!(
            "expected {} features per row, found {}",
            expected,
            row.len()
        )));
    }
    Ok(())
}

/// Replaces missing values with the per-column mean seen during fit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeanImputer {
    /// Mean values for each feature
    means: Option<Vec<f64>>,
}

impl MeanImputer {
    /// Create a new MeanImputer
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn column means; a column without any observed value cannot be imputed
    pub fn fit(&mut self, feature_names: &[String], rows: &[Vec<Option<f64>>]) -> Result<()> {
        let width = feature_names.len();
        let mut sums = vec![0.0; width];
        let mut counts = vec![0usize; width];
        for row in rows {
            check_width(row, width)?;
            for (j, value) in row.iter().enumerate() {
                if let Some(v) = value {
                    sums[j] += v;
                    counts[j] += 1;
                }
            }
        }

        if let Some(j) = counts.iter().position(|&c| c == 0) {
            return Err(Error::InsufficientData(format!(
                "feature '{}' has no observed values to impute from",
                feature_names[j]
            )));
        }

        self.means = Some(
            sums.iter()
                .zip(&counts)
                .map(|(s, &c)| s / c as f64)
                .collect(),
        );
        Ok(())
    }

    pub fn means(&self) -> Option<&[f64]> {
        self.means.as_deref()
    }

    /// Fill missing values with the fitted means
    pub fn transform(&self, rows: &[Vec<Option<f64>>]) -> Result<Vec<Vec<f64>>> {
        let means = self
            .means
            .as_ref()
            .ok_or_else(|| Error::Analysis("MeanImputer has not been fitted".into()))?;
        rows.iter()
            .map(|row| {
                check_width(row, means.len())?;
                Ok(row
                    .iter()
                    .zip(means)
                    .map(|(v, m)| v.unwrap_or(*m))
                    .collect())
            })
            .collect()
    }

    pub fn fit_transform(
        &mut self,
        feature_names: &[String],
        rows: &[Vec<Option<f64>>],
    ) -> Result<Vec<Vec<f64>>> {
        self.fit(feature_names, rows)?;
        self.transform(rows)
    }
}

/// Standardizes features to zero mean and unit (population) variance.
///
/// A zero-variance column is only centred, its scale is kept at 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Mean values for each feature
    means: Option<Vec<f64>>,
    /// Divisors for each feature
    scales: Option<Vec<f64>>,
}

impl StandardScaler {
    /// Create a new StandardScaler
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the scaler to the data
    pub fn fit(&mut self, rows: &[Vec<f64>]) -> Result<()> {
        let Some(first) = rows.first() else {
            return Err(Error::EmptyData("Cannot fit a scaler on zero rows".into()));
        };
        let width = first.len();
        let n = rows.len() as f64;

        let mut means = vec![0.0; width];
        for row in rows {
            check_width(row, width)?;
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in means.iter_mut() {
            *m /= n;
        }

        let mut variances = vec![0.0; width];
        for row in rows {
            for ((var, v), m) in variances.iter_mut().zip(row).zip(&means) {
                *var += (v - m).powi(2);
            }
        }

        let scales: Vec<f64> = variances
            .iter()
            .enumerate()
            .map(|(j, var)| {
                let std = (var / n).sqrt();
                let constant = rows.iter().all(|row| row[j] == rows[0][j]);
                if !constant && std > 0.0 {
                    std
                } else {
                    log::warn!(feature_index = j; "zero-variance feature is only centred");
                    1.0
                }
            })
            .collect();

        self.means = Some(means);
        self.scales = Some(scales);
        Ok(())
    }

    pub fn means(&self) -> Option<&[f64]> {
        self.means.as_deref()
    }

    pub fn scales(&self) -> Option<&[f64]> {
        self.scales.as_deref()
    }

    /// Transform data using the fitted scaler
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let (Some(means), Some(scales)) = (&self.means, &self.scales) else {
            return Err(Error::Analysis("StandardScaler has not been fitted".into()));
        };
        rows.iter()
            .map(|row| {
                check_width(row, means.len())?;
                Ok(row
                    .iter()
                    .zip(means.iter().zip(scales))
                    .map(|(v, (m, s))| (v - m) / s)
                    .collect())
            })
            .collect()
    }

    pub fn fit_transform(&mut self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        self.fit(rows)?;
        self.transform(rows)
    }
}
