//! Anomaly detection algorithms
//!
//! Univariate outlier scoring by distance from the mean in standard
//! deviations (z-score) or by distance beyond the interquartile fences.
//! Missing values are never flagged and carry no score.

use crate::core::error::{Error, Result};
use crate::stats;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scoring method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyMethod {
    /// Flag `|x - mean| > threshold * std` (population std)
    ZScore,
    /// Flag values outside `[Q1 - t*IQR, Q3 + t*IQR]`
    Iqr,
}

impl AnomalyMethod {
    pub fn name(&self) -> &'static str {
        match self {
            AnomalyMethod::ZScore => "zscore",
            AnomalyMethod::Iqr => "iqr",
        }
    }
}

impl FromStr for AnomalyMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "zscore" | "z-score" | "std" => Ok(AnomalyMethod::ZScore),
            "iqr" => Ok(AnomalyMethod::Iqr),
            other => Err(Error::UnsupportedMethod(other.to_string())),
        }
    }
}

impl fmt::Display for AnomalyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-row flags and severity scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyScores {
    pub is_anomaly: Vec<bool>,
    /// `None` for missing input values
    pub scores: Vec<Option<f64>>,
}

impl AnomalyScores {
    pub fn anomaly_count(&self) -> usize {
        self.is_anomaly.iter().filter(|&&flag| flag).count()
    }
}

/// Score every value of a column.
///
/// Non-finite values are treated as missing and stay unscored. A column
/// without spread (all finite values equal, or zero IQR) has no anomalies and
/// every scored value gets 0.
pub fn detect(
    values: &[Option<f64>],
    method: AnomalyMethod,
    threshold: f64,
) -> Result<AnomalyScores> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(Error::InvalidInput(format!(
            "threshold must be a non-negative number, got {}",
            threshold
        )));
    }

    let observed: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|x| x.is_finite())
        .collect();
    if observed.is_empty() {
        return Err(Error::InsufficientData(
            "column has no finite values to score".into(),
        ));
    }
    let skipped = values.iter().flatten().count() - observed.len();
    if skipped > 0 {
        log::warn!(skipped = skipped; "non-finite values are not scored");
    }
    let constant = observed.iter().all(|&x| x == observed[0]);

    let scorer: Box<dyn Fn(f64) -> (bool, f64)> = match method {
        AnomalyMethod::ZScore => {
            let mean = stats::mean(&observed)?;
            let std = stats::std(&observed, 0)?;
            if constant || std == 0.0 {
                log::warn!(method = "zscore"; "zero standard deviation, no value is anomalous");
                return Ok(degenerate(values));
            }
            Box::new(move |x| {
                let distance = (x - mean).abs();
                (distance > threshold * std, distance / std)
            })
        }
        AnomalyMethod::Iqr => {
            let q1 = stats::quantile(&observed, 0.25)?;
            let q3 = stats::quantile(&observed, 0.75)?;
            let iqr = q3 - q1;
            if iqr <= 0.0 {
                log::warn!(method = "iqr"; "zero interquartile range, no value is anomalous");
                return Ok(degenerate(values));
            }
            let lower = q1 - threshold * iqr;
            let upper = q3 + threshold * iqr;
            Box::new(move |x| {
                if x < lower {
                    (true, (lower - x) / iqr)
                } else if x > upper {
                    (true, (x - upper) / iqr)
                } else {
                    (false, 0.0)
                }
            })
        }
    };

    let (is_anomaly, scores) = values
        .iter()
        .map(|value| match value {
            Some(x) if x.is_finite() => {
                let (flag, score) = scorer(*x);
                (flag, Some(score))
            }
            _ => (false, None),
        })
        .unzip();
    Ok(AnomalyScores { is_anomaly, scores })
}

fn degenerate(values: &[Option<f64>]) -> AnomalyScores {
    AnomalyScores {
        is_anomaly: vec![false; values.len()],
        scores: values
            .iter()
            .map(|v| v.filter(|x| x.is_finite()).map(|_| 0.0))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().map(|&v| Some(v)).collect()
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("ZScore".parse::<AnomalyMethod>().unwrap(), AnomalyMethod::ZScore);
        assert_eq!("std".parse::<AnomalyMethod>().unwrap(), AnomalyMethod::ZScore);
        assert_eq!("iqr".parse::<AnomalyMethod>().unwrap(), AnomalyMethod::Iqr);
        assert!(matches!(
            "isolation_forest".parse::<AnomalyMethod>(),
            Err(Error::UnsupportedMethod(name)) if name == "isolation_forest"
        ));
    }

    #[test]
    fn test_zscore_flags_outlier() {
        let mut values = vec![10.0; 20];
        values.push(100.0);
        let result = detect(&observed(&values), AnomalyMethod::ZScore, 3.0).unwrap();
        assert_eq!(result.anomaly_count(), 1);
        assert!(result.is_anomaly[20]);
        assert!(result.scores[20].unwrap() > 3.0);
        assert!(result.scores[0].unwrap() < 1.0);
    }

    #[test]
    fn test_constant_column_has_no_anomalies() {
        let values = observed(&[5.0; 8]);
        for method in [AnomalyMethod::ZScore, AnomalyMethod::Iqr] {
            let result = detect(&values, method, 3.0).unwrap();
            assert_eq!(result.anomaly_count(), 0);
            assert!(result.scores.iter().all(|s| *s == Some(0.0)));
        }
    }

    #[test]
    fn test_iqr_scores_distance_beyond_fence() {
        // Q1 = 2.25, Q3 = 4.75, fences at -1.5 and 8.5 for t = 1.5
        let values = observed(&[1.0, 2.0, 3.0, 4.0, 5.0, 11.0]);
        let q1 = stats::quantile(&[1.0, 2.0, 3.0, 4.0, 5.0, 11.0], 0.25).unwrap();
        let q3 = stats::quantile(&[1.0, 2.0, 3.0, 4.0, 5.0, 11.0], 0.75).unwrap();
        let iqr = q3 - q1;
        let upper = q3 + 1.5 * iqr;

        let result = detect(&values, AnomalyMethod::Iqr, 1.5).unwrap();
        assert_eq!(result.is_anomaly, vec![false, false, false, false, false, true]);
        assert!((result.scores[5].unwrap() - (11.0 - upper) / iqr).abs() < 1e-12);
        assert_eq!(result.scores[2], Some(0.0));
    }

    #[test]
    fn test_missing_values_are_not_scored() {
        let values = vec![Some(1.0), None, Some(2.0), Some(3.0)];
        let result = detect(&values, AnomalyMethod::ZScore, 1.0).unwrap();
        assert!(!result.is_anomaly[1]);
        assert_eq!(result.scores[1], None);
    }

    #[test]
    fn test_non_finite_values_are_not_scored() {
        let values = observed(&[1.0, 2.0, f64::INFINITY, 1.5, f64::NAN]);
        let result = detect(&values, AnomalyMethod::ZScore, 3.0).unwrap();
        assert_eq!(result.scores[2], None);
        assert_eq!(result.scores[4], None);
        assert!(!result.is_anomaly[2]);
        assert!(result.scores[0].unwrap().is_finite());

        assert!(matches!(
            detect(&observed(&[f64::INFINITY, f64::NEG_INFINITY]), AnomalyMethod::Iqr, 1.5),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn test_tiny_spread_is_still_scored() {
        let mut values = vec![1e-17; 20];
        values.push(1e-15);
        let result = detect(&observed(&values), AnomalyMethod::ZScore, 3.0).unwrap();
        assert_eq!(result.anomaly_count(), 1);
        assert!(result.is_anomaly[20]);
    }

    #[test]
    fn test_invalid_threshold_and_empty_column() {
        let values = observed(&[1.0, 2.0]);
        assert!(matches!(
            detect(&values, AnomalyMethod::ZScore, -1.0),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            detect(&values, AnomalyMethod::Iqr, f64::NAN),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            detect(&[None, None], AnomalyMethod::ZScore, 3.0),
            Err(Error::InsufficientData(_))
        ));
    }
}
