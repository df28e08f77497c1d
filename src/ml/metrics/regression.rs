//! Regression model evaluation metrics

use crate::core::error::{Error, Result};

fn check_inputs(y_true: &[f64], y_pred: &[f64]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(Error::DimensionMismatch(format!(
            "Length mismatch between true and predicted values: {} vs {}",
            y_true.len(),
            y_pred.len()
        )));
    }

    if y_true.is_empty() {
        return Err(Error::EmptyData(
            "Cannot calculate with empty data".to_string(),
        ));
    }
    Ok(())
}

/// Calculate Mean Squared Error (MSE)
///
/// # Arguments
/// * `y_true` - True values
/// * `y_pred` - Predicted values
///
/// # Returns
/// * `Result<f64>` - Mean Squared Error
pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_inputs(y_true, y_pred)?;

    let sum_squared_error = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&true_val, &pred_val)| {
            let error = true_val - pred_val;
            error * error
        })
        .sum::<f64>();

    Ok(sum_squared_error / y_true.len() as f64)
}

/// Calculate Mean Absolute Error (MAE)
pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_inputs(y_true, y_pred)?;

    let sum_absolute_error = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&true_val, &pred_val)| (true_val - pred_val).abs())
        .sum::<f64>();

    Ok(sum_absolute_error / y_true.len() as f64)
}

/// Calculate Root Mean Squared Error (RMSE)
pub fn root_mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    let mse = mean_squared_error(y_true, y_pred)?;
    Ok(mse.sqrt())
}

/// Calculate Mean Absolute Percentage Error, in percent
///
/// Pairs whose true value is zero carry no percentage error and are skipped;
/// `None` is returned when every true value is zero.
pub fn mean_absolute_percentage_error(y_true: &[f64], y_pred: &[f64]) -> Result<Option<f64>> {
    check_inputs(y_true, y_pred)?;

    let (sum, count) = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(&true_val, _)| true_val != 0.0)
        .fold((0.0, 0usize), |(sum, count), (&true_val, &pred_val)| {
            (sum + ((true_val - pred_val) / true_val).abs(), count + 1)
        });

    if count == 0 {
        return Ok(None);
    }
    Ok(Some(sum / count as f64 * 100.0))
}

/// Calculate R² score (coefficient of determination)
///
/// # Returns
/// * `Result<f64>` - R² score (1 is best, negative when the model is worse than a constant one).
///   A constant target scores 1.0 when predicted exactly and 0.0 otherwise.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_inputs(y_true, y_pred)?;

    let y_mean = y_true.iter().sum::<f64>() / y_true.len() as f64;

    let ss_tot = y_true
        .iter()
        .map(|&true_val| (true_val - y_mean).powi(2))
        .sum::<f64>();

    let ss_res = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&true_val, &pred_val)| (true_val - pred_val).powi(2))
        .sum::<f64>();

    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            Ok(1.0)
        } else {
            Ok(0.0)
        }
    } else {
        Ok(1.0 - (ss_res / ss_tot))
    }
}
