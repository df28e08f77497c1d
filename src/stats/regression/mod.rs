//! Ordinary least squares on a row-major design matrix
//!
//! Used by the ARIMA fitter; solves the normal equations `XᵀX β = Xᵀy` with
//! Gauss-Jordan elimination and partial pivoting.

use crate::core::error::{Error, Result};

/// Relative ridge added to the diagonal of `XᵀX` so that exactly determined
/// systems with nearly collinear lags stay solvable.
const RIDGE: f64 = 1e-10;

/// Least squares coefficients for `rows · β ≈ y`
pub fn least_squares(rows: &[Vec<f64>], y: &[f64]) -> Result<Vec<f64>> {
    if rows.len() != y.len() {
        return Err(Error::DimensionMismatch(format!(
            "Design matrix has {} rows but target has {} values",
            rows.len(),
            y.len()
        )));
    }
    let Some(first) = rows.first() else {
        return Err(Error::InsufficientData(
            "Least squares needs at least one observation".into(),
        ));
    };
    let p = first.len();
    if rows.iter().any(|r| r.len() != p) {
        return Err(Error::DimensionMismatch("Design matrix rows differ in length".into()));
    }
    if rows.len() < p {
        return Err(Error::InsufficientData(format!(
            "{} observations cannot identify {} coefficients",
            rows.len(),
            p
        )));
    }

    let mut xt_x = matrix_multiply_transpose(rows, p);
    let xt_y = vec_multiply_transpose(rows, y, p);

    let scale = (0..p).map(|i| xt_x[i][i]).sum::<f64>() / p as f64;
    for (i, row) in xt_x.iter_mut().enumerate() {
        row[i] += RIDGE * scale.max(1.0);
    }

    solve(xt_x, xt_y)
}

/// XᵀX for row-major X with `p` columns
fn matrix_multiply_transpose(rows: &[Vec<f64>], p: usize) -> Vec<Vec<f64>> {
    let mut result = vec![vec![0.0; p]; p];
    for row in rows {
        for i in 0..p {
            for j in i..p {
                result[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..p {
        for j in 0..i {
            result[i][j] = result[j][i];
        }
    }
    result
}

/// Xᵀy
fn vec_multiply_transpose(rows: &[Vec<f64>], y: &[f64], p: usize) -> Vec<f64> {
    let mut result = vec![0.0; p];
    for (row, &target) in rows.iter().zip(y) {
        for (acc, &x) in result.iter_mut().zip(row) {
            *acc += x * target;
        }
    }
    result
}

/// Solve `a · x = b` (Gauss-Jordan method)
pub fn solve(a: Vec<Vec<f64>>, b: Vec<f64>) -> Result<Vec<f64>> {
    let n = a.len();
    if n == 0 || b.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(Error::DimensionMismatch("System must be square and non-empty".into()));
    }

    // Augmented matrix [A|b]
    let mut augmented: Vec<Vec<f64>> = a
        .into_iter()
        .zip(b)
        .map(|(mut row, rhs)| {
            row.push(rhs);
            row
        })
        .collect();

    for i in 0..n {
        // Pivot selection
        let mut max_row = i;
        let mut max_val = augmented[i][i].abs();
        for (j, row) in augmented.iter().enumerate().skip(i + 1) {
            if row[i].abs() > max_val {
                max_row = j;
                max_val = row[i].abs();
            }
        }

        if max_val < 1e-12 || !max_val.is_finite() {
            return Err(Error::Analysis(
                "Singular system (normal equations have no unique solution)".into(),
            ));
        }
        augmented.swap(i, max_row);

        let pivot = augmented[i][i];
        for value in augmented[i].iter_mut() {
            *value /= pivot;
        }

        for j in 0..n {
            if j != i {
                let factor = augmented[j][i];
                if factor != 0.0 {
                    for k in i..=n {
                        augmented[j][k] -= factor * augmented[i][k];
                    }
                }
            }
        }
    }

    Ok(augmented.into_iter().map(|row| row[n]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_regression() {
        // y = 1 + 2x
        let rows: Vec<Vec<f64>> = (0..5).map(|x| vec![1.0, x as f64]).collect();
        let y: Vec<f64> = (0..5).map(|x| 1.0 + 2.0 * x as f64).collect();
        let beta = least_squares(&rows, &y).unwrap();
        assert!((beta[0] - 1.0).abs() < 1e-6);
        assert!((beta[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_underdetermined_rejected() {
        let rows = vec![vec![1.0, 2.0, 3.0]];
        assert!(matches!(
            least_squares(&rows, &[1.0]),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn test_singular_solve() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(matches!(solve(a, vec![1.0, 2.0]), Err(Error::Analysis(_))));
    }
}
