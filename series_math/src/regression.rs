//! Least squares regression
//!
//! Contains the two regression forms the forecasting core needs:
//! - simple linear regression against an implicit time index (trend slopes)
//! - multivariate ordinary least squares via the normal equations
//!   (exogenous covariate fitting)

use crate::{MathError, Result};

/// Result of a simple linear regression `y = intercept + slope * x`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Evaluate the fitted line at `x`
    pub fn value_at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fit a line to `values` against the index sequence `0, 1, 2, ...`
pub fn fit_trend(values: &[f64]) -> Result<LinearFit> {
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    fit_xy(&xs, values)
}

/// Fit a line to explicit `(x, y)` pairs.
///
/// Used when the x axis is a day index with gaps rather than a dense
/// sequence.
pub fn fit_xy(xs: &[f64], ys: &[f64]) -> Result<LinearFit> {
    if xs.len() != ys.len() {
        return Err(MathError::InvalidInput(
            "x and y must have the same length".to_string(),
        ));
    }
    if ys.len() < 2 {
        return Err(MathError::InsufficientData(
            "Need at least 2 points for a trend line".to_string(),
        ));
    }

    let n = ys.len() as f64;
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = ys.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let dx = x - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }

    if sxx == 0.0 {
        return Err(MathError::CalculationError(
            "Degenerate x variance in trend fit".to_string(),
        ));
    }

    let slope = sxy / sxx;
    Ok(LinearFit {
        slope,
        intercept: y_mean - slope * x_mean,
    })
}

/// Multivariate ordinary least squares with an intercept.
///
/// `columns` holds one covariate per entry, all the same length as `y`.
/// Returns coefficients `[intercept, b_0, b_1, ...]` in column order.
pub fn multi_ols(columns: &[Vec<f64>], y: &[f64]) -> Result<Vec<f64>> {
    let n = y.len();
    if n == 0 {
        return Err(MathError::InsufficientData(
            "Empty target in least squares".to_string(),
        ));
    }
    for col in columns {
        if col.len() != n {
            return Err(MathError::InvalidInput(
                "Covariate length does not match target length".to_string(),
            ));
        }
    }

    let k = columns.len() + 1;
    if n < k {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} points to fit {} coefficients",
            k, k
        )));
    }

    // Build the normal equations X'X b = X'y with an implicit leading
    // intercept column of ones.
    let x_at = |row: usize, col: usize| -> f64 {
        if col == 0 {
            1.0
        } else {
            columns[col - 1][row]
        }
    };

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for row in 0..n {
        for i in 0..k {
            let xi = x_at(row, i);
            xty[i] += xi * y[row];
            for j in i..k {
                xtx[i][j] += xi * x_at(row, j);
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[i][j] = xtx[j][i];
        }
    }

    solve(xtx, xty)
}

/// Solve a small dense linear system by Gaussian elimination with partial
/// pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();

    for col in 0..n {
        let mut pivot = col;
        for row in col + 1..n {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() < 1e-12 {
            return Err(MathError::CalculationError(
                "Singular system in least squares solve".to_string(),
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for j in col..n {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for j in row + 1..n {
            sum -= a[row][j] * x[j];
        }
        x[row] = sum / a[row][row];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_trend_perfect_line() {
        let values = vec![10.0, 20.0, 30.0, 40.0];
        let fit = fit_trend(&values).unwrap();

        assert!((fit.slope - 10.0).abs() < 1e-9);
        assert!((fit.intercept - 10.0).abs() < 1e-9);
        assert!((fit.value_at(4.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_trend_flat_line() {
        let values = vec![5.0; 10];
        let fit = fit_trend(&values).unwrap();

        assert!(fit.slope.abs() < 1e-9);
        assert!((fit.intercept - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_trend_too_short() {
        assert!(fit_trend(&[1.0]).is_err());
    }

    #[test]
    fn test_multi_ols_recovers_coefficients() {
        // y = 3 + 2*a - 0.5*b, exactly
        let a = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let b = vec![2.0, 1.0, 4.0, 3.0, 6.0, 5.0];
        let y: Vec<f64> = a
            .iter()
            .zip(b.iter())
            .map(|(&ai, &bi)| 3.0 + 2.0 * ai - 0.5 * bi)
            .collect();

        let coef = multi_ols(&[a, b], &y).unwrap();

        assert!((coef[0] - 3.0).abs() < 1e-9);
        assert!((coef[1] - 2.0).abs() < 1e-9);
        assert!((coef[2] + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_multi_ols_singular_column() {
        // A constant covariate collides with the intercept column.
        let a = vec![1.0; 5];
        let y = vec![2.0, 3.0, 4.0, 5.0, 6.0];

        assert!(multi_ols(&[a], &y).is_err());
    }
}
