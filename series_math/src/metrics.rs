//! Forecast accuracy metrics

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Accuracy metrics for a forecast vs actual values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
}

impl std::fmt::Display for Accuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAPE:  {:.4}%", self.mape)?;
        writeln!(f, "  SMAPE: {:.4}%", self.smape)?;
        Ok(())
    }
}

/// Calculate accuracy metrics for a forecast vs actual values
pub fn accuracy(forecast: &[f64], actual: &[f64]) -> Result<Accuracy> {
    check_paired(forecast, actual)?;

    let n = forecast.len() as f64;

    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual.iter())
        .map(|(&f, &a)| a - f)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;
    let rmse = mse.sqrt();

    // MAPE skips zero actuals; a day with no visitors has no meaningful
    // percentage error.
    let nonzero = actual.iter().filter(|&&a| a != 0.0).count();
    let mape = if nonzero == 0 {
        0.0
    } else {
        actual
            .iter()
            .zip(errors.iter())
            .filter(|(&a, _)| a != 0.0)
            .map(|(&a, &e)| (e.abs() / a.abs()) * 100.0)
            .sum::<f64>()
            / nonzero as f64
    };

    let smape = actual
        .iter()
        .zip(forecast.iter())
        .map(|(&a, &f)| {
            let denom = a.abs() + f.abs();
            if denom == 0.0 {
                0.0
            } else {
                200.0 * (a - f).abs() / denom
            }
        })
        .sum::<f64>()
        / n;

    Ok(Accuracy {
        mae,
        mse,
        rmse,
        mape,
        smape,
    })
}

/// Mean absolute error between paired slices
pub fn mean_absolute_error(forecast: &[f64], actual: &[f64]) -> Result<f64> {
    check_paired(forecast, actual)?;
    let sum: f64 = forecast
        .iter()
        .zip(actual.iter())
        .map(|(f, a)| (f - a).abs())
        .sum();
    Ok(sum / forecast.len() as f64)
}

/// Root mean squared error between paired slices
pub fn root_mean_squared_error(forecast: &[f64], actual: &[f64]) -> Result<f64> {
    check_paired(forecast, actual)?;
    let sum: f64 = forecast
        .iter()
        .zip(actual.iter())
        .map(|(f, a)| (f - a).powi(2))
        .sum();
    Ok((sum / forecast.len() as f64).sqrt())
}

/// Fraction of actual outcomes that fall inside their reported interval.
///
/// Bounds are inclusive. Used to measure empirical interval coverage over a
/// backtest, not to assert it.
pub fn interval_coverage(actual: &[f64], intervals: &[(f64, f64)]) -> Result<f64> {
    if actual.len() != intervals.len() || actual.is_empty() {
        return Err(MathError::InvalidInput(
            "Actuals and intervals must have the same non-zero length".to_string(),
        ));
    }

    let hits = actual
        .iter()
        .zip(intervals.iter())
        .filter(|(&a, &(lo, hi))| a >= lo && a <= hi)
        .count();

    Ok(hits as f64 / actual.len() as f64)
}

fn check_paired(forecast: &[f64], actual: &[f64]) -> Result<()> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(MathError::InvalidInput(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_known_values() {
        let actual = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        let forecast = vec![12.0, 18.0, 33.0, 37.0, 52.0];

        let acc = accuracy(&forecast, &actual).unwrap();

        assert!((acc.mae - 2.8).abs() < 0.01);
        assert!((acc.mse - 10.0).abs() < 0.01);
        assert!((acc.rmse - 10.0_f64.sqrt()).abs() < 0.01);
        assert!(acc.mape > 0.0 && acc.mape < 15.0);
        assert!(acc.smape > 0.0 && acc.smape < 15.0);
    }

    #[test]
    fn test_mape_skips_zero_actuals() {
        let actual = vec![0.0, 10.0];
        let forecast = vec![5.0, 11.0];

        let acc = accuracy(&forecast, &actual).unwrap();
        // Only the non-zero day contributes: |10-11|/10 = 10%
        assert!((acc.mape - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_perfect_forecast() {
        let values = vec![1.0, 2.0, 3.0];
        let acc = accuracy(&values, &values).unwrap();

        assert!(acc.mae.abs() < 1e-12);
        assert!(acc.rmse.abs() < 1e-12);
    }

    #[test]
    fn test_mismatched_lengths_is_error() {
        assert!(accuracy(&[1.0], &[1.0, 2.0]).is_err());
        assert!(mean_absolute_error(&[], &[]).is_err());
    }

    #[test]
    fn test_interval_coverage() {
        let actual = vec![10.0, 20.0, 30.0, 40.0];
        let intervals = vec![(9.0, 11.0), (25.0, 30.0), (30.0, 30.0), (35.0, 45.0)];

        let coverage = interval_coverage(&actual, &intervals).unwrap();
        // 10 in, 20 out, 30 on both bounds (in), 40 in
        assert!((coverage - 0.75).abs() < 1e-12);
    }
}
