//! Trailing-window statistics over value slices
//!
//! All functions operate on the values actually present in the window; the
//! caller decides which observations fall inside a calendar window and passes
//! the corresponding slice.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Summary statistics for one trailing window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    /// Arithmetic mean of the window values
    pub mean: f64,
    /// Population standard deviation of the window values
    pub std_dev: f64,
    /// Smallest value in the window
    pub min: f64,
    /// Largest value in the window
    pub max: f64,
    /// Number of values the statistics were computed from
    pub samples: usize,
}

/// Compute summary statistics over a window of values
pub fn window_stats(values: &[f64]) -> Result<WindowStats> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Window contains no values".to_string(),
        ));
    }

    let mean = mean(values);
    let std_dev = std_dev(values);

    let mut min = values[0];
    let mut max = values[0];
    for &v in &values[1..] {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }

    Ok(WindowStats {
        mean,
        std_dev,
        min,
        max,
        samples: values.len(),
    })
}

/// Arithmetic mean; 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; 0.0 for an empty slice
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Expanding mean of every prefix, shifted by one step.
///
/// Element `i` of the output is the mean of `values[..i]`, or `None` for
/// `i = 0`. Used for leakage-free "average so far" features: the value at a
/// position never includes the observation at that position.
pub fn expanding_mean_shifted(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        if i == 0 {
            out.push(None);
        } else {
            out.push(Some(sum / i as f64));
        }
        sum += v;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_stats_constant_series() {
        let values = vec![10.0; 7];
        let stats = window_stats(&values).unwrap();

        assert!((stats.mean - 10.0).abs() < 1e-12);
        assert!(stats.std_dev.abs() < 1e-12);
        assert!((stats.min - 10.0).abs() < 1e-12);
        assert!((stats.max - 10.0).abs() < 1e-12);
        assert_eq!(stats.samples, 7);
    }

    #[test]
    fn test_window_stats_varied_series() {
        let values = vec![2.0, 4.0, 6.0, 8.0];
        let stats = window_stats(&values).unwrap();

        assert!((stats.mean - 5.0).abs() < 1e-12);
        // Population std of {2,4,6,8} is sqrt(5)
        assert!((stats.std_dev - 5.0_f64.sqrt()).abs() < 1e-12);
        assert!((stats.min - 2.0).abs() < 1e-12);
        assert!((stats.max - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_window_stats_empty_is_error() {
        assert!(window_stats(&[]).is_err());
    }

    #[test]
    fn test_expanding_mean_shifted_excludes_current() {
        let values = vec![10.0, 20.0, 30.0];
        let means = expanding_mean_shifted(&values);

        assert_eq!(means[0], None);
        assert!((means[1].unwrap() - 10.0).abs() < 1e-12);
        assert!((means[2].unwrap() - 15.0).abs() < 1e-12);
    }
}
