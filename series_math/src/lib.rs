//! # Series Math
//!
//! Mathematical calculations for daily time series work.
//! This crate provides the numeric building blocks used by the forecasting
//! core: trailing-window statistics, least squares regression, and forecast
//! accuracy metrics.

use thiserror::Error;

pub mod metrics;
pub mod regression;
pub mod rolling;

/// Errors that can occur in series-related calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_context() {
        let err = MathError::InsufficientData("need 2 points".to_string());
        assert_eq!(
            err.to_string(),
            "Insufficient data for calculation: need 2 points"
        );
    }
}
