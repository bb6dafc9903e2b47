//! Error types for the store_forecast crate

use thiserror::Error;

/// Custom error types for the store_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Fewer observations or eligible feature rows than the minimum
    #[error("Insufficient history: found {found}, need at least {required}")]
    InsufficientHistory { found: usize, required: usize },

    /// Malformed tenant identifier
    #[error("Invalid tenant id: {0}")]
    InvalidTenant(String),

    /// Requested forecast date outside the supported horizon
    #[error("Forecast horizon of {days} days is outside the supported range {min}-{max}")]
    InvalidHorizon { days: i64, min: i64, max: i64 },

    /// Underlying optimizer failure or numerical instability
    #[error("Model training failed: {0}")]
    ModelTraining(String),

    /// Error related to data validation or processing
    #[error("Validation error: {0}")]
    Validation(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from series math operations
    #[error("Math error: {0}")]
    Math(#[from] series_math::MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from CSV parsing
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
