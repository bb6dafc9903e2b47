//! # Store Forecast
//!
//! A Rust library for forecasting a store's daily visitor count and sales
//! total from point-of-sale receipt history and weather observations.
//!
//! ## Features
//!
//! - Receipt aggregation into a gap-aware daily series
//! - Calendar, lag, rolling-window and weather feature engineering
//! - Gradient-boosted trees plus a seasonal-trend decomposition, blended by
//!   a weighted ensemble with residual-based confidence intervals
//! - Chronological validation, never shuffled
//! - Drift monitoring over live forecast errors with retraining signals
//! - A versioned model registry with rollback
//!
//! ## Quick Start
//!
//! ```no_run
//! use store_forecast::aggregate::DailyAggregator;
//! use store_forecast::data::{DailySeries, TenantId};
//! use store_forecast::exogenous::{ExogenousSeries, NoHolidays};
//! use store_forecast::models::registry::ModelRegistry;
//! use store_forecast::service::{ForecastService, ServiceConfig, TrainingOptions};
//!
//! # fn main() -> store_forecast::Result<()> {
//! # let receipts = Vec::new();
//! # let as_of = chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//! # let target_date = chrono::NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
//! let tenant = TenantId::new("store-1")?;
//!
//! // Aggregate receipts into the daily series
//! let mut series = DailySeries::new();
//! DailyAggregator::apply("store-1", &receipts, &mut series)?;
//!
//! // Train and forecast
//! let mut service = ForecastService::new(
//!     ServiceConfig::default(),
//!     ModelRegistry::new(),
//!     Box::new(NoHolidays),
//! )?;
//! let exog = ExogenousSeries::new();
//! let report = service.train(&tenant, &series, &exog, &TrainingOptions::default())?;
//! let forecast = service.forecast(&tenant, &series, None, target_date, as_of)?;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod cache;
pub mod data;
pub mod drift;
pub mod ensemble;
pub mod error;
pub mod exogenous;
pub mod features;
pub mod models;
pub mod service;

// Re-export commonly used types
pub use crate::aggregate::DailyAggregator;
pub use crate::data::{DailyObservation, DailySeries, Receipt, Target, TenantId};
pub use crate::drift::{DriftMonitor, DriftSignal, DriftState};
pub use crate::ensemble::EnsembleCombiner;
pub use crate::error::{ForecastError, Result};
pub use crate::features::FeatureBuilder;
pub use crate::models::{FittedModel, Learner, ModelKind, ModelVersion, TrainedModel};
pub use crate::service::{ForecastService, ForecastResult, StoreForecast, TrainingReport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
