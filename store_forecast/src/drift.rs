//! Drift detection over live forecast errors
//!
//! A two-state machine per (tenant, target): Stable until the rolling mean
//! absolute error of the last K outcomes exceeds the training-time baseline
//! by more than a relative threshold, then Drifted until a retrain succeeds.
//! Drift is an operational signal, not an error; forecasts keep being served
//! while Drifted, flagged as stale.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{info, warn};

/// Drift monitor state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriftState {
    Stable,
    Drifted,
}

/// Configuration for the drift check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Number of recent outcomes in the rolling window
    pub window: usize,
    /// Relative degradation over baseline that triggers drift (0.2 = 20%)
    pub relative_threshold: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            window: 14,
            relative_threshold: 0.2,
        }
    }
}

impl DriftConfig {
    fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(ForecastError::InvalidParameter(
                "Drift window must be positive".to_string(),
            ));
        }
        if self.relative_threshold <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "Drift threshold must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Emitted once per Stable → Drifted transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftSignal {
    pub rolling_mae: f64,
    pub baseline_mae: f64,
    /// Ratio of rolling to baseline MAE
    pub degradation: f64,
}

/// Rolling-error drift monitor
#[derive(Debug, Clone)]
pub struct DriftMonitor {
    config: DriftConfig,
    baseline_mae: f64,
    errors: VecDeque<f64>,
    state: DriftState,
}

impl DriftMonitor {
    pub fn new(baseline_mae: f64, config: DriftConfig) -> Result<Self> {
        config.validate()?;
        if !baseline_mae.is_finite() || baseline_mae < 0.0 {
            return Err(ForecastError::InvalidParameter(
                "Baseline MAE must be a non-negative number".to_string(),
            ));
        }
        Ok(Self {
            config,
            baseline_mae,
            errors: VecDeque::new(),
            state: DriftState::Stable,
        })
    }

    pub fn state(&self) -> DriftState {
        self.state
    }

    /// True while a retrain is pending; served forecasts carry this flag
    pub fn is_stale(&self) -> bool {
        self.state == DriftState::Drifted
    }

    pub fn baseline_mae(&self) -> f64 {
        self.baseline_mae
    }

    /// Rolling mean absolute error over the current window, if full
    pub fn rolling_mae(&self) -> Option<f64> {
        if self.errors.len() < self.config.window {
            return None;
        }
        Some(self.errors.iter().sum::<f64>() / self.errors.len() as f64)
    }

    /// Record one (forecast, actual) outcome.
    ///
    /// Returns a signal exactly on the Stable → Drifted transition; while
    /// already Drifted, further degradation does not re-trigger.
    pub fn record(&mut self, forecast: f64, actual: f64) -> Option<DriftSignal> {
        self.errors.push_back((actual - forecast).abs());
        if self.errors.len() > self.config.window {
            self.errors.pop_front();
        }

        if self.state == DriftState::Drifted {
            return None;
        }

        let rolling = self.rolling_mae()?;
        // A zero-error baseline drifts on any sustained error at all.
        let limit = self.baseline_mae * (1.0 + self.config.relative_threshold);
        if rolling > limit {
            self.state = DriftState::Drifted;
            let signal = DriftSignal {
                rolling_mae: rolling,
                baseline_mae: self.baseline_mae,
                degradation: if self.baseline_mae > 0.0 {
                    rolling / self.baseline_mae
                } else {
                    f64::INFINITY
                },
            };
            warn!(
                rolling_mae = rolling,
                baseline_mae = self.baseline_mae,
                "forecast drift detected, retraining requested"
            );
            return Some(signal);
        }

        None
    }

    /// A retrain finished with acceptable metrics: adopt the new baseline
    /// and return to Stable
    pub fn retrain_succeeded(&mut self, new_baseline_mae: f64) {
        info!(
            old_baseline = self.baseline_mae,
            new_baseline = new_baseline_mae,
            "retrain complete, drift monitor reset"
        );
        self.baseline_mae = new_baseline_mae;
        self.errors.clear();
        self.state = DriftState::Stable;
    }

    /// A retrain failed; stay Drifted and keep serving flagged forecasts
    pub fn retrain_failed(&mut self) {
        warn!("retrain failed, forecasts remain flagged as stale");
    }
}
