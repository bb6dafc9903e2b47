//! Ensemble combination of model outputs
//!
//! Blends per-model point predictions into a single estimate with a
//! confidence interval. The interval is derived from validation residual
//! spread under a normal assumption: lower = point − z·σ, upper = point +
//! z·σ. That is an approximation, not a coverage guarantee; backtests
//! measure the empirical coverage separately.

use crate::error::{ForecastError, Result};
use crate::models::{ModelKind, ModelVersion};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// One model's contribution to the ensemble
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    pub kind: ModelKind,
    pub version: ModelVersion,
    pub point: f64,
    /// Residual standard deviation from the model's validation split
    pub residual_std: f64,
}

/// Combined estimate with its interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combined {
    pub point: f64,
    pub lower: f64,
    pub upper: f64,
    /// Models that contributed, with the weight each received
    pub contributions: Vec<(ModelKind, ModelVersion, f64)>,
}

/// Non-negative per-kind blending weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleWeights {
    weights: Vec<(ModelKind, f64)>,
}

impl EnsembleWeights {
    /// Weights must be non-negative and sum to 1
    pub fn new(weights: Vec<(ModelKind, f64)>) -> Result<Self> {
        if weights.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "At least one ensemble weight is required".to_string(),
            ));
        }
        if weights.iter().any(|(_, w)| *w < 0.0) {
            return Err(ForecastError::InvalidParameter(
                "Ensemble weights must be non-negative".to_string(),
            ));
        }
        let sum: f64 = weights.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(ForecastError::InvalidParameter(format!(
                "Ensemble weights must sum to 1, got {}",
                sum
            )));
        }
        Ok(Self { weights })
    }

    fn weight_for(&self, kind: ModelKind) -> Option<f64> {
        self.weights
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, w)| *w)
    }
}

impl Default for EnsembleWeights {
    /// Short-history default: trust the trees more than the decomposition
    fn default() -> Self {
        Self {
            weights: vec![
                (ModelKind::GradientBoost, 0.7),
                (ModelKind::SeasonalTrend, 0.3),
            ],
        }
    }
}

/// Blends model outputs into one point estimate and interval
#[derive(Debug, Clone)]
pub struct EnsembleCombiner {
    weights: EnsembleWeights,
    confidence: f64,
    z: f64,
}

impl EnsembleCombiner {
    /// Create a combiner for the given confidence level (e.g. 0.90)
    pub fn new(weights: EnsembleWeights, confidence: f64) -> Result<Self> {
        if confidence <= 0.0 || confidence >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "Confidence level must be between 0 and 1".to_string(),
            ));
        }
        let normal = Normal::new(0.0, 1.0).map_err(|e| {
            ForecastError::Validation(format!("Normal distribution unavailable: {}", e))
        })?;
        let z = normal.inverse_cdf(0.5 + confidence / 2.0);
        Ok(Self {
            weights,
            confidence,
            z,
        })
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Combine model outputs into a single estimate.
    ///
    /// A single model passes through unchanged (weight 1). With several
    /// models, configured weights are renormalized over the kinds actually
    /// present. Bounds are clamped at zero: neither visitors nor sales can
    /// go negative.
    pub fn combine(&self, outputs: &[ModelOutput]) -> Result<Combined> {
        if outputs.is_empty() {
            return Err(ForecastError::Validation(
                "No model outputs to combine".to_string(),
            ));
        }

        let raw: Vec<f64> = if outputs.len() == 1 {
            vec![1.0]
        } else {
            outputs
                .iter()
                .map(|o| self.weights.weight_for(o.kind).unwrap_or(0.0))
                .collect()
        };

        let total: f64 = raw.iter().sum();
        let normalized: Vec<f64> = if total > 0.0 {
            raw.iter().map(|w| w / total).collect()
        } else {
            // None of the present kinds is configured; fall back to equal
            // weighting rather than refusing to serve.
            vec![1.0 / outputs.len() as f64; outputs.len()]
        };

        let point: f64 = outputs
            .iter()
            .zip(normalized.iter())
            .map(|(o, w)| w * o.point)
            .sum();
        let variance: f64 = outputs
            .iter()
            .zip(normalized.iter())
            .map(|(o, w)| w * o.residual_std * o.residual_std)
            .sum();
        let sigma = variance.sqrt();

        let point = point.max(0.0);
        let lower = (point - self.z * sigma).max(0.0);
        let upper = point + self.z * sigma;

        let contributions = outputs
            .iter()
            .zip(normalized.iter())
            .map(|(o, &w)| (o.kind, o.version, w))
            .collect();

        Ok(Combined {
            point,
            lower,
            upper,
            contributions,
        })
    }
}

impl Default for EnsembleCombiner {
    fn default() -> Self {
        Self {
            weights: EnsembleWeights::default(),
            confidence: 0.90,
            // Standard-normal quantile at 0.95, the 90% two-sided z
            z: 1.6448536269514722,
        }
    }
}
