//! Forecast service: orchestration of the forecasting core
//!
//! Ties the aggregated history, feature builder, trainers, ensemble and
//! drift monitoring together behind one entry point per operation. The
//! service holds no global state: the model registry is injected and every
//! call names its tenant explicitly.

use crate::cache::ForecastCache;
use crate::data::{DailySeries, Target, TenantId};
use crate::drift::{DriftConfig, DriftMonitor, DriftSignal};
use crate::ensemble::{EnsembleCombiner, EnsembleWeights, ModelOutput};
use crate::error::{ForecastError, Result};
use crate::exogenous::{ExogenousSeries, HolidayCalendar, WeatherRecord};
use crate::features::{FeatureBuilder, FeatureConfig};
use crate::models::gradient_boost::{tune, GradientBoost, GradientBoostConfig, TuningGrid};
use crate::models::registry::ModelRegistry;
use crate::models::seasonal_trend::SeasonalTrend;
use crate::models::{
    Learner, ModelKind, ModelVersion, TrainedModel, ValidationMetrics, MIN_TRAINING_ROWS,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Minimum observed days before training or inference is attempted
pub const MIN_OBSERVED_DAYS: usize = 30;

/// Supported forecast horizon in days ahead of `as_of`
pub const MIN_HORIZON_DAYS: i64 = 1;
pub const MAX_HORIZON_DAYS: i64 = 14;

/// Service-level configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub features: FeatureConfig,
    pub weights: EnsembleWeights,
    /// Two-sided interval confidence, e.g. 0.90
    pub confidence: f64,
    pub cache_ttl: Duration,
    pub drift: DriftConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            weights: EnsembleWeights::default(),
            confidence: 0.90,
            cache_ttl: ForecastCache::DEFAULT_TTL,
            drift: DriftConfig::default(),
        }
    }
}

/// Options for one training run
#[derive(Debug, Clone, Default)]
pub struct TrainingOptions {
    /// Run the bounded hyperparameter search before fitting
    pub tune: bool,
    /// Abandon the search at this instant and fall back to defaults
    pub deadline: Option<Instant>,
}

/// Metrics and identity of one fitted model within a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRun {
    pub target: Target,
    pub kind: ModelKind,
    pub version: ModelVersion,
    pub metrics: ValidationMetrics,
    /// Highest-gain feature names, descending
    pub top_features: Vec<String>,
}

/// Structured report for one training invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub tenant: String,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub rows_total: usize,
    pub rows_eligible: usize,
    pub runs: Vec<TrainingRun>,
    pub trained_at: DateTime<Utc>,
}

impl TrainingReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ForecastError::Validation(format!("Report serialization failed: {}", e)))
    }
}

/// One target's forecast: point estimate, interval and provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub target: Target,
    pub date: NaiveDate,
    pub point: f64,
    pub lower: f64,
    pub upper: f64,
    /// Contributing models with their blend weight
    pub contributions: Vec<(ModelKind, ModelVersion, f64)>,
    pub generated_at: DateTime<Utc>,
    /// Weather came from the seasonal-average fallback
    pub exogenous_fallback: bool,
    /// Served while the drift monitor awaits a successful retrain
    pub stale: bool,
}

/// Both targets' forecasts for one (tenant, date)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreForecast {
    pub tenant: String,
    pub date: NaiveDate,
    pub visitor_count: ForecastResult,
    pub sales_amount: ForecastResult,
    pub generated_at: DateTime<Utc>,
}

/// Per-target backtest outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub mae: f64,
    /// Fraction of actuals inside the reported interval
    pub interval_coverage: f64,
}

/// Walk-forward backtest summary over a held-out tail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub holdout_days: usize,
    pub evaluated_days: usize,
    pub confidence: f64,
    pub visitor_count: BacktestMetrics,
    pub sales_amount: BacktestMetrics,
}

/// The forecasting core's orchestration facade
#[derive(Debug)]
pub struct ForecastService {
    builder: FeatureBuilder,
    combiner: EnsembleCombiner,
    registry: ModelRegistry,
    cache: ForecastCache,
    holidays: Box<dyn HolidayCalendar>,
    drift_config: DriftConfig,
    drift: HashMap<(TenantId, Target), DriftMonitor>,
}

impl ForecastService {
    pub fn new(
        config: ServiceConfig,
        registry: ModelRegistry,
        holidays: Box<dyn HolidayCalendar>,
    ) -> Result<Self> {
        let builder = FeatureBuilder::new(config.features)?;
        let combiner = EnsembleCombiner::new(config.weights, config.confidence)?;
        Ok(Self {
            builder,
            combiner,
            registry,
            cache: ForecastCache::new(config.cache_ttl),
            holidays,
            drift_config: config.drift,
            drift: HashMap::new(),
        })
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ModelRegistry {
        &mut self.registry
    }

    /// Train both targets' models on the tenant's current history.
    ///
    /// Fits the gradient-boosting baseline (mandatory) and the
    /// seasonal-trend secondary (skipped with a warning when it cannot fit).
    /// Registered models supersede prior versions; the forecast cache for
    /// the tenant is invalidated and the drift baseline reset.
    pub fn train(
        &mut self,
        tenant: &TenantId,
        series: &DailySeries,
        exog: &ExogenousSeries,
        options: &TrainingOptions,
    ) -> Result<TrainingReport> {
        ensure_min_history(series)?;

        let feature_set = self.builder.build(series, exog, self.holidays.as_ref())?;
        let rows_total = feature_set.rows.len();
        let rows_eligible = feature_set.eligible_count();

        info!(
            tenant = %tenant,
            rows_total,
            rows_eligible,
            tune = options.tune,
            "training started"
        );

        let mut runs = Vec::new();

        for target in Target::all() {
            let data = feature_set.dataset(target);
            if data.len() < MIN_TRAINING_ROWS {
                return Err(ForecastError::InsufficientHistory {
                    found: data.len(),
                    required: MIN_TRAINING_ROWS,
                });
            }

            let gb_config = if options.tune {
                tune(&data, &TuningGrid::default(), options.deadline)?
            } else {
                GradientBoostConfig::default()
            };

            let baseline = GradientBoost::new(gb_config)?;
            let fitted = baseline.fit(&data)?;
            let baseline_mae = fitted.metrics().mae;
            runs.push(self.register_run(tenant, target, &data, fitted)?);

            match SeasonalTrend::new().fit(&data) {
                Ok(fitted) => runs.push(self.register_run(tenant, target, &data, fitted)?),
                Err(err) => {
                    warn!(tenant = %tenant, target = %target, %err, "secondary model skipped");
                }
            }

            match self.drift.entry((tenant.clone(), target)) {
                Entry::Occupied(mut entry) => entry.get_mut().retrain_succeeded(baseline_mae),
                Entry::Vacant(entry) => {
                    entry.insert(DriftMonitor::new(baseline_mae, self.drift_config.clone())?);
                }
            }
        }

        self.cache.invalidate_tenant(tenant);

        Ok(TrainingReport {
            tenant: tenant.to_string(),
            window_start: series.first_date().unwrap_or_default(),
            window_end: series.last_date().unwrap_or_default(),
            rows_total,
            rows_eligible,
            runs,
            trained_at: Utc::now(),
        })
    }

    fn register_run(
        &mut self,
        tenant: &TenantId,
        target: Target,
        data: &crate::features::Dataset,
        fitted: Box<dyn crate::models::FittedModel>,
    ) -> Result<TrainingRun> {
        let kind = fitted.kind();
        let metrics = fitted.metrics().clone();
        let importance = fitted.feature_importance();
        let top_features: Vec<String> = importance
            .iter()
            .take(5)
            .map(|(name, _)| name.clone())
            .collect();

        let artifact = TrainedModel {
            version: ModelVersion(0),
            kind,
            target,
            window_start: *data.dates.first().ok_or_else(|| {
                ForecastError::Validation("Empty training dataset".to_string())
            })?,
            window_end: *data.dates.last().ok_or_else(|| {
                ForecastError::Validation("Empty training dataset".to_string())
            })?,
            metrics: metrics.clone(),
            trained_at: Utc::now(),
            feature_importance: importance,
        };

        let version = self.registry.register(tenant, artifact, Arc::from(fitted));

        Ok(TrainingRun {
            target,
            kind,
            version,
            metrics,
            top_features,
        })
    }

    /// Forecast both targets for a future date.
    ///
    /// The target date must lie 1 to 14 days after `as_of`. Weather for the
    /// date may be supplied by the caller; when absent, seasonal averages
    /// stand in and the result is flagged. Fails fast on insufficient
    /// history or missing models rather than guessing.
    pub fn forecast(
        &mut self,
        tenant: &TenantId,
        series: &DailySeries,
        weather: Option<&WeatherRecord>,
        target_date: NaiveDate,
        as_of: NaiveDate,
    ) -> Result<StoreForecast> {
        let horizon = (target_date - as_of).num_days();
        if !(MIN_HORIZON_DAYS..=MAX_HORIZON_DAYS).contains(&horizon) {
            return Err(ForecastError::InvalidHorizon {
                days: horizon,
                min: MIN_HORIZON_DAYS,
                max: MAX_HORIZON_DAYS,
            });
        }
        ensure_min_history(series)?;

        if let Some(cached) = self.cache.get(tenant, target_date) {
            return Ok(cached);
        }

        let row = self
            .builder
            .prediction_row(series, weather, self.holidays.as_ref(), target_date)?;

        let generated_at = Utc::now();
        let mut results = Vec::with_capacity(2);

        for target in Target::all() {
            let active = self.registry.active_models(tenant, target);
            if active.is_empty() {
                return Err(ForecastError::Validation(format!(
                    "No trained models for tenant {} target {}; train first",
                    tenant, target
                )));
            }

            let mut outputs = Vec::with_capacity(active.len());
            for stored in active {
                let point = stored.model.predict(&row.values)?;
                outputs.push(ModelOutput {
                    kind: stored.artifact.kind,
                    version: stored.artifact.version,
                    point,
                    residual_std: stored.artifact.metrics.residual_std,
                });
            }

            let combined = self.combiner.combine(&outputs)?;
            let stale = self
                .drift
                .get(&(tenant.clone(), target))
                .map(|m| m.is_stale())
                .unwrap_or(false);

            results.push(ForecastResult {
                target,
                date: target_date,
                point: combined.point,
                lower: combined.lower,
                upper: combined.upper,
                contributions: combined.contributions,
                generated_at,
                exogenous_fallback: row.exogenous_fallback,
                stale,
            });
        }

        let sales_amount = results.pop().ok_or_else(|| {
            ForecastError::Validation("Missing sales forecast".to_string())
        })?;
        let visitor_count = results.pop().ok_or_else(|| {
            ForecastError::Validation("Missing visitor forecast".to_string())
        })?;

        let forecast = StoreForecast {
            tenant: tenant.to_string(),
            date: target_date,
            visitor_count,
            sales_amount,
            generated_at,
        };

        self.cache.insert(tenant, target_date, forecast.clone());
        Ok(forecast)
    }

    /// Record an observed outcome against an earlier forecast.
    ///
    /// Feeds the tenant's drift monitor; the returned signal (if any) is the
    /// retraining request. A failed retrain afterwards leaves the monitor
    /// Drifted and subsequent forecasts flagged stale.
    pub fn record_actual(
        &mut self,
        tenant: &TenantId,
        target: Target,
        forecast_point: f64,
        actual: f64,
    ) -> Option<DriftSignal> {
        self.drift
            .get_mut(&(tenant.clone(), target))
            .and_then(|monitor| monitor.record(forecast_point, actual))
    }

    /// Drift state for a tenant and target, if a baseline exists
    pub fn drift_monitor(&self, tenant: &TenantId, target: Target) -> Option<&DriftMonitor> {
        self.drift.get(&(tenant.clone(), target))
    }

    /// Walk-forward backtest: train on all but the last `holdout_days`
    /// observations, forecast each held-out day, and measure accuracy and
    /// empirical interval coverage.
    pub fn backtest(
        &mut self,
        tenant: &TenantId,
        series: &DailySeries,
        exog: &ExogenousSeries,
        holdout_days: usize,
        options: &TrainingOptions,
    ) -> Result<BacktestReport> {
        if holdout_days == 0 || holdout_days as i64 > MAX_HORIZON_DAYS {
            return Err(ForecastError::InvalidParameter(format!(
                "Holdout must be between 1 and {} days",
                MAX_HORIZON_DAYS
            )));
        }
        if series.len() <= holdout_days {
            return Err(ForecastError::InsufficientHistory {
                found: series.len(),
                required: holdout_days + MIN_OBSERVED_DAYS,
            });
        }

        let obs = series.observations();
        let split = obs.len() - holdout_days;
        let train_series = DailySeries::from_observations(obs[..split].to_vec())?;
        let holdout = &obs[split..];

        self.train(tenant, &train_series, exog, options)?;
        let as_of = train_series
            .last_date()
            .ok_or_else(|| ForecastError::Validation("Empty training series".to_string()))?;

        let mut visitor_actual = Vec::new();
        let mut visitor_points = Vec::new();
        let mut visitor_intervals = Vec::new();
        let mut sales_actual = Vec::new();
        let mut sales_points = Vec::new();
        let mut sales_intervals = Vec::new();

        for o in holdout {
            let horizon = (o.date - as_of).num_days();
            if !(MIN_HORIZON_DAYS..=MAX_HORIZON_DAYS).contains(&horizon) {
                continue;
            }
            let weather = exog.get(o.date).cloned();
            let forecast =
                self.forecast(tenant, &train_series, weather.as_ref(), o.date, as_of)?;

            visitor_actual.push(o.visitor_count as f64);
            visitor_points.push(forecast.visitor_count.point);
            visitor_intervals.push((forecast.visitor_count.lower, forecast.visitor_count.upper));
            sales_actual.push(o.sales_amount);
            sales_points.push(forecast.sales_amount.point);
            sales_intervals.push((forecast.sales_amount.lower, forecast.sales_amount.upper));
        }

        if visitor_actual.is_empty() {
            return Err(ForecastError::Validation(
                "No held-out day fell inside the forecast horizon".to_string(),
            ));
        }

        let report = BacktestReport {
            holdout_days,
            evaluated_days: visitor_actual.len(),
            confidence: self.combiner.confidence(),
            visitor_count: BacktestMetrics {
                mae: series_math::metrics::mean_absolute_error(&visitor_points, &visitor_actual)?,
                interval_coverage: series_math::metrics::interval_coverage(
                    &visitor_actual,
                    &visitor_intervals,
                )?,
            },
            sales_amount: BacktestMetrics {
                mae: series_math::metrics::mean_absolute_error(&sales_points, &sales_actual)?,
                interval_coverage: series_math::metrics::interval_coverage(
                    &sales_actual,
                    &sales_intervals,
                )?,
            },
        };

        // Backtest forecasts were built on the truncated series; do not let
        // them answer real requests.
        self.cache.invalidate_tenant(tenant);

        Ok(report)
    }
}

fn ensure_min_history(series: &DailySeries) -> Result<()> {
    if series.len() < MIN_OBSERVED_DAYS {
        return Err(ForecastError::InsufficientHistory {
            found: series.len(),
            required: MIN_OBSERVED_DAYS,
        });
    }
    Ok(())
}
