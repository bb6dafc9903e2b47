//! Trend plus day-of-week decomposition with exogenous covariates
//!
//! The secondary learner: a least-squares trend over the day index,
//! day-of-week offsets from the detrended values, and a linear correction
//! from weather covariates fitted to what remains. Unlike the trees, every
//! component extrapolates beyond the training range, which makes this model
//! the more robust half of the ensemble on out-of-range dates.

use crate::error::{ForecastError, Result};
use crate::features::Dataset;
use crate::models::{
    chronological_split, check_trainable, validation_metrics, FittedModel, Learner, ModelKind,
    ValidationMetrics, VALIDATION_RATIO,
};
use series_math::regression::{fit_xy, multi_ols, LinearFit};
use tracing::debug;

/// Schema columns consumed by the decomposition
const DAY_INDEX: &str = "day_index";
const DAY_OF_WEEK: &str = "day_of_week";

/// Default exogenous covariates for the linear correction
const DEFAULT_COVARIATES: [&str; 2] = ["temp_avg", "precipitation"];

/// Seasonal-trend decomposition learner
#[derive(Debug, Clone)]
pub struct SeasonalTrend {
    covariates: Vec<String>,
}

impl SeasonalTrend {
    pub fn new() -> Self {
        Self {
            covariates: DEFAULT_COVARIATES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Use a custom set of exogenous covariate columns
    pub fn with_covariates(covariates: Vec<String>) -> Self {
        Self { covariates }
    }
}

impl Default for SeasonalTrend {
    fn default() -> Self {
        Self::new()
    }
}

impl Learner for SeasonalTrend {
    fn kind(&self) -> ModelKind {
        ModelKind::SeasonalTrend
    }

    fn fit(&self, data: &Dataset) -> Result<Box<dyn FittedModel>> {
        check_trainable(data)?;
        let (train, valid) = chronological_split(data, VALIDATION_RATIO)?;

        let day_index_col = column_index(&train, DAY_INDEX)?;
        let dow_col = column_index(&train, DAY_OF_WEEK)?;
        let covariate_cols: Vec<usize> = self
            .covariates
            .iter()
            .map(|name| column_index(&train, name))
            .collect::<Result<_>>()?;

        let day_indices: Vec<f64> = train.rows.iter().map(|r| r[day_index_col]).collect();
        let trend = fit_xy(&day_indices, &train.target)?;

        // Day-of-week offsets from the detrended values.
        let mut sums = [0.0f64; 7];
        let mut counts = [0usize; 7];
        for (row, &y) in train.rows.iter().zip(train.target.iter()) {
            let dow = row[dow_col] as usize % 7;
            sums[dow] += y - trend.value_at(row[day_index_col]);
            counts[dow] += 1;
        }
        let mut offsets = [0.0f64; 7];
        for dow in 0..7 {
            if counts[dow] > 0 {
                offsets[dow] = sums[dow] / counts[dow] as f64;
            }
        }

        // Linear correction from the exogenous covariates, fitted to the
        // residual after trend and seasonality. A singular system (constant
        // weather over the whole window) simply disables the correction.
        let residuals: Vec<f64> = train
            .rows
            .iter()
            .zip(train.target.iter())
            .map(|(row, &y)| {
                let dow = row[dow_col] as usize % 7;
                y - trend.value_at(row[day_index_col]) - offsets[dow]
            })
            .collect();
        let columns: Vec<Vec<f64>> = covariate_cols
            .iter()
            .map(|&c| train.rows.iter().map(|r| r[c]).collect())
            .collect();
        let exog_coef = match multi_ols(&columns, &residuals) {
            Ok(coef) => coef,
            Err(err) => {
                debug!(%err, "exogenous correction disabled");
                vec![0.0; covariate_cols.len() + 1]
            }
        };

        let model = FittedSeasonalTrend {
            trend,
            offsets,
            day_index_col,
            dow_col,
            covariate_cols,
            exog_coef,
            metrics: ValidationMetrics {
                mae: 0.0,
                rmse: 0.0,
                mape: 0.0,
                residual_std: 0.0,
                training_rows: 0,
                validation_rows: 0,
            },
        };

        let predictions: Vec<f64> = valid.rows.iter().map(|row| model.evaluate(row)).collect();
        let metrics = validation_metrics(&predictions, &valid.target, train.len())?;

        Ok(Box::new(FittedSeasonalTrend { metrics, ..model }))
    }
}

/// A fitted decomposition model
#[derive(Debug)]
pub struct FittedSeasonalTrend {
    trend: LinearFit,
    offsets: [f64; 7],
    day_index_col: usize,
    dow_col: usize,
    covariate_cols: Vec<usize>,
    exog_coef: Vec<f64>,
    metrics: ValidationMetrics,
}

impl FittedSeasonalTrend {
    fn evaluate(&self, row: &[f64]) -> f64 {
        let dow = row[self.dow_col] as usize % 7;
        let mut value = self.trend.value_at(row[self.day_index_col]) + self.offsets[dow];

        value += self.exog_coef[0];
        for (k, &col) in self.covariate_cols.iter().enumerate() {
            value += self.exog_coef[k + 1] * row[col];
        }

        value
    }
}

impl FittedModel for FittedSeasonalTrend {
    fn kind(&self) -> ModelKind {
        ModelKind::SeasonalTrend
    }

    fn predict(&self, row: &[f64]) -> Result<f64> {
        let required = self
            .covariate_cols
            .iter()
            .copied()
            .chain([self.day_index_col, self.dow_col])
            .max()
            .unwrap_or(0);
        if row.len() <= required {
            return Err(ForecastError::Validation(
                "Feature vector shorter than the trained schema".to_string(),
            ));
        }
        Ok(self.evaluate(row))
    }

    fn metrics(&self) -> &ValidationMetrics {
        &self.metrics
    }
}

fn column_index(data: &Dataset, name: &str) -> Result<usize> {
    data.schema.index(name).ok_or_else(|| {
        ForecastError::ModelTraining(format!("Required feature column '{}' is missing", name))
    })
}
