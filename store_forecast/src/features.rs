//! Feature engineering for the daily series
//!
//! Turns a gap-aware [`DailySeries`] plus exogenous inputs into the feature
//! matrix the model trainers consume. The builder is pure: the same inputs
//! always produce bit-identical output, row order is date ascending, and no
//! feature ever looks at the row's own day or later (rolling windows end the
//! day before the row's date).

use crate::data::{DailySeries, Target};
use crate::error::{ForecastError, Result};
use crate::exogenous::{ExogenousSeries, HolidayCalendar, WeatherRecord};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Configuration for lag horizons, rolling windows and the history minimum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Lag horizons in days, per target
    pub lags: Vec<u32>,
    /// Rolling window lengths in days, per target
    pub windows: Vec<u32>,
    /// Window lengths for the rolling trend slope, per target
    pub trend_windows: Vec<u32>,
    /// Minimum observations that must back every lag reference
    pub min_history: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            lags: vec![1, 7, 14, 30],
            windows: vec![7, 14, 30],
            trend_windows: vec![7, 14],
            min_history: 30,
        }
    }
}

impl FeatureConfig {
    fn validate(&self) -> Result<()> {
        if self.min_history == 0 {
            return Err(ForecastError::InvalidParameter(
                "min_history must be positive".to_string(),
            ));
        }
        if self.lags.iter().chain(&self.windows).chain(&self.trend_windows).any(|&v| v == 0) {
            return Err(ForecastError::InvalidParameter(
                "Lag and window lengths must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Ordered column names shared by every row the builder produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    fn from_config(config: &FeatureConfig) -> Self {
        let mut columns: Vec<String> = [
            "year",
            "month",
            "day",
            "day_of_week",
            "day_of_year",
            "week_of_year",
            "quarter",
            "is_weekend",
            "is_monday",
            "is_friday",
            "is_sunday",
            "is_month_start",
            "is_month_end",
            "is_month_middle",
            "is_holiday",
            "is_day_before_holiday",
            "is_day_after_holiday",
            "dow_sin",
            "dow_cos",
            "month_sin",
            "month_cos",
            "day_index",
            "weather_code",
            "temp_max",
            "temp_min",
            "temp_avg",
            "temp_range",
            "precipitation",
            "is_rainy",
            "is_hot",
            "is_cold",
            "comfort_index",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        for target in Target::all() {
            let prefix = target.prefix();
            for h in &config.lags {
                columns.push(format!("{}_lag{}", prefix, h));
            }
            for w in &config.windows {
                columns.push(format!("{}_ma{}", prefix, w));
                columns.push(format!("{}_std{}", prefix, w));
                columns.push(format!("{}_min{}", prefix, w));
                columns.push(format!("{}_max{}", prefix, w));
            }
            for tw in &config.trend_windows {
                columns.push(format!("{}_trend{}", prefix, tw));
            }
            columns.push(format!("{}_dow_avg", prefix));
        }

        columns.push("avg_ticket_lag1".to_string());
        columns.push("avg_ticket_ma7".to_string());

        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a named column
    pub fn index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// One date's feature vector plus its targets and validity flags
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub values: Vec<f64>,
    pub visitor_actual: f64,
    pub sales_actual: f64,
    /// False when a required lag/rolling context is missing; such rows are
    /// excluded from training, never zero-imputed
    pub eligible: bool,
    /// True when a rolling window spanned a gap and was computed over fewer
    /// samples than its nominal length
    pub reduced_sample: bool,
    /// True when weather came from the seasonal-average fallback
    pub exogenous_fallback: bool,
}

/// Feature vector for a future date, built for inference
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRow {
    pub date: NaiveDate,
    pub values: Vec<f64>,
    pub reduced_sample: bool,
    pub exogenous_fallback: bool,
}

/// The full output of one build pass
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub schema: FeatureSchema,
    pub rows: Vec<FeatureRow>,
}

/// Training input for one target: eligible rows only, date ascending
#[derive(Debug, Clone)]
pub struct Dataset {
    pub schema: FeatureSchema,
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<Vec<f64>>,
    pub target: Vec<f64>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FeatureSet {
    pub fn eligible_count(&self) -> usize {
        self.rows.iter().filter(|r| r.eligible).count()
    }

    /// Extract the training dataset for one target variable.
    ///
    /// Only eligible rows enter the matrix; the target column itself is held
    /// out as the label vector.
    pub fn dataset(&self, target: Target) -> Dataset {
        let mut dates = Vec::new();
        let mut rows = Vec::new();
        let mut labels = Vec::new();

        for row in self.rows.iter().filter(|r| r.eligible) {
            dates.push(row.date);
            rows.push(row.values.clone());
            labels.push(match target {
                Target::VisitorCount => row.visitor_actual,
                Target::SalesAmount => row.sales_actual,
            });
        }

        Dataset {
            schema: self.schema.clone(),
            dates,
            rows,
            target: labels,
        }
    }
}

/// Builds feature rows from a daily series and exogenous inputs
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    config: FeatureConfig,
}

impl FeatureBuilder {
    pub fn new(config: FeatureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::from_config(&self.config)
    }

    /// Build one feature row per observation in the series.
    ///
    /// Rows whose lag context is incomplete are marked ineligible: a lag at
    /// horizon `h` must reference an observed day, the span between reference
    /// and row must contain no gap, and the referenced day must itself have
    /// at least `min_history` observations behind it.
    pub fn build(
        &self,
        series: &DailySeries,
        exog: &ExogenousSeries,
        holidays: &dyn HolidayCalendar,
    ) -> Result<FeatureSet> {
        let schema = self.schema();
        let obs = series.observations();
        if obs.is_empty() {
            return Ok(FeatureSet {
                schema,
                rows: Vec::new(),
            });
        }

        let first_date = obs[0].date;
        let visitor_values = series.values(Target::VisitorCount);
        let sales_values = series.values(Target::SalesAmount);

        let visitor_dow_avg = dow_expanding_means(obs.iter().map(|o| o.date), &visitor_values);
        let sales_dow_avg = dow_expanding_means(obs.iter().map(|o| o.date), &sales_values);

        let mut rows = Vec::with_capacity(obs.len());
        let mut ineligible = 0usize;

        for (i, o) in obs.iter().enumerate() {
            let date = o.date;
            let mut eligible = i >= self.config.min_history;
            let mut reduced_sample = false;

            let mut values = Vec::with_capacity(schema.len());
            push_calendar_features(&mut values, date, first_date, holidays);

            let (weather, exogenous_fallback) = exog.get_or_seasonal(date);
            push_weather_features(&mut values, &weather);

            for (target_values, dow_avg) in [
                (&visitor_values, &visitor_dow_avg),
                (&sales_values, &sales_dow_avg),
            ] {
                // Lags: strict for historical rows.
                for &h in &self.config.lags {
                    let reference = date - Duration::days(h as i64);
                    match series.index_of(reference) {
                        // Contiguous span iff the index distance equals the
                        // calendar distance.
                        Some(j) if i - j == h as usize && j >= self.config.min_history => {
                            values.push(target_values[j]);
                        }
                        _ => {
                            values.push(0.0);
                            eligible = false;
                        }
                    }
                }

                for &w in &self.config.windows {
                    let window = trailing_window(series, target_values, date, w);
                    if window.is_empty() {
                        values.extend_from_slice(&[0.0, 0.0, 0.0, 0.0]);
                        eligible = false;
                        continue;
                    }
                    if window.len() < w as usize {
                        reduced_sample = true;
                    }
                    let stats = series_math::rolling::window_stats(&window)?;
                    values.push(stats.mean);
                    values.push(stats.std_dev);
                    values.push(stats.min);
                    values.push(stats.max);
                }

                for &tw in &self.config.trend_windows {
                    let window = trailing_window(series, target_values, date, tw);
                    values.push(trend_slope(&window));
                    if !window.is_empty() && window.len() < tw as usize {
                        reduced_sample = true;
                    }
                }

                match dow_avg[i] {
                    Some(avg) => values.push(avg),
                    None => {
                        values.push(0.0);
                        eligible = false;
                    }
                }
            }

            push_ticket_features(&mut values, series, date, &mut eligible);

            debug_assert_eq!(values.len(), schema.len());

            if !eligible {
                ineligible += 1;
            }

            rows.push(FeatureRow {
                date,
                values,
                visitor_actual: o.visitor_count as f64,
                sales_actual: o.sales_amount,
                eligible,
                reduced_sample,
                exogenous_fallback,
            });
        }

        if ineligible > 0 {
            debug!(
                total = rows.len(),
                ineligible, "excluded rows lacking full lag/rolling context"
            );
        }

        Ok(FeatureSet { schema, rows })
    }

    /// Build the feature vector for a future target date.
    ///
    /// The target day has no history of its own, so lag references whose
    /// exact date is missing carry the nearest prior observation forward, and
    /// rolling windows that lie entirely beyond the history fall back to the
    /// most recent observations.
    pub fn prediction_row(
        &self,
        series: &DailySeries,
        weather_forecast: Option<&WeatherRecord>,
        holidays: &dyn HolidayCalendar,
        target_date: NaiveDate,
    ) -> Result<PredictionRow> {
        let schema = self.schema();
        let obs = series.observations();
        let last_date = series
            .last_date()
            .ok_or_else(|| ForecastError::Validation("Empty history".to_string()))?;
        if target_date <= last_date {
            return Err(ForecastError::Validation(format!(
                "Target date {} is not after the last observation {}",
                target_date, last_date
            )));
        }

        let first_date = obs[0].date;
        let visitor_values = series.values(Target::VisitorCount);
        let sales_values = series.values(Target::SalesAmount);

        let mut reduced_sample = false;
        let mut values = Vec::with_capacity(schema.len());
        push_calendar_features(&mut values, target_date, first_date, holidays);

        let (weather, exogenous_fallback) = match weather_forecast {
            Some(record) => (record.clone(), false),
            None => (WeatherRecord::seasonal_average(target_date), true),
        };
        push_weather_features(&mut values, &weather);

        for target_values in [&visitor_values, &sales_values] {
            for &h in &self.config.lags {
                let reference = target_date - Duration::days(h as i64);
                let value = match series.index_of(reference) {
                    Some(j) => target_values[j],
                    None => {
                        // Carry the nearest prior observation forward.
                        reduced_sample = true;
                        let j = nearest_prior_index(series, reference).unwrap_or(0);
                        target_values[j]
                    }
                };
                values.push(value);
            }

            for &w in &self.config.windows {
                let mut window = trailing_window(series, target_values, target_date, w);
                if window.len() < w as usize {
                    reduced_sample = true;
                }
                if window.is_empty() {
                    let take = (w as usize).min(target_values.len());
                    window = target_values[target_values.len() - take..].to_vec();
                }
                let stats = series_math::rolling::window_stats(&window)?;
                values.push(stats.mean);
                values.push(stats.std_dev);
                values.push(stats.min);
                values.push(stats.max);
            }

            for &tw in &self.config.trend_windows {
                let mut window = trailing_window(series, target_values, target_date, tw);
                if window.is_empty() {
                    let take = (tw as usize).min(target_values.len());
                    window = target_values[target_values.len() - take..].to_vec();
                }
                values.push(trend_slope(&window));
            }

            // Average of every historical observation on the same weekday,
            // falling back to the overall mean for a weekday never seen.
            let dow = weekday_number(target_date);
            let same_dow: Vec<f64> = obs
                .iter()
                .zip(target_values.iter())
                .filter(|(o, _)| weekday_number(o.date) == dow)
                .map(|(_, &v)| v)
                .collect();
            if same_dow.is_empty() {
                values.push(series_math::rolling::mean(target_values));
            } else {
                values.push(series_math::rolling::mean(&same_dow));
            }
        }

        let mut always_eligible = true;
        push_ticket_features(&mut values, series, target_date, &mut always_eligible);
        if !always_eligible {
            // No prior day ever had a visitor; fall back to zero spend.
            reduced_sample = true;
        }

        debug_assert_eq!(values.len(), schema.len());

        Ok(PredictionRow {
            date: target_date,
            values,
            reduced_sample,
            exogenous_fallback,
        })
    }
}

/// Monday = 0 ... Sunday = 6
fn weekday_number(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

fn push_calendar_features(
    values: &mut Vec<f64>,
    date: NaiveDate,
    first_date: NaiveDate,
    holidays: &dyn HolidayCalendar,
) {
    let dow = weekday_number(date);
    let month = date.month();
    let day = date.day();

    values.push(date.year() as f64);
    values.push(month as f64);
    values.push(day as f64);
    values.push(dow as f64);
    values.push(date.ordinal() as f64);
    values.push(date.iso_week().week() as f64);
    values.push(((month - 1) / 3 + 1) as f64);
    values.push(flag(dow >= 5));
    values.push(flag(dow == 0));
    values.push(flag(dow == 4));
    values.push(flag(dow == 6));
    values.push(flag(day <= 5));
    values.push(flag(day >= 25));
    values.push(flag((10..=20).contains(&day)));
    values.push(flag(holidays.is_holiday(date)));
    values.push(flag(holidays.is_holiday(date + Duration::days(1))));
    values.push(flag(holidays.is_holiday(date - Duration::days(1))));
    values.push((2.0 * PI * dow as f64 / 7.0).sin());
    values.push((2.0 * PI * dow as f64 / 7.0).cos());
    values.push((2.0 * PI * month as f64 / 12.0).sin());
    values.push((2.0 * PI * month as f64 / 12.0).cos());
    values.push((date - first_date).num_days() as f64);
}

fn push_weather_features(values: &mut Vec<f64>, weather: &WeatherRecord) {
    let impact = weather.impact();
    values.push(impact.condition_code);
    values.push(weather.temp_max);
    values.push(weather.temp_min);
    values.push(impact.temp_avg);
    values.push(impact.temp_range);
    values.push(weather.precipitation);
    values.push(flag(impact.is_rainy));
    values.push(flag(impact.is_hot));
    values.push(flag(impact.is_cold));
    values.push(impact.comfort_index);
}

/// Average-ticket interaction features: the most recent prior day's ticket
/// and the trailing 7-day mean, both skipping zero-visitor days.
fn push_ticket_features(
    values: &mut Vec<f64>,
    series: &DailySeries,
    date: NaiveDate,
    eligible: &mut bool,
) {
    let obs = series.observations();
    let end = obs.partition_point(|o| o.date < date);

    let lag1 = obs[..end].iter().rev().find_map(|o| o.avg_ticket());
    match lag1 {
        Some(v) => values.push(v),
        None => {
            values.push(0.0);
            *eligible = false;
        }
    }

    let window_start = date - Duration::days(7);
    let tickets: Vec<f64> = obs[..end]
        .iter()
        .filter(|o| o.date >= window_start)
        .filter_map(|o| o.avg_ticket())
        .collect();
    if tickets.is_empty() {
        values.push(lag1.unwrap_or(0.0));
    } else {
        values.push(series_math::rolling::mean(&tickets));
    }
}

/// Index of the latest observation on or before `date`, if any
fn nearest_prior_index(series: &DailySeries, date: NaiveDate) -> Option<usize> {
    let obs = series.observations();
    let end = obs.partition_point(|o| o.date <= date);
    if end == 0 {
        None
    } else {
        Some(end - 1)
    }
}

/// Values of observations in the calendar window `[date - w, date - 1]`
fn trailing_window(
    series: &DailySeries,
    target_values: &[f64],
    date: NaiveDate,
    w: u32,
) -> Vec<f64> {
    let obs = series.observations();
    let start_date = date - Duration::days(w as i64);
    let start = obs.partition_point(|o| o.date < start_date);
    let end = obs.partition_point(|o| o.date < date);
    target_values[start..end].to_vec()
}

/// Slope of a least-squares line through the window, 0.0 when degenerate
fn trend_slope(window: &[f64]) -> f64 {
    match series_math::regression::fit_trend(window) {
        Ok(fit) => fit.slope,
        Err(_) => 0.0,
    }
}

/// Expanding same-weekday mean, shifted so a row never sees its own value
fn dow_expanding_means<I: Iterator<Item = NaiveDate>>(
    dates: I,
    values: &[f64],
) -> Vec<Option<f64>> {
    let mut sums = [0.0f64; 7];
    let mut counts = [0usize; 7];
    let mut out = Vec::with_capacity(values.len());

    for (date, &value) in dates.zip(values.iter()) {
        let dow = weekday_number(date) as usize;
        if counts[dow] == 0 {
            out.push(None);
        } else {
            out.push(Some(sums[dow] / counts[dow] as f64));
        }
        sums[dow] += value;
        counts[dow] += 1;
    }

    out
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}
