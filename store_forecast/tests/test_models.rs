use chrono::{Duration, NaiveDate};
use store_forecast::data::{DailyObservation, DailySeries, Target};
use store_forecast::error::ForecastError;
use store_forecast::exogenous::{ExogenousSeries, NoHolidays};
use store_forecast::features::{Dataset, FeatureBuilder, FeatureConfig};
use store_forecast::models::gradient_boost::{tune, GradientBoost, GradientBoostConfig, TuningGrid};
use store_forecast::models::seasonal_trend::SeasonalTrend;
use store_forecast::models::{chronological_split, Learner};
use std::time::Instant;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Weekday visitors 40, weekend 60, sales at ten times visitors
fn weekly_series(days: usize) -> DailySeries {
    let start = day(2024, 1, 1);
    let obs = (0..days)
        .map(|i| {
            let date = start + Duration::days(i as i64);
            let weekend = date.format("%a").to_string() == "Sat"
                || date.format("%a").to_string() == "Sun";
            let visitors = if weekend { 60 } else { 40 };
            DailyObservation {
                date,
                visitor_count: visitors,
                sales_amount: visitors as f64 * 10.0,
            }
        })
        .collect();
    DailySeries::from_observations(obs).unwrap()
}

fn weekly_dataset(days: usize, target: Target) -> Dataset {
    let series = weekly_series(days);
    let exog = ExogenousSeries::new();
    let builder = FeatureBuilder::new(FeatureConfig::default()).unwrap();
    builder
        .build(&series, &exog, &NoHolidays)
        .unwrap()
        .dataset(target)
}

#[test]
fn test_chronological_split_never_leaks_future_rows() {
    let data = weekly_dataset(120, Target::VisitorCount);
    let (train, valid) = chronological_split(&data, 0.2).unwrap();

    assert!(!train.is_empty());
    assert!(!valid.is_empty());
    assert_eq!(train.len() + valid.len(), data.len());

    let last_train = train.dates.iter().max().unwrap();
    let first_valid = valid.dates.iter().min().unwrap();
    assert!(last_train < first_valid);
}

#[test]
fn test_training_requires_thirty_eligible_rows() {
    // 89 days of history leaves 29 eligible rows under the default config.
    let short = weekly_dataset(89, Target::VisitorCount);
    assert_eq!(short.len(), 29);
    let result = GradientBoost::with_defaults().fit(&short);
    assert!(matches!(
        result,
        Err(ForecastError::InsufficientHistory {
            found: 29,
            required: 30
        })
    ));

    // One more day crosses the threshold.
    let enough = weekly_dataset(90, Target::VisitorCount);
    assert_eq!(enough.len(), 30);
    assert!(GradientBoost::with_defaults().fit(&enough).is_ok());
}

#[test]
fn test_gradient_boost_learns_weekly_pattern() {
    let data = weekly_dataset(120, Target::VisitorCount);
    let fitted = GradientBoost::with_defaults().fit(&data).unwrap();

    // Validation error should be far below the 10-visitor class spread.
    assert!(fitted.metrics().mae < 3.0, "mae = {}", fitted.metrics().mae);

    // A weekend row from the validation tail predicts near 60, a weekday
    // near 40.
    let weekend_col = data.schema.index("is_weekend").unwrap();
    for (row, &actual) in data.rows.iter().zip(data.target.iter()).rev().take(14) {
        let predicted = fitted.predict(row).unwrap();
        assert!(
            (predicted - actual).abs() < 8.0,
            "weekend={} predicted={} actual={}",
            row[weekend_col],
            predicted,
            actual
        );
    }
}

#[test]
fn test_gradient_boost_is_deterministic() {
    let data = weekly_dataset(100, Target::SalesAmount);

    let first = GradientBoost::with_defaults().fit(&data).unwrap();
    let second = GradientBoost::with_defaults().fit(&data).unwrap();

    assert_eq!(first.metrics(), second.metrics());
    for row in data.rows.iter().take(10) {
        assert_eq!(first.predict(row).unwrap(), second.predict(row).unwrap());
    }
}

#[test]
fn test_gradient_boost_reports_feature_importance() {
    let data = weekly_dataset(120, Target::VisitorCount);
    let fitted = GradientBoost::with_defaults().fit(&data).unwrap();

    let importance = fitted.feature_importance();
    assert!(!importance.is_empty());
    // Descending by gain.
    for pair in importance.windows(2) {
        assert!(pair[0].1 >= pair[1].1);
    }
}

#[test]
fn test_nan_in_matrix_fails_training() {
    let mut data = weekly_dataset(90, Target::VisitorCount);
    data.rows[3][5] = f64::NAN;

    let result = GradientBoost::with_defaults().fit(&data);
    assert!(matches!(result, Err(ForecastError::ModelTraining(_))));

    let mut data = weekly_dataset(90, Target::VisitorCount);
    data.target[7] = f64::INFINITY;
    let result = SeasonalTrend::new().fit(&data);
    assert!(matches!(result, Err(ForecastError::ModelTraining(_))));
}

#[test]
fn test_invalid_hyperparameters_are_rejected() {
    for config in [
        GradientBoostConfig {
            num_leaves: 1,
            ..GradientBoostConfig::default()
        },
        GradientBoostConfig {
            learning_rate: 0.0,
            ..GradientBoostConfig::default()
        },
        GradientBoostConfig {
            bagging_fraction: 1.5,
            ..GradientBoostConfig::default()
        },
    ] {
        assert!(GradientBoost::new(config).is_err());
    }
}

#[test]
fn test_seasonal_trend_learns_dow_offsets() {
    let data = weekly_dataset(120, Target::VisitorCount);
    let fitted = SeasonalTrend::new().fit(&data).unwrap();

    assert!(fitted.metrics().mae < 5.0, "mae = {}", fitted.metrics().mae);
}

#[test]
fn test_seasonal_trend_extrapolates_a_trend() {
    // Strictly increasing series: value = 100 + i.
    let start = day(2024, 1, 1);
    let obs: Vec<DailyObservation> = (0..120)
        .map(|i| DailyObservation {
            date: start + Duration::days(i as i64),
            visitor_count: (100 + i) as u32,
            sales_amount: (100 + i) as f64,
        })
        .collect();
    let series = DailySeries::from_observations(obs).unwrap();
    let builder = FeatureBuilder::new(FeatureConfig::default()).unwrap();
    let set = builder
        .build(&series, &ExogenousSeries::new(), &NoHolidays)
        .unwrap();
    let data = set.dataset(Target::VisitorCount);

    let fitted = SeasonalTrend::new().fit(&data).unwrap();

    // A prediction row 10 days past the end should continue the slope
    // instead of saturating at the last observed level.
    let row = builder
        .prediction_row(&series, None, &NoHolidays, start + Duration::days(129))
        .unwrap();
    let predicted = fitted.predict(&row.values).unwrap();
    assert!(
        (predicted - 229.0).abs() < 5.0,
        "expected ~229, got {}",
        predicted
    );
}

#[test]
fn test_tuning_selects_from_the_grid() {
    let data = weekly_dataset(100, Target::VisitorCount);
    let grid = TuningGrid {
        num_leaves: vec![7, 15],
        learning_rate: vec![0.05],
        lambda_l2: vec![0.1],
        bagging_fraction: vec![1.0],
    };

    let config = tune(&data, &grid, None).unwrap();
    assert!(grid.num_leaves.contains(&config.num_leaves));
    assert_eq!(config.bagging_fraction, 1.0);
}

#[test]
fn test_tuning_deadline_falls_back_to_defaults() {
    let data = weekly_dataset(100, Target::VisitorCount);

    // A deadline already in the past abandons the search immediately.
    let expired = Instant::now() - std::time::Duration::from_secs(1);
    let config = tune(&data, &TuningGrid::default(), Some(expired)).unwrap();

    assert_eq!(config, GradientBoostConfig::default());
}
