use chrono::{Duration, NaiveDate};
use store_forecast::data::{DailyObservation, DailySeries, TenantId};
use store_forecast::exogenous::{ExogenousSeries, NoHolidays};
use store_forecast::models::registry::ModelRegistry;
use store_forecast::service::{ForecastService, ServiceConfig, TrainingOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Store Forecast: Basic Forecasting Example");
    println!("=========================================\n");

    // Create sample data
    println!("Creating sample history...");
    let series = create_sample_history(120);
    println!("Sample history created: {} days\n", series.len());

    let tenant = TenantId::new("demo-store")?;
    let exog = ExogenousSeries::new();

    // Train models
    println!("Training models...");
    let mut service = ForecastService::new(
        ServiceConfig::default(),
        ModelRegistry::new(),
        Box::new(NoHolidays),
    )?;
    let report = service.train(&tenant, &series, &exog, &TrainingOptions::default())?;

    println!("Models trained successfully\n");
    for run in &report.runs {
        println!(
            "  {} / {}: {} (MAE {:.2}, RMSE {:.2})",
            run.target, run.kind, run.version, run.metrics.mae, run.metrics.rmse
        );
    }

    // Forecast the next seven days
    println!("\nGenerating forecasts...");
    let as_of = series.last_date().expect("non-empty history");
    for days_ahead in 1..=7 {
        let date = as_of + Duration::days(days_ahead);
        let forecast = service.forecast(&tenant, &series, None, date, as_of)?;
        let v = &forecast.visitor_count;
        let s = &forecast.sales_amount;
        println!(
            "  {}: {:.0} visitors ({:.0}-{:.0}), sales {:.0} ({:.0}-{:.0})",
            date, v.point, v.lower, v.upper, s.point, s.lower, s.upper
        );
    }

    println!("\nForecasting complete!");
    Ok(())
}

/// Weekly pattern with a gentle upward trend
fn create_sample_history(days: usize) -> DailySeries {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
    let observations = (0..days)
        .map(|i| {
            let base = if i % 7 >= 5 { 62 } else { 41 };
            let visitors = base + (i / 30) as u32;
            DailyObservation {
                date: start + Duration::days(i as i64),
                visitor_count: visitors,
                sales_amount: visitors as f64 * 950.0,
            }
        })
        .collect();
    DailySeries::from_observations(observations).expect("unique dates")
}
