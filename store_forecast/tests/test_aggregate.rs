use chrono::{NaiveDate, NaiveTime};
use std::io::Write;
use store_forecast::aggregate::DailyAggregator;
use store_forecast::data::{DailySeries, DataLoader, Receipt, TenantId};
use store_forecast::error::ForecastError;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn receipt(no: &str, date: NaiveDate, line: f64, tax: f64) -> Receipt {
    Receipt {
        receipt_no: no.to_string(),
        date,
        time: Some(NaiveTime::from_hms_opt(12, 30, 0).unwrap()),
        line_amount: line,
        tax_amount: tax,
    }
}

#[test]
fn test_visitor_count_is_distinct_receipts_not_rows() {
    let d = day(2024, 3, 1);
    // Receipt R1 has two lines, R2 one.
    let receipts = vec![
        receipt("R1", d, 100.0, 10.0),
        receipt("R1", d, 200.0, 20.0),
        receipt("R2", d, 50.0, 5.0),
    ];

    let obs = DailyAggregator::aggregate("store-1", &receipts).unwrap();

    assert_eq!(obs.len(), 1);
    assert_eq!(obs[0].visitor_count, 2);
    assert!((obs[0].sales_amount - 385.0).abs() < 1e-9);
}

#[test]
fn test_aggregation_is_idempotent_under_reingestion() {
    let d = day(2024, 3, 1);
    let batch = vec![
        receipt("R1", d, 100.0, 10.0),
        receipt("R2", d, 50.0, 5.0),
    ];

    let once = DailyAggregator::aggregate("store-1", &batch).unwrap();

    // The same receipts ingested twice over.
    let mut doubled = batch.clone();
    doubled.extend(batch.clone());
    let twice = DailyAggregator::aggregate("store-1", &doubled).unwrap();

    assert_eq!(once, twice);
}

#[test]
fn test_reaggregation_replaces_prior_values() {
    let d = day(2024, 3, 1);
    let mut series = DailySeries::new();

    let first = vec![receipt("R1", d, 100.0, 10.0)];
    DailyAggregator::apply("store-1", &first, &mut series).unwrap();
    assert_eq!(series.get(d).unwrap().visitor_count, 1);

    // A corrected batch for the same date fully replaces, never accumulates.
    let corrected = vec![
        receipt("R1", d, 100.0, 10.0),
        receipt("R2", d, 30.0, 3.0),
    ];
    DailyAggregator::apply("store-1", &corrected, &mut series).unwrap();

    let obs = series.get(d).unwrap();
    assert_eq!(obs.visitor_count, 2);
    assert!((obs.sales_amount - 143.0).abs() < 1e-9);
    assert_eq!(series.len(), 1);
}

#[test]
fn test_dates_without_receipts_are_gaps_not_zeros() {
    let receipts = vec![
        receipt("R1", day(2024, 3, 1), 100.0, 10.0),
        receipt("R2", day(2024, 3, 3), 50.0, 5.0),
    ];

    let obs = DailyAggregator::aggregate("store-1", &receipts).unwrap();

    assert_eq!(obs.len(), 2);
    assert!(obs.iter().all(|o| o.date != day(2024, 3, 2)));

    let series = DailySeries::from_observations(obs).unwrap();
    assert!(series.get(day(2024, 3, 2)).is_none());
}

#[test]
fn test_malformed_tenant_is_the_only_error() {
    // Sparse data is fine.
    assert!(DailyAggregator::aggregate("store-1", &[]).unwrap().is_empty());

    let too_long = "x".repeat(65);
    for bad in ["", "store 1", "store/1", too_long.as_str()] {
        let result = DailyAggregator::aggregate(bad, &[]);
        assert!(matches!(result, Err(ForecastError::InvalidTenant(_))));
    }
}

#[test]
fn test_tenant_id_validation() {
    assert!(TenantId::new("store-1").is_ok());
    assert!(TenantId::new("STORE_42").is_ok());
    assert!(TenantId::new("店舗").is_err());
}

#[test]
fn test_avg_ticket_undefined_for_zero_visitors() {
    let obs = store_forecast::data::DailyObservation {
        date: day(2024, 3, 1),
        visitor_count: 0,
        sales_amount: 0.0,
    };
    assert!(obs.avg_ticket().is_none());
}

#[test]
fn test_receipts_from_csv() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "receipt_no,sales_date,sales_time,subtotal,tax_amount").unwrap();
    writeln!(file, "R1,2024-03-01,09:15:00,1200.0,120.0").unwrap();
    writeln!(file, "R2,2024-03-01,,800.0,80.0").unwrap();
    file.flush().unwrap();

    let receipts = DataLoader::receipts_from_csv(file.path()).unwrap();

    assert_eq!(receipts.len(), 2);
    assert_eq!(receipts[0].receipt_no, "R1");
    assert_eq!(receipts[0].date, day(2024, 3, 1));
    assert!(receipts[0].time.is_some());
    assert!(receipts[1].time.is_none());

    let obs = DailyAggregator::aggregate("store-1", &receipts).unwrap();
    assert_eq!(obs[0].visitor_count, 2);
    assert!((obs[0].sales_amount - 2200.0).abs() < 1e-9);
}

#[test]
fn test_daily_from_csv_rejects_duplicate_dates() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "date,visitor_count,sales_amount").unwrap();
    writeln!(file, "2024-03-01,10,1000.0").unwrap();
    writeln!(file, "2024-03-01,12,1200.0").unwrap();
    file.flush().unwrap();

    assert!(DataLoader::daily_from_csv(file.path()).is_err());
}
