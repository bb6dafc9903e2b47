//! Receipt and daily series data handling

use crate::error::{ForecastError, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Target variable a model is trained to predict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    VisitorCount,
    SalesAmount,
}

impl Target {
    /// Column prefix used for lag and rolling feature names
    pub fn prefix(&self) -> &'static str {
        match self {
            Target::VisitorCount => "visitor",
            Target::SalesAmount => "sales",
        }
    }

    /// Both targets, in a fixed order
    pub fn all() -> [Target; 2] {
        [Target::VisitorCount, Target::SalesAmount]
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::VisitorCount => write!(f, "visitor_count"),
            Target::SalesAmount => write!(f, "sales_amount"),
        }
    }
}

/// Validated store/account identifier.
///
/// Tenants are isolated from one another; every aggregation, training and
/// forecasting call operates on a single tenant's data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    pub const MAX_LEN: usize = 64;

    /// Parse and validate a raw tenant identifier
    pub fn new(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(ForecastError::InvalidTenant("empty identifier".to_string()));
        }
        if raw.len() > Self::MAX_LEN {
            return Err(ForecastError::InvalidTenant(format!(
                "identifier longer than {} characters",
                Self::MAX_LEN
            )));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ForecastError::InvalidTenant(format!(
                "identifier '{}' contains unsupported characters",
                raw
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One point-of-sale receipt line.
///
/// A receipt may span multiple lines; the receipt number ties them together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Receipt identifier, shared by all lines of one receipt
    pub receipt_no: String,
    /// Transaction date
    pub date: NaiveDate,
    /// Transaction time, when the export carries one
    pub time: Option<NaiveTime>,
    /// Line amount before tax
    pub line_amount: f64,
    /// Tax amount for this line
    pub tax_amount: f64,
}

/// One calendar day's aggregated figures for a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyObservation {
    pub date: NaiveDate,
    /// Count of distinct receipts that day
    pub visitor_count: u32,
    /// Sum of line and tax amounts across all receipts that day
    pub sales_amount: f64,
}

impl DailyObservation {
    /// Average spend per visitor; `None` when the day had no visitors
    pub fn avg_ticket(&self) -> Option<f64> {
        if self.visitor_count == 0 {
            None
        } else {
            Some(self.sales_amount / self.visitor_count as f64)
        }
    }
}

/// Date-ascending, gap-aware sequence of daily observations.
///
/// Missing dates stay missing; the series never interpolates a gap to zero.
#[derive(Debug, Clone, Default)]
pub struct DailySeries {
    observations: Vec<DailyObservation>,
}

impl DailySeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from unordered observations.
    ///
    /// Duplicate dates are rejected; callers that need replacement semantics
    /// go through [`DailySeries::upsert`].
    pub fn from_observations(mut observations: Vec<DailyObservation>) -> Result<Self> {
        observations.sort_by_key(|o| o.date);
        for pair in observations.windows(2) {
            if pair[0].date == pair[1].date {
                return Err(ForecastError::Validation(format!(
                    "Duplicate observation for {}",
                    pair[0].date
                )));
            }
        }
        Ok(Self { observations })
    }

    /// Insert or fully replace the observation for its date
    pub fn upsert(&mut self, obs: DailyObservation) {
        match self
            .observations
            .binary_search_by_key(&obs.date, |o| o.date)
        {
            Ok(idx) => self.observations[idx] = obs,
            Err(idx) => self.observations.insert(idx, obs),
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyObservation> {
        self.index_of(date).map(|i| &self.observations[i])
    }

    /// Position of `date` in the series, if observed
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.observations
            .binary_search_by_key(&date, |o| o.date)
            .ok()
    }

    pub fn observations(&self) -> &[DailyObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    /// Target values in date order
    pub fn values(&self, target: Target) -> Vec<f64> {
        self.observations
            .iter()
            .map(|o| match target {
                Target::VisitorCount => o.visitor_count as f64,
                Target::SalesAmount => o.sales_amount,
            })
            .collect()
    }
}

/// Raw journal export row as it appears in the CSV
#[derive(Debug, Deserialize)]
struct JournalRow {
    receipt_no: String,
    sales_date: String,
    sales_time: Option<String>,
    subtotal: f64,
    tax_amount: f64,
}

/// Loader for bulk receipt and observation data
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load receipts from a journal export CSV.
    ///
    /// Expected columns: `receipt_no, sales_date, sales_time, subtotal,
    /// tax_amount`, with dates as `YYYY-MM-DD` and times as `HH:MM:SS`.
    pub fn receipts_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Receipt>> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut receipts = Vec::new();

        for row in reader.deserialize() {
            let row: JournalRow = row?;
            let date = row.sales_date.parse::<NaiveDate>().map_err(|e| {
                ForecastError::Validation(format!(
                    "Unparsable sales_date '{}': {}",
                    row.sales_date, e
                ))
            })?;
            let time = match &row.sales_time {
                Some(t) if !t.is_empty() => Some(t.parse::<NaiveTime>().map_err(|e| {
                    ForecastError::Validation(format!("Unparsable sales_time '{}': {}", t, e))
                })?),
                _ => None,
            };
            receipts.push(Receipt {
                receipt_no: row.receipt_no,
                date,
                time,
                line_amount: row.subtotal,
                tax_amount: row.tax_amount,
            });
        }

        Ok(receipts)
    }

    /// Load pre-aggregated daily observations from a CSV with columns
    /// `date, visitor_count, sales_amount`.
    pub fn daily_from_csv<P: AsRef<Path>>(path: P) -> Result<DailySeries> {
        #[derive(Deserialize)]
        struct DailyRow {
            date: String,
            visitor_count: u32,
            sales_amount: f64,
        }

        let mut reader = csv::Reader::from_path(path)?;
        let mut observations = Vec::new();

        for row in reader.deserialize() {
            let row: DailyRow = row?;
            let date = row.date.parse::<NaiveDate>().map_err(|e| {
                ForecastError::Validation(format!("Unparsable date '{}': {}", row.date, e))
            })?;
            observations.push(DailyObservation {
                date,
                visitor_count: row.visitor_count,
                sales_amount: row.sales_amount,
            });
        }

        DailySeries::from_observations(observations)
    }
}
