//! Daily aggregation of receipt-level records
//!
//! Collapses a tenant's receipts into one [`DailyObservation`] per calendar
//! day. Visitor count is the number of distinct receipt identifiers, not the
//! row count; a receipt with three lines is still one visitor.

use crate::data::{DailyObservation, DailySeries, Receipt, TenantId};
use crate::error::Result;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Aggregates receipts into daily observations
#[derive(Debug)]
pub struct DailyAggregator;

/// Hashable identity of one receipt line, used to drop duplicate ingestion
/// of the same line. Amounts are compared bit-for-bit.
type LineKey = (String, chrono::NaiveDate, Option<chrono::NaiveTime>, u64, u64);

impl DailyAggregator {
    /// Aggregate a tenant's receipts into one observation per date present.
    ///
    /// The same receipt set aggregated twice produces identical output:
    /// duplicate lines are dropped before counting or summing. Dates with no
    /// receipts simply do not appear; sparse data is never an error. The only
    /// failure is a malformed tenant identifier.
    pub fn aggregate(tenant: &str, receipts: &[Receipt]) -> Result<Vec<DailyObservation>> {
        let tenant = TenantId::new(tenant)?;

        let mut seen: HashSet<LineKey> = HashSet::with_capacity(receipts.len());
        let mut days: BTreeMap<chrono::NaiveDate, (HashSet<&str>, f64)> = BTreeMap::new();

        for receipt in receipts {
            let key: LineKey = (
                receipt.receipt_no.clone(),
                receipt.date,
                receipt.time,
                receipt.line_amount.to_bits(),
                receipt.tax_amount.to_bits(),
            );
            if !seen.insert(key) {
                continue;
            }

            let entry = days
                .entry(receipt.date)
                .or_insert_with(|| (HashSet::new(), 0.0));
            entry.0.insert(receipt.receipt_no.as_str());
            entry.1 += receipt.line_amount + receipt.tax_amount;
        }

        let observations: Vec<DailyObservation> = days
            .into_iter()
            .map(|(date, (receipt_ids, sales_amount))| DailyObservation {
                date,
                visitor_count: receipt_ids.len() as u32,
                sales_amount,
            })
            .collect();

        debug!(
            tenant = %tenant,
            receipts = receipts.len(),
            days = observations.len(),
            "aggregated receipts into daily observations"
        );

        Ok(observations)
    }

    /// Aggregate and upsert into an existing series.
    ///
    /// Each aggregated date fully replaces any prior observation for that
    /// date; re-running the same batch leaves the series unchanged.
    pub fn apply(tenant: &str, receipts: &[Receipt], series: &mut DailySeries) -> Result<usize> {
        let observations = Self::aggregate(tenant, receipts)?;
        let count = observations.len();
        for obs in observations {
            series.upsert(obs);
        }
        Ok(count)
    }
}
