//! TTL'd forecast cache
//!
//! Avoids retraining for a (tenant, date) that was already answered
//! recently. Entries expire after a configurable TTL and are dropped
//! wholesale for a tenant when new data arrives or a retrain runs.

use crate::data::TenantId;
use crate::service::StoreForecast;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: StoreForecast,
    expires_at: Instant,
}

/// In-memory forecast cache keyed by (tenant, target date)
#[derive(Debug)]
pub struct ForecastCache {
    ttl: Duration,
    entries: HashMap<(TenantId, NaiveDate), CacheEntry>,
}

impl ForecastCache {
    /// Default time-to-live for cached forecasts
    pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Cached forecast for the key, if present and not expired
    pub fn get(&mut self, tenant: &TenantId, date: NaiveDate) -> Option<StoreForecast> {
        let key = (tenant.clone(), date);
        let expired = match self.entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                debug!(tenant = %tenant, %date, "forecast cache hit");
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(&key);
        }
        None
    }

    pub fn insert(&mut self, tenant: &TenantId, date: NaiveDate, value: StoreForecast) {
        self.entries.insert(
            (tenant.clone(), date),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop every entry for a tenant; returns how many were removed
    pub fn invalidate_tenant(&mut self, tenant: &TenantId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(t, _), _| t != tenant);
        before - self.entries.len()
    }

    /// Drop expired entries; returns how many were removed
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ForecastCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}
