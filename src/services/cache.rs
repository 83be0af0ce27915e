//! Fetch cache
//!
//! Entries are keyed by (symbol, start day, end day, resolution) and live for a fixed TTL.
//! Each entry holds the series plus an eagerly computed indicator bundle. Expired entries
//! are treated as absent; nothing is evicted except by `clear`.

use crate::analysis::indicators::calculate_common_indicators;
use crate::constants::CACHE_TTL_SECONDS;
use crate::models::{IndicatorMap, Resolution, Series};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::time::parse_date;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub start: String,
    pub end: String,
    pub resolution: Resolution,
}

impl CacheKey {
    /// Build a key, dropping any time-of-day from `start`/`end`
    pub fn new(symbol: &str, start: &str, end: &str, resolution: Resolution) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            start: normalize_day(start),
            end: normalize_day(end),
            resolution,
        }
    }

    pub fn for_dates(symbol: &str, start: NaiveDate, end: NaiveDate, resolution: Resolution) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            start: start.format("%Y-%m-%d").to_string(),
            end: end.format("%Y-%m-%d").to_string(),
            resolution,
        }
    }
}

fn normalize_day(raw: &str) -> String {
    match parse_date(raw) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => raw.trim().chars().take(10).collect(),
    }
}

#[derive(Debug)]
struct CacheEntry {
    series: Arc<Series>,
    indicators: Arc<IndicatorMap>,
    created_at: DateTime<Utc>,
}

/// A cache hit
#[derive(Debug, Clone)]
pub struct CachedData {
    pub series: Arc<Series>,
    pub indicators: Arc<IndicatorMap>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
}

pub struct FetchCache {
    entries: RwLock<HashMap<CacheKey, Arc<CacheEntry>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::new(CACHE_TTL_SECONDS, Arc::new(SystemClock))
    }
}

impl FetchCache {
    pub fn new(ttl_secs: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs),
            clock,
        }
    }

    fn is_valid(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.created_at < self.ttl
    }

    /// `None` when absent or expired
    pub async fn get(&self, key: &CacheKey) -> Option<CachedData> {
        let entries = self.entries.read().await;
        let now = self.clock.now();

        match entries.get(key) {
            Some(entry) if self.is_valid(entry, now) => {
                debug!(symbol = %key.symbol, start = %key.start, end = %key.end, "Cache hit");
                Some(CachedData {
                    series: entry.series.clone(),
                    indicators: entry.indicators.clone(),
                    created_at: entry.created_at,
                })
            }
            Some(_) => {
                debug!(symbol = %key.symbol, start = %key.start, end = %key.end, "Cache expired");
                None
            }
            None => {
                debug!(symbol = %key.symbol, start = %key.start, end = %key.end, "Cache miss");
                None
            }
        }
    }

    /// Store `series` and its indicator bundle, replacing any previous entry as a whole
    pub async fn put(&self, key: CacheKey, series: Arc<Series>) -> CachedData {
        // computed outside the lock
        let indicators = Arc::new(calculate_common_indicators(&series));
        let entry = Arc::new(CacheEntry {
            series,
            indicators,
            created_at: self.clock.now(),
        });

        let data = CachedData {
            series: entry.series.clone(),
            indicators: entry.indicators.clone(),
            created_at: entry.created_at,
        };

        debug!(symbol = %key.symbol, rows = data.series.len(), "Cache put");
        self.entries.write().await.insert(key, entry);
        data
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        debug!(removed, "Cache cleared");
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let now = self.clock.now();
        CacheStats {
            total: entries.len(),
            valid: entries.values().filter(|e| self.is_valid(e, now)).count(),
        }
    }
}
