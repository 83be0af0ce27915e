//! Symbol universe
//!
//! Downloads a one-column CSV listing and caches it for the universe TTL. Any failure
//! falls back to a fixed list of blue chips.

use crate::constants::{FALLBACK_SYMBOLS, SYMBOLS_FETCH_TIMEOUT_SECS, SYMBOLS_TTL_SECONDS};
use crate::error::{AppError, Result};
use crate::utils::clock::{Clock, SystemClock};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

struct CachedUniverse {
    symbols: Arc<Vec<String>>,
    fetched_at: DateTime<Utc>,
}

pub struct SymbolUniverse {
    url: String,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    client: reqwest::Client,
    cached: RwLock<Option<CachedUniverse>>,
}

impl SymbolUniverse {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_clock(url, SYMBOLS_TTL_SECONDS, Arc::new(SystemClock))
    }

    pub fn with_clock(url: impl Into<String>, ttl_secs: i64, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(SYMBOLS_FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            ttl: Duration::seconds(ttl_secs),
            clock,
            client,
            cached: RwLock::new(None),
        })
    }

    /// Sorted, de-duplicated symbols; the fallback list when the listing is unreachable
    pub async fn symbols(&self) -> Arc<Vec<String>> {
        let now = self.clock.now();
        if let Some(cached) = self.cached.read().await.as_ref() {
            if now - cached.fetched_at < self.ttl {
                return cached.symbols.clone();
            }
        }

        let symbols = match self.download().await {
            Ok(symbols) if !symbols.is_empty() => {
                info!(count = symbols.len(), "Loaded symbol universe");
                symbols
            }
            Ok(_) => {
                warn!(url = %self.url, "Symbol listing was empty, using fallback list");
                fallback_symbols()
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Symbol listing unavailable, using fallback list");
                fallback_symbols()
            }
        };

        let symbols = Arc::new(symbols);
        *self.cached.write().await = Some(CachedUniverse {
            symbols: symbols.clone(),
            fetched_at: now,
        });
        symbols
    }

    async fn download(&self) -> Result<Vec<String>> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "symbol listing returned status {}",
                response.status()
            )));
        }
        let body = response.text().await?;
        parse_symbol_csv(&body)
    }
}

/// First column of a CSV with a header row, trimmed, upper-cased, de-duplicated and sorted
pub fn parse_symbol_csv(body: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut symbols = BTreeSet::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(0) {
            let symbol = value.trim().to_uppercase();
            if !symbol.is_empty() {
                symbols.insert(symbol);
            }
        }
    }

    Ok(symbols.into_iter().collect())
}

pub fn fallback_symbols() -> Vec<String> {
    let mut symbols: Vec<String> = FALLBACK_SYMBOLS.iter().map(|s| s.to_string()).collect();
    symbols.sort();
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::ManualClock;
    use chrono::TimeZone;

    #[test]
    fn test_parse_symbol_csv() {
        let body = "symbol\nvnm\nFPT\n  hpg \n\nFPT\n";
        assert_eq!(parse_symbol_csv(body).unwrap(), vec!["FPT", "HPG", "VNM"]);
    }

    #[test]
    fn test_fallback_is_sorted() {
        let symbols = fallback_symbols();
        assert_eq!(symbols.len(), 22);
        assert!(symbols.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_unreachable_listing_uses_fallback_and_caches() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        // nothing listens on port 9 of the loopback interface
        let universe = SymbolUniverse::with_clock("http://127.0.0.1:9/symbols.csv", 3600, Arc::new(clock.clone())).unwrap();

        let first = universe.symbols().await;
        assert_eq!(*first, fallback_symbols());

        let second = universe.symbols().await;
        assert!(Arc::ptr_eq(&first, &second));

        clock.advance(Duration::seconds(3600));
        let third = universe.symbols().await;
        assert!(!Arc::ptr_eq(&first, &third));
    }
}
