//! Parallel batch fetcher
//!
//! One task per symbol under a semaphore-bounded pool. Every task goes through the fetch
//! cache before the multi-source fetcher, and a failing symbol only records its own
//! failure in the result map.

use crate::error::{AppError, Result};
use crate::models::{MarketData, Resolution};
use crate::services::cache::{CacheKey, CachedData, FetchCache};
use crate::services::fetcher::MultiSourceFetcher;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct BatchFetcher {
    cache: Arc<FetchCache>,
    fetcher: Arc<MultiSourceFetcher>,
    max_workers: usize,
}

impl BatchFetcher {
    pub fn new(cache: Arc<FetchCache>, fetcher: Arc<MultiSourceFetcher>, max_workers: usize) -> Self {
        Self {
            cache,
            fetcher,
            max_workers: max_workers.max(1),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Cached series and bundle for one symbol, fetching and storing on a miss
    pub async fn load(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> Result<CachedData> {
        load_through_cache(&self.cache, &self.fetcher, symbol, start, end, resolution).await
    }

    /// Fetch every symbol. The map is keyed by the caller's spelling; symbols equal after
    /// trimming and upper-casing are fetched once under the first spelling seen.
    pub async fn fetch_many(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> MarketData {
        let mut seen = HashSet::new();
        let requests: Vec<(String, String)> = symbols
            .iter()
            .map(|requested| (requested.clone(), requested.trim().to_uppercase()))
            .filter(|(_, normalized)| !normalized.is_empty() && seen.insert(normalized.clone()))
            .collect();

        let mut results: MarketData = HashMap::with_capacity(requests.len());
        if requests.is_empty() {
            return results;
        }

        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut handles = Vec::with_capacity(symbols.len());

        for (_, normalized) in &requests {
            let cache = Arc::clone(&self.cache);
            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&semaphore);
            let symbol = normalized.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| AppError::Other(format!("worker pool closed: {}", e)))?;
                load_through_cache(&cache, &fetcher, &symbol, start, end, resolution)
                    .await
                    .map(|data| data.series)
            });
            handles.push(handle);
        }

        let outcomes = futures::future::join_all(handles).await;

        let mut failed = 0usize;
        for ((requested, normalized), outcome) in requests.into_iter().zip(outcomes) {
            let result = match outcome {
                Ok(result) => result,
                Err(join_err) => Err(AppError::Other(format!("fetch task for {} aborted: {}", normalized, join_err))),
            };
            if let Err(e) = &result {
                failed += 1;
                warn!(symbol = %normalized, error = %e, "Symbol fetch failed");
            }
            results.insert(requested, result);
        }

        info!(
            symbols = results.len(),
            failed,
            workers = self.max_workers,
            duration_ms = started.elapsed().as_millis() as u64,
            "Batch fetch complete"
        );

        results
    }
}

async fn load_through_cache(
    cache: &FetchCache,
    fetcher: &MultiSourceFetcher,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    resolution: Resolution,
) -> Result<CachedData> {
    let key = CacheKey::for_dates(symbol, start, end, resolution);
    if let Some(hit) = cache.get(&key).await {
        return Ok(hit);
    }

    debug!(symbol, %start, %end, %resolution, "Fetching from providers");
    let series = fetcher.fetch(&key.symbol, start, end, resolution).await?;
    Ok(cache.put(key, Arc::new(series)).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fetcher::tests::{daily_frame, Behavior, MockProvider};
    use crate::services::provider::{DataProvider, RawFrame};
    use crate::utils::clock::SystemClock;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fails for one symbol, serves `daily_frame` for the rest
    struct SelectiveProvider {
        failing: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DataProvider for SelectiveProvider {
        fn name(&self) -> &str {
            "SELECTIVE"
        }

        async fn fetch(&self, symbol: &str, _: NaiveDate, _: NaiveDate, _: Resolution) -> Result<RawFrame> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if symbol == self.failing {
                Err(AppError::provider("SELECTIVE", "upstream error"))
            } else {
                Ok(daily_frame())
            }
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn batch(provider: Arc<dyn DataProvider>, workers: usize) -> BatchFetcher {
        let cache = Arc::new(FetchCache::new(300, Arc::new(SystemClock)));
        let fetcher = Arc::new(MultiSourceFetcher::new(vec![provider], Duration::from_secs(5)));
        BatchFetcher::new(cache, fetcher, workers)
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let provider = Arc::new(SelectiveProvider {
            failing: "XXX".to_string(),
            calls: AtomicUsize::new(0),
        });
        let b = batch(provider, 2);

        let symbols = vec!["XXX".to_string(), "YYY".to_string()];
        let results = b.fetch_many(&symbols, date(1), date(5), Resolution::Day1).await;

        assert_eq!(results.len(), 2);
        assert!(matches!(results["XXX"], Err(AppError::NoData(_))));
        assert_eq!(results["YYY"].as_ref().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_second_batch_served_from_cache() {
        let provider = MockProvider::new("A", Behavior::Frame(daily_frame()));
        let b = batch(provider.clone(), 4);
        let symbols: Vec<String> = ["VNM", "FPT", "vnm", " "].iter().map(|s| s.to_string()).collect();

        let first = b.fetch_many(&symbols, date(1), date(5), Resolution::Day1).await;
        assert_eq!(first.len(), 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

        let second = b.fetch_many(&symbols, date(1), date(5), Resolution::Day1).await;
        assert!(second.values().all(|r| r.is_ok()));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_results_keyed_by_requested_spelling() {
        let provider = MockProvider::new("A", Behavior::Frame(daily_frame()));
        let b = batch(provider.clone(), 2);
        let symbols: Vec<String> = ["vnm", "FPT", "VNM", "Hpg"].iter().map(|s| s.to_string()).collect();

        let results = b.fetch_many(&symbols, date(1), date(5), Resolution::Day1).await;

        let mut keys: Vec<&str> = results.keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(keys, vec!["FPT", "Hpg", "vnm"]);
        assert_eq!(results["vnm"].as_ref().unwrap().symbol, "VNM");
        assert_eq!(results["Hpg"].as_ref().unwrap().symbol, "HPG");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    /// Serves `daily_frame` after a short pause, recording the peak number of calls in flight
    struct InFlightProvider {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl DataProvider for InFlightProvider {
        fn name(&self) -> &str {
            "IN_FLIGHT"
        }

        async fn fetch(&self, _: &str, _: NaiveDate, _: NaiveDate, _: Resolution) -> Result<RawFrame> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(daily_frame())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_bounded_by_max_workers() {
        let provider = Arc::new(InFlightProvider {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let b = batch(provider.clone(), 3);
        let symbols: Vec<String> = (0..12).map(|i| format!("S{}", i)).collect();

        let results = b.fetch_many(&symbols, date(1), date(5), Resolution::Day1).await;

        assert_eq!(results.len(), 12);
        assert!(results.values().all(|r| r.is_ok()));
        let peak = provider.peak.load(Ordering::SeqCst);
        assert!(peak >= 1 && peak <= 3, "peak in-flight calls {}", peak);
        assert_eq!(provider.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_single_worker_completes_all() {
        let provider = MockProvider::new("A", Behavior::Frame(daily_frame()));
        let b = batch(provider, 1);
        let symbols: Vec<String> = (0..5).map(|i| format!("S{}", i)).collect();

        let results = b.fetch_many(&symbols, date(1), date(5), Resolution::Day1).await;
        assert_eq!(results.len(), 5);
        assert!(results.values().all(|r| r.is_ok()));
    }

    #[tokio::test]
    async fn test_empty_request() {
        let provider = MockProvider::new("A", Behavior::Fail);
        let b = batch(provider, 3);
        assert!(b.fetch_many(&[], date(1), date(5), Resolution::Day1).await.is_empty());
    }
}
