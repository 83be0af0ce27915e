//! Presentation-facing facade over the cache, fetcher and batch pool

use crate::error::{AppError, Result};
use crate::models::{FetchConfig, IndicatorMap, MarketData, Resolution, Series};
use crate::services::batch::BatchFetcher;
use crate::services::cache::{CacheStats, FetchCache};
use crate::services::fetcher::MultiSourceFetcher;
use crate::utils::clock::{Clock, SystemClock};
use chrono::NaiveDate;
use std::sync::Arc;

/// A single-symbol result
#[derive(Debug, Clone)]
pub struct StockData {
    pub series: Arc<Series>,
    /// Present only when requested
    pub indicators: Option<Arc<IndicatorMap>>,
}

#[derive(Clone)]
pub struct StockService {
    cache: Arc<FetchCache>,
    batch: BatchFetcher,
}

impl StockService {
    pub fn new(cache: Arc<FetchCache>, fetcher: Arc<MultiSourceFetcher>, max_workers: usize) -> Self {
        Self {
            batch: BatchFetcher::new(cache.clone(), fetcher, max_workers),
            cache,
        }
    }

    /// Wire providers, cache and pool from configuration using the system clock
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        Self::from_config_with_clock(config, Arc::new(SystemClock))
    }

    pub fn from_config_with_clock(config: &FetchConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let fetcher = Arc::new(MultiSourceFetcher::from_config(config)?);
        let cache = Arc::new(FetchCache::new(config.cache_ttl_secs, clock));
        Ok(Self::new(cache, fetcher, config.max_workers))
    }

    pub async fn get_stock(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
        want_indicators: bool,
    ) -> Result<StockData> {
        let data = self.batch.load(symbol, start, end, resolution).await?;
        Ok(StockData {
            series: data.series,
            indicators: want_indicators.then_some(data.indicators),
        })
    }

    pub async fn get_multiple_stocks(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> MarketData {
        self.batch.fetch_many(symbols, start, end, resolution).await
    }

    /// One indicator from the cached bundle (e.g. `sma20`, `macd_signal`)
    pub async fn get_indicator(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
        name: &str,
    ) -> Result<Vec<f64>> {
        let data = self.batch.load(symbol, start, end, resolution).await?;
        let key = name.trim().to_lowercase();
        data.indicators.get(&key).cloned().ok_or_else(|| {
            let mut known: Vec<&String> = data.indicators.keys().collect();
            known.sort();
            AppError::InvalidInput(format!("unknown indicator '{}', available: {:?}", name, known))
        })
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fetcher::tests::{daily_frame, Behavior, MockProvider};
    use crate::utils::clock::ManualClock;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::Ordering;
    use std::time::Duration as StdDuration;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn service(provider: Arc<MockProvider>) -> (StockService, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap());
        let cache = Arc::new(FetchCache::new(300, Arc::new(clock.clone())));
        let fetcher = Arc::new(MultiSourceFetcher::new(vec![provider], StdDuration::from_secs(5)));
        (StockService::new(cache, fetcher, 2), clock)
    }

    #[tokio::test]
    async fn test_get_stock_with_and_without_indicators() {
        let provider = MockProvider::new("A", Behavior::Frame(daily_frame()));
        let (svc, _) = service(provider.clone());

        let plain = svc.get_stock("VNM", date(1), date(5), Resolution::Day1, false).await.unwrap();
        assert_eq!(plain.series.len(), 5);
        assert!(plain.indicators.is_none());

        let full = svc.get_stock("VNM", date(1), date(5), Resolution::Day1, true).await.unwrap();
        assert_eq!(full.indicators.unwrap()["sma5"].len(), 5);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(svc.cache_stats().await, CacheStats { total: 1, valid: 1 });
    }

    #[tokio::test]
    async fn test_refetch_after_ttl() {
        let provider = MockProvider::new("A", Behavior::Frame(daily_frame()));
        let (svc, clock) = service(provider.clone());

        svc.get_stock("VNM", date(1), date(5), Resolution::Day1, false).await.unwrap();
        clock.advance(Duration::seconds(301));
        svc.get_stock("VNM", date(1), date(5), Resolution::Day1, false).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

        svc.clear_cache().await;
        assert_eq!(svc.cache_stats().await.total, 0);
    }

    #[tokio::test]
    async fn test_get_indicator() {
        let provider = MockProvider::new("A", Behavior::Frame(daily_frame()));
        let (svc, _) = service(provider);

        let rsi = svc.get_indicator("VNM", date(1), date(5), Resolution::Day1, "RSI14").await.unwrap();
        assert_eq!(rsi.len(), 5);

        let unknown = svc.get_indicator("VNM", date(1), date(5), Resolution::Day1, "vwap").await;
        assert!(matches!(unknown, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_no_data_surfaces_per_symbol() {
        let provider = MockProvider::new("A", Behavior::Fail);
        let (svc, _) = service(provider);

        let result = svc.get_stock("VNM", date(1), date(5), Resolution::Day1, true).await;
        assert!(matches!(result, Err(AppError::NoData(_))));

        let many = svc
            .get_multiple_stocks(&["VNM".to_string()], date(1), date(5), Resolution::Day1)
            .await;
        assert!(many["VNM"].is_err());
    }
}
