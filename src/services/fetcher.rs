//! Multi-source fetcher
//!
//! Tries providers in priority order. A provider that errors, times out or returns rows
//! without the required columns is logged and skipped. The first usable frame is
//! normalized into a [`Series`]: sorted, de-duplicated (last wins) and clipped to the
//! requested dates.

use crate::error::{AppError, Result};
use crate::models::{Bar, FetchConfig, Resolution, Series};
use crate::services::provider::{DataProvider, RawFrame};
use crate::services::tcbs::TcbsProvider;
use crate::services::vci::{SharedRateLimiter, VciProvider};
use crate::utils::time::{parse_number_value, parse_time_value};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const TIME_ALIASES: &[&str] = &["date", "datetime", "trading_date"];
const PRICE_COLUMNS: [&str; 4] = ["open", "high", "low", "close"];
static MISSING_CELL: serde_json::Value = serde_json::Value::Null;

pub struct MultiSourceFetcher {
    providers: Vec<Arc<dyn DataProvider>>,
    timeout: Duration,
}

impl MultiSourceFetcher {
    pub fn new(providers: Vec<Arc<dyn DataProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    /// Build the provider list named by `config.sources`; unknown names are skipped
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let rate_limiter = Arc::new(SharedRateLimiter::new(config.vci_rate_limit));
        let mut providers: Vec<Arc<dyn DataProvider>> = Vec::new();

        for source in &config.sources {
            match source.as_str() {
                "TCBS" => providers.push(Arc::new(TcbsProvider::new(config.provider_timeout)?)),
                "VCI" => providers.push(Arc::new(VciProvider::new(
                    config.provider_timeout,
                    rate_limiter.clone(),
                )?)),
                other => warn!(source = other, "Unknown data source, skipping"),
            }
        }

        if providers.is_empty() {
            return Err(AppError::Config(format!(
                "No usable data sources in {:?}",
                config.sources
            )));
        }

        Ok(Self::new(providers, config.provider_timeout))
    }

    /// Fetch one symbol; `AppError::NoData` once every provider has been exhausted
    pub async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> Result<Series> {
        if start > end {
            return Err(AppError::InvalidInput(format!(
                "start {} is after end {}",
                start, end
            )));
        }

        for provider in &self.providers {
            let started = Instant::now();
            match self.try_provider(provider.as_ref(), symbol, start, end, resolution).await {
                Ok(series) => {
                    if series.is_empty() {
                        warn!(symbol, provider = provider.name(), %start, %end, "No bars inside requested window");
                    }
                    info!(
                        symbol,
                        provider = provider.name(),
                        rows = series.len(),
                        duration_ms = started.elapsed().as_millis() as u64,
                        "Fetched series"
                    );
                    return Ok(series);
                }
                Err(e) if e.is_recoverable() => {
                    warn!(symbol, provider = provider.name(), error = %e, "Provider failed, trying next source");
                }
                Err(e) => {
                    // a rejected request would be rejected by every source
                    error!(symbol, provider = provider.name(), error = %e, "Provider rejected request, not trying further sources");
                    return Err(e);
                }
            }
        }

        error!(symbol, %start, %end, %resolution, "All providers exhausted");
        Err(AppError::NoData(symbol.to_string()))
    }

    async fn try_provider(
        &self,
        provider: &dyn DataProvider,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> Result<Series> {
        let frame = tokio::time::timeout(self.timeout, provider.fetch(symbol, start, end, resolution))
            .await
            .map_err(|_| AppError::Timeout {
                provider: provider.name().to_string(),
                secs: self.timeout.as_secs(),
            })??;

        let series = normalize_frame(provider.name(), symbol, resolution, &frame)?;
        Ok(series.clip(start, end))
    }
}

/// Resolve canonical column positions: `time` or its first alias, then the price columns
fn column_positions(provider: &str, frame: &RawFrame) -> Result<(usize, [usize; 4], usize)> {
    let names: Vec<String> = frame.columns.iter().map(|c| c.trim().to_lowercase()).collect();
    let find = |name: &str| names.iter().position(|c| c == name);

    let time = find("time")
        .or_else(|| TIME_ALIASES.iter().find_map(|alias| find(*alias)))
        .ok_or_else(|| AppError::schema(provider, "missing time column"))?;

    let mut prices = [0usize; 4];
    for (slot, name) in prices.iter_mut().zip(PRICE_COLUMNS) {
        *slot = find(name).ok_or_else(|| AppError::schema(provider, format!("missing {} column", name)))?;
    }

    let volume = find("volume").ok_or_else(|| AppError::schema(provider, "missing volume column"))?;

    Ok((time, prices, volume))
}

/// Turn a provider frame into a sorted, de-duplicated series (not yet clipped)
pub fn normalize_frame(provider: &str, symbol: &str, resolution: Resolution, frame: &RawFrame) -> Result<Series> {
    if frame.is_empty() {
        return Err(AppError::provider(provider, "empty result"));
    }

    let (time_idx, [open_idx, high_idx, low_idx, close_idx], volume_idx) = column_positions(provider, frame)?;

    let mut bars = Vec::with_capacity(frame.len());
    for (row_no, row) in frame.rows.iter().enumerate() {
        let cell = |idx: usize| row.get(idx).unwrap_or(&MISSING_CELL);

        let time = parse_time_value(cell(time_idx))
            .ok_or_else(|| AppError::schema(provider, format!("unparseable time in row {}: {}", row_no, cell(time_idx))))?;
        let number = |idx: usize, name: &str| {
            parse_number_value(cell(idx))
                .ok_or_else(|| AppError::schema(provider, format!("unparseable {} in row {}: {}", name, row_no, cell(idx))))
        };

        let volume = number(volume_idx, "volume")?;
        if volume < 0.0 {
            return Err(AppError::schema(provider, format!("negative volume in row {}", row_no)));
        }

        bars.push(Bar::new(
            time,
            number(open_idx, "open")?,
            number(high_idx, "high")?,
            number(low_idx, "low")?,
            number(close_idx, "close")?,
            volume.round() as u64,
        ));
    }

    Ok(Series::from_bars(symbol, resolution, bars))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) enum Behavior {
        Fail,
        Frame(RawFrame),
        Hang,
        Reject,
    }

    pub(crate) struct MockProvider {
        pub name: String,
        pub behavior: Behavior,
        pub calls: AtomicUsize,
    }

    impl MockProvider {
        pub fn new(name: &str, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                behavior,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl DataProvider for MockProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn fetch(&self, _symbol: &str, _start: NaiveDate, _end: NaiveDate, _resolution: Resolution) -> Result<RawFrame> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Fail => Err(AppError::provider(&self.name, "boom")),
                Behavior::Frame(frame) => Ok(frame.clone()),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(RawFrame::default())
                }
                Behavior::Reject => Err(AppError::InvalidInput(format!("{} rejected the request", self.name))),
            }
        }
    }

    pub(crate) fn frame(columns: &[&str], rows: Vec<Vec<Value>>) -> RawFrame {
        RawFrame {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    /// Daily rows for 2024-01-01 .. 2024-01-05 with close = 10 + day index
    pub(crate) fn daily_frame() -> RawFrame {
        let rows = (1..=5)
            .map(|d| {
                let close = 10.0 + d as f64;
                vec![
                    json!(format!("2024-01-0{}", d)),
                    json!(close - 0.5),
                    json!(close + 1.0),
                    json!(close - 1.0),
                    json!(close),
                    json!(1000 * d),
                ]
            })
            .collect();
        frame(&["Date", "Open", "High", "Low", "Close", "Volume"], rows)
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn fetcher(providers: Vec<Arc<dyn DataProvider>>) -> MultiSourceFetcher {
        MultiSourceFetcher::new(providers, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_falls_back_to_next_provider() {
        let a = MockProvider::new("A", Behavior::Fail);
        let b = MockProvider::new("B", Behavior::Frame(daily_frame()));
        let f = fetcher(vec![a.clone(), b.clone()]);

        let series = f.fetch("VNM", date(1), date(5), Resolution::Day1).await.unwrap();

        assert_eq!(series.len(), 5);
        assert_eq!(series.symbol, "VNM");
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_schema_error_skips_provider() {
        let missing_volume = frame(&["time", "open", "high", "low", "close"], vec![vec![json!(1704067200), json!(1), json!(1), json!(1), json!(1)]]);
        let a = MockProvider::new("A", Behavior::Frame(missing_volume));
        let b = MockProvider::new("B", Behavior::Frame(daily_frame()));

        let series = fetcher(vec![a, b]).fetch("VNM", date(1), date(5), Resolution::Day1).await.unwrap();
        assert_eq!(series.len(), 5);
    }

    #[tokio::test]
    async fn test_all_providers_exhausted_is_no_data() {
        let a = MockProvider::new("A", Behavior::Fail);
        let b = MockProvider::new("B", Behavior::Frame(RawFrame::default()));

        let result = fetcher(vec![a, b]).fetch("VNM", date(1), date(5), Resolution::Day1).await;
        assert!(matches!(result, Err(AppError::NoData(ref s)) if s == "VNM"));
    }

    #[tokio::test]
    async fn test_unrecoverable_error_stops_fallback() {
        let a = MockProvider::new("A", Behavior::Reject);
        let b = MockProvider::new("B", Behavior::Frame(daily_frame()));

        let result = fetcher(vec![a.clone(), b.clone()]).fetch("VNM", date(1), date(5), Resolution::Day1).await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_advances_to_next_provider() {
        let slow = MockProvider::new("SLOW", Behavior::Hang);
        let b = MockProvider::new("B", Behavior::Frame(daily_frame()));
        let f = MultiSourceFetcher::new(vec![slow, b], Duration::from_secs(1));

        let series = f.fetch("VNM", date(1), date(5), Resolution::Day1).await.unwrap();
        assert_eq!(series.len(), 5);
    }

    #[tokio::test]
    async fn test_clips_to_requested_window() {
        let b = MockProvider::new("B", Behavior::Frame(daily_frame()));
        let series = fetcher(vec![b]).fetch("VNM", date(2), date(4), Resolution::Day1).await.unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.bars()[0].date(), date(2));
        assert_eq!(series.last().unwrap().date(), date(4));
    }

    #[tokio::test]
    async fn test_empty_window_is_success() {
        let b = MockProvider::new("B", Behavior::Frame(daily_frame()));
        let series = fetcher(vec![b]).fetch("VNM", date(20), date(25), Resolution::Day1).await.unwrap();
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn test_start_after_end_is_invalid() {
        let b = MockProvider::new("B", Behavior::Frame(daily_frame()));
        let result = fetcher(vec![b.clone()]).fetch("VNM", date(5), date(1), Resolution::Day1).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert_eq!(b.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_normalize_sorts_and_keeps_last_duplicate() {
        let f = frame(
            &["trading_date", "open", "high", "low", "close", "volume"],
            vec![
                vec![json!("2024-01-03"), json!(1), json!(2), json!(0.5), json!(1.5), json!(10)],
                vec![json!("2024-01-02"), json!(1), json!(2), json!(0.5), json!(1.1), json!(10)],
                vec![json!("2024-01-03"), json!(1), json!(2), json!(0.5), json!(1.9), json!(10)],
            ],
        );
        let series = normalize_frame("T", "VNM", Resolution::Day1, &f).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].close, 1.1);
        assert_eq!(series.bars()[1].close, 1.9);
    }

    #[test]
    fn test_normalize_prefers_time_over_aliases() {
        let f = frame(
            &["date", "TIME", "open", "high", "low", "close", "volume"],
            vec![vec![json!("garbage"), json!(1704067200), json!(1), json!(2), json!(0.5), json!(1.5), json!("2500")]],
        );
        let series = normalize_frame("T", "VNM", Resolution::Day1, &f).unwrap();
        assert_eq!(series.bars()[0].date(), date(1));
        assert_eq!(series.bars()[0].volume, 2500);
    }

    #[test]
    fn test_normalize_rejects_bad_cells() {
        let bad_price = frame(
            &["time", "open", "high", "low", "close", "volume"],
            vec![vec![json!("2024-01-01"), json!("n/a"), json!(2), json!(0.5), json!(1.5), json!(1)]],
        );
        assert!(matches!(normalize_frame("T", "VNM", Resolution::Day1, &bad_price), Err(AppError::Schema { .. })));

        let negative_volume = frame(
            &["time", "open", "high", "low", "close", "volume"],
            vec![vec![json!("2024-01-01"), json!(1), json!(2), json!(0.5), json!(1.5), json!(-5)]],
        );
        assert!(normalize_frame("T", "VNM", Resolution::Day1, &negative_volume).is_err());
    }
}
