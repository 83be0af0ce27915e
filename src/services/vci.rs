use crate::error::{AppError, Result};
use crate::models::{Bar, Resolution};
use crate::services::provider::{DataProvider, RawFrame};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, TimeZone, Utc, Weekday};
use isahc::{config::Configurable, prelude::*, HttpClient};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration as StdDuration, SystemTime};
use tokio::sync::Mutex as TokioMutex;
use tokio::time::sleep;

const PROVIDER_NAME: &str = "VCI";
const BASE_URL: &str = "https://trading.vietcap.com.vn/api/";
const MAX_RETRIES: u32 = 3;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.3 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// Shared rate limiter for VCI API requests across all concurrent tasks
#[derive(Debug)]
pub struct SharedRateLimiter {
    /// Timestamps of recent requests (sliding window)
    request_timestamps: TokioMutex<Vec<SystemTime>>,
    /// Maximum requests allowed per minute
    rate_limit_per_minute: u32,
}

impl SharedRateLimiter {
    pub fn new(rate_limit_per_minute: u32) -> Self {
        Self {
            request_timestamps: TokioMutex::new(Vec::new()),
            rate_limit_per_minute: rate_limit_per_minute.max(1),
        }
    }

    /// Sliding window limiter; safe to call from many tasks
    pub async fn enforce_rate_limit(&self) {
        let current_time = SystemTime::now();
        let mut timestamps = self.request_timestamps.lock().await;

        timestamps.retain(|&timestamp| {
            current_time
                .duration_since(timestamp)
                .unwrap_or(StdDuration::from_secs(0))
                < StdDuration::from_secs(60)
        });

        if timestamps.len() >= self.rate_limit_per_minute as usize {
            if let Some(&oldest_request) = timestamps.first() {
                let wait_time = StdDuration::from_secs(60).saturating_sub(
                    current_time
                        .duration_since(oldest_request)
                        .unwrap_or(StdDuration::from_secs(0)),
                );

                if !wait_time.is_zero() {
                    // release the lock while sleeping so other tasks can check the window
                    drop(timestamps);
                    tracing::debug!(wait_ms = wait_time.as_millis() as u64, "VCI rate limit reached, waiting");
                    sleep(wait_time + StdDuration::from_millis(100)).await;
                    self.request_timestamps.lock().await.push(SystemTime::now());
                    return;
                }
            }
        }

        timestamps.push(current_time);
    }
}

/// Vietcap chart API. Daily bars only; weekly and monthly bars are resampled locally.
pub struct VciProvider {
    client: HttpClient,
    base_url: String,
    rate_limiter: Arc<SharedRateLimiter>,
}

impl VciProvider {
    pub fn new(timeout: StdDuration, rate_limiter: Arc<SharedRateLimiter>) -> Result<Self> {
        let client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            rate_limiter,
        })
    }

    fn get_user_agent(&self) -> &'static str {
        use rand::seq::SliceRandom;
        USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0])
    }

    async fn make_request(&self, url: &str, payload: &Value) -> Result<Value> {
        let body = serde_json::to_string(payload)?;
        let mut last_error: Option<String> = None;

        for attempt in 0..MAX_RETRIES {
            self.rate_limiter.enforce_rate_limit().await;

            if attempt > 0 {
                let delay = StdDuration::from_secs_f64(2.0_f64.powi(attempt as i32 - 1) + rand::random::<f64>());
                tracing::info!(
                    provider = PROVIDER_NAME,
                    attempt = attempt + 1,
                    reason = last_error.as_deref().unwrap_or("unknown error"),
                    "VCI retry backoff {:.1}s",
                    delay.as_secs_f64()
                );
                sleep(delay).await;
            }

            let request = isahc::Request::builder()
                .uri(url)
                .method("POST")
                .header("Accept", "application/json, text/plain, */*")
                .header("Accept-Language", "en-US,en;q=0.9,vi-VN;q=0.8,vi;q=0.7")
                .header("Content-Type", "application/json")
                .header("Cache-Control", "no-cache")
                .header("User-Agent", self.get_user_agent())
                .header("Referer", "https://trading.vietcap.com.vn/")
                .header("Origin", "https://trading.vietcap.com.vn")
                .body(body.clone())
                .map_err(|e| AppError::provider(PROVIDER_NAME, format!("request build error: {}", e)))?;

            match self.client.send_async(request).await {
                Ok(mut resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        match resp.text().await {
                            Ok(text) => match serde_json::from_str::<Value>(&text) {
                                Ok(data) => return Ok(data),
                                Err(e) => last_error = Some(format!("JSON parse error: {}", e)),
                            },
                            Err(e) => last_error = Some(format!("response body error: {}", e)),
                        }
                    } else if status == 403 || status == 429 || status.is_server_error() {
                        last_error = Some(format!("HTTP {}", status.as_u16()));
                    } else {
                        // other 4xx are request problems, retrying will not help
                        return Err(AppError::provider(
                            PROVIDER_NAME,
                            format!("client error ({}) - not retryable", status.as_u16()),
                        ));
                    }
                }
                Err(e) => last_error = Some(format!("network error: {}", e)),
            }
        }

        Err(AppError::provider(
            PROVIDER_NAME,
            format!(
                "max retries exceeded: {}",
                last_error.unwrap_or_else(|| "unknown error".to_string())
            ),
        ))
    }
}

#[async_trait]
impl DataProvider for VciProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> Result<RawFrame> {
        let url = format!("{}chart/OHLCChart/gap-chart", self.base_url);
        let payload = serde_json::json!({
            "timeFrame": "ONE_DAY",
            "symbols": [symbol],
            "to": calculate_timestamp(end),
            "countBack": calculate_count_back(start, end),
        });

        tracing::debug!(provider = PROVIDER_NAME, symbol, %start, %end, %resolution, "VCI request");

        let response = self.make_request(&url, &payload).await?;
        let bars = parse_chart_response(&response)?;

        let bars = match resolution {
            Resolution::Day1 => bars,
            Resolution::Week1 => resample(bars, week_start),
            Resolution::Month1 => resample(bars, month_start),
        };

        Ok(bars_to_frame(&bars))
    }
}

/// End-of-day timestamp of `date` (the API's `to` is inclusive)
pub fn calculate_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(23, 59, 59)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Business days in `[start, end]` plus a buffer; the API counts bars backwards from `to`
pub fn calculate_count_back(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut business_days = 0u32;
    let mut current_date = start;
    while current_date <= end {
        if !matches!(current_date.weekday(), Weekday::Sat | Weekday::Sun) {
            business_days += 1;
        }
        current_date += ChronoDuration::days(1);
    }
    business_days + 100
}

fn column<'a>(item: &'a Value, key: &str) -> Result<&'a Vec<Value>> {
    item.get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| AppError::schema(PROVIDER_NAME, format!("missing array '{}'", key)))
}

fn number(value: &Value, key: &str, idx: usize) -> Result<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        .ok_or_else(|| AppError::schema(PROVIDER_NAME, format!("invalid {} at index {}: {}", key, idx, value)))
}

/// Parse the `[{o,h,l,c,v,t}]` chart payload into ascending daily bars
pub fn parse_chart_response(response: &Value) -> Result<Vec<Bar>> {
    let item = match response.as_array().and_then(|items| items.first()) {
        Some(item) => item,
        None => return Err(AppError::provider(PROVIDER_NAME, "empty response")),
    };

    let opens = column(item, "o")?;
    let highs = column(item, "h")?;
    let lows = column(item, "l")?;
    let closes = column(item, "c")?;
    let volumes = column(item, "v")?;
    let times = column(item, "t")?;

    let length = times.len();
    if [opens.len(), highs.len(), lows.len(), closes.len(), volumes.len()]
        .iter()
        .any(|&len| len != length)
    {
        return Err(AppError::schema(PROVIDER_NAME, "inconsistent array lengths"));
    }

    let mut bars = Vec::with_capacity(length);
    for i in 0..length {
        let timestamp = number(&times[i], "t", i)? as i64;
        let time = DateTime::<Utc>::from_timestamp(timestamp, 0)
            .ok_or_else(|| AppError::schema(PROVIDER_NAME, format!("invalid timestamp {}", timestamp)))?;
        let volume = number(&volumes[i], "v", i)?;

        bars.push(Bar::new(
            time,
            number(&opens[i], "o", i)?,
            number(&highs[i], "h", i)?,
            number(&lows[i], "l", i)?,
            number(&closes[i], "c", i)?,
            volume.max(0.0).round() as u64,
        ));
    }

    bars.sort_by(|a, b| a.time.cmp(&b.time));
    Ok(bars)
}

/// Monday 00:00 UTC of the week containing `date`
pub fn week_start(date: DateTime<Utc>) -> DateTime<Utc> {
    let days_since_monday = date.weekday().num_days_from_monday() as i64;
    let week_start_date = date.date_naive() - ChronoDuration::days(days_since_monday);
    week_start_date
        .and_hms_opt(0, 0, 0)
        .and_then(|dt| Utc.from_local_datetime(&dt).single())
        .unwrap_or(date)
}

/// First day of the month 00:00 UTC
pub fn month_start(date: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(date.year(), date.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(date)
}

/// Aggregate ascending bars into buckets keyed by `bucket_start`
pub fn resample<F>(bars: Vec<Bar>, bucket_start: F) -> Vec<Bar>
where
    F: Fn(DateTime<Utc>) -> DateTime<Utc>,
{
    let mut buckets: BTreeMap<DateTime<Utc>, Bar> = BTreeMap::new();

    for bar in bars {
        let key = bucket_start(bar.time);
        buckets
            .entry(key)
            .and_modify(|agg: &mut Bar| {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume += bar.volume;
            })
            .or_insert(Bar { time: key, ..bar });
    }

    buckets.into_values().collect()
}

fn bars_to_frame(bars: &[Bar]) -> RawFrame {
    let mut frame = RawFrame::new(
        ["time", "open", "high", "low", "close", "volume"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
    );
    for bar in bars {
        frame.push_row(vec![
            Value::from(bar.time.timestamp()),
            Value::from(bar.open),
            Value::from(bar.high),
            Value::from(bar.low),
            Value::from(bar.close),
            Value::from(bar.volume),
        ]);
    }
    frame
}
