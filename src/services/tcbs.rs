use crate::error::{AppError, Result};
use crate::models::Resolution;
use crate::services::provider::{DataProvider, RawFrame};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

const PROVIDER_NAME: &str = "TCBS";
const BASE_URL: &str = "https://apipubaws.tcbs.com.vn/stock-insight/v2/stock/bars-long-term";

/// TCBS long-term bars endpoint.
///
/// Serves day, week and month bars directly, but ignores the requested window for weekly
/// and monthly data, so the caller must clip.
pub struct TcbsProvider {
    base_url: String,
    client: reqwest::Client,
}

impl TcbsProvider {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Invalid TCBS base_url: must start with http:// or https://, got: '{}'",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { base_url, client })
    }
}

#[async_trait]
impl DataProvider for TcbsProvider {
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
        let from = start.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp()).unwrap_or_default();
        let to = end.and_hms_opt(23, 59, 59).map(|dt| dt.and_utc().timestamp()).unwrap_or_default();

        let query = [
            ("ticker", symbol.to_string()),
            ("type", "stock".to_string()),
            ("resolution", resolution.tcbs_code().to_string()),
            ("from", from.to_string()),
            ("to", to.to_string()),
        ];

        debug!(provider = PROVIDER_NAME, symbol, %start, %end, %resolution, "TCBS request");

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::provider(PROVIDER_NAME, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::provider(PROVIDER_NAME, format!("HTTP {}", status.as_u16())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::provider(PROVIDER_NAME, format!("failed to read body: {}", e)))?;
        let json: Value = serde_json::from_str(&body)
            .map_err(|e| AppError::provider(PROVIDER_NAME, format!("invalid JSON: {}", e)))?;

        parse_bars_response(&json)
    }
}

/// `{"data": [{"tradingDate": ..., "open": ...}, ...]}` into a raw frame with snake_case columns
pub fn parse_bars_response(json: &Value) -> Result<RawFrame> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| AppError::schema(PROVIDER_NAME, "missing 'data' array"))?;

    let records: Vec<Map<String, Value>> = data
        .iter()
        .filter_map(|row| row.as_object())
        .map(|row| {
            row.iter()
                .map(|(key, value)| (camel_to_snake(key), value.clone()))
                .collect()
        })
        .collect();

    if records.is_empty() {
        return Err(AppError::provider(PROVIDER_NAME, "no rows returned"));
    }

    Ok(RawFrame::from_records(&records))
}

/// `tradingDate` -> `trading_date`
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
