use crate::constants::{
    CACHE_TTL_SECONDS, DEFAULT_MAX_WORKERS, DEFAULT_PROVIDER_TIMEOUT_SECS, DEFAULT_SOURCES,
    DEFAULT_SYMBOLS_URL, DEFAULT_VCI_RATE_LIMIT, SYMBOLS_TTL_SECONDS,
};
use std::str::FromStr;
use std::time::Duration;

/// Configuration for fetching, caching and the batch worker pool
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Concurrent per-symbol fetches in a batch
    pub max_workers: usize,

    /// Upper bound for a single provider call
    pub provider_timeout: Duration,

    /// Fetch cache TTL in seconds
    pub cache_ttl_secs: i64,

    /// Symbol universe TTL in seconds
    pub symbols_ttl_secs: i64,

    /// Provider names in priority order (upper-case)
    pub sources: Vec<String>,

    /// Symbol listing CSV URL
    pub symbols_url: String,

    /// VCI requests per minute
    pub vci_rate_limit: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            cache_ttl_secs: CACHE_TTL_SECONDS,
            symbols_ttl_secs: SYMBOLS_TTL_SECONDS,
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            symbols_url: DEFAULT_SYMBOLS_URL.to_string(),
            vci_rate_limit: DEFAULT_VCI_RATE_LIMIT,
        }
    }
}

impl FetchConfig {
    /// Build config from `VNTREND_*` environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_workers = parse_var(&lookup, "VNTREND_MAX_WORKERS")
            .unwrap_or(defaults.max_workers)
            .max(1);

        let provider_timeout = parse_var::<u64, _>(&lookup, "VNTREND_PROVIDER_TIMEOUT_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.provider_timeout);

        let cache_ttl_secs = parse_var(&lookup, "VNTREND_CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl_secs);
        let symbols_ttl_secs =
            parse_var(&lookup, "VNTREND_SYMBOLS_TTL_SECS").unwrap_or(defaults.symbols_ttl_secs);
        let vci_rate_limit = parse_var::<u32, _>(&lookup, "VNTREND_RATE_LIMIT")
            .filter(|limit| *limit > 0)
            .unwrap_or(defaults.vci_rate_limit);

        let sources = lookup("VNTREND_SOURCES")
            .map(|raw| parse_sources(&raw))
            .filter(|sources| !sources.is_empty())
            .unwrap_or(defaults.sources);

        let symbols_url = lookup("VNTREND_SYMBOLS_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.symbols_url);

        Self {
            max_workers,
            provider_timeout,
            cache_ttl_secs,
            symbols_ttl_secs,
            sources,
            symbols_url,
            vci_rate_limit,
        }
    }
}

/// Split a comma-separated provider list, upper-casing names and dropping blanks
pub fn parse_sources(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| part.trim().to_uppercase())
        .filter(|part| !part.is_empty())
        .collect()
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key = key, value = raw.as_str(), "Ignoring invalid config value, using default");
            None
        }
    }
}
