//! Shared constants
//!
//! TTLs, indicator periods and the fixed tables used by the trend and breadth scorers.

/// Fetch cache TTL for per-request price data (5 minutes)
pub const CACHE_TTL_SECONDS: i64 = 300;

/// TTL for the symbol universe listing (1 hour)
pub const SYMBOLS_TTL_SECONDS: i64 = 3600;

/// Default number of concurrent per-symbol fetches
pub const DEFAULT_MAX_WORKERS: usize = 6;

/// Default timeout for a single provider call
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;

/// Default VCI request budget (requests per minute)
pub const DEFAULT_VCI_RATE_LIMIT: u32 = 60;

/// Timeout for the symbol listing download
pub const SYMBOLS_FETCH_TIMEOUT_SECS: u64 = 10;

/// Symbol listing CSV (one symbol per line, header row first)
pub const DEFAULT_SYMBOLS_URL: &str =
    "https://drive.usercontent.google.com/uc?id=1wbBwe3L4m4Yw1NNnOQwePpNxFORxbkmv&export=download";

/// Provider priority when nothing is configured. TCBS first: VCI is often blocked from cloud hosts.
pub const DEFAULT_SOURCES: &[&str] = &["TCBS", "VCI"];

/// Universe used when the listing source is unreachable
pub const FALLBACK_SYMBOLS: &[&str] = &[
    "VNM", "VCB", "HPG", "VHM", "VIC", "MSN", "FPT", "SSI", "MBB", "TCB", "CTG", "ACB", "VPB",
    "VRE", "GAS", "PLX", "POW", "SAB", "BVH", "MWG", "PNJ", "HDB",
];

/// History loaded behind a display window so long moving averages are warmed up (3 years)
pub const INDICATOR_LOOKBACK_DAYS: i64 = 1095;

/// Moving average periods pre-computed into the cache bundle
pub const BUNDLE_MA_PERIODS: &[usize] = &[5, 10, 20, 50, 100, 200];

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD_MULT: f64 = 2.0;
pub const ADX_PERIOD: usize = 14;
pub const VOLUME_SMA_PERIOD: usize = 20;

/// Window of the rolling mean turning raw scores into the trend score
pub const TREND_SCORE_WINDOW: usize = 10;

/// Breadth windows (in dates)
pub const UD_RATIO_MA_WINDOW: usize = 5;
pub const ADL_TREND_WINDOW: usize = 10;
pub const ADL_MIN_POINTS: usize = 5;
pub const MACD_CROSSOVER_WINDOW: usize = 3;

/// Left-closed bucket tables: `(upper_edges, scores)`, `scores.len() == upper_edges.len() + 1`.
/// A value below `upper_edges[0]` scores `scores[0]`, and so on.
pub mod breadth_buckets {
    pub const PCT_ABOVE_MA200: (&[f64], &[i32]) = (&[0.30, 0.50, 0.70], &[-2, 0, 1, 2]);
    pub const PCT_ABOVE_MA50: (&[f64], &[i32]) = (&[0.60, 0.80], &[-1, 1, 2]);
    pub const UD_RATIO_MA5: (&[f64], &[i32]) = (&[0.5, 0.75, 1.25, 1.75], &[-2, -1, 0, 1, 2]);
    pub const PCT_RSI_ABOVE_50: (&[f64], &[i32]) = (&[0.40, 0.60], &[-2, 0, 2]);
    pub const MACD_CROSSOVER_3D: (&[f64], &[i32]) = (&[0.10, 0.20], &[0, 1, 2]);

    /// Total score cutoffs for the five breadth status labels
    pub const STATUS_CUTOFFS: &[i32] = &[-6, -2, 3, 8];
}
