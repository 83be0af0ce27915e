mod ohlcv;
mod resolution;
mod series;
mod fetch_config;
pub mod indicators;

pub use fetch_config::FetchConfig;
pub use indicators::{IndicatorMap, IndicatorRow};
pub use ohlcv::Bar;
pub use resolution::Resolution;
pub use series::Series;

use std::collections::HashMap;
use std::sync::Arc;

/// Per-symbol outcome of a batch fetch
pub type SymbolResult = crate::error::Result<Arc<Series>>;

/// Batch results (symbol -> series or failure)
pub type MarketData = HashMap<String, SymbolResult>;
