pub mod batch;
pub mod cache;
pub mod fetcher;
pub mod provider;
pub mod stock_service;
pub mod symbols;
pub mod tcbs;
pub mod vci;

pub use batch::BatchFetcher;
pub use cache::{CacheKey, CacheStats, CachedData, FetchCache};
pub use fetcher::MultiSourceFetcher;
pub use provider::{DataProvider, RawFrame};
pub use stock_service::{StockData, StockService};
pub use symbols::SymbolUniverse;
pub use tcbs::TcbsProvider;
pub use vci::{SharedRateLimiter, VciProvider};
