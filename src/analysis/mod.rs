pub mod adx;
pub mod breadth;
pub mod indicators;
pub mod signals;
pub mod trend_score;

pub use adx::{calculate_adx, calculate_adx_with_di, AdxResult};
pub use breadth::{breadth_history, BreadthSnapshot, BreadthStatus};
pub use indicators::{
    calculate_bollinger_bands, calculate_common_indicators, calculate_ema, calculate_macd,
    calculate_rsi, calculate_sma, calculate_stochastic, BollingerBands, MacdResult, StochasticResult,
};
pub use signals::{latest_day_signals, summarize, LatestSignal, SignalSummary};
pub use trend_score::{score_series, ScoredBar, ScoredSeries, TrendLabel};
