//! Latest-day classification across a universe

use super::trend_score::{ScoredSeries, TrendLabel};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestSignal {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: f64,
    pub raw_score: i32,
    pub label: TrendLabel,
    pub adx: Option<f64>,
    /// Volume above its 20-bar average
    pub high_volume: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
    pub positive_pct: f64,
    pub negative_pct: f64,
}

/// Most recent date present in any series of the universe
pub fn latest_date(universe: &[ScoredSeries]) -> Option<NaiveDate> {
    universe
        .iter()
        .filter_map(|s| s.latest())
        .map(|row| row.bar.date())
        .max()
}

/// One signal per symbol whose last bar falls on the universe's latest date, sorted by
/// raw score descending then symbol
pub fn latest_day_signals(universe: &[ScoredSeries]) -> Vec<LatestSignal> {
    let Some(date) = latest_date(universe) else {
        return Vec::new();
    };

    let mut signals: Vec<LatestSignal> = universe
        .iter()
        .filter_map(|series| {
            let row = series.latest()?;
            if row.bar.date() != date {
                return None;
            }
            let high_volume = row
                .indicators
                .vol_sma20
                .is_some_and(|avg| row.bar.volume as f64 > avg);

            Some(LatestSignal {
                symbol: series.symbol.clone(),
                date,
                close: row.bar.close,
                raw_score: row.raw_score,
                label: row.label(),
                adx: row.indicators.adx14,
                high_volume,
            })
        })
        .collect();

    signals.sort_by(|a, b| b.raw_score.cmp(&a.raw_score).then_with(|| a.symbol.cmp(&b.symbol)));
    signals
}

/// Positive/negative counts with percentages of the total
pub fn summarize(signals: &[LatestSignal]) -> SignalSummary {
    let total = signals.len();
    if total == 0 {
        return SignalSummary::default();
    }
    let positive = signals.iter().filter(|s| s.label.is_positive()).count();
    let negative = signals.iter().filter(|s| s.label.is_negative()).count();

    SignalSummary {
        total,
        positive,
        negative,
        positive_pct: positive as f64 * 100.0 / total as f64,
        negative_pct: negative as f64 * 100.0 / total as f64,
    }
}
