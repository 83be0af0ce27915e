use crate::models::{Bar, Resolution};
use crate::utils::deduplication::filter_duplicate_records;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ordered bars for one symbol, strictly increasing by time.
///
/// Built once by the fetcher and never mutated afterwards; a re-fetch produces a new
/// `Series`. The bar vector is private so the ordering invariant cannot be broken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub symbol: String,
    pub resolution: Resolution,
    bars: Vec<Bar>,
}

impl Series {
    /// Sort by time (stable) and drop duplicate timestamps, keeping the last submitted row
    pub fn from_bars(symbol: impl Into<String>, resolution: Resolution, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|bar| bar.time);
        Self {
            symbol: symbol.into(),
            resolution,
            bars: filter_duplicate_records(bars),
        }
    }

    pub fn empty(symbol: impl Into<String>, resolution: Resolution) -> Self {
        Self {
            symbol: symbol.into(),
            resolution,
            bars: Vec::new(),
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume as f64).collect()
    }

    /// Keep bars whose calendar date falls inside `[start, end]`
    pub fn clip(self, start: NaiveDate, end: NaiveDate) -> Self {
        let bars = self
            .bars
            .into_iter()
            .filter(|bar| {
                let date = bar.date();
                date >= start && date <= end
            })
            .collect();

        Self {
            symbol: self.symbol,
            resolution: self.resolution,
            bars,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(day: u32, close: f64) -> Bar {
        let time = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
        Bar::new(time, close, close, close, close, 100)
    }

    #[test]
    fn test_from_bars_sorts_and_dedups() {
        let series = Series::from_bars(
            "VCB",
            Resolution::Day1,
            vec![bar(3, 3.0), bar(1, 1.0), bar(2, 2.0), bar(1, 1.5)],
        );

        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![1.5, 2.0, 3.0]);
        assert!(series.bars().windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn test_later_submitted_duplicate_survives() {
        let series = Series::from_bars("FPT", Resolution::Day1, vec![bar(5, 10.0), bar(5, 12.0)]);
        assert_eq!(series.len(), 1);
        assert_eq!(series.closes(), vec![12.0]);
    }

    #[test]
    fn test_clip_is_inclusive() {
        let series = Series::from_bars(
            "HPG",
            Resolution::Day1,
            (1..=10).map(|d| bar(d, d as f64)).collect(),
        );
        let clipped = series.clip(
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        );
        assert_eq!(clipped.closes(), vec![3.0, 4.0, 5.0]);
    }
}
