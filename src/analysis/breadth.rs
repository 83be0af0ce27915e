//! Market breadth across a universe of scored series
//!
//! One snapshot per calendar date: advances/declines, volume split, TRIN, the share of
//! symbols meeting indicator conditions, and a bucketed total score with a status label.

use super::trend_score::ScoredSeries;
use crate::constants::breadth_buckets::{
    MACD_CROSSOVER_3D, PCT_ABOVE_MA200, PCT_ABOVE_MA50, PCT_RSI_ABOVE_50, STATUS_CUTOFFS, UD_RATIO_MA5,
};
use crate::constants::{ADL_MIN_POINTS, ADL_TREND_WINDOW, MACD_CROSSOVER_WINDOW, UD_RATIO_MA_WINDOW};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreadthStatus {
    StrongDecline,
    CautiousDecline,
    Neutral,
    CautiousAdvance,
    StrongAdvance,
}

impl BreadthStatus {
    /// Left-closed bins at `{-6, -2, 3, 8}`
    pub fn from_total_score(total: i32) -> Self {
        let idx = STATUS_CUTOFFS.iter().take_while(|&&cut| total >= cut).count();
        match idx {
            0 => BreadthStatus::StrongDecline,
            1 => BreadthStatus::CautiousDecline,
            2 => BreadthStatus::Neutral,
            3 => BreadthStatus::CautiousAdvance,
            _ => BreadthStatus::StrongAdvance,
        }
    }
}

impl fmt::Display for BreadthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BreadthStatus::StrongDecline => "strong decline",
            BreadthStatus::CautiousDecline => "cautious decline",
            BreadthStatus::Neutral => "neutral",
            BreadthStatus::CautiousAdvance => "cautious advance",
            BreadthStatus::StrongAdvance => "strong advance",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreadthSnapshot {
    pub date: NaiveDate,
    pub symbols: usize,
    pub advances: usize,
    pub declines: usize,
    pub net: i64,
    pub up_volume: u64,
    pub down_volume: u64,
    pub trin: f64,
    pub pct_above_ma50: f64,
    pub pct_above_ma200: f64,
    pub pct_rsi_above_50: f64,
    pub pct_macd_crossover: f64,
    pub ad_line: i64,
    pub ud_ratio: f64,
    pub ud_ratio_ma5: Option<f64>,
    pub score_adl: Option<i32>,
    pub score_ma200: i32,
    pub score_ma50: i32,
    pub score_udv: i32,
    pub score_rsi: i32,
    pub score_macd: i32,
    pub total_score: i32,
    pub status: BreadthStatus,
}

#[derive(Debug, Default)]
struct DailyTally {
    symbols: usize,
    advances: usize,
    declines: usize,
    up_volume: u64,
    down_volume: u64,
    above_ma50: usize,
    above_ma200: usize,
    rsi_above_50: usize,
    macd_crossovers: usize,
}

/// Score for `value` from a left-closed bucket table; `None` scores 0
pub fn bucket_score(value: Option<f64>, table: (&[f64], &[i32])) -> i32 {
    let (edges, scores) = table;
    match value {
        Some(v) if !v.is_nan() => {
            let idx = edges.iter().take_while(|&&edge| v >= edge).count();
            scores.get(idx).copied().unwrap_or(0)
        }
        _ => 0,
    }
}

/// Least-squares slope of `values` against `0..n`
pub fn linear_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n_f;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }
    Some(sxy / sxx)
}

/// Trend of an A-D line window: slope normalized by the window mean, bucketed to -2..=2
pub fn adl_trend_score(window: &[f64]) -> Option<i32> {
    let values: Vec<f64> = window.iter().copied().filter(|v| !v.is_nan()).collect();
    if values.len() < ADL_MIN_POINTS {
        return None;
    }
    let slope = linear_slope(&values)?;
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let normalized = if mean != 0.0 { slope / mean } else { 0.0 };

    let score = if normalized > 0.05 {
        2
    } else if normalized > 0.01 {
        1
    } else if normalized < -0.05 {
        -2
    } else if normalized < -0.01 {
        -1
    } else {
        0
    };
    Some(score)
}

/// TRIN (Arms index). Zero declines or zero down volume count as a denominator of 1.
pub fn trin(advances: usize, declines: usize, up_volume: u64, down_volume: u64) -> f64 {
    let ad_ratio = advances as f64 / declines.max(1) as f64;
    let volume_ratio = up_volume as f64 / down_volume.max(1) as f64;
    if volume_ratio > 0.0 {
        ad_ratio / volume_ratio
    } else {
        0.0
    }
}

fn fraction(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn tally_by_date(universe: &[ScoredSeries]) -> BTreeMap<NaiveDate, DailyTally> {
    let mut days: BTreeMap<NaiveDate, DailyTally> = BTreeMap::new();

    for series in universe {
        for row in &series.rows {
            let tally = days.entry(row.bar.date()).or_default();
            let close = row.bar.close;
            tally.symbols += 1;

            if let Some(prev) = row.prev_close {
                if close > prev {
                    tally.advances += 1;
                    tally.up_volume += row.bar.volume;
                } else if close < prev {
                    tally.declines += 1;
                    tally.down_volume += row.bar.volume;
                }
            }
            if row.indicators.sma50.is_some_and(|ma| close > ma) {
                tally.above_ma50 += 1;
            }
            if row.indicators.sma200.is_some_and(|ma| close > ma) {
                tally.above_ma200 += 1;
            }
            if row.indicators.rsi14.is_some_and(|rsi| rsi > 50.0) {
                tally.rsi_above_50 += 1;
            }
            if row.macd_state_changed == Some(true) {
                tally.macd_crossovers += 1;
            }
        }
    }

    days
}

/// Breadth snapshots for every date in the universe, ascending by date
pub fn breadth_history(universe: &[ScoredSeries]) -> Vec<BreadthSnapshot> {
    let days = tally_by_date(universe);

    let mut snapshots = Vec::with_capacity(days.len());
    let mut ad_line_values: Vec<f64> = Vec::with_capacity(days.len());
    let mut ud_ratios: Vec<f64> = Vec::with_capacity(days.len());
    let mut crossover_pcts: Vec<f64> = Vec::with_capacity(days.len());
    let mut ad_line: i64 = 0;

    for (date, tally) in days {
        let net = tally.advances as i64 - tally.declines as i64;
        ad_line += net;
        ad_line_values.push(ad_line as f64);

        let ud_ratio = tally.up_volume as f64 / tally.down_volume.max(1) as f64;
        ud_ratios.push(ud_ratio);
        let ud_ratio_ma5 = trailing_mean(&ud_ratios, UD_RATIO_MA_WINDOW);

        let pct_macd_crossover = fraction(tally.macd_crossovers, tally.symbols);
        crossover_pcts.push(pct_macd_crossover);
        let macd_crossover_3d = trailing_sum(&crossover_pcts, MACD_CROSSOVER_WINDOW);

        let score_adl = if ad_line_values.len() >= ADL_TREND_WINDOW {
            adl_trend_score(&ad_line_values[ad_line_values.len() - ADL_TREND_WINDOW..])
        } else {
            None
        };

        let pct_above_ma50 = fraction(tally.above_ma50, tally.symbols);
        let pct_above_ma200 = fraction(tally.above_ma200, tally.symbols);
        let pct_rsi_above_50 = fraction(tally.rsi_above_50, tally.symbols);

        let score_ma200 = bucket_score(Some(pct_above_ma200), PCT_ABOVE_MA200);
        let score_ma50 = bucket_score(Some(pct_above_ma50), PCT_ABOVE_MA50);
        let score_udv = bucket_score(ud_ratio_ma5, UD_RATIO_MA5);
        let score_rsi = bucket_score(Some(pct_rsi_above_50), PCT_RSI_ABOVE_50);
        let score_macd = bucket_score(macd_crossover_3d, MACD_CROSSOVER_3D);

        let total_score =
            score_ma200 + score_ma50 + score_adl.unwrap_or(0) + score_udv + score_rsi + score_macd;

        snapshots.push(BreadthSnapshot {
            date,
            symbols: tally.symbols,
            advances: tally.advances,
            declines: tally.declines,
            net,
            up_volume: tally.up_volume,
            down_volume: tally.down_volume,
            trin: trin(tally.advances, tally.declines, tally.up_volume, tally.down_volume),
            pct_above_ma50,
            pct_above_ma200,
            pct_rsi_above_50,
            pct_macd_crossover,
            ad_line,
            ud_ratio,
            ud_ratio_ma5,
            score_adl,
            score_ma200,
            score_ma50,
            score_udv,
            score_rsi,
            score_macd,
            total_score,
            status: BreadthStatus::from_total_score(total_score),
        });
    }

    tracing::debug!(dates = snapshots.len(), symbols = universe.len(), "Computed breadth history");
    snapshots
}

fn trailing_mean(values: &[f64], window: usize) -> Option<f64> {
    trailing_sum(values, window).map(|sum| sum / window as f64)
}

fn trailing_sum(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    Some(values[values.len() - window..].iter().sum())
}
