//! Per-symbol trend health scoring
//!
//! Each bar gets a signed raw score summed from independent contributions. A contribution
//! whose inputs are undefined adds nothing. The trend score is the 10-bar mean of raw scores.

use super::adx::calculate_adx_with_di;
use super::indicators::{calculate_bollinger_bands, calculate_macd, calculate_rsi, calculate_sma, rolling_mean};
use crate::constants::{
    ADX_PERIOD, BOLLINGER_PERIOD, BOLLINGER_STD_MULT, MACD_FAST, MACD_SIGNAL, MACD_SLOW, RSI_PERIOD,
    TREND_SCORE_WINDOW, VOLUME_SMA_PERIOD,
};
use crate::models::indicators::value_at;
use crate::models::{Bar, IndicatorRow, Resolution, Series};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discretized raw score of a single bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendLabel {
    VeryPositive,
    Positive,
    Neutral,
    Negative,
    VeryNegative,
}

impl TrendLabel {
    pub fn from_raw_score(score: i32) -> Self {
        if score > 10 {
            TrendLabel::VeryPositive
        } else if score > 5 {
            TrendLabel::Positive
        } else if score < -5 {
            TrendLabel::VeryNegative
        } else if score < 0 {
            TrendLabel::Negative
        } else {
            TrendLabel::Neutral
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, TrendLabel::VeryPositive | TrendLabel::Positive)
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, TrendLabel::VeryNegative | TrendLabel::Negative)
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendLabel::VeryPositive => "very positive",
            TrendLabel::Positive => "positive",
            TrendLabel::Neutral => "neutral",
            TrendLabel::Negative => "negative",
            TrendLabel::VeryNegative => "very negative",
        };
        write!(f, "{}", label)
    }
}

/// A bar with its indicator snapshot and scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredBar {
    pub bar: Bar,
    pub indicators: IndicatorRow,
    pub raw_score: i32,
    pub trend_score: Option<f64>,
    /// MACD line above its signal line
    pub macd_bullish: Option<bool>,
    /// Bullish state differs from the previous bar
    pub macd_state_changed: Option<bool>,
    pub prev_close: Option<f64>,
}

impl ScoredBar {
    pub fn label(&self) -> TrendLabel {
        TrendLabel::from_raw_score(self.raw_score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSeries {
    pub symbol: String,
    pub resolution: Resolution,
    pub rows: Vec<ScoredBar>,
}

impl ScoredSeries {
    pub fn latest(&self) -> Option<&ScoredBar> {
        self.rows.last()
    }
}

/// Indicator snapshot for every bar of `series`
pub fn indicator_rows(series: &Series) -> Vec<IndicatorRow> {
    let closes = series.closes();
    let volumes = series.volumes();

    let sma20 = calculate_sma(&closes, 20);
    let sma50 = calculate_sma(&closes, 50);
    let sma100 = calculate_sma(&closes, 100);
    let sma200 = calculate_sma(&closes, 200);
    let rsi = calculate_rsi(&closes, RSI_PERIOD);
    let macd = calculate_macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let bb = calculate_bollinger_bands(&closes, BOLLINGER_PERIOD, BOLLINGER_STD_MULT);
    let vol_sma = calculate_sma(&volumes, VOLUME_SMA_PERIOD);
    let adx = calculate_adx_with_di(&series.highs(), &series.lows(), &closes, ADX_PERIOD);

    (0..series.len())
        .map(|i| IndicatorRow {
            sma20: value_at(&sma20, i),
            sma50: value_at(&sma50, i),
            sma100: value_at(&sma100, i),
            sma200: value_at(&sma200, i),
            rsi14: value_at(&rsi, i),
            macd: value_at(&macd.macd, i),
            macd_signal: value_at(&macd.signal, i),
            macd_hist: value_at(&macd.histogram, i),
            bb_upper: value_at(&bb.upper, i),
            bb_middle: value_at(&bb.middle, i),
            bb_lower: value_at(&bb.lower, i),
            vol_sma20: value_at(&vol_sma, i),
            adx14: value_at(&adx.adx, i),
            plus_di: value_at(&adx.plus_di, i),
            minus_di: value_at(&adx.minus_di, i),
        })
        .collect()
}

/// `+points` when `a > b`, otherwise `-points` (a tie counts against); 0 when undefined
fn compare(a: Option<f64>, b: Option<f64>, points: i32) -> i32 {
    match (a, b) {
        (Some(a), Some(b)) if a > b => points,
        (Some(_), Some(_)) => -points,
        _ => 0,
    }
}

fn rsi_points(rsi: Option<f64>) -> i32 {
    match rsi {
        Some(v) if v > 70.0 => 2,
        Some(v) if v > 50.0 => 1,
        Some(v) if v < 30.0 => -2,
        Some(v) if v < 50.0 => -1,
        _ => 0,
    }
}

fn macd_cross_points(row: &IndicatorRow, prev: Option<&IndicatorRow>) -> i32 {
    let Some(prev) = prev else {
        return 0;
    };
    match (row.macd, row.macd_signal, prev.macd, prev.macd_signal) {
        (Some(m), Some(s), Some(pm), Some(ps)) => {
            if m > s && pm <= ps {
                2
            } else if m < s && pm >= ps {
                -2
            } else {
                0
            }
        }
        _ => 0,
    }
}

fn adx_points(adx: Option<f64>) -> i32 {
    match adx {
        Some(v) if v > 40.0 => 1,
        Some(v) if v > 25.0 => 0,
        Some(v) if v < 20.0 => -1,
        _ => 0,
    }
}

fn volume_points(bar: &Bar, vol_sma: Option<f64>) -> i32 {
    match vol_sma {
        Some(avg) if bar.volume as f64 > avg => {
            if bar.is_bullish() {
                2
            } else if bar.is_bearish() {
                -2
            } else {
                0
            }
        }
        _ => 0,
    }
}

fn bollinger_points(close: f64, row: &IndicatorRow) -> i32 {
    match (row.bb_upper, row.bb_lower) {
        (Some(upper), _) if close > upper => 1,
        (_, Some(lower)) if close < lower => -1,
        _ => 0,
    }
}

/// Raw score of one bar given its indicators and the previous bar's indicators
pub fn raw_score(bar: &Bar, row: &IndicatorRow, prev: Option<&IndicatorRow>) -> i32 {
    let close = Some(bar.close);

    let mut score = 0;
    score += compare(close, row.sma200, 3);
    score += compare(close, row.sma100, 2);
    score += compare(row.sma100, row.sma200, 2);
    score += compare(close, row.sma50, 2);
    score += compare(close, row.sma20, 1);
    score += compare(row.sma20, row.sma50, 1);
    score += rsi_points(row.rsi14);
    score += macd_cross_points(row, prev);
    score += adx_points(row.adx14);
    score += volume_points(bar, row.vol_sma20);
    score += bollinger_points(bar.close, row);
    score
}

/// Compute indicators and scores for every bar of `series`
pub fn score_series(series: &Series) -> ScoredSeries {
    let rows = indicator_rows(series);
    let bars = series.bars();

    let raw_scores: Vec<i32> = (0..bars.len())
        .map(|i| {
            let prev = if i > 0 { rows.get(i - 1) } else { None };
            raw_score(&bars[i], &rows[i], prev)
        })
        .collect();

    let raw_as_f64: Vec<f64> = raw_scores.iter().map(|&s| s as f64).collect();
    let rolling = rolling_mean(&raw_as_f64, TREND_SCORE_WINDOW);

    let mut scored = Vec::with_capacity(bars.len());
    let mut prev_bullish: Option<bool> = None;

    for (i, (bar, row)) in bars.iter().zip(rows).enumerate() {
        let macd_bullish = match (row.macd, row.macd_signal) {
            (Some(m), Some(s)) => Some(m > s),
            _ => None,
        };
        let macd_state_changed = match (i, macd_bullish, prev_bullish) {
            (0, _, _) => None,
            (_, Some(cur), Some(prev)) => Some(cur != prev),
            _ => None,
        };
        prev_bullish = macd_bullish;

        // rolling mean only counts once a full window of raw scores exists
        let trend_score = if i + 1 >= TREND_SCORE_WINDOW {
            value_at(&rolling, i)
        } else {
            None
        };

        scored.push(ScoredBar {
            bar: bar.clone(),
            indicators: row,
            raw_score: raw_scores[i],
            trend_score,
            macd_bullish,
            macd_state_changed,
            prev_close: if i > 0 { Some(bars[i - 1].close) } else { None },
        });
    }

    ScoredSeries {
        symbol: series.symbol.clone(),
        resolution: series.resolution,
        rows: scored,
    }
}
