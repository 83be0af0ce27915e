//! Indicator data model
//!
//! Indicator outputs are `Vec<f64>` aligned 1:1 with the bars of a [`Series`](super::Series);
//! warm-up positions hold `f64::NAN`. Scoring code never reads NaN directly: it goes through
//! [`IndicatorRow`], where every indicator is an `Option<f64>`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Indicator name -> aligned output (e.g. `sma20`, `rsi14`, `macd_signal`)
pub type IndicatorMap = HashMap<String, Vec<f64>>;

/// `Some(value)` for finite-or-infinite numbers, `None` for NaN
pub fn defined(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

/// Value at `idx`, `None` when out of range or undefined
pub fn value_at(values: &[f64], idx: usize) -> Option<f64> {
    values.get(idx).copied().and_then(defined)
}

/// Indicator snapshot for a single bar
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma20: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma50: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma100: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma200: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi14: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd_signal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd_hist: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bb_upper: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bb_middle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bb_lower: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vol_sma20: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adx14: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plus_di: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minus_di: Option<f64>,
}
