//! Average Directional Index with +DI / -DI
//!
//! ADX measures trend strength (0-100), not direction:
//! - 0-25: weak or no trend
//! - 25-50: strong trend
//! - 50-75: very strong trend
//! - 75-100: extremely strong trend
//!
//! Smoothing is Wilder's (`alpha = 1 / period`), which is deliberately not the EMA
//! constant `2 / (period + 1)`.

use super::indicators::ewm_mean;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdxResult {
    pub adx: Vec<f64>,
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
}

/// True Range per bar. The first bar has no previous close, so it is `high - low`.
pub fn true_range(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<f64> {
    (0..highs.len())
        .map(|i| {
            let high_low = highs[i] - lows[i];
            if i == 0 {
                return high_low;
            }
            let high_close = (highs[i] - closes[i - 1]).abs();
            let low_close = (lows[i] - closes[i - 1]).abs();
            [high_low, high_close, low_close]
                .into_iter()
                .filter(|v| !v.is_nan())
                .fold(f64::NAN, f64::max)
        })
        .collect()
}

/// +DM / -DM per bar (0 on the first bar)
pub fn directional_movement(highs: &[f64], lows: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut plus_dm = vec![0.0; highs.len()];
    let mut minus_dm = vec![0.0; highs.len()];

    for i in 1..highs.len() {
        let up_move = highs[i] - highs[i - 1];
        let down_move = lows[i - 1] - lows[i];

        if up_move > down_move && up_move > 0.0 {
            plus_dm[i] = up_move;
        }
        if down_move > up_move && down_move > 0.0 {
            minus_dm[i] = down_move;
        }
    }

    (plus_dm, minus_dm)
}

/// Wilder smoothing; undefined until `period` observations exist
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; values.len()];
    }
    ewm_mean(values, 1.0 / period as f64, period)
}

/// ADX together with the directional indicators.
///
/// `+DI`/`-DI` are defined from bar `period - 1`; ADX needs `period` defined DX values on
/// top of that. A bar where `+DI + -DI == 0` has an undefined DX.
pub fn calculate_adx_with_di(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> AdxResult {
    let tr = true_range(highs, lows, closes);
    let (plus_dm, minus_dm) = directional_movement(highs, lows);

    let tr_smooth = wilder_smooth(&tr, period);
    let plus_dm_smooth = wilder_smooth(&plus_dm, period);
    let minus_dm_smooth = wilder_smooth(&minus_dm, period);

    let plus_di: Vec<f64> = plus_dm_smooth
        .iter()
        .zip(&tr_smooth)
        .map(|(dm, tr)| 100.0 * (dm / tr))
        .collect();
    let minus_di: Vec<f64> = minus_dm_smooth
        .iter()
        .zip(&tr_smooth)
        .map(|(dm, tr)| 100.0 * (dm / tr))
        .collect();

    let dx: Vec<f64> = plus_di
        .iter()
        .zip(&minus_di)
        .map(|(p, m)| {
            let sum = p + m;
            if sum == 0.0 {
                f64::NAN
            } else {
                100.0 * (p - m).abs() / sum
            }
        })
        .collect();

    let adx = wilder_smooth(&dx, period);

    AdxResult {
        adx,
        plus_di,
        minus_di,
    }
}

/// ADX only
pub fn calculate_adx(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    calculate_adx_with_di(highs, lows, closes, period).adx
}
