//! Technical indicators over OHLCV columns
//!
//! Every function is pure and returns a vector with exactly one value per input bar.
//! Undefined positions are `f64::NAN`.
//!
//! ## Warm-up policy
//! - Rolling windows (SMA, rolling std/min/max) use partial windows: position `i < period`
//!   averages over the `i + 1` values available, so SMA has no undefined prefix.
//! - Rolling windows skip NaN inputs and divide by the number of defined values.
//! - EMA is seeded with the first observation and is defined everywhere.
//!
//! ## Price Format
//! Inputs may be in any unit as long as a single call is consistent; all outputs are in
//! the input unit except RSI/Stochastic (0-100 oscillators).

use crate::constants::{
    BOLLINGER_PERIOD, BOLLINGER_STD_MULT, BUNDLE_MA_PERIODS, MACD_FAST, MACD_SIGNAL, MACD_SLOW,
    RSI_PERIOD,
};
use crate::models::{IndicatorMap, Series};
use serde::{Deserialize, Serialize};

/// MACD line, signal line and histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdResult {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Bollinger bands around an SMA
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Stochastic oscillator %K and %D
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StochasticResult {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

/// Apply `f` to the defined values of each trailing window (partial windows allowed).
/// Windows without defined values yield NaN.
fn rolling_apply<F>(values: &[f64], period: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    if period == 0 {
        return vec![f64::NAN; values.len()];
    }

    let mut window = Vec::with_capacity(period);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(period);
            window.clear();
            window.extend(values[start..=i].iter().copied().filter(|v| !v.is_nan()));
            if window.is_empty() {
                f64::NAN
            } else {
                f(&window)
            }
        })
        .collect()
}

/// Trailing mean over up to `period` values
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    rolling_apply(values, period, |w| w.iter().sum::<f64>() / w.len() as f64)
}

/// Trailing sample standard deviation (ddof = 1); a single observation is undefined
pub fn rolling_std(values: &[f64], period: usize) -> Vec<f64> {
    rolling_apply(values, period, |w| {
        if w.len() < 2 {
            return f64::NAN;
        }
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let var = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (w.len() - 1) as f64;
        var.sqrt()
    })
}

/// Trailing minimum
pub fn rolling_min(values: &[f64], period: usize) -> Vec<f64> {
    rolling_apply(values, period, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
}

/// Trailing maximum
pub fn rolling_max(values: &[f64], period: usize) -> Vec<f64> {
    rolling_apply(values, period, |w| w.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Recursive exponential mean: `y[t] = (1 - alpha) * y[t-1] + alpha * x[t]`, seeded by the
/// first defined value.
///
/// An undefined input carries the previous value forward while its weight keeps decaying,
/// so the next defined input is weighted against the aged value. Output stays undefined
/// until `min_periods` defined inputs have been seen.
pub fn ewm_mean(values: &[f64], alpha: f64, min_periods: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let Some(&first) = values.first() else {
        return out;
    };

    let min_periods = min_periods.max(1);
    let old_wt_factor = 1.0 - alpha;
    let new_wt = alpha;

    let mut weighted = first;
    let mut nobs = usize::from(!first.is_nan());
    let mut old_wt = 1.0;
    out.push(if nobs >= min_periods { weighted } else { f64::NAN });

    for &cur in &values[1..] {
        let is_obs = !cur.is_nan();
        nobs += usize::from(is_obs);

        if !weighted.is_nan() {
            old_wt *= old_wt_factor;
            if is_obs {
                if weighted != cur {
                    weighted = (old_wt * weighted + new_wt * cur) / (old_wt + new_wt);
                }
                old_wt = 1.0;
            }
        } else if is_obs {
            weighted = cur;
        }

        out.push(if nobs >= min_periods { weighted } else { f64::NAN });
    }

    out
}

/// Simple Moving Average with partial warm-up windows
pub fn calculate_sma(values: &[f64], period: usize) -> Vec<f64> {
    rolling_mean(values, period)
}

/// Exponential Moving Average, `alpha = 2 / (period + 1)`
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; values.len()];
    }
    ewm_mean(values, 2.0 / (period as f64 + 1.0), 0)
}

/// Relative Strength Index over rolling-mean gains and losses.
///
/// A window with gains but no losses is 100; a window with neither is undefined
/// (always the case for the first bar).
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());

    for i in 0..closes.len() {
        let delta = if i == 0 { f64::NAN } else { closes[i] - closes[i - 1] };
        gains.push(if delta > 0.0 { delta } else { 0.0 });
        losses.push(if delta < 0.0 { -delta } else { 0.0 });
    }

    let avg_gain = rolling_mean(&gains, period);
    let avg_loss = rolling_mean(&losses, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&gain, &loss)| {
            if gain.is_nan() || loss.is_nan() {
                f64::NAN
            } else if loss == 0.0 {
                if gain > 0.0 {
                    100.0
                } else {
                    f64::NAN
                }
            } else {
                100.0 - 100.0 / (1.0 + gain / loss)
            }
        })
        .collect()
}

/// MACD = EMA(fast) - EMA(slow); signal = EMA(signal) of MACD; histogram = MACD - signal
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdResult {
    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);

    let macd: Vec<f64> = ema_fast.iter().zip(&ema_slow).map(|(f, s)| f - s).collect();
    let signal_line = calculate_ema(&macd, signal);
    let histogram = macd.iter().zip(&signal_line).map(|(m, s)| m - s).collect();

    MacdResult {
        macd,
        signal: signal_line,
        histogram,
    }
}

/// Bollinger Bands: SMA(period) +/- `std_mult` sample standard deviations
pub fn calculate_bollinger_bands(closes: &[f64], period: usize, std_mult: f64) -> BollingerBands {
    let middle = calculate_sma(closes, period);
    let std_dev = rolling_std(closes, period);

    let upper = middle.iter().zip(&std_dev).map(|(m, s)| m + s * std_mult).collect();
    let lower = middle.iter().zip(&std_dev).map(|(m, s)| m - s * std_mult).collect();

    BollingerBands { upper, middle, lower }
}

/// Stochastic oscillator.
///
/// %K = 100 * (close - lowest low) / (highest high - lowest low) over `k_period`;
/// %D = SMA(%K, `d_period`). A flat range gives an undefined or infinite %K.
pub fn calculate_stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> StochasticResult {
    let low_min = rolling_min(lows, k_period);
    let high_max = rolling_max(highs, k_period);

    let k: Vec<f64> = closes
        .iter()
        .zip(low_min.iter().zip(&high_max))
        .map(|(&close, (&lo, &hi))| 100.0 * (close - lo) / (hi - lo))
        .collect();
    let d = calculate_sma(&k, d_period);

    StochasticResult { k, d }
}

/// Pre-computed indicator bundle stored alongside cached series.
///
/// Keys: `sma{5,10,20,50,100,200}`, `ema{5,10,20,50,100,200}`, `rsi14`, `macd`,
/// `macd_signal`, `macd_histogram`, `bb_upper`, `bb_middle`, `bb_lower`.
pub fn calculate_common_indicators(series: &Series) -> IndicatorMap {
    let mut indicators = IndicatorMap::new();
    if series.is_empty() {
        return indicators;
    }

    let closes = series.closes();

    for &period in BUNDLE_MA_PERIODS {
        indicators.insert(format!("sma{}", period), calculate_sma(&closes, period));
        indicators.insert(format!("ema{}", period), calculate_ema(&closes, period));
    }

    indicators.insert(format!("rsi{}", RSI_PERIOD), calculate_rsi(&closes, RSI_PERIOD));

    let macd = calculate_macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    indicators.insert("macd".to_string(), macd.macd);
    indicators.insert("macd_signal".to_string(), macd.signal);
    indicators.insert("macd_histogram".to_string(), macd.histogram);

    let bb = calculate_bollinger_bands(&closes, BOLLINGER_PERIOD, BOLLINGER_STD_MULT);
    indicators.insert("bb_upper".to_string(), bb.upper);
    indicators.insert("bb_middle".to_string(), bb.middle);
    indicators.insert("bb_lower".to_string(), bb.lower);

    indicators
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bar, Resolution};
    use chrono::{Duration, TimeZone, Utc};

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    fn rising_closes() -> Vec<f64> {
        (100..120).map(|v| v as f64).collect()
    }

    #[test]
    fn test_sma_partial_windows() {
        let closes = vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0];
        let ma3 = calculate_sma(&closes, 3);

        assert_eq!(ma3.len(), closes.len());
        assert_close(ma3[0], 10.0); // mean of 1 value
        assert_close(ma3[1], 10.5); // mean of 2 values
        assert_close(ma3[2], 11.0);
        assert_close(ma3[5], 14.0);
        assert!(ma3.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_sma_period_longer_than_series() {
        let closes = vec![1.0, 2.0, 3.0];
        let ma = calculate_sma(&closes, 200);
        assert_eq!(ma.len(), 3);
        assert_close(ma[2], 2.0);
    }

    #[test]
    fn test_sma_rising_twenty_bars() {
        let sma20 = calculate_sma(&rising_closes(), 20);
        assert_close(sma20[19], 109.5);
    }

    #[test]
    fn test_ema_seeded_by_first_value() {
        let closes = vec![10.0, 20.0, 30.0];
        let ema = calculate_ema(&closes, 3); // alpha = 0.5
        assert_close(ema[0], 10.0);
        assert_close(ema[1], 15.0);
        assert_close(ema[2], 22.5);
    }

    #[test]
    fn test_ewm_mean_min_periods() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        let out = ewm_mean(&values, 0.5, 3);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert_close(out[2], 2.25);
    }

    #[test]
    fn test_ewm_mean_carries_over_gaps() {
        let values = vec![f64::NAN, 2.0, f64::NAN, 4.0];
        let out = ewm_mean(&values, 0.5, 1);
        assert!(out[0].is_nan());
        assert_close(out[1], 2.0);
        assert_close(out[2], 2.0);
        // aged weight 0.25 against new weight 0.5
        assert_close(out[3], (0.25 * 2.0 + 0.5 * 4.0) / 0.75);
    }

    #[test]
    fn test_rsi_monotonic_up() {
        let rsi = calculate_rsi(&rising_closes(), 14);
        assert!(rsi[0].is_nan());
        assert_close(rsi[19], 100.0);
        assert!(rsi[19] > 70.0);
    }

    #[test]
    fn test_rsi_bounded() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ];
        let rsi = calculate_rsi(&closes, 14);
        for value in rsi.iter().filter(|v| !v.is_nan()) {
            assert!((0.0..=100.0).contains(value), "RSI out of range: {}", value);
        }
    }

    #[test]
    fn test_rsi_all_losses_is_zero() {
        let closes = vec![10.0, 9.0, 8.0, 7.0];
        let rsi = calculate_rsi(&closes, 14);
        assert_close(rsi[3], 0.0);
    }

    #[test]
    fn test_macd_histogram_identity() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let macd = calculate_macd(&closes, 12, 26, 9);

        assert_eq!(macd.macd.len(), closes.len());
        for i in 0..closes.len() {
            assert_eq!(macd.histogram[i], macd.macd[i] - macd.signal[i]);
        }
        assert_eq!(macd.macd[0], 0.0);
    }

    #[test]
    fn test_bollinger_bands() {
        let closes = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let bb = calculate_bollinger_bands(&closes, 8, 2.0);

        assert!(bb.upper[0].is_nan());
        assert!(bb.lower[0].is_nan());
        assert_close(bb.middle[7], 5.0);
        // sample std of the 8 values = sqrt(32 / 7)
        let width = 2.0 * (32.0_f64 / 7.0).sqrt();
        assert_close(bb.upper[7], 5.0 + width);
        assert_close(bb.lower[7], 5.0 - width);
    }

    #[test]
    fn test_stochastic() {
        let highs = vec![10.0, 12.0, 14.0];
        let lows = vec![8.0, 9.0, 10.0];
        let closes = vec![9.0, 11.0, 13.0];
        let stoch = calculate_stochastic(&highs, &lows, &closes, 14, 3);

        assert_close(stoch.k[0], 50.0);
        assert_close(stoch.k[2], 100.0 * (13.0 - 8.0) / (14.0 - 8.0));
        assert_close(stoch.d[1], (stoch.k[0] + stoch.k[1]) / 2.0);
    }

    #[test]
    fn test_stochastic_flat_range_is_undefined() {
        let flat = vec![5.0, 5.0];
        let stoch = calculate_stochastic(&flat, &flat, &flat, 14, 3);
        assert!(stoch.k[0].is_nan());
        assert!(stoch.d[1].is_nan());
    }

    #[test]
    fn test_common_indicator_bundle() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = rising_closes()
            .into_iter()
            .enumerate()
            .map(|(i, c)| Bar::new(start + Duration::days(i as i64), c, c + 1.0, c - 1.0, c, 1000))
            .collect();
        let series = Series::from_bars("VNM", Resolution::Day1, bars);

        let bundle = calculate_common_indicators(&series);
        for key in [
            "sma5", "sma200", "ema10", "ema100", "rsi14", "macd", "macd_signal", "macd_histogram",
            "bb_upper", "bb_middle", "bb_lower",
        ] {
            let values = bundle.get(key).unwrap_or_else(|| panic!("missing {}", key));
            assert_eq!(values.len(), series.len());
        }
        assert_eq!(bundle.len(), 19);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(calculate_sma(&[], 5).is_empty());
        assert!(calculate_ema(&[], 5).is_empty());
        assert!(calculate_rsi(&[], 14).is_empty());
        assert!(calculate_common_indicators(&Series::empty("X", Resolution::Day1)).is_empty());
    }
}
