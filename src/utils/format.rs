use crate::models::Series;
use chrono::Duration;
use serde::Serialize;

/// `120000.5` -> `"120,000.50"`, `None`/NaN -> `"N/A"`
pub fn format_price(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => {
            let formatted = format!("{:.2}", v.abs());
            let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));
            let sign = if v < 0.0 && formatted != "0.00" { "-" } else { "" };
            format!("{}{}.{}", sign, group_thousands(int_part), frac_part)
        }
        _ => "N/A".to_string(),
    }
}

/// `1234567` -> `"1,234,567"`
pub fn format_volume(volume: u64) -> String {
    group_thousands(&volume.to_string())
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Percent change from `previous` to `current`; 0 when `previous` is missing or zero
pub fn calculate_change(current: f64, previous: Option<f64>) -> f64 {
    match previous {
        Some(prev) if prev != 0.0 && prev.is_finite() => (current - prev) / prev * 100.0,
        _ => 0.0,
    }
}

/// Price and volume extremes over the trailing 52 weeks (364 days before the last bar)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Week52Stats {
    pub high: f64,
    pub low: f64,
    pub max_volume: u64,
    /// Percent distance of the last close from the high
    pub from_high_pct: f64,
    /// Percent distance of the last close from the low
    pub from_low_pct: f64,
}

pub fn week52_stats(series: &Series) -> Option<Week52Stats> {
    let last = series.last()?;
    let cutoff = last.time - Duration::days(364);
    let window = series.bars().iter().filter(|bar| bar.time >= cutoff);

    let (high, low, max_volume) = window.fold((f64::MIN, f64::MAX, 0u64), |(h, l, v), bar| {
        (h.max(bar.high), l.min(bar.low), v.max(bar.volume))
    });

    Some(Week52Stats {
        high,
        low,
        max_volume,
        from_high_pct: calculate_change(last.close, Some(high)),
        from_low_pct: calculate_change(last.close, Some(low)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bar, Resolution};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(Some(120000.5)), "120,000.50");
        assert_eq!(format_price(Some(999.999)), "1,000.00");
        assert_eq!(format_price(Some(12.0)), "12.00");
        assert_eq!(format_price(Some(-1234.5)), "-1,234.50");
        assert_eq!(format_price(None), "N/A");
        assert_eq!(format_price(Some(f64::NAN)), "N/A");
    }

    #[test]
    fn test_format_volume() {
        assert_eq!(format_volume(0), "0");
        assert_eq!(format_volume(1_234_567), "1,234,567");
        assert_eq!(format_volume(100_000), "100,000");
    }

    #[test]
    fn test_calculate_change() {
        assert!((calculate_change(110.0, Some(100.0)) - 10.0).abs() < 1e-12);
        assert_eq!(calculate_change(110.0, Some(0.0)), 0.0);
        assert_eq!(calculate_change(110.0, None), 0.0);
    }

    #[test]
    fn test_week52_stats_ignores_older_bars() {
        let t0 = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
        let bars = vec![
            Bar::new(t0, 10.0, 500.0, 1.0, 10.0, 9_999_999),
            Bar::new(t0 + Duration::days(300), 50.0, 60.0, 40.0, 55.0, 1_000),
            Bar::new(t0 + Duration::days(400), 55.0, 80.0, 50.0, 72.0, 2_000),
        ];
        let series = Series::from_bars("VNM", Resolution::Day1, bars);
        let stats = week52_stats(&series).unwrap();

        assert_eq!(stats.high, 80.0);
        assert_eq!(stats.low, 40.0);
        assert_eq!(stats.max_volume, 2_000);
        assert!((stats.from_high_pct - (-10.0)).abs() < 1e-12);
        assert!((stats.from_low_pct - 80.0).abs() < 1e-12);

        assert!(week52_stats(&Series::empty("X", Resolution::Day1)).is_none());
    }
}
