use crate::error::AppError;
use crate::models::Resolution;
use chrono::{Datelike, Duration, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Display window presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimelineOption {
    ThreeMonths,
    SixMonths,
    OneYear,
    Ytd,
    Custom,
}

impl TimelineOption {
    pub fn all() -> &'static [TimelineOption] {
        &[
            TimelineOption::ThreeMonths,
            TimelineOption::SixMonths,
            TimelineOption::OneYear,
            TimelineOption::Ytd,
            TimelineOption::Custom,
        ]
    }

    /// Default preset for a resolution: six months of daily bars, a year otherwise
    pub fn default_for(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Day1 => TimelineOption::SixMonths,
            Resolution::Week1 | Resolution::Month1 => TimelineOption::OneYear,
        }
    }

    /// `(start, end)` ending at `today`. Short presets are widened for coarse resolutions
    /// so the chart still has a useful number of candles. `Custom` yields the six-month
    /// default for callers to override.
    pub fn date_range(&self, resolution: Resolution, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let days_back = match (resolution, self) {
            (Resolution::Month1, TimelineOption::ThreeMonths) => 365,
            (Resolution::Month1, TimelineOption::SixMonths) => 730,
            (Resolution::Week1, TimelineOption::ThreeMonths) => 180,
            (_, TimelineOption::ThreeMonths) => 90,
            (_, TimelineOption::SixMonths) => 180,
            (_, TimelineOption::OneYear) => 365,
            (_, TimelineOption::Ytd) => {
                let jan1 = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                return (jan1, today);
            }
            (_, TimelineOption::Custom) => 180,
        };
        (today - Duration::days(days_back), today)
    }

    /// Rough candle count shown for a preset (`None` for `Custom`)
    pub fn expected_candles(&self, resolution: Resolution, today: NaiveDate) -> Option<u32> {
        let ytd_days = today.ordinal0();
        let count = match (resolution, self) {
            (_, TimelineOption::Custom) => return None,
            (Resolution::Day1, TimelineOption::ThreeMonths) => 63,
            (Resolution::Day1, TimelineOption::SixMonths) => 126,
            (Resolution::Day1, TimelineOption::OneYear) => 252,
            (Resolution::Day1, TimelineOption::Ytd) => ytd_days,
            (Resolution::Week1, TimelineOption::ThreeMonths) => 12,
            (Resolution::Week1, TimelineOption::SixMonths) => 26,
            (Resolution::Week1, TimelineOption::OneYear) => 52,
            (Resolution::Week1, TimelineOption::Ytd) => ytd_days / 7,
            (Resolution::Month1, TimelineOption::ThreeMonths) => 3,
            (Resolution::Month1, TimelineOption::SixMonths) => 6,
            (Resolution::Month1, TimelineOption::OneYear) => 12,
            (Resolution::Month1, TimelineOption::Ytd) => today.month(),
        };
        Some(count)
    }
}

impl fmt::Display for TimelineOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimelineOption::ThreeMonths => "3m",
            TimelineOption::SixMonths => "6m",
            TimelineOption::OneYear => "1y",
            TimelineOption::Ytd => "ytd",
            TimelineOption::Custom => "custom",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for TimelineOption {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "3m" | "3months" => Ok(TimelineOption::ThreeMonths),
            "6m" | "6months" => Ok(TimelineOption::SixMonths),
            "1y" | "1year" | "12m" => Ok(TimelineOption::OneYear),
            "ytd" => Ok(TimelineOption::Ytd),
            "custom" => Ok(TimelineOption::Custom),
            other => Err(AppError::InvalidInput(format!(
                "Invalid timeline '{}', expected one of 3m, 6m, 1y, ytd, custom",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    #[test]
    fn test_daily_ranges() {
        let (start, end) = TimelineOption::ThreeMonths.date_range(Resolution::Day1, today());
        assert_eq!(end, today());
        assert_eq!((end - start).num_days(), 90);

        let (start, _) = TimelineOption::Ytd.date_range(Resolution::Day1, today());
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_coarse_resolutions_widen_short_presets() {
        let days = |opt: TimelineOption, res: Resolution| {
            let (start, end) = opt.date_range(res, today());
            (end - start).num_days()
        };
        assert_eq!(days(TimelineOption::ThreeMonths, Resolution::Month1), 365);
        assert_eq!(days(TimelineOption::SixMonths, Resolution::Month1), 730);
        assert_eq!(days(TimelineOption::ThreeMonths, Resolution::Week1), 180);
        assert_eq!(days(TimelineOption::SixMonths, Resolution::Week1), 180);
        assert_eq!(days(TimelineOption::OneYear, Resolution::Month1), 365);
    }

    #[test]
    fn test_defaults_and_candles() {
        assert_eq!(TimelineOption::default_for(Resolution::Day1), TimelineOption::SixMonths);
        assert_eq!(TimelineOption::default_for(Resolution::Month1), TimelineOption::OneYear);
        assert_eq!(TimelineOption::SixMonths.expected_candles(Resolution::Day1, today()), Some(126));
        assert_eq!(TimelineOption::Ytd.expected_candles(Resolution::Month1, today()), Some(7));
        assert_eq!(TimelineOption::Custom.expected_candles(Resolution::Day1, today()), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("6M".parse::<TimelineOption>().unwrap(), TimelineOption::SixMonths);
        assert_eq!("ytd".parse::<TimelineOption>().unwrap(), TimelineOption::Ytd);
        assert!("forever".parse::<TimelineOption>().is_err());
        for opt in TimelineOption::all() {
            assert_eq!(opt.to_string().parse::<TimelineOption>().unwrap(), *opt);
        }
    }
}
