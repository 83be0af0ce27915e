use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bar resolution requested from providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// Daily candles
    Day1,
    /// Weekly candles
    Week1,
    /// Monthly candles
    Month1,
}

impl Resolution {
    /// Convert to interval string representation
    pub fn to_interval_string(&self) -> &'static str {
        match self {
            Resolution::Day1 => "1D",
            Resolution::Week1 => "1W",
            Resolution::Month1 => "1M",
        }
    }

    /// Single-letter code used by the TCBS bars endpoint
    pub fn tcbs_code(&self) -> &'static str {
        match self {
            Resolution::Day1 => "D",
            Resolution::Week1 => "W",
            Resolution::Month1 => "M",
        }
    }

    /// Get all available resolutions
    pub fn all() -> Vec<Resolution> {
        vec![Resolution::Day1, Resolution::Week1, Resolution::Month1]
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "1M" is month here, there are no minute bars
        match s.trim().to_uppercase().as_str() {
            "1D" | "D" | "DAY" | "DAILY" => Ok(Resolution::Day1),
            "1W" | "W" | "WEEK" | "WEEKLY" => Ok(Resolution::Week1),
            "1M" | "M" | "MONTH" | "MONTHLY" => Ok(Resolution::Month1),
            _ => Err(format!("Invalid resolution: {}. Valid options: 1D, 1W, 1M", s)),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_interval_string())
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::Day1
    }
}
