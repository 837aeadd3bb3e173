//! Cadence policy.
//!
//! A run samples the archive at one fixed cadence. The cadence decides
//! three things downstream: which calendar periods get a composite, how
//! wide the smoothing window around each composite is, and how a frame
//! timestamp is rendered as a label.

mod label;
mod period;
mod window;

pub use period::Period;
pub use window::{SmoothingWindow, WindowUnit};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from strict cadence parsing.
#[derive(Debug, Clone, Error)]
pub enum CadenceError {
    #[error("unknown cadence '{0}' (expected year, quarter or month)")]
    Unknown(String),
}

/// Sampling frequency of the output sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePeriod {
    /// One composite per calendar year.
    #[default]
    Year,
    /// One composite per calendar quarter.
    Quarter,
    /// One composite per calendar month.
    Month,
}

impl TimePeriod {
    /// All cadences, coarsest first.
    pub const ALL: [TimePeriod; 3] = [TimePeriod::Year, TimePeriod::Quarter, TimePeriod::Month];

    /// Parses a cadence name, falling back to [`TimePeriod::Year`] for
    /// anything unrecognized.
    pub fn parse_lenient(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            tracing::debug!(cadence = name, "Unknown cadence, using yearly policy");
            TimePeriod::Year
        })
    }

    /// Lowercase name used on the command line and in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            TimePeriod::Year => "year",
            TimePeriod::Quarter => "quarter",
            TimePeriod::Month => "month",
        }
    }

    /// Length of one period in calendar months.
    pub fn months(self) -> u32 {
        match self {
            TimePeriod::Year => 12,
            TimePeriod::Quarter => 3,
            TimePeriod::Month => 1,
        }
    }

    /// Smoothing half-window for this cadence.
    ///
    /// Years reach one year each side and months two months. Quarters reach
    /// four months each side, which is wider than one quarter.
    pub fn window(self) -> SmoothingWindow {
        match self {
            TimePeriod::Year => SmoothingWindow::new(1, WindowUnit::Year),
            TimePeriod::Quarter => SmoothingWindow::new(4, WindowUnit::Month),
            TimePeriod::Month => SmoothingWindow::new(2, WindowUnit::Month),
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimePeriod {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "year" | "yearly" => Ok(TimePeriod::Year),
            "quarter" | "quarterly" => Ok(TimePeriod::Quarter),
            "month" | "monthly" => Ok(TimePeriod::Month),
            _ => Err(CadenceError::Unknown(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_per_cadence() {
        assert_eq!(TimePeriod::Year.window(), SmoothingWindow::new(1, WindowUnit::Year));
        assert_eq!(TimePeriod::Quarter.window(), SmoothingWindow::new(4, WindowUnit::Month));
        assert_eq!(TimePeriod::Month.window(), SmoothingWindow::new(2, WindowUnit::Month));
    }

    #[test]
    fn test_quarter_window_wider_than_quarter() {
        // Documented behaviour: a quarterly window spans more than one quarter.
        let window = TimePeriod::Quarter.window();
        assert!(window.span_months() > TimePeriod::Quarter.months());
        // Monthly windows reach two periods each side, quarterly only one.
        assert_eq!(window.span_months() / TimePeriod::Quarter.months(), 1);
        assert_eq!(TimePeriod::Month.window().span_months() / TimePeriod::Month.months(), 2);
    }

    #[test]
    fn test_unknown_cadence_falls_back_to_year() {
        assert_eq!(TimePeriod::parse_lenient("fortnight"), TimePeriod::Year);
        assert_eq!(TimePeriod::parse_lenient("").window(), TimePeriod::Year.window());
        assert_eq!(TimePeriod::parse_lenient("Quarter"), TimePeriod::Quarter);
    }

    #[test]
    fn test_strict_parse_rejects_unknown() {
        assert!(matches!("decade".parse::<TimePeriod>(), Err(CadenceError::Unknown(_))));
        assert_eq!("month".parse::<TimePeriod>().unwrap(), TimePeriod::Month);
    }

    #[test]
    fn test_default_is_year() {
        assert_eq!(TimePeriod::default(), TimePeriod::Year);
    }

    #[test]
    fn test_serde_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            cadence: TimePeriod,
        }
        let parsed: Wrapper = toml::from_str("cadence = \"quarter\"").unwrap();
        assert_eq!(parsed.cadence, TimePeriod::Quarter);
    }
}
