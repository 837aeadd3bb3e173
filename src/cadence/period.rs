//! Enumeration of calendar periods at a given cadence.

use super::TimePeriod;
use chrono::{DateTime, Datelike, Months, TimeZone, Utc};

/// One calendar period a composite is reduced over.
///
/// `start` is inclusive and doubles as the composite timestamp,
/// `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    /// Period start in epoch milliseconds.
    #[inline]
    pub fn time_start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    /// Calendar year the period starts in.
    #[inline]
    pub fn year(&self) -> i32 {
        self.start.year()
    }
}

impl TimePeriod {
    /// Every period from January 1st of `start_year` through December 31st
    /// of `end_year`, ascending. Empty when `end_year < start_year`.
    pub fn periods(self, start_year: i32, end_year: i32) -> Vec<Period> {
        let Some(first) = Utc.with_ymd_and_hms(start_year, 1, 1, 0, 0, 0).single() else {
            return Vec::new();
        };
        let Some(stop) = Utc.with_ymd_and_hms(end_year.saturating_add(1), 1, 1, 0, 0, 0).single()
        else {
            return Vec::new();
        };

        let step = Months::new(self.months());
        let mut periods = Vec::new();
        let mut start = first;

        while start < stop {
            let Some(end) = start.checked_add_months(step) else {
                break;
            };
            periods.push(Period { start, end });
            start = end;
        }

        periods
    }
}
