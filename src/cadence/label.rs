//! Frame labels derived from composite timestamps.

use super::TimePeriod;
use chrono::{Datelike, TimeZone, Utc};

impl TimePeriod {
    /// Formats a frame label for a composite timestamp (epoch ms, UTC).
    ///
    /// `"YYYY"` for years, `"YYYY Qn"` for quarters, `"YYYY-MM"` for months.
    /// A missing or unrepresentable timestamp yields an empty label.
    pub fn label(self, time_start: Option<i64>) -> String {
        let Some(date) = time_start.and_then(|ms| Utc.timestamp_millis_opt(ms).single()) else {
            return String::new();
        };

        match self {
            TimePeriod::Year => format!("{:04}", date.year()),
            TimePeriod::Quarter => {
                let quarter = (date.month() - 1) / 3 + 1;
                format!("{:04} Q{}", date.year(), quarter)
            }
            TimePeriod::Month => format!("{:04}-{:02}", date.year(), date.month()),
        }
    }

    /// Labels for a whole sequence of timestamps, in order.
    pub fn labels<I>(self, timestamps: I) -> Vec<String>
    where
        I: IntoIterator<Item = Option<i64>>,
    {
        timestamps.into_iter().map(|t| self.label(t)).collect()
    }
}
