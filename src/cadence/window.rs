//! Calendar-aware smoothing windows.

use chrono::{DateTime, Months, TimeZone, Utc};

/// Calendar unit a smoothing window advances by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowUnit {
    Year,
    Month,
}

impl WindowUnit {
    fn months(self) -> u32 {
        match self {
            WindowUnit::Year => 12,
            WindowUnit::Month => 1,
        }
    }
}

/// Half-width of a moving window, in whole calendar units.
///
/// The window around a timestamp `t` is the closed interval
/// `[t - half_width·unit, t + half_width·unit]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SmoothingWindow {
    half_width: u32,
    unit: WindowUnit,
}

impl SmoothingWindow {
    pub const fn new(half_width: u32, unit: WindowUnit) -> Self {
        Self { half_width, unit }
    }

    #[inline]
    pub fn half_width(&self) -> u32 {
        self.half_width
    }

    #[inline]
    pub fn unit(&self) -> WindowUnit {
        self.unit
    }

    /// Half-width expressed in months.
    pub fn span_months(&self) -> u32 {
        self.half_width * self.unit.months()
    }

    /// Window bounds around `center_ms`, in epoch milliseconds.
    ///
    /// Returns `None` when the timestamp or either bound falls outside the
    /// representable calendar range.
    pub fn bounds(&self, center_ms: i64) -> Option<(i64, i64)> {
        let center: DateTime<Utc> = Utc.timestamp_millis_opt(center_ms).single()?;
        let span = Months::new(self.span_months());
        let start = center.checked_sub_months(span)?;
        let end = center.checked_add_months(span)?;
        Some((start.timestamp_millis(), end.timestamp_millis()))
    }

    /// Returns true if `candidate_ms` lies inside the window centered on
    /// `center_ms`. Both ends are inclusive.
    pub fn contains(&self, center_ms: i64, candidate_ms: i64) -> bool {
        self.bounds(center_ms)
            .map(|(start, end)| (start..=end).contains(&candidate_ms))
            .unwrap_or(candidate_ms == center_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(y: i32, m: u32, d: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap().timestamp_millis()
    }

    #[test]
    fn test_year_window_bounds() {
        let window = SmoothingWindow::new(1, WindowUnit::Year);
        let (start, end) = window.bounds(ms(2010, 1, 1)).unwrap();
        assert_eq!(start, ms(2009, 1, 1));
        assert_eq!(end, ms(2011, 1, 1));
    }

    #[test]
    fn test_month_window_crosses_year() {
        let window = SmoothingWindow::new(2, WindowUnit::Month);
        let (start, end) = window.bounds(ms(2020, 1, 1)).unwrap();
        assert_eq!(start, ms(2019, 11, 1));
        assert_eq!(end, ms(2020, 3, 1));
    }

    #[test]
    fn test_window_is_closed() {
        let window = SmoothingWindow::new(4, WindowUnit::Month);
        let center = ms(2020, 7, 1);
        assert!(window.contains(center, ms(2020, 3, 1)));
        assert!(window.contains(center, ms(2020, 11, 1)));
        assert!(!window.contains(center, ms(2020, 2, 29)));
        assert!(!window.contains(center, ms(2020, 11, 2)));
        assert!(window.contains(center, center));
    }

    #[test]
    fn test_span_months() {
        assert_eq!(SmoothingWindow::new(1, WindowUnit::Year).span_months(), 12);
        assert_eq!(SmoothingWindow::new(4, WindowUnit::Month).span_months(), 4);
    }
}
