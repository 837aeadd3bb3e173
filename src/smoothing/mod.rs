//! Temporal smoothing.
//!
//! Each composite is replaced by the per-pixel, per-band median of every
//! composite whose timestamp lies within the cadence window around it.
//! Cloud-contaminated periods are pulled toward their neighbours without
//! dropping any period from the sequence.
//!
//! # Invariants
//!
//! - Output length and order equal the input's.
//! - Output `i` keeps input `i`'s timestamp.
//! - Windows are drawn from the original sequence and truncated at its ends.
//! - Masked (`NaN`) samples are ignored; a pixel masked in every member
//!   stays masked.

mod median;

pub use median::median_in_place;

use crate::cadence::{SmoothingWindow, TimePeriod};
use crate::composite::{BandRaster, Composite};
use crate::region::PixelGrid;
use std::ops::Range;
use thiserror::Error;

/// Errors that can occur while smoothing a sequence.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SmoothingError {
    #[error("composite {index} is {actual:?}, sequence is {expected:?}")]
    ShapeMismatch {
        index: usize,
        expected: PixelGrid,
        actual: PixelGrid,
    },
    #[error("composite {index} is not strictly after its predecessor")]
    Unordered { index: usize },
    #[error("timestamp {0} cannot be windowed")]
    TimestampOutOfRange(i64),
}

/// Moving-window median over a composite sequence.
#[derive(Debug, Clone, Copy)]
pub struct TemporalSmoother {
    window: SmoothingWindow,
}

impl TemporalSmoother {
    /// Creates a smoother using the window of `cadence`.
    pub fn new(cadence: TimePeriod) -> Self {
        Self::with_window(cadence.window())
    }

    pub fn with_window(window: SmoothingWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> SmoothingWindow {
        self.window
    }

    /// Indices of the composites inside the window around `sequence[index]`.
    ///
    /// `sequence` must be sorted by timestamp.
    pub fn window_members(
        &self,
        sequence: &[Composite],
        index: usize,
    ) -> Result<Range<usize>, SmoothingError> {
        let center = sequence[index].time_start();
        let (start, end) = self
            .window
            .bounds(center)
            .ok_or(SmoothingError::TimestampOutOfRange(center))?;

        let lo = sequence.partition_point(|c| c.time_start() < start);
        let hi = sequence.partition_point(|c| c.time_start() <= end);
        Ok(lo..hi)
    }

    /// Smooths `sequence`, returning one frame per input composite.
    pub fn smooth(&self, sequence: &[Composite]) -> Result<Vec<Composite>, SmoothingError> {
        validate(sequence)?;

        tracing::info!(
            composites = sequence.len(),
            half_width = self.window.half_width(),
            unit = ?self.window.unit(),
            "Applying moving-window median"
        );

        let mut frames = Vec::with_capacity(sequence.len());
        for (i, composite) in sequence.iter().enumerate() {
            let members = self.window_members(sequence, i)?;
            tracing::trace!(index = i, members = members.len(), "Smoothing window");

            let frame = if members.len() == 1 {
                composite.clone()
            } else {
                median_composite(&sequence[members], composite.time_start())
            };
            frames.push(frame);
        }

        Ok(frames)
    }
}

/// Smooths `sequence` with the window of `cadence`.
pub fn smooth(sequence: &[Composite], cadence: TimePeriod) -> Result<Vec<Composite>, SmoothingError> {
    TemporalSmoother::new(cadence).smooth(sequence)
}

fn validate(sequence: &[Composite]) -> Result<(), SmoothingError> {
    let Some(first) = sequence.first() else {
        return Ok(());
    };
    let expected = first.grid();

    for (index, pair) in sequence.windows(2).enumerate() {
        if pair[1].time_start() <= pair[0].time_start() {
            return Err(SmoothingError::Unordered { index: index + 1 });
        }
    }
    for (index, composite) in sequence.iter().enumerate() {
        if composite.grid() != expected {
            return Err(SmoothingError::ShapeMismatch {
                index,
                expected,
                actual: composite.grid(),
            });
        }
    }
    Ok(())
}

/// Per-pixel, per-band median of `members`, tagged with `time_start`.
fn median_composite(members: &[Composite], time_start: i64) -> Composite {
    let grid = members[0].grid();
    let mut scratch = Vec::with_capacity(members.len());

    let bands: [BandRaster; 3] = std::array::from_fn(|band| {
        let samples = (0..grid.pixel_count())
            .map(|pixel| {
                scratch.clear();
                scratch.extend(
                    members
                        .iter()
                        .map(|m| m.bands()[band].samples()[pixel])
                        .filter(|v| !v.is_nan()),
                );
                median_in_place(&mut scratch)
            })
            .collect();
        BandRaster::from_grid(grid, samples)
    });

    Composite::from_bands(time_start, bands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CLOUD_REFLECTANCE;
    use crate::composite::Band;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn year_ms(year: i32) -> i64 {
        Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap().timestamp_millis()
    }

    fn month_ms(year: i32, month: u32) -> i64 {
        Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).unwrap().timestamp_millis()
    }

    fn uniform(time_start: i64, value: f32) -> Composite {
        Composite::uniform(time_start, PixelGrid::new(2, 2), value)
    }

    fn red(c: &Composite) -> f32 {
        c.band(Band::Red).samples()[0]
    }

    #[test]
    fn test_yearly_window_members() {
        let sequence: Vec<_> = (2000..2005).map(|y| uniform(year_ms(y), 0.1)).collect();
        let smoother = TemporalSmoother::new(TimePeriod::Year);

        assert_eq!(smoother.window_members(&sequence, 0).unwrap(), 0..2);
        assert_eq!(smoother.window_members(&sequence, 2).unwrap(), 1..4);
        assert_eq!(smoother.window_members(&sequence, 4).unwrap(), 3..5);
    }

    #[test]
    fn test_boundary_windows_are_truncated() {
        let sequence: Vec<_> = (1..=12).map(|m| uniform(month_ms(2020, m), 0.1)).collect();
        let smoother = TemporalSmoother::new(TimePeriod::Month);

        let first = smoother.window_members(&sequence, 0).unwrap().len();
        let interior = smoother.window_members(&sequence, 6).unwrap().len();
        let last = smoother.window_members(&sequence, 11).unwrap().len();

        assert_eq!(interior, 5);
        assert_eq!(first, 3);
        assert_eq!(last, 3);
    }

    #[test]
    fn test_quarter_window_reaches_adjacent_quarters() {
        // Documented behaviour: four months either side, wider than a quarter.
        let sequence: Vec<_> = [1, 4, 7, 10]
            .iter()
            .map(|&m| uniform(month_ms(2020, m), 0.1))
            .collect();
        let smoother = TemporalSmoother::new(TimePeriod::Quarter);
        assert_eq!(smoother.window_members(&sequence, 1).unwrap(), 0..3);
        assert_eq!(smoother.window_members(&sequence, 2).unwrap(), 1..4);
    }

    #[test]
    fn test_cloudy_year_is_suppressed() {
        let values = [0.10, 0.11, CLOUD_REFLECTANCE, 0.13, 0.14];
        let sequence: Vec<_> = values
            .iter()
            .zip(2000..)
            .map(|(&v, y)| uniform(year_ms(y), v))
            .collect();

        let frames = smooth(&sequence, TimePeriod::Year).unwrap();

        assert_eq!(frames.len(), sequence.len());
        assert!((red(&frames[2]) - 0.13).abs() < 1e-6);
        // Edge frame: median of {0.10, 0.11}.
        assert!((red(&frames[0]) - 0.105).abs() < 1e-6);
    }

    #[test]
    fn test_timestamps_preserved() {
        let sequence: Vec<_> = (2000..2010).map(|y| uniform(year_ms(y), 0.2)).collect();
        let frames = smooth(&sequence, TimePeriod::Year).unwrap();
        for (frame, original) in frames.iter().zip(&sequence) {
            assert_eq!(frame.time_start(), original.time_start());
        }
    }

    #[test]
    fn test_single_composite_is_identity() {
        let grid = PixelGrid::new(2, 1);
        let composite = Composite::new(
            year_ms(2020),
            BandRaster::new(2, 1, vec![0.1, f32::NAN]).unwrap(),
            BandRaster::filled(grid, 0.2),
            BandRaster::filled(grid, 0.3),
        )
        .unwrap();

        let frames = smooth(std::slice::from_ref(&composite), TimePeriod::Month).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].time_start(), composite.time_start());
        assert_eq!(frames[0].band(Band::Red).samples()[0], 0.1);
        assert!(frames[0].band(Band::Red).samples()[1].is_nan());
        assert_eq!(frames[0].band(Band::Blue), composite.band(Band::Blue));
    }

    #[test]
    fn test_masked_samples_are_ignored() {
        let masked = |t: i64| {
            Composite::new(
                t,
                BandRaster::new(1, 1, vec![f32::NAN]).unwrap(),
                BandRaster::new(1, 1, vec![0.2]).unwrap(),
                BandRaster::new(1, 1, vec![0.2]).unwrap(),
            )
            .unwrap()
        };
        let sequence = vec![
            Composite::uniform(year_ms(2000), PixelGrid::new(1, 1), 0.1),
            masked(year_ms(2001)),
            Composite::uniform(year_ms(2002), PixelGrid::new(1, 1), 0.3),
        ];

        let frames = smooth(&sequence, TimePeriod::Year).unwrap();
        assert!((red(&frames[1]) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_empty_sequence() {
        assert!(smooth(&[], TimePeriod::Year).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_unordered_and_mismatched() {
        let unordered = vec![uniform(year_ms(2001), 0.1), uniform(year_ms(2000), 0.1)];
        assert_eq!(
            smooth(&unordered, TimePeriod::Year).unwrap_err(),
            SmoothingError::Unordered { index: 1 }
        );

        let mismatched = vec![
            uniform(year_ms(2000), 0.1),
            Composite::uniform(year_ms(2001), PixelGrid::new(3, 3), 0.1),
        ];
        assert!(matches!(
            smooth(&mismatched, TimePeriod::Year),
            Err(SmoothingError::ShapeMismatch { index: 1, .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_matches_brute_force_median(
            values in proptest::collection::vec(0.0f32..1.0, 1..30),
            cadence_idx in 0usize..3,
        ) {
            let cadence = TimePeriod::ALL[cadence_idx];
            let periods = cadence.periods(2000, 2030);
            let sequence: Vec<Composite> = values
                .iter()
                .zip(&periods)
                .map(|(&v, p)| Composite::uniform(p.time_start_ms(), PixelGrid::new(1, 1), v))
                .collect();

            let frames = smooth(&sequence, cadence).unwrap();
            prop_assert_eq!(frames.len(), sequence.len());

            let window = cadence.window();
            for (i, frame) in frames.iter().enumerate() {
                let t_i = sequence[i].time_start();
                prop_assert_eq!(frame.time_start(), t_i);

                let mut members: Vec<f32> = sequence
                    .iter()
                    .filter(|c| (t_i - c.time_start()).abs() <= window_ms(window, t_i, c.time_start()))
                    .map(red)
                    .collect();
                let expected = median_in_place(&mut members);
                prop_assert!((red(frame) - expected).abs() < 1e-6);
            }
        }
    }

    /// Distance from `center` to the window edge on the side of `other`.
    fn window_ms(window: SmoothingWindow, center: i64, other: i64) -> i64 {
        let (start, end) = window.bounds(center).unwrap();
        if other < center {
            center - start
        } else {
            end - center
        }
    }
}
