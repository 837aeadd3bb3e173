//! Composite source adapter.

use super::Composite;
use crate::backend::{BackendError, ImageryBackend};
use crate::cadence::TimePeriod;
use crate::region::{PixelGrid, Region};

/// Fetches the ordered composite sequence for a run.
pub struct CompositeSource<'a> {
    backend: &'a dyn ImageryBackend,
}

impl<'a> CompositeSource<'a> {
    pub fn new(backend: &'a dyn ImageryBackend) -> Self {
        Self { backend }
    }

    /// Requests one Red/Green/Blue composite per `cadence` period between
    /// `start_year` and `end_year` inclusive.
    ///
    /// The result is sorted by ascending timestamp with one composite per
    /// distinct timestamp. Any failed request aborts the fetch.
    pub fn fetch(
        &self,
        region: &Region,
        grid: &PixelGrid,
        start_year: i32,
        end_year: i32,
        cadence: TimePeriod,
    ) -> Result<Vec<Composite>, BackendError> {
        let periods = cadence.periods(start_year, end_year);
        tracing::info!(
            backend = self.backend.name(),
            cadence = %cadence,
            start_year,
            end_year,
            periods = periods.len(),
            width = grid.width,
            height = grid.height,
            "Fetching composites"
        );

        let mut composites = Vec::with_capacity(periods.len());
        for (i, period) in periods.iter().enumerate() {
            let composite = self.backend.composite(region, grid, period)?;
            tracing::debug!(
                index = i,
                time_start = composite.time_start(),
                "Composite received"
            );
            composites.push(composite);
        }

        composites.sort_by_key(Composite::time_start);
        let before = composites.len();
        composites.dedup_by_key(|c| c.time_start());
        if composites.len() != before {
            tracing::warn!(
                dropped = before - composites.len(),
                "Dropped composites with duplicate timestamps"
            );
        }

        Ok(composites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::region::{BoundingBox, GeoPoint};

    fn region() -> Region {
        Region::Buffered(BoundingBox::around(GeoPoint::new(46.06, 13.23), 6000.0).unwrap())
    }

    #[test]
    fn test_fetch_one_per_period_in_order() {
        let backend = MockBackend::new();
        let source = CompositeSource::new(&backend);
        let grid = PixelGrid::new(8, 8);

        let composites = source
            .fetch(&region(), &grid, 2018, 2020, TimePeriod::Quarter)
            .unwrap();

        assert_eq!(composites.len(), 12);
        assert_eq!(backend.requests(), 12);
        assert!(composites
            .windows(2)
            .all(|w| w[0].time_start() < w[1].time_start()));
        assert!(composites.iter().all(|c| c.grid() == grid));
    }

    #[test]
    fn test_fetch_aborts_on_failure() {
        let failing = TimePeriod::Year.periods(2015, 2015)[0].time_start_ms();
        let backend = MockBackend::new().failing_at(failing);
        let source = CompositeSource::new(&backend);

        let result = source.fetch(&region(), &PixelGrid::new(2, 2), 2010, 2020, TimePeriod::Year);
        assert!(result.is_err());
        assert_eq!(backend.requests(), 6);
    }
}
