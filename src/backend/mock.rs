//! In-process backend producing synthetic composites.
//!
//! Used for tests and offline dry runs. Every composite is uniform; its
//! reflectance encodes the period start so smoothing results are easy to
//! predict.

use super::{BackendConnector, BackendError, BackendInitError, ImageryBackend};
use crate::cadence::Period;
use crate::composite::Composite;
use crate::region::{PixelGrid, Region};
use chrono::Datelike;
use std::cell::Cell;
use std::collections::HashSet;

/// Reflectance assigned to cloud-contaminated periods.
pub const CLOUD_REFLECTANCE: f32 = 1.0;

/// Synthetic imagery backend.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    cloudy: HashSet<i64>,
    fail_at: Option<i64>,
    requests: Cell<usize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the period starting at `time_start` as cloud-covered.
    pub fn with_cloudy(mut self, time_start: i64) -> Self {
        self.cloudy.insert(time_start);
        self
    }

    /// Fails the request for the period starting at `time_start`.
    pub fn failing_at(mut self, time_start: i64) -> Self {
        self.fail_at = Some(time_start);
        self
    }

    /// Number of composite requests served so far.
    pub fn requests(&self) -> usize {
        self.requests.get()
    }

    /// Clear-sky reflectance for a period: rises by 0.001 per month since 2000.
    pub fn clear_reflectance(period: &Period) -> f32 {
        let months = (period.start.year() - 2000) * 12 + period.start.month0() as i32;
        0.05 + months as f32 * 0.001
    }
}

impl ImageryBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn composite(
        &self,
        _region: &Region,
        grid: &PixelGrid,
        period: &Period,
    ) -> Result<Composite, BackendError> {
        self.requests.set(self.requests.get() + 1);
        let time_start = period.time_start_ms();

        if self.fail_at == Some(time_start) {
            return Err(BackendError::Api {
                status: 500,
                message: format!("synthetic failure for {}", period.start.date_naive()),
            });
        }

        let value = if self.cloudy.contains(&time_start) {
            CLOUD_REFLECTANCE
        } else {
            Self::clear_reflectance(period)
        };
        Ok(Composite::uniform(time_start, *grid, value))
    }
}

/// Hands out clones of a template [`MockBackend`].
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    template: MockBackend,
    require_project: bool,
}

impl MockConnector {
    pub fn new(template: MockBackend) -> Self {
        Self {
            template,
            require_project: false,
        }
    }

    /// Rejects connections without a project, like the real backend.
    pub fn requiring_project(mut self) -> Self {
        self.require_project = true;
        self
    }
}

impl BackendConnector for MockConnector {
    fn connect(&self, project: Option<&str>) -> Result<Box<dyn ImageryBackend>, BackendInitError> {
        if self.require_project && project.map_or(true, |p| p.trim().is_empty()) {
            return Err(BackendInitError::MissingProject);
        }
        Ok(Box::new(self.template.clone()))
    }
}
