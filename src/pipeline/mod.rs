//! Pipeline orchestration.
//!
//! One run is a linear, single-pass sequence of blocking stages:
//!
//! ```text
//! geocode → connect → region → fetch → smooth → render → overlay → transcode
//! ```
//!
//! Everything up to and including render is fail-fast. Overlay and
//! transcode degrade: their failures are logged and reported in the
//! [`RunReport`], and the run still succeeds with the artifacts it has.

mod config;
mod error;
mod output;

pub use config::{ConfigError, FileConfig, TimelapseConfig, DEFAULT_OUTPUT};
pub use error::{PipelineError, TimelapseError, EXIT_INTERRUPTED};
pub use output::OutputPaths;

use crate::backend::BackendConnector;
use crate::composite::CompositeSource;
use crate::geocode::{Geocoder, Location};
use crate::metrics::PipelineMetrics;
use crate::overlay::{FrameAnnotator, OverlayCompositor};
use crate::region::{PixelGrid, RegionBuilder};
use crate::render::FrameRenderer;
use crate::smoothing::TemporalSmoother;
use crate::transcode::Transcoder;
use chrono::{Datelike, Utc};
use std::time::Instant;

/// Named pipeline stages, used for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Geocode,
    Connect,
    Region,
    Fetch,
    Smooth,
    Render,
    Overlay,
    Transcode,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Geocode => "geocode",
            Stage::Connect => "connect",
            Stage::Region => "region",
            Stage::Fetch => "fetch",
            Stage::Smooth => "smooth",
            Stage::Render => "render",
            Stage::Overlay => "overlay",
            Stage::Transcode => "transcode",
        }
    }
}

/// How a degradable stage ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    Skipped(String),
    Failed(String),
}

impl StageOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, StageOutcome::Completed)
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub location: Location,
    pub start_year: i32,
    pub end_year: i32,
    pub grid: PixelGrid,
    pub frames: usize,
    /// The GIF; always present on success.
    pub primary: std::path::PathBuf,
    /// The MP4, if transcoding succeeded.
    pub secondary: Option<std::path::PathBuf>,
    pub overlay: StageOutcome,
    pub transcode: StageOutcome,
}

/// External services a run depends on.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub geocoder: &'a dyn Geocoder,
    pub connector: &'a dyn BackendConnector,
    /// `None` when no transcoder was found at startup.
    pub transcoder: Option<&'a dyn Transcoder>,
    /// `None` draws with an [`OverlayCompositor`] built from the configured
    /// overlay style.
    pub annotator: Option<&'a dyn FrameAnnotator>,
}

/// A configured timelapse run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: TimelapseConfig,
    current_year: i32,
}

impl Pipeline {
    /// Validates `config` and anchors the year range at the current UTC year.
    pub fn new(config: TimelapseConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            current_year: Utc::now().year(),
        })
    }

    /// Anchors the year range at `year` instead of the current year.
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    pub fn config(&self) -> &TimelapseConfig {
        &self.config
    }

    /// `(current_year - years, current_year)`.
    pub fn year_range(&self) -> (i32, i32) {
        let end = self.current_year;
        (end - self.config.years as i32, end)
    }

    pub fn output_paths(&self) -> OutputPaths {
        OutputPaths::derive(&self.config.place, &self.config.output, &self.config.output_dir)
    }

    /// Runs every stage once.
    pub fn run(
        &self,
        services: &Collaborators<'_>,
        metrics: &PipelineMetrics,
    ) -> Result<RunReport, TimelapseError> {
        let config = &self.config;
        let (start_year, end_year) = self.year_range();
        tracing::info!(place = %config.place, start_year, end_year, "Generating timelapse");

        let location = timed(metrics, Stage::Geocode, || services.geocoder.geocode(&config.place))?;
        tracing::info!(
            address = %location.address,
            lat = location.point.lat,
            lon = location.point.lon,
            "Found location"
        );

        let backend = timed(metrics, Stage::Connect, || {
            services.connector.connect(config.project.as_deref())
        })?;

        let plan = timed(metrics, Stage::Region, || {
            RegionBuilder::new(location.point, config.radius_m as f64).build(config.vertical, config.width)
        })
        .map_err(PipelineError::from)?;
        let grid = plan.dimensions.resolve(&plan.region);
        tracing::info!(
            width = grid.width,
            height = grid.height,
            vertical = config.vertical,
            radius_m = config.radius_m,
            "Region planned"
        );

        let composites = timed(metrics, Stage::Fetch, || {
            CompositeSource::new(backend.as_ref()).fetch(
                &plan.region,
                &grid,
                start_year,
                end_year,
                config.cadence,
            )
        })
        .map_err(PipelineError::from)?;
        metrics.record_composites(composites.len());
        if composites.is_empty() {
            return Err(PipelineError::NoComposites {
                start_year,
                end_year,
            }
            .into());
        }

        let smoother = TemporalSmoother::new(config.cadence);
        tracing::info!(
            cadence = %config.cadence,
            half_width = smoother.window().half_width(),
            unit = ?smoother.window().unit(),
            "Smoothing composites"
        );
        let smoothed = timed(metrics, Stage::Smooth, || smoother.smooth(&composites))
            .map_err(PipelineError::from)?;
        drop(composites);

        let paths = self.output_paths();
        if let Some(dir) = paths.primary.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| PipelineError::OutputDir {
                path: dir.display().to_string(),
                source,
            })?;
        }

        let renderer = FrameRenderer::new(config.tuning.visualization);
        let video = timed(metrics, Stage::Render, || {
            renderer.render(&smoothed, config.fps, &paths.primary)
        })
        .map_err(PipelineError::from)?;
        metrics.record_rendered(video.frames);
        tracing::info!(path = %video.path.display(), frames = video.frames, "Timelapse saved");

        let labels = config
            .cadence
            .labels(smoothed.iter().map(|c| Some(c.time_start())));
        drop(smoothed);

        let overlay = timed(metrics, Stage::Overlay, || {
            self.annotate(services.annotator, &paths, &labels, metrics)
        });
        let (transcode, secondary) = timed(metrics, Stage::Transcode, || {
            self.transcode(services.transcoder, &paths, metrics)
        });

        Ok(RunReport {
            location,
            start_year,
            end_year,
            grid,
            frames: video.frames,
            primary: video.path,
            secondary,
            overlay,
            transcode,
        })
    }

    fn annotate(
        &self,
        annotator: Option<&dyn FrameAnnotator>,
        paths: &OutputPaths,
        labels: &[String],
        metrics: &PipelineMetrics,
    ) -> StageOutcome {
        if labels.is_empty() {
            tracing::warn!("No frame timestamps available; skipping overlay");
            return StageOutcome::Skipped("no frame timestamps".into());
        }

        let place = self.config.place.trim();
        let result = match annotator {
            Some(annotator) => annotator.annotate(&paths.primary, labels, place),
            None => OverlayCompositor::new(self.config.tuning.overlay.clone())
                .annotate(&paths.primary, labels, place),
        };
        match result {
            Ok(summary) => {
                metrics.record_annotated(summary.frames);
                tracing::info!(frames = summary.frames, font = %summary.font, "Overlay added");
                StageOutcome::Completed
            }
            Err(e) => {
                metrics.record_overlay_failure();
                tracing::warn!(error = %e, "Could not add overlay; keeping unannotated timelapse");
                StageOutcome::Failed(e.to_string())
            }
        }
    }

    fn transcode(
        &self,
        transcoder: Option<&dyn Transcoder>,
        paths: &OutputPaths,
        metrics: &PipelineMetrics,
    ) -> (StageOutcome, Option<std::path::PathBuf>) {
        let Some(transcoder) = transcoder else {
            metrics.record_transcode_skipped();
            tracing::warn!("No transcoder available; skipping MP4 generation");
            return (StageOutcome::Skipped("no transcoder available".into()), None);
        };

        tracing::info!(transcoder = transcoder.name(), path = %paths.secondary.display(), "Converting to MP4");
        match transcoder.transcode(&paths.primary, &paths.secondary) {
            Ok(()) => {
                tracing::info!(path = %paths.secondary.display(), "MP4 saved");
                (StageOutcome::Completed, Some(paths.secondary.clone()))
            }
            Err(e) => {
                metrics.record_transcode_failure();
                tracing::warn!(error = %e, "Failed to generate MP4");
                (StageOutcome::Failed(e.to_string()), None)
            }
        }
    }
}

/// Runs `f` and records its wall time under `stage`.
fn timed<T>(metrics: &PipelineMetrics, stage: Stage, f: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let result = f();
    let elapsed = started.elapsed().as_secs_f64();
    metrics.observe_stage(stage.as_str(), elapsed);
    tracing::debug!(stage = stage.as_str(), seconds = elapsed, "Stage finished");
    result
}
