//! Metrics collection and registry.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, Registry, TextEncoder};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("failed to write metrics to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Stage duration buckets in seconds, from sub-second local stages to
/// multi-minute backend fetches.
const STAGE_BUCKETS: &[f64] = &[0.05, 0.25, 1.0, 5.0, 15.0, 60.0, 180.0, 600.0, 1800.0];

/// Prometheus registry for one pipeline run.
pub struct PipelineMetrics {
    registry: Registry,

    composites_fetched: IntCounter,
    frames_rendered: IntCounter,
    frames_annotated: IntCounter,

    overlay_failures: IntCounter,
    transcode_failures: IntCounter,
    transcode_skipped: IntCounter,

    stage_duration: HistogramVec,
}

impl PipelineMetrics {
    /// Creates a registry with all run metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let composites_fetched = IntCounter::new(
            "earth_timelapse_composites_fetched_total",
            "Composites received from the imagery backend",
        )?;
        let frames_rendered = IntCounter::new(
            "earth_timelapse_frames_rendered_total",
            "Frames written to the primary animation",
        )?;
        let frames_annotated = IntCounter::new(
            "earth_timelapse_frames_annotated_total",
            "Frames carrying date and place overlay text",
        )?;
        let overlay_failures = IntCounter::new(
            "earth_timelapse_overlay_failures_total",
            "Overlay passes that failed and left the animation unannotated",
        )?;
        let transcode_failures = IntCounter::new(
            "earth_timelapse_transcode_failures_total",
            "Secondary transcodes that failed",
        )?;
        let transcode_skipped = IntCounter::new(
            "earth_timelapse_transcode_skipped_total",
            "Secondary transcodes skipped because no transcoder was available",
        )?;
        let stage_duration = HistogramVec::new(
            HistogramOpts::new(
                "earth_timelapse_stage_duration_seconds",
                "Wall time spent in each pipeline stage",
            )
            .buckets(STAGE_BUCKETS.to_vec()),
            &["stage"],
        )?;

        registry.register(Box::new(composites_fetched.clone()))?;
        registry.register(Box::new(frames_rendered.clone()))?;
        registry.register(Box::new(frames_annotated.clone()))?;
        registry.register(Box::new(overlay_failures.clone()))?;
        registry.register(Box::new(transcode_failures.clone()))?;
        registry.register(Box::new(transcode_skipped.clone()))?;
        registry.register(Box::new(stage_duration.clone()))?;

        Ok(Self {
            registry,
            composites_fetched,
            frames_rendered,
            frames_annotated,
            overlay_failures,
            transcode_failures,
            transcode_skipped,
            stage_duration,
        })
    }

    pub fn record_composites(&self, count: usize) {
        self.composites_fetched.inc_by(count as u64);
    }

    pub fn record_rendered(&self, frames: usize) {
        self.frames_rendered.inc_by(frames as u64);
    }

    pub fn record_annotated(&self, frames: usize) {
        self.frames_annotated.inc_by(frames as u64);
    }

    pub fn record_overlay_failure(&self) {
        self.overlay_failures.inc();
    }

    pub fn record_transcode_failure(&self) {
        self.transcode_failures.inc();
    }

    pub fn record_transcode_skipped(&self) {
        self.transcode_skipped.inc();
    }

    /// Records the wall time of one stage.
    pub fn observe_stage(&self, stage: &str, seconds: f64) {
        self.stage_duration.with_label_values(&[stage]).observe(seconds);
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Writes the encoded metrics to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), MetricsError> {
        let path = path.as_ref();
        let text = self.encode()?;
        std::fs::write(path, text).map_err(|source| MetricsError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

impl std::fmt::Debug for PipelineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineMetrics")
            .field("composites_fetched", &self.composites_fetched.get())
            .field("frames_rendered", &self.frames_rendered.get())
            .field("frames_annotated", &self.frames_annotated.get())
            .finish_non_exhaustive()
    }
}
