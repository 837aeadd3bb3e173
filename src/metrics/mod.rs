//! Run metrics in Prometheus text format.
//!
//! A timelapse run is a one-shot batch job, so metrics are gathered in a
//! local registry and optionally written to a file when the run ends,
//! ready for a node-exporter textfile collector or a pushgateway.
//!
//! # Metrics Exposed
//!
//! - `earth_timelapse_composites_fetched_total` - Composites received from the backend
//! - `earth_timelapse_frames_rendered_total` - Frames written to the primary animation
//! - `earth_timelapse_frames_annotated_total` - Frames carrying overlay text
//! - `earth_timelapse_overlay_failures_total` - Overlay passes that degraded
//! - `earth_timelapse_transcode_failures_total` - Transcodes that failed
//! - `earth_timelapse_transcode_skipped_total` - Transcodes skipped for lack of a transcoder
//! - `earth_timelapse_stage_duration_seconds{stage}` - Wall time per pipeline stage
//!
//! # Example
//!
//! ```no_run
//! use earth_timelapse::metrics::PipelineMetrics;
//!
//! let metrics = PipelineMetrics::new().expect("Failed to create registry");
//! metrics.record_composites(21);
//! metrics.observe_stage("fetch", 12.5);
//! metrics.write_to("run.prom").expect("Failed to write metrics");
//! ```

mod collector;

pub use collector::{MetricsError, PipelineMetrics};
