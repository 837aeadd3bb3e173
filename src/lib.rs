//! Earth Timelapse Library
//!
//! Builds flicker-reduced satellite-imagery timelapses for a named place.
//! A place name is geocoded, per-period Landsat composites are requested
//! from a remote imagery backend, the sequence is smoothed with a
//! moving-window median, rendered to a looping GIF, annotated with date
//! and place text, and optionally transcoded to MP4.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! geocode → region → composite fetch → smoothing → render → overlay → transcode
//!                          ↑
//!                   backend session
//! ```
//!
//! # Design Principles
//!
//! - **Explicit session**: the backend session is opened once and passed by reference
//! - **Local pure smoothing**: composites are fetched once and smoothed in memory
//! - **Consistent stretch**: every frame uses the same visualization parameters
//! - **Degrade, don't abort**: overlay and transcode failures keep the primary artifact
//!
//! # Example
//!
//! ```no_run
//! use earth_timelapse::{
//!     backend::{MockBackend, MockConnector},
//!     geocode::MockGeocoder,
//!     metrics::PipelineMetrics,
//!     pipeline::{Collaborators, Pipeline, TimelapseConfig},
//! };
//!
//! let geocoder = MockGeocoder::new().with_place("Udine, Italy", 46.06, 13.23, "Udine");
//! let connector = MockConnector::new(MockBackend::new());
//! let metrics = PipelineMetrics::new().unwrap();
//!
//! let pipeline = Pipeline::new(TimelapseConfig::for_place("Udine, Italy")).unwrap();
//! let report = pipeline
//!     .run(
//!         &Collaborators {
//!             geocoder: &geocoder,
//!             connector: &connector,
//!             transcoder: None,
//!             annotator: None,
//!         },
//!         &metrics,
//!     )
//!     .unwrap();
//! println!("{} frames written to {}", report.frames, report.primary.display());
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod backend;
pub mod cadence;
pub mod composite;
pub mod geocode;
pub mod metrics;
pub mod overlay;
pub mod pipeline;
pub mod region;
pub mod render;
pub mod smoothing;
pub mod transcode;

// Re-export commonly used types at crate root
pub use backend::{BackendConnector, EarthEngineConnector, ImageryBackend};
pub use cadence::{SmoothingWindow, TimePeriod};
pub use composite::{Composite, CompositeSource};
pub use geocode::{Geocoder, NominatimGeocoder};
pub use overlay::OverlayCompositor;
pub use pipeline::{Pipeline, RunReport, TimelapseConfig, TimelapseError};
pub use region::{GeoPoint, Region, RegionBuilder};
pub use render::FrameRenderer;
pub use smoothing::{smooth, TemporalSmoother};
pub use transcode::{FfmpegTranscoder, Transcoder};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
