//! Run configuration.
//!
//! Run parameters come from the command line. Rendering, overlay and
//! service tuning can additionally be loaded from a TOML file; every
//! section is optional and falls back to defaults.

use crate::backend::BackendConfig;
use crate::cadence::TimePeriod;
use crate::geocode::GeocoderConfig;
use crate::overlay::OverlayStyle;
use crate::render::VisParams;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Output base name that is replaced by one derived from the place name.
pub const DEFAULT_OUTPUT: &str = "timelapse";

const FPS_RANGE: RangeInclusive<u32> = 1..=60;
const WIDTH_RANGE: RangeInclusive<u32> = 16..=4096;
const YEARS_RANGE: RangeInclusive<u32> = 0..=60;

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("place name must not be empty")]
    EmptyPlace,
    #[error("invalid frame rate {0} (must be 1-60 fps)")]
    InvalidFrameRate(u32),
    #[error("invalid width {0} (must be 16-4096 px)")]
    InvalidWidth(u32),
    #[error("invalid radius {0} m (must be positive)")]
    InvalidRadius(u32),
    #[error("invalid year span {0} (must be 0-60)")]
    InvalidYears(u32),
    #[error("invalid visualization settings: {0}")]
    InvalidVisualization(String),
    #[error("invalid overlay settings: {0}")]
    InvalidOverlay(String),
    #[error("invalid geocoder settings: {0}")]
    InvalidGeocoder(String),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub visualization: VisParams,
    #[serde(default)]
    pub overlay: OverlayStyle,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        let config: FileConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the tuning parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.visualization
            .validate()
            .map_err(|e| ConfigError::InvalidVisualization(e.to_string()))?;

        let overlay = &self.overlay;
        if !(0.0..=1.0).contains(&overlay.box_alpha) {
            return Err(ConfigError::InvalidOverlay(format!(
                "box_alpha {} must be within 0-1",
                overlay.box_alpha
            )));
        }
        for (name, scale) in [("label_scale", overlay.label_scale), ("place_scale", overlay.place_scale)] {
            if !(scale > 0.0 && scale < 1.0) {
                return Err(ConfigError::InvalidOverlay(format!(
                    "{name} {scale} must be a fraction of the frame height"
                )));
            }
        }
        Ok(())
    }
}

/// Everything one run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelapseConfig {
    /// Free-text place name to geocode.
    pub place: String,
    /// Number of years before the current year to start from.
    pub years: u32,
    /// Output base name, or [`DEFAULT_OUTPUT`] to derive one.
    pub output: String,
    /// Directory the artifacts are written to.
    pub output_dir: PathBuf,
    /// Imagery backend project.
    pub project: Option<String>,
    /// Buffer radius around the place, in meters.
    pub radius_m: u32,
    pub cadence: TimePeriod,
    /// Output width in pixels (ignored for vertical output).
    pub width: u32,
    pub fps: u32,
    /// Render 9:16 portrait output.
    pub vertical: bool,
    pub tuning: FileConfig,
}

impl TimelapseConfig {
    /// A configuration with the command-line defaults for `place`.
    pub fn for_place(place: impl Into<String>) -> Self {
        Self {
            place: place.into(),
            years: 20,
            output: DEFAULT_OUTPUT.to_string(),
            output_dir: PathBuf::from("."),
            project: None,
            radius_m: 6000,
            cadence: TimePeriod::Year,
            width: 768,
            fps: 10,
            vertical: false,
            tuning: FileConfig::default(),
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.place.trim().is_empty() {
            return Err(ConfigError::EmptyPlace);
        }
        if !FPS_RANGE.contains(&self.fps) {
            return Err(ConfigError::InvalidFrameRate(self.fps));
        }
        if !WIDTH_RANGE.contains(&self.width) {
            return Err(ConfigError::InvalidWidth(self.width));
        }
        if self.radius_m == 0 {
            return Err(ConfigError::InvalidRadius(self.radius_m));
        }
        if !YEARS_RANGE.contains(&self.years) {
            return Err(ConfigError::InvalidYears(self.years));
        }
        self.tuning.validate()
    }
}
