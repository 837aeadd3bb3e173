//! Top-level error taxonomy and exit codes.

use super::config::ConfigError;
use crate::backend::{BackendError, BackendInitError};
use crate::geocode::GeocodeError;
use crate::region::RegionError;
use crate::render::RenderError;
use crate::smoothing::SmoothingError;
use thiserror::Error;

/// Exit code after Ctrl-C.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Failures between a successful backend connection and a written
/// primary animation.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("region: {0}")]
    Region(#[from] RegionError),
    #[error("fetch: {0}")]
    Fetch(#[from] BackendError),
    #[error("no composites returned for {start_year}-{end_year}")]
    NoComposites { start_year: i32, end_year: i32 },
    #[error("smoothing: {0}")]
    Smoothing(#[from] SmoothingError),
    #[error("render: {0}")]
    Render(#[from] RenderError),
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum TimelapseError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resolution(#[from] GeocodeError),
    #[error(transparent)]
    BackendInit(#[from] BackendInitError),
    #[error("failed to generate timelapse: {0}")]
    Pipeline(#[from] PipelineError),
}

impl TimelapseError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            TimelapseError::Config(_) => 2,
            TimelapseError::Resolution(_) => 3,
            TimelapseError::BackendInit(_) => 4,
            TimelapseError::Pipeline(_) => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            TimelapseError::from(ConfigError::EmptyPlace),
            TimelapseError::from(GeocodeError::NotFound("x".into())),
            TimelapseError::from(BackendInitError::MissingProject),
            TimelapseError::from(PipelineError::from(RenderError::Empty)),
        ];
        let codes: Vec<u8> = errors.iter().map(TimelapseError::exit_code).collect();
        assert_eq!(codes, vec![2, 3, 4, 5]);
        assert!(!codes.contains(&0));
        assert!(!codes.contains(&EXIT_INTERRUPTED));
    }

    #[test]
    fn test_backend_init_message_passes_through() {
        let err = TimelapseError::from(BackendInitError::MissingProject);
        assert!(err.to_string().contains("EARTHENGINE_PROJECT"));
    }
}
