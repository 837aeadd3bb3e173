//! Remote imagery backend.
//!
//! The backend stores the raw Landsat archive and performs scene filtering,
//! per-period reduction and band selection server-side. A session is opened
//! once per run through a [`BackendConnector`] and passed by reference to
//! everything that needs it.

mod earth_engine;
mod expression;
mod mock;
mod npy;

pub use earth_engine::{BackendConfig, EarthEngineConnector, EarthEngineSession};
pub use expression::CompositeExpression;
pub use mock::{MockBackend, MockConnector, CLOUD_REFLECTANCE};
pub use npy::{decode_rgb, NpyError, MASKED_SENTINEL};

use crate::cadence::Period;
use crate::composite::{Composite, CompositeError};
use crate::region::{PixelGrid, Region};
use thiserror::Error;

/// Errors raised while opening a backend session.
#[derive(Debug, Error)]
pub enum BackendInitError {
    #[error(
        "no imagery backend project configured; pass --project <PROJECT_ID> \
         or set EARTHENGINE_PROJECT"
    )]
    MissingProject,

    #[error(
        "no access token found in ${env}; export one, e.g. \
         `export {env}=$(gcloud auth print-access-token)`"
    )]
    MissingCredentials { env: String },

    #[error("access token rejected by the imagery backend; refresh it with `gcloud auth print-access-token`")]
    InvalidCredentials,

    #[error("project '{project}' rejected by the imagery backend (HTTP {status}): {message}")]
    ProjectRejected {
        project: String,
        status: u16,
        message: String,
    },

    #[error("imagery backend unreachable: {0}")]
    Unreachable(String),
}

/// Errors raised by an open backend session.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("backend returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed pixel payload: {0}")]
    Payload(#[from] NpyError),

    #[error("invalid composite: {0}")]
    Composite(#[from] CompositeError),

    #[error("composite for {period} has {actual:?} pixels, requested {expected:?}")]
    GridMismatch {
        period: String,
        expected: PixelGrid,
        actual: PixelGrid,
    },
}

/// An open session with the imagery backend.
pub trait ImageryBackend {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Requests the Red/Green/Blue reflectance composite for one period over
    /// `region`, sampled onto `grid`. The result is tagged with the period
    /// start. Periods without usable scenes come back fully masked.
    fn composite(
        &self,
        region: &Region,
        grid: &PixelGrid,
        period: &Period,
    ) -> Result<Composite, BackendError>;
}

/// Opens backend sessions.
pub trait BackendConnector {
    /// Connects using an explicit project or the connector's default.
    fn connect(&self, project: Option<&str>) -> Result<Box<dyn ImageryBackend>, BackendInitError>;
}
