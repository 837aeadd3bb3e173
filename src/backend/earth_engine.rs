//! Earth Engine REST session.
//!
//! Composites are computed server-side with `image:computePixels` and
//! returned as NPY arrays on an EPSG:3857 grid matching the run's region
//! and pixel dimensions.

use super::{
    npy, BackendConnector, BackendError, BackendInitError, CompositeExpression, ImageryBackend,
};
use crate::cadence::Period;
use crate::composite::Composite;
use crate::region::{PixelGrid, Region};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const DEFAULT_ENDPOINT: &str = "https://earthengine.googleapis.com/v1";
const DEFAULT_TOKEN_ENV: &str = "EARTHENGINE_TOKEN";
const USER_AGENT: &str = concat!("earth-timelapse/", env!("CARGO_PKG_VERSION"));

/// Imagery backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// REST API root.
    pub endpoint: String,
    /// Environment variable holding an OAuth access token.
    pub token_env: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
        }
    }
}

/// Opens [`EarthEngineSession`]s.
#[derive(Debug, Clone, Default)]
pub struct EarthEngineConnector {
    config: BackendConfig,
}

impl EarthEngineConnector {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }
}

impl BackendConnector for EarthEngineConnector {
    fn connect(&self, project: Option<&str>) -> Result<Box<dyn ImageryBackend>, BackendInitError> {
        let project = project
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(BackendInitError::MissingProject)?;

        let token = std::env::var(&self.config.token_env)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BackendInitError::MissingCredentials {
                env: self.config.token_env.clone(),
            })?;

        let session = EarthEngineSession::open(&self.config.endpoint, project, token)?;
        Ok(Box::new(session))
    }
}

/// An authenticated session bound to one cloud project.
pub struct EarthEngineSession {
    client: Client,
    endpoint: String,
    project: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl EarthEngineSession {
    /// Opens a session and verifies the project is usable.
    pub fn open(endpoint: &str, project: &str, token: String) -> Result<Self, BackendInitError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(|e| BackendInitError::Unreachable(e.to_string()))?;

        let session = Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project: project.to_string(),
            token,
        };

        let url = format!("{}/projects/{}/algorithms", session.endpoint, session.project);
        let response = session
            .client
            .get(&url)
            .bearer_auth(&session.token)
            .send()
            .map_err(|e| BackendInitError::Unreachable(e.to_string()))?;

        match response.status() {
            s if s.is_success() => {
                tracing::info!(project = %session.project, "Imagery backend session opened");
                Ok(session)
            }
            StatusCode::UNAUTHORIZED => Err(BackendInitError::InvalidCredentials),
            status => Err(BackendInitError::ProjectRejected {
                project: session.project.clone(),
                status: status.as_u16(),
                message: error_message(response),
            }),
        }
    }
}

impl ImageryBackend for EarthEngineSession {
    fn name(&self) -> &str {
        "earth-engine"
    }

    fn composite(
        &self,
        region: &Region,
        grid: &PixelGrid,
        period: &Period,
    ) -> Result<Composite, BackendError> {
        let url = format!("{}/projects/{}/image:computePixels", self.endpoint, self.project);
        let body = compute_pixels_request(region, grid, period);

        tracing::debug!(period = %period.start.date_naive(), "Requesting composite");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: error_message(response),
            });
        }

        let bytes = response
            .bytes()
            .map_err(|e| BackendError::Request(e.to_string()))?;
        let composite = npy::decode_rgb(&bytes, period.time_start_ms())?;

        if composite.grid() != *grid {
            return Err(BackendError::GridMismatch {
                period: period.start.date_naive().to_string(),
                expected: *grid,
                actual: composite.grid(),
            });
        }
        Ok(composite)
    }
}

/// Body of an `image:computePixels` request.
pub(crate) fn compute_pixels_request(region: &Region, grid: &PixelGrid, period: &Period) -> Value {
    let extent = region.bounds().to_mercator();
    let expression = CompositeExpression::for_period(region, period);
    json!({
        "expression": expression.to_json(),
        "fileFormat": "NPY",
        "grid": {
            "dimensions": { "width": grid.width, "height": grid.height },
            "affineTransform": {
                "scaleX": extent.width() / grid.width as f64,
                "shearX": 0.0,
                "translateX": extent.min_x,
                "shearY": 0.0,
                "scaleY": -extent.height() / grid.height as f64,
                "translateY": extent.max_y,
            },
            "crsCode": "EPSG:3857",
        },
    })
}

fn error_message(response: Response) -> String {
    let text = response.text().unwrap_or_default();
    serde_json::from_str::<ApiErrorBody>(&text)
        .map(|body| body.error.message)
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::TimePeriod;
    use crate::region::{BoundingBox, GeoPoint};

    #[test]
    fn test_missing_project_is_reported_first() {
        let connector = EarthEngineConnector::default();
        let err = connector.connect(None).err().unwrap();
        assert!(matches!(err, BackendInitError::MissingProject));
        assert!(err.to_string().contains("--project"));

        let err = connector.connect(Some("  ")).err().unwrap();
        assert!(matches!(err, BackendInitError::MissingProject));
    }

    #[test]
    fn test_missing_token_names_variable() {
        let connector = EarthEngineConnector::new(BackendConfig {
            token_env: "EARTH_TIMELAPSE_TEST_TOKEN_UNSET".into(),
            ..Default::default()
        });
        let err = connector.connect(Some("my-project")).err().unwrap();
        assert!(
            matches!(err, BackendInitError::MissingCredentials { ref env } if env == "EARTH_TIMELAPSE_TEST_TOKEN_UNSET")
        );
    }

    #[test]
    fn test_compute_pixels_grid() {
        let region =
            Region::Buffered(BoundingBox::around(GeoPoint::new(46.06, 13.23), 6000.0).unwrap());
        let grid = PixelGrid::new(200, 100);
        let period = TimePeriod::Year.periods(2020, 2020)[0];
        let body = compute_pixels_request(&region, &grid, &period);

        let extent = region.bounds().to_mercator();
        let transform = &body["grid"]["affineTransform"];
        assert_eq!(body["fileFormat"], "NPY");
        assert_eq!(body["grid"]["crsCode"], "EPSG:3857");
        assert_eq!(body["grid"]["dimensions"]["width"], 200);
        assert_eq!(body["grid"]["dimensions"]["height"], 100);
        assert_eq!(transform["translateX"].as_f64().unwrap(), extent.min_x);
        assert_eq!(transform["translateY"].as_f64().unwrap(), extent.max_y);
        assert!(transform["scaleY"].as_f64().unwrap() < 0.0);
        assert!(body["expression"]["values"]["0"].is_object());
    }

    #[test]
    fn test_default_config() {
        let config = BackendConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.token_env, "EARTHENGINE_TOKEN");
    }
}
