//! OpenStreetMap Nominatim client.

use super::{GeocodeError, Geocoder, Location};
use crate::region::GeoPoint;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
const DEFAULT_USER_AGENT: &str = "earth-time-lapse-tool";

/// Geocoder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Search endpoint URL.
    pub endpoint: String,
    /// User agent sent with every request; Nominatim rejects anonymous clients.
    pub user_agent: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

/// Blocking Nominatim search client.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, place: &str) -> Result<Location, GeocodeError> {
        tracing::debug!(place, endpoint = %self.endpoint, "Geocoding");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", place), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(GeocodeError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        parse_search(place, &body)
    }
}

/// Extracts the first hit from a `jsonv2` search response.
fn parse_search(place: &str, body: &str) -> Result<Location, GeocodeError> {
    let hits: Vec<SearchHit> =
        serde_json::from_str(body).map_err(|e| GeocodeError::Parse(e.to_string()))?;
    let hit = hits
        .into_iter()
        .next()
        .ok_or_else(|| GeocodeError::NotFound(place.to_string()))?;

    let lat: f64 = hit
        .lat
        .trim()
        .parse()
        .map_err(|_| GeocodeError::Parse(format!("bad latitude '{}'", hit.lat)))?;
    let lon: f64 = hit
        .lon
        .trim()
        .parse()
        .map_err(|_| GeocodeError::Parse(format!("bad longitude '{}'", hit.lon)))?;

    Ok(Location {
        point: GeoPoint::new(lat, lon),
        address: hit.display_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_first_hit() {
        let body = r#"[
            {"place_id": 1, "lat": "46.0634", "lon": "13.2358",
             "display_name": "Udine, Friuli-Venezia Giulia, Italia", "importance": 0.7},
            {"place_id": 2, "lat": "0", "lon": "0", "display_name": "elsewhere"}
        ]"#;
        let location = parse_search("Udine", body).unwrap();
        assert_eq!(location.point, GeoPoint::new(46.0634, 13.2358));
        assert!(location.address.starts_with("Udine"));
    }

    #[test]
    fn test_parse_empty_is_not_found() {
        assert!(matches!(
            parse_search("Atlantis", "[]"),
            Err(GeocodeError::NotFound(_))
        ));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(parse_search("x", "{}"), Err(GeocodeError::Parse(_))));
        assert!(matches!(
            parse_search("x", r#"[{"lat": "north", "lon": "1"}]"#),
            Err(GeocodeError::Parse(_))
        ));
    }

    #[test]
    fn test_default_config() {
        let config = GeocoderConfig::default();
        assert_eq!(config.user_agent, "earth-time-lapse-tool");
        assert!(NominatimGeocoder::new(&config).is_ok());
    }
}
