//! Place-name resolution.
//!
//! A place name is resolved once, before any imagery work starts. A name
//! that resolves to nothing is a hard failure for the run.

mod nominatim;

pub use nominatim::{GeocoderConfig, NominatimGeocoder};

use crate::region::GeoPoint;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while resolving a place name.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("could not find location '{0}'")]
    NotFound(String),
    #[error("geocoding request failed: {0}")]
    Network(String),
    #[error("geocoder returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("unexpected geocoder response: {0}")]
    Parse(String),
}

/// A resolved place.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub point: GeoPoint,
    /// Full display address reported by the geocoder.
    pub address: String,
}

/// Resolves free-text place names to coordinates.
pub trait Geocoder {
    fn geocode(&self, place: &str) -> Result<Location, GeocodeError>;
}

/// Geocoder answering from a fixed table. Lookups ignore case and
/// surrounding whitespace.
#[derive(Debug, Clone, Default)]
pub struct MockGeocoder {
    places: HashMap<String, Location>,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place(mut self, name: &str, lat: f64, lon: f64, address: &str) -> Self {
        self.places.insert(
            Self::key(name),
            Location {
                point: GeoPoint::new(lat, lon),
                address: address.to_string(),
            },
        );
        self
    }

    fn key(name: &str) -> String {
        name.trim().to_lowercase()
    }
}

impl Geocoder for MockGeocoder {
    fn geocode(&self, place: &str) -> Result<Location, GeocodeError> {
        self.places
            .get(&Self::key(place))
            .cloned()
            .ok_or_else(|| GeocodeError::NotFound(place.to_string()))
    }
}
