//! Region of interest and output pixel dimensions.
//!
//! The region is computed once per run from the geocoded center point and
//! reused for every composite request and every rendered frame.

mod builder;

pub use builder::{RegionBuilder, RegionPlan, VERTICAL_DIMENSIONS};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius used for buffering, in meters.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Sphere radius of the Web Mercator (EPSG:3857) projection, in meters.
const MERCATOR_RADIUS_M: f64 = 6_378_137.0;

/// Errors that can occur while computing a region.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegionError {
    #[error("invalid center point ({lat}, {lon})")]
    InvalidCenter { lat: f64, lon: f64 },
    #[error("invalid buffer radius: {0} m")]
    InvalidRadius(f64),
    #[error("buffer of {radius_m} m around latitude {lat} reaches a pole")]
    ReachesPole { lat: f64, radius_m: f64 },
}

/// A geographic point in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Axis-aligned longitude/latitude box, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Bounding box of the spherical disk of `radius_m` meters around `center`.
    pub fn around(center: GeoPoint, radius_m: f64) -> Result<Self, RegionError> {
        if !center.is_valid() {
            return Err(RegionError::InvalidCenter {
                lat: center.lat,
                lon: center.lon,
            });
        }
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(RegionError::InvalidRadius(radius_m));
        }

        let angular = radius_m / EARTH_RADIUS_M;
        let dlat = angular.to_degrees();
        let north = center.lat + dlat;
        let south = center.lat - dlat;

        let cos_lat = center.lat.to_radians().cos();
        if north >= 90.0 || south <= -90.0 || angular.sin() >= cos_lat {
            return Err(RegionError::ReachesPole {
                lat: center.lat,
                radius_m,
            });
        }

        // Widest longitude reach of a spherical cap.
        let dlon = (angular.sin() / cos_lat).asin().to_degrees();

        Ok(Self {
            west: center.lon - dlon,
            south,
            east: center.lon + dlon,
            north,
        })
    }

    #[inline]
    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    #[inline]
    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    /// Combines the longitude extent of `self` with the latitude extent of `other`.
    pub fn with_lat_extent_of(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            west: self.west,
            south: other.south,
            east: self.east,
            north: other.north,
        }
    }

    /// Projects the box to Web Mercator meters.
    pub fn to_mercator(&self) -> MercatorExtent {
        let x = |lon: f64| MERCATOR_RADIUS_M * lon.to_radians();
        let y = |lat: f64| {
            MERCATOR_RADIUS_M * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln()
        };
        MercatorExtent {
            min_x: x(self.west),
            min_y: y(self.south),
            max_x: x(self.east),
            max_y: y(self.north),
        }
    }

    /// Closed polygon ring (lon, lat) in counter-clockwise order.
    pub fn ring(&self) -> [[f64; 2]; 5] {
        [
            [self.west, self.south],
            [self.east, self.south],
            [self.east, self.north],
            [self.west, self.north],
            [self.west, self.south],
        ]
    }
}

/// Extent of a region in EPSG:3857 meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MercatorExtent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl MercatorExtent {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// The area imagery is queried over and rendered for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Region {
    /// Bounds of a buffered point (standard aspect).
    Buffered(BoundingBox),
    /// Explicit rectangle sized for a 9:16 portrait frame.
    Rectangle(BoundingBox),
}

impl Region {
    pub fn bounds(&self) -> &BoundingBox {
        match self {
            Region::Buffered(b) | Region::Rectangle(b) => b,
        }
    }
}

/// Requested output pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimensions {
    /// Fixed width; height follows the region's projected aspect.
    Width(u32),
    /// Exact width and height.
    Exact { width: u32, height: u32 },
}

impl Dimensions {
    /// Resolves to a concrete pixel grid for `region`.
    pub fn resolve(&self, region: &Region) -> PixelGrid {
        match *self {
            Dimensions::Exact { width, height } => PixelGrid::new(width, height),
            Dimensions::Width(width) => {
                let extent = region.bounds().to_mercator();
                let aspect = extent.height() / extent.width();
                let height = if aspect.is_finite() && aspect > 0.0 {
                    (width as f64 * aspect).round().max(1.0) as u32
                } else {
                    width
                };
                PixelGrid::new(width, height)
            }
        }
    }
}

/// Concrete raster dimensions shared by every composite and frame of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelGrid {
    pub width: u32,
    pub height: u32,
}

impl PixelGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn udine() -> GeoPoint {
        GeoPoint::new(46.06, 13.23)
    }

    #[test]
    fn test_buffer_is_centered() {
        let bbox = BoundingBox::around(udine(), 6000.0).unwrap();
        assert!(((bbox.north + bbox.south) / 2.0 - 46.06).abs() < 1e-9);
        assert!(((bbox.east + bbox.west) / 2.0 - 13.23).abs() < 1e-9);
    }

    #[test]
    fn test_buffer_lat_span_matches_radius() {
        let bbox = BoundingBox::around(udine(), 6000.0).unwrap();
        // 12 km north-south is roughly 0.108 degrees.
        assert!((bbox.lat_span() - 0.1079).abs() < 1e-3);
        // Longitude degrees shrink with latitude.
        assert!(bbox.lon_span() > bbox.lat_span());
    }

    #[test]
    fn test_buffer_projects_roughly_square() {
        let extent = BoundingBox::around(udine(), 6000.0).unwrap().to_mercator();
        let aspect = extent.width() / extent.height();
        assert!((aspect - 1.0).abs() < 0.01, "aspect {aspect}");
    }

    #[test]
    fn test_pole_is_rejected() {
        let err = BoundingBox::around(GeoPoint::new(89.99, 0.0), 6000.0).unwrap_err();
        assert!(matches!(err, RegionError::ReachesPole { .. }));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            BoundingBox::around(GeoPoint::new(f64::NAN, 0.0), 10.0),
            Err(RegionError::InvalidCenter { .. })
        ));
        assert!(matches!(
            BoundingBox::around(udine(), 0.0),
            Err(RegionError::InvalidRadius(_))
        ));
    }

    #[test]
    fn test_width_dimensions_follow_region_aspect() {
        let bbox = BoundingBox::around(udine(), 6000.0).unwrap();
        let tall = bbox.with_lat_extent_of(&BoundingBox::around(udine(), 12000.0).unwrap());
        let grid = Dimensions::Width(400).resolve(&Region::Rectangle(tall));
        assert_eq!(grid.width, 400);
        assert!((grid.height as i64 - 800).abs() <= 8, "height {}", grid.height);
    }

    #[test]
    fn test_exact_dimensions_ignore_region() {
        let region = Region::Buffered(BoundingBox::around(udine(), 6000.0).unwrap());
        let grid = Dimensions::Exact { width: 720, height: 1280 }.resolve(&region);
        assert_eq!(grid, PixelGrid::new(720, 1280));
        assert_eq!(grid.pixel_count(), 720 * 1280);
    }
}
