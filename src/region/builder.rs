//! Region and output-dimension planning.

use super::{BoundingBox, Dimensions, GeoPoint, Region, RegionError};

/// Capped portrait dimensions for vertical output.
pub const VERTICAL_DIMENSIONS: (u32, u32) = (720, 1280);

/// Portrait height-to-width ratio.
const PORTRAIT_RATIO: f64 = 16.0 / 9.0;

/// A region together with the pixel dimensions it is rendered at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionPlan {
    pub region: Region,
    pub dimensions: Dimensions,
}

/// Builds the query region for a run.
#[derive(Debug, Clone, Copy)]
pub struct RegionBuilder {
    center: GeoPoint,
    radius_m: f64,
}

impl RegionBuilder {
    pub fn new(center: GeoPoint, radius_m: f64) -> Self {
        Self { center, radius_m }
    }

    /// Plans the region and output dimensions.
    ///
    /// Standard output buffers the center point and lets the height follow
    /// the region. Vertical output combines the longitude extent of the
    /// `radius` buffer with the latitude extent of the `radius × 16/9`
    /// buffer and renders at [`VERTICAL_DIMENSIONS`]. If the taller buffer
    /// cannot be computed, vertical output falls back to the standard box
    /// rendered at `width × round(width × 16/9)`.
    pub fn build(&self, vertical: bool, width: u32) -> Result<RegionPlan, RegionError> {
        let standard = BoundingBox::around(self.center, self.radius_m)?;

        if !vertical {
            return Ok(RegionPlan {
                region: Region::Buffered(standard),
                dimensions: Dimensions::Width(width),
            });
        }

        match BoundingBox::around(self.center, self.radius_m * PORTRAIT_RATIO) {
            Ok(tall) => {
                let (width, height) = VERTICAL_DIMENSIONS;
                tracing::debug!(
                    lon_span = standard.lon_span(),
                    lat_span = tall.lat_span(),
                    "Vertical region computed"
                );
                Ok(RegionPlan {
                    region: Region::Rectangle(standard.with_lat_extent_of(&tall)),
                    dimensions: Dimensions::Exact { width, height },
                })
            }
            Err(e) => {
                let height = (width as f64 * PORTRAIT_RATIO).round() as u32;
                tracing::warn!(
                    error = %e,
                    width,
                    height,
                    "Vertical region failed, using standard region with portrait dimensions"
                );
                Ok(RegionPlan {
                    region: Region::Buffered(standard),
                    dimensions: Dimensions::Exact { width, height },
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn udine() -> GeoPoint {
        GeoPoint::new(46.06, 13.23)
    }

    #[test]
    fn test_standard_plan() {
        let plan = RegionBuilder::new(udine(), 6000.0).build(false, 768).unwrap();
        assert_eq!(plan.dimensions, Dimensions::Width(768));
        assert_eq!(
            plan.region,
            Region::Buffered(BoundingBox::around(udine(), 6000.0).unwrap())
        );
    }

    #[test]
    fn test_vertical_plan_spans() {
        let plan = RegionBuilder::new(udine(), 6000.0).build(true, 768).unwrap();
        let standard = BoundingBox::around(udine(), 6000.0).unwrap();
        let tall = BoundingBox::around(udine(), 6000.0 * (16.0 / 9.0)).unwrap();

        let Region::Rectangle(bounds) = plan.region else {
            panic!("expected rectangle, got {:?}", plan.region);
        };
        assert_eq!(bounds.lon_span(), standard.lon_span());
        assert_eq!(bounds.lat_span(), tall.lat_span());
        assert_eq!(plan.dimensions, Dimensions::Exact { width: 720, height: 1280 });
    }

    #[test]
    fn test_vertical_plan_is_portrait_in_mercator() {
        let plan = RegionBuilder::new(udine(), 6000.0).build(true, 768).unwrap();
        let extent = plan.region.bounds().to_mercator();
        let ratio = extent.height() / extent.width();
        assert!((ratio - 16.0 / 9.0).abs() < 0.05, "ratio {ratio}");
    }

    #[test]
    fn test_vertical_fallback_near_pole() {
        // 6 km fits below the pole, 6 km × 16/9 does not.
        let center = GeoPoint::new(89.93, 0.0);
        let plan = RegionBuilder::new(center, 6000.0).build(true, 768).unwrap();
        assert!(matches!(plan.region, Region::Buffered(_)));
        assert_eq!(plan.dimensions, Dimensions::Exact { width: 768, height: 1365 });
    }

    #[test]
    fn test_standard_failure_propagates() {
        let err = RegionBuilder::new(udine(), -5.0).build(false, 768).unwrap_err();
        assert_eq!(err, RegionError::InvalidRadius(-5.0));
    }
}
