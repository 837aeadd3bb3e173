//! Band rasters and composites.

use crate::region::PixelGrid;
use thiserror::Error;

/// Errors constructing a composite.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompositeError {
    #[error("band {band} has {actual} samples, expected {expected}")]
    SampleCount {
        band: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("band dimensions differ: {0:?}")]
    ShapeMismatch(Vec<(u32, u32)>),
}

/// Visible-light band of a composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Red,
    Green,
    Blue,
}

impl Band {
    /// Bands in display order.
    pub const RGB: [Band; 3] = [Band::Red, Band::Green, Band::Blue];

    /// Band name as used by the imagery backend.
    pub fn name(self) -> &'static str {
        match self {
            Band::Red => "Red",
            Band::Green => "Green",
            Band::Blue => "Blue",
        }
    }

    #[inline]
    fn index(self) -> usize {
        match self {
            Band::Red => 0,
            Band::Green => 1,
            Band::Blue => 2,
        }
    }
}

/// A single band of surface reflectance, row-major.
///
/// `NaN` marks masked (no-data) pixels.
#[derive(Clone, PartialEq)]
pub struct BandRaster {
    width: u32,
    height: u32,
    samples: Vec<f32>,
}

impl BandRaster {
    /// Wraps a sample buffer. The buffer length must equal `width × height`.
    pub fn new(width: u32, height: u32, samples: Vec<f32>) -> Result<Self, CompositeError> {
        let expected = (width as usize) * (height as usize);
        if samples.len() != expected {
            return Err(CompositeError::SampleCount {
                band: "raster",
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// A raster filled with one value.
    pub fn filled(grid: PixelGrid, value: f32) -> Self {
        Self {
            width: grid.width,
            height: grid.height,
            samples: vec![value; grid.pixel_count()],
        }
    }

    /// Wraps a buffer already known to match `grid`.
    pub(crate) fn from_grid(grid: PixelGrid, samples: Vec<f32>) -> Self {
        debug_assert_eq!(samples.len(), grid.pixel_count());
        Self {
            width: grid.width,
            height: grid.height,
            samples,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl std::fmt::Debug for BandRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BandRaster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("samples", &self.samples.len())
            .finish()
    }
}

/// A reduced image for one period: Red, Green and Blue reflectance tagged
/// with the period start (`time_start`, epoch milliseconds).
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    time_start: i64,
    bands: [BandRaster; 3],
}

impl Composite {
    /// Builds a composite from three equally-sized bands.
    pub fn new(
        time_start: i64,
        red: BandRaster,
        green: BandRaster,
        blue: BandRaster,
    ) -> Result<Self, CompositeError> {
        let shapes = [&red, &green, &blue].map(|b| (b.width, b.height));
        if shapes.iter().any(|s| *s != shapes[0]) {
            return Err(CompositeError::ShapeMismatch(shapes.to_vec()));
        }
        Ok(Self {
            time_start,
            bands: [red, green, blue],
        })
    }

    /// Builds a composite from bands already known to share one grid.
    pub(crate) fn from_bands(time_start: i64, bands: [BandRaster; 3]) -> Self {
        debug_assert!(bands.iter().all(|b| b.width == bands[0].width && b.height == bands[0].height));
        Self { time_start, bands }
    }

    /// A composite with every band set to `value`.
    pub fn uniform(time_start: i64, grid: PixelGrid, value: f32) -> Self {
        let band = BandRaster::filled(grid, value);
        Self {
            time_start,
            bands: [band.clone(), band.clone(), band],
        }
    }

    #[inline]
    pub fn time_start(&self) -> i64 {
        self.time_start
    }

    #[inline]
    pub fn band(&self, band: Band) -> &BandRaster {
        &self.bands[band.index()]
    }

    #[inline]
    pub fn bands(&self) -> &[BandRaster; 3] {
        &self.bands
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.bands[0].width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.bands[0].height
    }

    #[inline]
    pub fn grid(&self) -> PixelGrid {
        PixelGrid::new(self.width(), self.height())
    }
}
