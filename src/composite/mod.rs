//! Period composites and the adapter that fetches them.
//!
//! A run fetches its composite sequence exactly once. The smoother treats
//! that in-memory sequence as its lookup table; nothing is re-requested
//! per smoothing window.

mod raster;
mod source;

pub use raster::{Band, BandRaster, Composite, CompositeError};
pub use source::CompositeSource;
