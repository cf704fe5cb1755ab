//! Core geocoding modules

pub mod geocode;
pub mod geometry;
pub mod interp;
pub mod lut;
pub mod lut3d;
pub mod raster_lut;
pub mod rlut;
pub mod transform;

// Re-export main types
pub use geocode::{nearest_neighbor_lookup, nearest_neighbor_lookup_bands};
pub use geometry::transform_geometry;
pub use interp::{InterpolationMethod, ScatteredInterpolator};
pub use lut::Lut;
pub use lut3d::{Lut3d, DEFAULT_MIN_VALID_HEIGHT};
pub use raster_lut::RasterLut;
pub use rlut::Rlut;
pub use transform::CoordTransform;
