//! slantgeo: geocoding between slant-range and geographic coordinates
//!
//! This library converts between the native slant-range geometry of
//! airborne SAR images (azimuth, range pixel indices) and geographic
//! or projected map coordinates, mediated by discrete lookup tables:
//!
//! - [`Lut`] maps geographic grid cells to azimuth/range positions and
//!   drives both forward geocoding (SLC image to geographic raster)
//!   and backward geocoding (coordinates, geometries, and tables to
//!   azimuth/range).
//! - [`Rlut`] is the reverse table for fast repeated back-geocoding.
//! - [`Lut3d`] adds per-pixel polynomial terrain correction and
//!   flattens to a [`Lut`] for a given height field.
//! - [`RasterLut`] provides the same geocoding contracts for lookup
//!   tables georeferenced by an affine transform and CRS (GeoTIFF).
//!
//! Invalid data (coordinates outside coverage, NaN inputs, negative
//! az/rg sentinels) flows through every operation as NaN, absent
//! geometries, or omitted members, never as errors; structural
//! misuse (shape mismatches, malformed archives, unsupported geometry
//! types) fails fast with [`GeoError`].

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    GeoBounds, GeoError, GeoResult, GeoTable, GeoTransform, Hemisphere, LutGrid, MapProjection,
    SlcComplex, SlcImage, UtmGeoHeader,
};

pub use crate::core::{
    nearest_neighbor_lookup, nearest_neighbor_lookup_bands, transform_geometry, CoordTransform,
    InterpolationMethod, Lut, Lut3d, RasterLut, Rlut, DEFAULT_MIN_VALID_HEIGHT,
};

pub use io::{parse_hdr_file, NpzReader, NpzWriter};
