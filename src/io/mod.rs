//! Input/output: archive persistence, auxiliary headers, raster bands.

pub mod envi_header;
pub mod geotiff;
pub mod npz;

pub use envi_header::parse_hdr_file;
pub use geotiff::{read_band, RasterBand};
pub use npz::{NpzReader, NpzWriter};
