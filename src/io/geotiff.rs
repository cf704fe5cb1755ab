//! GeoTIFF raster band reading via GDAL.
//!
//! Supplies the raster-backed lookup-table variant with its band data,
//! affine transform, and CRS definition.

use crate::types::{GeoError, GeoResult, GeoTransform, MapProjection};
use gdal::Dataset;
use ndarray::Array2;
use std::path::Path;

/// Single raster band with its georeferencing.
pub struct RasterBand {
    pub data: Array2<f64>,
    pub transform: GeoTransform,
    pub projection: MapProjection,
}

/// Read band 1 of a GeoTIFF file together with its affine transform
/// and CRS (exported as a PROJ string).
pub fn read_band<P: AsRef<Path>>(path: P) -> GeoResult<RasterBand> {
    log::info!("Reading raster band from: {}", path.as_ref().display());

    let dataset = Dataset::open(path.as_ref())?;
    let geo_transform = dataset.geo_transform()?;
    let (width, height) = dataset.raster_size();
    log::debug!("Raster size: {}x{}", width, height);

    let rasterband = dataset.rasterband(1)?;
    let band_data = rasterband.read_as::<f64>((0, 0), (width, height), (width, height), None)?;
    let data = Array2::from_shape_vec((height, width), band_data.data).map_err(|e| {
        GeoError::InvalidFormat(format!("failed to reshape raster band: {}", e))
    })?;

    let spatial_ref = dataset.spatial_ref()?;
    let proj_string = spatial_ref.to_proj4()?;

    Ok(RasterBand {
        data,
        transform: GeoTransform::from_gdal(&geo_transform),
        projection: MapProjection::ProjString(proj_string),
    })
}
