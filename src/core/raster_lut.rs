//! Raster-backed lookup table (GeoTIFF-origin LUTs).
//!
//! Functionally equivalent to [`crate::core::lut::Lut`] geocoding but
//! sourced from CRS + affine raster pairs instead of explicit
//! min/max/spacing metadata. Raster rows are stored top-to-bottom
//! (row 0 at the maximum coordinate), unlike the bottom-up convention
//! used elsewhere; image geocoding flips the grids accordingly.

use crate::core::geocode::{
    nearest_neighbor_lookup, nearest_neighbor_lookup_bands, rowcol_to_azrg,
};
use crate::core::geometry::transform_geometry;
use crate::io::geotiff::read_band;
use crate::types::{
    GeoBounds, GeoError, GeoResult, GeoTable, GeoTransform, LutGrid, MapProjection,
};
use geo_types::Geometry;
use ndarray::{s, Array1, Array2, Array3, ArrayView2, ArrayView3};
use std::path::Path;

/// Lookup table georeferenced by an affine transform and CRS.
#[derive(Debug, Clone)]
pub struct RasterLut {
    lut_az: LutGrid,
    lut_rg: LutGrid,
    transform: GeoTransform,
    projection: MapProjection,
}

impl RasterLut {
    pub fn new(
        lut_az: LutGrid,
        lut_rg: LutGrid,
        transform: GeoTransform,
        projection: MapProjection,
    ) -> GeoResult<Self> {
        if lut_az.dim() != lut_rg.dim() {
            return Err(GeoError::ShapeMismatch(format!(
                "lut_az shape {:?} != lut_rg shape {:?}",
                lut_az.dim(),
                lut_rg.dim()
            )));
        }
        if transform.determinant().abs() < f64::MIN_POSITIVE {
            return Err(GeoError::InvalidFormat(
                "raster transform is not invertible".to_string(),
            ));
        }
        Ok(Self {
            lut_az,
            lut_rg,
            transform,
            projection,
        })
    }

    /// Load the azimuth/range lookup-table pair from two GeoTIFF
    /// files; georeferencing is taken from the azimuth file.
    pub fn from_geotiff_files<P: AsRef<Path>>(path_az: P, path_rg: P) -> GeoResult<Self> {
        let az = read_band(path_az)?;
        let rg = read_band(path_rg)?;
        Self::new(az.data, rg.data, az.transform, az.projection)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.lut_az.dim()
    }

    pub fn lut_az(&self) -> &LutGrid {
        &self.lut_az
    }

    pub fn lut_rg(&self) -> &LutGrid {
        &self.lut_rg
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn projection(&self) -> &MapProjection {
        &self.projection
    }

    /// Bounds of this lookup table in its geographic coordinates.
    pub fn bounds(&self) -> GeoBounds {
        let (rows, cols) = self.lut_az.dim();
        self.transform.array_bounds(rows, cols)
    }

    /// Geocode an SLC image to the geometry of this lookup table by
    /// nearest neighbor lookup.
    ///
    /// The raster stores its rows top-down while the output follows
    /// the bottom-up row convention (row 0 at the minimum coordinate),
    /// so the lookup grids are flipped vertically before use.
    pub fn geocode_image<A: Copy>(
        &self,
        img: &ArrayView2<'_, A>,
        invalid_fill: A,
    ) -> GeoResult<Array2<A>> {
        let lut_az = self.lut_az.slice(s![..;-1, ..]);
        let lut_rg = self.lut_rg.slice(s![..;-1, ..]);
        nearest_neighbor_lookup(img, &lut_az, &lut_rg, invalid_fill)
    }

    /// Multi-channel variant of [`RasterLut::geocode_image`].
    pub fn geocode_image_bands<A: Copy>(
        &self,
        img: &ArrayView3<'_, A>,
        invalid_fill: A,
    ) -> GeoResult<Array3<A>> {
        let lut_az = self.lut_az.slice(s![..;-1, ..]);
        let lut_rg = self.lut_rg.slice(s![..;-1, ..]);
        nearest_neighbor_lookup_bands(img, &lut_az, &lut_rg, invalid_fill)
    }

    /// Geocode coordinate arrays (x = easting/longitude,
    /// y = northing/latitude, in this raster's CRS) to azimuth/range.
    /// Coordinates outside the raster or the radar coverage come back
    /// as NaN.
    pub fn geocode_coords(&self, xs: &[f64], ys: &[f64]) -> (Array1<f64>, Array1<f64>) {
        let n = xs.len().min(ys.len());
        let mut rows = vec![f64::NAN; n];
        let mut cols = vec![f64::NAN; n];
        for i in 0..n {
            let (row, col) = self.transform.rowcol(xs[i], ys[i]);
            rows[i] = row.floor();
            cols[i] = col.floor();
        }
        rowcol_to_azrg(&self.lut_az.view(), &self.lut_rg.view(), &rows, &cols)
    }

    /// Scalar convenience wrapper over [`RasterLut::geocode_coords`];
    /// invalid positions short-circuit to `(NaN, NaN)`.
    pub fn geocode_point(&self, x: f64, y: f64) -> (f64, f64) {
        let (row, col) = self.transform.rowcol(x, y);
        let (row, col) = (row.floor(), col.floor());
        let (rows, cols) = self.lut_az.dim();
        if row.is_nan() || col.is_nan() || row < 0.0 || row >= rows as f64 || col < 0.0
            || col >= cols as f64
        {
            return (f64::NAN, f64::NAN);
        }
        let az = self.lut_az[[row as usize, col as usize]];
        let rg = self.lut_rg[[row as usize, col as usize]];
        if az < 0.0 || rg < 0.0 {
            return (f64::NAN, f64::NAN);
        }
        (az, rg)
    }

    /// Geocode a geometry in this raster's CRS to the SLC geometry.
    /// Geometry x maps to azimuth, y to range.
    pub fn geocode_geometry(
        &self,
        geometry: &Geometry<f64>,
    ) -> GeoResult<Option<Geometry<f64>>> {
        let mut to_azrg = |x: f64, y: f64| self.geocode_point(x, y);
        transform_geometry(geometry, &mut to_azrg)
    }

    /// Geocode a table with "longitude" and "latitude" columns (in
    /// this raster's CRS) to slant-range geometry, appending "azimuth"
    /// and "range" columns to a new table.
    pub fn geocode_table(&self, table: &GeoTable) -> GeoResult<GeoTable> {
        let xs = table.column("longitude")?;
        let ys = table.column("latitude")?;
        let (az, rg) = self.geocode_coords(xs, ys);
        table.with_columns(vec![("azimuth", az.to_vec()), ("range", rg.to_vec())])
    }
}
