//! Look-Up Table (LUT) for geocoding between geographic and
//! slant-range coordinates.
//!
//! A LUT is a regular grid in a map projection whose cells store the
//! azimuth/range position of the corresponding ground point in the SLC
//! image. Grid point `(i, j)` sits at coordinate
//! `(min_x1 + i * step1, min_x2 + j * step2)` where axis 1 is
//! northing/latitude and axis 2 is easting/longitude; row 0 holds the
//! minimum coordinate. Cells outside radar coverage carry NaN or a
//! negative sentinel. Instances are immutable: every transformation
//! returns a new value.

use crate::core::geocode::{
    nearest_neighbor_lookup, nearest_neighbor_lookup_bands, rowcol_to_azrg,
};
use crate::core::geometry::transform_geometry;
use crate::core::interp::{
    zoom_bilinear, BilinearGridInterp, GridAxis, InterpolationMethod, ScatteredInterpolator,
};
use crate::core::rlut::Rlut;
use crate::core::transform::CoordTransform;
use crate::io::npz::{NpzReader, NpzWriter};
use crate::types::{GeoError, GeoResult, GeoTable, LutGrid, MapProjection, UtmGeoHeader};
use geo_types::Geometry;
use ndarray::{s, Array1, Array2, Array3, ArrayView2, ArrayView3, Ix2};
use std::path::Path;

/// Placeholder for NaN cells during grid interpolation; interpolated
/// values dragged below zero by it are re-masked to NaN.
const INVALID_SENTINEL: f64 = -9999.0;

/// Archive fields of the current on-disk layout.
const NPZ_FIELDS: [&str; 4] = ["corners", "proj_params", "lut_rg", "lut_az"];
/// Archive fields of the legacy on-disk layout.
const NPZ_FIELDS_LEGACY: [&str; 6] =
    ["min_lat", "max_lat", "min_lon", "max_lon", "lut_rg", "lut_az"];

/// Geocoding lookup table.
#[derive(Debug, Clone)]
pub struct Lut {
    min_x1: f64,
    max_x1: f64,
    min_x2: f64,
    max_x2: f64,
    lut_az: LutGrid,
    lut_rg: LutGrid,
    projection: MapProjection,
}

impl Lut {
    /// Build a LUT from its extent `[min_x1, max_x1, min_x2, max_x2]`
    /// and the two index grids. The extent covers the first and last
    /// grid cells inclusively.
    pub fn new(
        extent: [f64; 4],
        lut_rg: LutGrid,
        lut_az: LutGrid,
        projection: MapProjection,
    ) -> GeoResult<Self> {
        if lut_rg.dim() != lut_az.dim() {
            return Err(GeoError::ShapeMismatch(format!(
                "lut_rg shape {:?} != lut_az shape {:?}",
                lut_rg.dim(),
                lut_az.dim()
            )));
        }
        let (rows, cols) = lut_az.dim();
        if rows < 2 || cols < 2 {
            return Err(GeoError::ShapeMismatch(format!(
                "LUT needs at least 2x2 cells, got {:?}",
                lut_az.dim()
            )));
        }
        let [min_x1, max_x1, min_x2, max_x2] = extent;
        if !(max_x1 > min_x1) || !(max_x2 > min_x2) {
            return Err(GeoError::InvalidFormat(format!(
                "degenerate LUT extent: {:?}",
                extent
            )));
        }
        Ok(Self {
            min_x1,
            max_x1,
            min_x2,
            max_x2,
            lut_az,
            lut_rg,
            projection,
        })
    }

    /// Build a LUT from full-resolution latitude/longitude rasters of
    /// the SLC geometry.
    ///
    /// Every SLC pixel becomes a scattered sample carrying its own
    /// row/column index; the samples are interpolated onto a regular
    /// `shape` grid spanning the coordinate extent. When either input
    /// dimension exceeds `max_dim` the rasters are first reduced with
    /// an area-preserving zoom to bound the interpolation cost, and
    /// the interpolated indices are rescaled back to full-resolution
    /// units afterwards.
    pub fn from_lat_lon(
        lat: &ArrayView2<'_, f64>,
        lon: &ArrayView2<'_, f64>,
        shape: (usize, usize),
        max_dim: usize,
    ) -> GeoResult<Self> {
        if lat.dim() != lon.dim() {
            return Err(GeoError::ShapeMismatch(format!(
                "lat shape {:?} != lon shape {:?}",
                lat.dim(),
                lon.dim()
            )));
        }
        if shape.0 < 2 || shape.1 < 2 {
            return Err(GeoError::ShapeMismatch(format!(
                "LUT shape must be at least 2x2, got {:?}",
                shape
            )));
        }
        let (rows, cols) = lat.dim();
        let min_lat = nan_min(lat);
        let max_lat = nan_max(lat);
        let min_lon = nan_min(lon);
        let max_lon = nan_max(lon);
        if !min_lat.is_finite() || !min_lon.is_finite() {
            return Err(GeoError::InvalidFormat(
                "lat/lon rasters contain no finite coordinates".to_string(),
            ));
        }
        let lat_step = (max_lat - min_lat) / (shape.0 - 1) as f64;
        let lon_step = (max_lon - min_lon) / (shape.1 - 1) as f64;

        let larger_dim = rows.max(cols);
        let (rlat, rlon) = if larger_dim > max_dim {
            let zfactor = max_dim as f64 / larger_dim as f64;
            log::info!(
                "lat/lon rasters exceed the maximum dimension: max{:?} > {}, scale factor {}",
                lat.dim(),
                max_dim,
                zfactor
            );
            let rlat = zoom_bilinear(lat, zfactor);
            let rlon = zoom_bilinear(lon, zfactor);
            log::debug!("reduced raster size: {:?}", rlat.dim());
            (rlat, rlon)
        } else {
            log::info!("processing full size lat/lon rasters ({:?})", lat.dim());
            (lat.to_owned(), lon.to_owned())
        };

        // Correction factors reversing the index shift induced by the
        // shape reduction.
        let f_row = (rows - 1) as f64 / (rlat.dim().0 - 1).max(1) as f64;
        let f_col = (cols - 1) as f64 / (rlat.dim().1 - 1).max(1) as f64;

        let mut pt_lat = Vec::new();
        let mut pt_lon = Vec::new();
        let mut val_row = Vec::new();
        let mut val_col = Vec::new();
        for ((i, j), &la) in rlat.indexed_iter() {
            let lo = rlon[[i, j]];
            if la.is_finite() && lo.is_finite() {
                pt_lat.push(la);
                pt_lon.push(lo);
                val_row.push(i as f64);
                val_col.push(j as f64);
            }
        }
        if pt_lat.is_empty() {
            return Err(GeoError::InvalidFormat(
                "lat/lon rasters contain no valid sample points".to_string(),
            ));
        }

        let interp = ScatteredInterpolator::new(&pt_lat, &pt_lon)?;
        let (row_grid, col_grid) = interp.interpolate_pair_to_grid(
            &val_row,
            &val_col,
            GridAxis::new(min_lat, lat_step, shape.0),
            GridAxis::new(min_lon, lon_step, shape.1),
            InterpolationMethod::Linear,
        )?;
        let lut_az = row_grid.mapv(|v| v * f_row);
        let lut_rg = col_grid.mapv(|v| v * f_col);

        Self::new(
            [min_lat, max_lat, min_lon, max_lon],
            lut_rg,
            lut_az,
            MapProjection::Geographic,
        )
    }

    /// Build a LUT from a native UTM lookup-table band pair.
    ///
    /// The binary reader hands over the two raw rasters; the geocoding
    /// header comes either embedded in the raster file or from an
    /// auxiliary text header (see `io::envi_header`). Native rasters
    /// store rows top-to-bottom, so they are flipped here to the
    /// bottom-up row convention.
    pub fn from_utm_bands(
        lut_az: LutGrid,
        lut_rg: LutGrid,
        header: &UtmGeoHeader,
    ) -> GeoResult<Self> {
        if lut_az.dim() != lut_rg.dim() {
            return Err(GeoError::ShapeMismatch(format!(
                "lut_az shape {:?} != lut_rg shape {:?}",
                lut_az.dim(),
                lut_rg.dim()
            )));
        }
        let (rows, cols) = lut_az.dim();
        if rows < 2 || cols < 2 {
            return Err(GeoError::ShapeMismatch(format!(
                "LUT needs at least 2x2 cells, got {:?}",
                lut_az.dim()
            )));
        }
        let max_x1 = header.min_north + (rows - 1) as f64 * header.ps_north;
        let max_x2 = header.min_east + (cols - 1) as f64 * header.ps_east;
        let lut_az = lut_az.slice(s![..;-1, ..]).to_owned();
        let lut_rg = lut_rg.slice(s![..;-1, ..]).to_owned();
        Self::new(
            [header.min_north, max_x1, header.min_east, max_x2],
            lut_rg,
            lut_az,
            header.projection(),
        )
    }

    /// Load a LUT from a compressed archive.
    ///
    /// Supports the current layout (`corners` + `proj_params`) and the
    /// legacy layout (separate min/max lat/lon scalars); an archive
    /// with neither field set is a structural error.
    pub fn from_npz_file<P: AsRef<Path>>(path: P) -> GeoResult<Self> {
        let mut reader = NpzReader::open(path.as_ref())?;
        if reader.contains_all(&NPZ_FIELDS) {
            let corners: Array2<f64> = reader.array::<f64, Ix2>("corners")?;
            if corners.dim() != (2, 2) {
                return Err(GeoError::InvalidFormat(format!(
                    "corners field has shape {:?}, expected (2, 2)",
                    corners.dim()
                )));
            }
            let projection: MapProjection = reader.json("proj_params")?;
            let lut_rg = reader.array::<f64, Ix2>("lut_rg")?;
            let lut_az = reader.array::<f64, Ix2>("lut_az")?;
            Self::new(
                [
                    corners[[0, 0]],
                    corners[[1, 0]],
                    corners[[0, 1]],
                    corners[[1, 1]],
                ],
                lut_rg,
                lut_az,
                projection,
            )
        } else if reader.contains_all(&NPZ_FIELDS_LEGACY) {
            let min_lat = reader.scalar("min_lat")?;
            let max_lat = reader.scalar("max_lat")?;
            let min_lon = reader.scalar("min_lon")?;
            let max_lon = reader.scalar("max_lon")?;
            let lut_rg = reader.array::<f64, Ix2>("lut_rg")?;
            let lut_az = reader.array::<f64, Ix2>("lut_az")?;
            Self::new(
                [min_lat, max_lat, min_lon, max_lon],
                lut_rg,
                lut_az,
                MapProjection::Geographic,
            )
        } else {
            Err(GeoError::InvalidFormat(format!(
                "archive {} does not contain the fields of a LUT",
                path.as_ref().display()
            )))
        }
    }

    /// Save to a compressed archive in the current layout.
    pub fn to_npz_file<P: AsRef<Path>>(&self, path: P) -> GeoResult<()> {
        let corners = ndarray::arr2(&[
            [self.min_x1, self.min_x2],
            [self.max_x1, self.max_x2],
        ]);
        let mut writer = NpzWriter::create(path)?;
        writer.add_array("lut_rg", &self.lut_rg)?;
        writer.add_array("lut_az", &self.lut_az)?;
        writer.add_array("corners", &corners)?;
        writer.add_json("proj_params", &self.projection)?;
        writer.finish()
    }

    pub fn min_x1(&self) -> f64 {
        self.min_x1
    }

    pub fn max_x1(&self) -> f64 {
        self.max_x1
    }

    pub fn min_x2(&self) -> f64 {
        self.min_x2
    }

    pub fn max_x2(&self) -> f64 {
        self.max_x2
    }

    /// Grid spacing along axis 1 (northing/latitude).
    pub fn step1(&self) -> f64 {
        (self.max_x1 - self.min_x1) / (self.lut_az.dim().0 - 1) as f64
    }

    /// Grid spacing along axis 2 (easting/longitude).
    pub fn step2(&self) -> f64 {
        (self.max_x2 - self.min_x2) / (self.lut_az.dim().1 - 1) as f64
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

    pub fn projection(&self) -> &MapProjection {
        &self.projection
    }

    /// Covered coordinate extent in plotting order:
    /// `[min_x2, max_x2, min_x1, max_x1]`.
    pub fn extent(&self) -> [f64; 4] {
        [self.min_x2, self.max_x2, self.min_x1, self.max_x1]
    }

    /// Coordinate values of the two grid axes.
    pub fn axes(&self) -> (Array1<f64>, Array1<f64>) {
        let (rows, cols) = self.lut_az.dim();
        let step1 = self.step1();
        let step2 = self.step2();
        let x1 = Array1::from_shape_fn(rows, |i| self.min_x1 + i as f64 * step1);
        let x2 = Array1::from_shape_fn(cols, |j| self.min_x2 + j as f64 * step2);
        (x1, x2)
    }

    /// Resample this LUT onto an arbitrary destination grid in the
    /// same projection.
    ///
    /// Uses degree-1 bivariate interpolation of the az and rg grids
    /// independently. NaN source cells are replaced by a large
    /// negative sentinel beforehand and interpolated values below zero
    /// are re-masked to NaN; this leaks small interpolation artifacts
    /// across the coverage boundary, which callers comparing values
    /// near the boundary should be aware of.
    pub fn resample_to_grid(&self, x1_dest: &[f64], x2_dest: &[f64]) -> GeoResult<Self> {
        if x1_dest.len() < 2 || x2_dest.len() < 2 {
            return Err(GeoError::ShapeMismatch(format!(
                "destination grid must have at least 2 cells per axis, got {}x{}",
                x1_dest.len(),
                x2_dest.len()
            )));
        }
        let extent = [
            x1_dest[0],
            x1_dest[x1_dest.len() - 1],
            x2_dest[0],
            x2_dest[x2_dest.len() - 1],
        ];
        let lut_az = self.resample_grid_masked(&self.lut_az, x1_dest, x2_dest);
        let lut_rg = self.resample_grid_masked(&self.lut_rg, x1_dest, x2_dest);
        Self::new(extent, lut_rg, lut_az, self.projection.clone())
    }

    fn resample_grid_masked(
        &self,
        grid: &LutGrid,
        x1_dest: &[f64],
        x2_dest: &[f64],
    ) -> LutGrid {
        // Bilinear interpolation does not tolerate NaN; substitute a
        // sentinel and re-mask afterwards.
        let masked = grid.mapv(|v| if v.is_finite() { v } else { INVALID_SENTINEL });
        let interp = BilinearGridInterp::new(
            self.min_x1,
            self.step1(),
            self.min_x2,
            self.step2(),
            masked.view(),
        );
        let mut resampled = interp.eval_grid(x1_dest, x2_dest);
        resampled.mapv_inplace(|v| if v < 0.0 { f64::NAN } else { v });
        resampled
    }

    /// Resample this LUT onto the grid of another LUT, making the two
    /// pixel-identical for direct comparison. Both LUTs must be in the
    /// same projection.
    pub fn resample_to_lut(&self, dest: &Lut) -> GeoResult<Self> {
        let (x1_dest, x2_dest) = dest.axes();
        self.resample_to_grid(&x1_dest.to_vec(), &x2_dest.to_vec())
    }

    /// Generate a reverse lookup table for fast back-geocoding.
    ///
    /// All valid LUT cells (finite, non-negative az and rg) become
    /// scattered samples in the image geometry carrying their own
    /// coordinate position; the samples are interpolated onto every
    /// integer (azimuth, range) cell of `image_shape`. Image cells
    /// outside the convex hull of the valid samples are NaN.
    pub fn generate_rlut(
        &self,
        image_shape: (usize, usize),
        method: InterpolationMethod,
    ) -> GeoResult<Rlut> {
        let step1 = self.step1();
        let step2 = self.step2();
        let mut az_pts = Vec::new();
        let mut rg_pts = Vec::new();
        let mut x1_vals = Vec::new();
        let mut x2_vals = Vec::new();
        for ((i, j), &az) in self.lut_az.indexed_iter() {
            let rg = self.lut_rg[[i, j]];
            if az.is_finite() && rg.is_finite() && az >= 0.0 && rg >= 0.0 {
                az_pts.push(az);
                rg_pts.push(rg);
                x1_vals.push(self.min_x1 + i as f64 * step1);
                x2_vals.push(self.min_x2 + j as f64 * step2);
            }
        }
        log::info!(
            "generating RLUT of shape {:?} from {} valid LUT cells",
            image_shape,
            az_pts.len()
        );

        let interp = ScatteredInterpolator::new(&az_pts, &rg_pts)?;
        let (x1_grid, x2_grid) = interp.interpolate_pair_to_grid(
            &x1_vals,
            &x2_vals,
            GridAxis::new(0.0, 1.0, image_shape.0),
            GridAxis::new(0.0, 1.0, image_shape.1),
            method,
        )?;
        Rlut::new(
            x1_grid.mapv(|v| v as f32),
            x2_grid.mapv(|v| v as f32),
            self.projection.clone(),
            1.0,
        )
    }

    /// Geocode an SLC image to the geometry of this LUT by nearest
    /// neighbor lookup.
    pub fn geocode_image<A: Copy>(
        &self,
        img: &ArrayView2<'_, A>,
        invalid_fill: A,
    ) -> GeoResult<Array2<A>> {
        nearest_neighbor_lookup(img, &self.lut_az.view(), &self.lut_rg.view(), invalid_fill)
    }

    /// Multi-channel variant of [`Lut::geocode_image`].
    pub fn geocode_image_bands<A: Copy>(
        &self,
        img: &ArrayView3<'_, A>,
        invalid_fill: A,
    ) -> GeoResult<Array3<A>> {
        nearest_neighbor_lookup_bands(img, &self.lut_az.view(), &self.lut_rg.view(), invalid_fill)
    }

    /// Geocode coordinate arrays in this LUT's projection (axis 1 =
    /// northing/latitude, axis 2 = easting/longitude) to azimuth/range.
    /// Coordinates outside the grid or the radar coverage come back as
    /// NaN.
    pub fn geocode_coords(&self, x1s: &[f64], x2s: &[f64]) -> (Array1<f64>, Array1<f64>) {
        let step1 = self.step1();
        let step2 = self.step2();
        let rows: Vec<f64> = x1s
            .iter()
            .map(|&x1| ((x1 - self.min_x1) / step1).round_ties_even())
            .collect();
        let cols: Vec<f64> = x2s
            .iter()
            .map(|&x2| ((x2 - self.min_x2) / step2).round_ties_even())
            .collect();
        rowcol_to_azrg(&self.lut_az.view(), &self.lut_rg.view(), &rows, &cols)
    }

    /// Scalar convenience wrapper over [`Lut::geocode_coords`];
    /// invalid positions short-circuit to `(NaN, NaN)`.
    pub fn geocode_point(&self, x1: f64, x2: f64) -> (f64, f64) {
        let row = ((x1 - self.min_x1) / self.step1()).round_ties_even();
        let col = ((x2 - self.min_x2) / self.step2()).round_ties_even();
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

    /// Geocode longitude/latitude arrays to azimuth/range, projecting
    /// into this LUT's coordinate system first when needed.
    pub fn geocode_lon_lat(
        &self,
        lons: &[f64],
        lats: &[f64],
    ) -> GeoResult<(Array1<f64>, Array1<f64>)> {
        match &self.projection {
            MapProjection::Geographic => Ok(self.geocode_coords(lats, lons)),
            projection => {
                let transform = CoordTransform::new(&MapProjection::Geographic, projection)?;
                let (eastings, northings) = transform.transform_arrays(lons, lats);
                Ok(self.geocode_coords(&northings, &eastings))
            }
        }
    }

    /// Geocode a geometry given in this LUT's projection to the SLC
    /// geometry. Geometry x maps to azimuth, y to range.
    pub fn geocode_geometry(
        &self,
        geometry: &Geometry<f64>,
    ) -> GeoResult<Option<Geometry<f64>>> {
        let mut to_azrg = |x: f64, y: f64| self.geocode_point(y, x);
        transform_geometry(geometry, &mut to_azrg)
    }

    /// Geocode a longitude/latitude geometry to the SLC geometry,
    /// projecting the vertices into this LUT's coordinate system
    /// first.
    pub fn geocode_geometry_lon_lat(
        &self,
        geometry: &Geometry<f64>,
    ) -> GeoResult<Option<Geometry<f64>>> {
        match &self.projection {
            MapProjection::Geographic => self.geocode_geometry(geometry),
            projection => {
                let transform = CoordTransform::new(&MapProjection::Geographic, projection)?;
                let mut to_azrg = |lon: f64, lat: f64| {
                    let (easting, northing) = transform.transform_point(lon, lat);
                    self.geocode_point(northing, easting)
                };
                transform_geometry(geometry, &mut to_azrg)
            }
        }
    }

    /// Geocode a table with "longitude" and "latitude" columns.
    ///
    /// Returns a new table with "azimuth" and "range" columns appended
    /// (plus "northing" and "easting" intermediates when this LUT uses
    /// a projected coordinate system). The input table is untouched.
    pub fn geocode_table(&self, table: &GeoTable) -> GeoResult<GeoTable> {
        let lons = table.column("longitude")?;
        let lats = table.column("latitude")?;
        match &self.projection {
            MapProjection::Geographic => {
                let (az, rg) = self.geocode_coords(lats, lons);
                table.with_columns(vec![("azimuth", az.to_vec()), ("range", rg.to_vec())])
            }
            projection => {
                let transform = CoordTransform::new(&MapProjection::Geographic, projection)?;
                let (eastings, northings) = transform.transform_arrays(lons, lats);
                let (az, rg) = self.geocode_coords(&northings, &eastings);
                table.with_columns(vec![
                    ("northing", northings),
                    ("easting", eastings),
                    ("azimuth", az.to_vec()),
                    ("range", rg.to_vec()),
                ])
            }
        }
    }
}

fn nan_min(arr: &ArrayView2<'_, f64>) -> f64 {
    arr.iter()
        .filter(|v| v.is_finite())
        .fold(f64::INFINITY, |acc, &v| acc.min(v))
}

fn nan_max(arr: &ArrayView2<'_, f64>) -> f64 {
    arr.iter()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, |acc, &v| acc.max(v))
}
