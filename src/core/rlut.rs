//! Reverse Look-Up Table (RLUT) for back-geocoding.
//!
//! Maps integer (azimuth, range) image positions to the coordinates of
//! the corresponding ground point. The backing is either a dense grid
//! with one cell per image pixel (`factor == 1`) or a reduced grid
//! evaluated by bilinear interpolation (`factor > 1`), which keeps
//! large scenes affordable. Building an RLUT from a LUT is expensive
//! (see [`crate::core::lut::Lut::generate_rlut`]); instances are
//! treated as cache artifacts and can be persisted.

use crate::core::transform::CoordTransform;
use crate::io::npz::{NpzReader, NpzWriter};
use crate::types::{GeoError, GeoResult, MapProjection};
use ndarray::{Array1, Array2, Ix2};
use std::path::Path;

/// Archive fields of the RLUT on-disk layout.
const NPZ_FIELDS: [&str; 4] = ["rlut_x1", "rlut_x2", "factor", "proj_def"];

/// Reverse geocoding lookup table.
#[derive(Debug, Clone)]
pub struct Rlut {
    rlut_x1: Array2<f32>,
    rlut_x2: Array2<f32>,
    projection: MapProjection,
    factor: f64,
}

impl Rlut {
    /// Build an RLUT from its two backing grids.
    ///
    /// `factor` is the reduction of the backing relative to the image:
    /// 1 means one cell per image pixel and requires equal grid
    /// shapes; larger factors mean the backing is evaluated at
    /// `(az / factor, rg / factor)`.
    pub fn new(
        rlut_x1: Array2<f32>,
        rlut_x2: Array2<f32>,
        projection: MapProjection,
        factor: f64,
    ) -> GeoResult<Self> {
        if !(factor >= 1.0) {
            return Err(GeoError::InvalidFormat(format!(
                "RLUT reduction factor must be >= 1, got {}",
                factor
            )));
        }
        if factor == 1.0 && rlut_x1.dim() != rlut_x2.dim() {
            return Err(GeoError::ShapeMismatch(format!(
                "rlut_x1 shape {:?} != rlut_x2 shape {:?}",
                rlut_x1.dim(),
                rlut_x2.dim()
            )));
        }
        Ok(Self {
            rlut_x1,
            rlut_x2,
            projection,
            factor,
        })
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn projection(&self) -> &MapProjection {
        &self.projection
    }

    pub fn backing_shape(&self) -> (usize, usize) {
        self.rlut_x1.dim()
    }

    /// Coordinates of a single (azimuth, range) image position, in
    /// this RLUT's projection and (axis 1, axis 2) order. Positions
    /// outside the table come back as `(NaN, NaN)`.
    pub fn lookup_point(&self, az: f64, rg: f64) -> (f64, f64) {
        if az.is_nan() || rg.is_nan() {
            return (f64::NAN, f64::NAN);
        }
        if self.factor == 1.0 {
            let az = az.round_ties_even();
            let rg = rg.round_ties_even();
            let (rows, cols) = self.rlut_x1.dim();
            if az < 0.0 || az >= rows as f64 || rg < 0.0 || rg >= cols as f64 {
                return (f64::NAN, f64::NAN);
            }
            let (i, j) = (az as usize, rg as usize);
            (self.rlut_x1[[i, j]] as f64, self.rlut_x2[[i, j]] as f64)
        } else {
            let row = az / self.factor;
            let col = rg / self.factor;
            (
                sample_bilinear_f32(&self.rlut_x1, row, col),
                sample_bilinear_f32(&self.rlut_x2, row, col),
            )
        }
    }

    /// Element-wise variant of [`Rlut::lookup_point`].
    pub fn lookup(&self, az: &[f64], rg: &[f64]) -> (Array1<f64>, Array1<f64>) {
        let n = az.len().min(rg.len());
        let mut x1 = Array1::from_elem(n, f64::NAN);
        let mut x2 = Array1::from_elem(n, f64::NAN);
        for i in 0..n {
            let (a, b) = self.lookup_point(az[i], rg[i]);
            x1[i] = a;
            x2[i] = b;
        }
        (x1, x2)
    }

    /// Coordinates of (azimuth, range) positions in an arbitrary
    /// destination projection, round-tripping through the unprojected
    /// longitude/latitude frame.
    pub fn to_coordinates(
        &self,
        az: &[f64],
        rg: &[f64],
        dest_projection: &MapProjection,
    ) -> GeoResult<(Array1<f64>, Array1<f64>)> {
        let (x1, x2) = self.lookup(az, rg);
        let to_geographic =
            CoordTransform::new(&self.projection, &MapProjection::Geographic)?;
        let to_dest = CoordTransform::new(&MapProjection::Geographic, dest_projection)?;
        // transforms take (x, y) = (easting/longitude, northing/latitude)
        let (lons, lats) = to_geographic.transform_arrays(&x2.to_vec(), &x1.to_vec());
        let (dest_x, dest_y) = to_dest.transform_arrays(&lons, &lats);
        Ok((Array1::from(dest_y), Array1::from(dest_x)))
    }

    /// Load an RLUT from a compressed archive; an archive without the
    /// RLUT field set is a structural error.
    pub fn from_npz_file<P: AsRef<Path>>(path: P) -> GeoResult<Self> {
        let mut reader = NpzReader::open(path.as_ref())?;
        if !reader.contains_all(&NPZ_FIELDS) {
            return Err(GeoError::InvalidFormat(format!(
                "archive {} does not contain the fields of an RLUT",
                path.as_ref().display()
            )));
        }
        let rlut_x1 = reader.array::<f32, Ix2>("rlut_x1")?;
        let rlut_x2 = reader.array::<f32, Ix2>("rlut_x2")?;
        let factor = reader.scalar("factor")?;
        let proj_def: String = reader.json("proj_def")?;
        Self::new(
            rlut_x1,
            rlut_x2,
            MapProjection::ProjString(proj_def),
            factor,
        )
    }

    /// Save to a compressed archive.
    pub fn to_npz_file<P: AsRef<Path>>(&self, path: P) -> GeoResult<()> {
        let mut writer = NpzWriter::create(path)?;
        writer.add_array("rlut_x1", &self.rlut_x1)?;
        writer.add_array("rlut_x2", &self.rlut_x2)?;
        writer.add_scalar("factor", self.factor)?;
        writer.add_json("proj_def", &self.projection.to_proj_string())?;
        writer.finish()
    }
}

/// Bilinear sample of an f32 grid at a fractional position, clamped
/// to the grid edges.
fn sample_bilinear_f32(arr: &Array2<f32>, row: f64, col: f64) -> f64 {
    let (rows, cols) = arr.dim();
    let row = row.clamp(0.0, (rows - 1) as f64);
    let col = col.clamp(0.0, (cols - 1) as f64);

    let r0 = row.floor() as usize;
    let c0 = col.floor() as usize;
    let r1 = (r0 + 1).min(rows - 1);
    let c1 = (c0 + 1).min(cols - 1);

    let dr = row - r0 as f64;
    let dc = col - c0 as f64;

    let v00 = arr[[r0, c0]] as f64;
    let v01 = arr[[r0, c1]] as f64;
    let v10 = arr[[r1, c0]] as f64;
    let v11 = arr[[r1, c1]] as f64;

    v00 * (1.0 - dr) * (1.0 - dc)
        + v01 * (1.0 - dr) * dc
        + v10 * dr * (1.0 - dc)
        + v11 * dr * dc
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn dense_rlut() -> Rlut {
        // coordinates grow linearly with the image indices
        let x1 = Array2::from_shape_fn((6, 6), |(i, _)| 100.0 + i as f32);
        let x2 = Array2::from_shape_fn((6, 6), |(_, j)| 200.0 + 2.0 * j as f32);
        Rlut::new(x1, x2, MapProjection::Geographic, 1.0).unwrap()
    }

    #[test]
    fn test_dense_lookup() {
        let rlut = dense_rlut();
        let (x1, x2) = rlut.lookup_point(3.0, 2.0);
        assert_abs_diff_eq!(x1, 103.0);
        assert_abs_diff_eq!(x2, 204.0);
    }

    #[test]
    fn test_lookup_outside_table_is_nan() {
        let rlut = dense_rlut();
        let (x1, _) = rlut.lookup_point(17.0, 2.0);
        assert!(x1.is_nan());
        let (x1, _) = rlut.lookup_point(f64::NAN, 2.0);
        assert!(x1.is_nan());
    }

    #[test]
    fn test_reduced_backing_interpolates() {
        // backing cell (i, j) represents image position (2i, 2j)
        let x1 = Array2::from_shape_fn((3, 3), |(i, _)| 100.0 + 2.0 * i as f32);
        let x2 = Array2::from_shape_fn((3, 3), |(_, j)| 50.0 + 2.0 * j as f32);
        let rlut = Rlut::new(x1, x2, MapProjection::Geographic, 2.0).unwrap();
        let (x1, x2) = rlut.lookup_point(3.0, 1.0);
        assert_abs_diff_eq!(x1, 103.0, epsilon = 1e-9);
        assert_abs_diff_eq!(x2, 51.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_factor_and_shape_are_errors() {
        let grid = Array2::<f32>::zeros((2, 2));
        assert!(Rlut::new(
            grid.clone(),
            grid.clone(),
            MapProjection::Geographic,
            0.5
        )
        .is_err());
        assert!(Rlut::new(
            grid,
            Array2::<f32>::zeros((2, 3)),
            MapProjection::Geographic,
            1.0
        )
        .is_err());
    }

    #[test]
    fn test_npz_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rlut.npz");
        let rlut = dense_rlut();
        rlut.to_npz_file(&path).unwrap();

        let loaded = Rlut::from_npz_file(&path).unwrap();
        assert_eq!(loaded.factor(), 1.0);
        assert_eq!(loaded.backing_shape(), (6, 6));
        assert_eq!(
            loaded.projection().to_proj_string(),
            rlut.projection().to_proj_string()
        );
        let (x1, _) = loaded.lookup_point(1.0, 1.0);
        assert_abs_diff_eq!(x1, 101.0);
    }

    #[test]
    fn test_npz_missing_fields_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_rlut.npz");
        let mut writer = NpzWriter::create(&path).unwrap();
        writer
            .add_array("rlut_x1", &Array2::<f32>::zeros((2, 2)))
            .unwrap();
        writer.finish().unwrap();
        assert!(matches!(
            Rlut::from_npz_file(&path),
            Err(GeoError::InvalidFormat(_))
        ));
    }
}
