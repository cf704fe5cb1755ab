//! Height-parameterized Look-Up Table (LUT3D).
//!
//! Extends a LUT with per-pixel polynomial height-correction
//! coefficients and the reference ellipsoidal height at which the 2D
//! table was computed. A LUT3D is never used for lookup directly: it
//! flattens to an ordinary [`Lut`] for a given height field first.

use crate::core::lut::Lut;
use crate::io::npz::{NpzReader, NpzWriter};
use crate::types::{GeoError, GeoResult, LutGrid, MapProjection, UtmGeoHeader};
use ndarray::{s, Array2, ArrayView2, Ix2};
use std::path::Path;

/// Heights below this value are treated as invalid by convention.
pub const DEFAULT_MIN_VALID_HEIGHT: f64 = -999.0;

/// Archive fields of the LUT3D on-disk layout.
const NPZ_FIELDS: [&str; 9] = [
    "corners",
    "proj_params",
    "lut_rg",
    "lut_az",
    "lut3d_o1_rg",
    "lut3d_o1_az",
    "lut3d_o2_rg",
    "lut3d_o2_az",
    "lut3d_h0",
];

/// Lookup table with polynomial terrain correction.
#[derive(Debug, Clone)]
pub struct Lut3d {
    lut: Lut,
    o1_rg: LutGrid,
    o1_az: LutGrid,
    o2_rg: LutGrid,
    o2_az: LutGrid,
    h0: LutGrid,
}

impl Lut3d {
    /// Build a LUT3D from the reference LUT grids, the first and
    /// second order coefficient rasters, and the reference height
    /// raster. All rasters must share one shape.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        extent: [f64; 4],
        lut_rg: LutGrid,
        lut_az: LutGrid,
        o1_rg: LutGrid,
        o1_az: LutGrid,
        o2_rg: LutGrid,
        o2_az: LutGrid,
        h0: LutGrid,
        projection: MapProjection,
    ) -> GeoResult<Self> {
        let lut = Lut::new(extent, lut_rg, lut_az, projection)?;
        let shape = lut.shape();
        for (name, raster) in [
            ("lut3d_o1_rg", &o1_rg),
            ("lut3d_o1_az", &o1_az),
            ("lut3d_o2_rg", &o2_rg),
            ("lut3d_o2_az", &o2_az),
            ("lut3d_h0", &h0),
        ] {
            if raster.dim() != shape {
                return Err(GeoError::ShapeMismatch(format!(
                    "{} shape {:?} != LUT shape {:?}",
                    name,
                    raster.dim(),
                    shape
                )));
            }
        }
        Ok(Self {
            lut,
            o1_rg,
            o1_az,
            o2_rg,
            o2_az,
            h0,
        })
    }

    /// Build a LUT3D from a native UTM band set (reference az/rg pair,
    /// two coefficient pairs, reference heights). Rows are flipped to
    /// the bottom-up convention like in [`Lut::from_utm_bands`].
    #[allow(clippy::too_many_arguments)]
    pub fn from_utm_bands(
        lut_az: LutGrid,
        lut_rg: LutGrid,
        o1_az: LutGrid,
        o1_rg: LutGrid,
        o2_az: LutGrid,
        o2_rg: LutGrid,
        h0: LutGrid,
        header: &UtmGeoHeader,
    ) -> GeoResult<Self> {
        let (rows, cols) = lut_az.dim();
        if rows < 2 || cols < 2 {
            return Err(GeoError::ShapeMismatch(format!(
                "LUT needs at least 2x2 cells, got {:?}",
                lut_az.dim()
            )));
        }
        let max_x1 = header.min_north + (rows - 1) as f64 * header.ps_north;
        let max_x2 = header.min_east + (cols - 1) as f64 * header.ps_east;
        let flip = |grid: LutGrid| grid.slice(s![..;-1, ..]).to_owned();
        Self::new(
            [header.min_north, max_x1, header.min_east, max_x2],
            flip(lut_rg),
            flip(lut_az),
            flip(o1_rg),
            flip(o1_az),
            flip(o2_rg),
            flip(o2_az),
            flip(h0),
            header.projection(),
        )
    }

    /// The reference LUT (valid at the reference height `h0`).
    pub fn reference_lut(&self) -> &Lut {
        &self.lut
    }

    pub fn shape(&self) -> (usize, usize) {
        self.lut.shape()
    }

    pub fn h0(&self) -> &LutGrid {
        &self.h0
    }

    /// Flatten to an ordinary LUT for the given height field.
    ///
    /// `height` is sampled on the same grid and projection as this
    /// LUT3D. With `relative_height` the heights are offsets from the
    /// reference height `h0`; otherwise they are ellipsoidal heights
    /// and the delta is `height - h0`. Only cells where both the LUT
    /// and the height are valid (finite, height >= min_valid_height,
    /// azimuth >= 0) are corrected; everywhere else the delta is
    /// forced to zero, silently keeping the reference-height value.
    pub fn generate_lut_at_height(
        &self,
        height: &ArrayView2<'_, f64>,
        relative_height: bool,
        min_valid_height: f64,
    ) -> GeoResult<Lut> {
        let shape = self.lut.shape();
        if height.dim() != shape {
            return Err(GeoError::ShapeMismatch(format!(
                "height raster shape {:?} != LUT shape {:?}",
                height.dim(),
                shape
            )));
        }
        let lut_az = self.lut.lut_az();
        let lut_rg = self.lut.lut_rg();

        let mut delta_h = Array2::<f64>::zeros(shape);
        for ((i, j), delta) in delta_h.indexed_iter_mut() {
            let az = lut_az[[i, j]];
            let h = height[[i, j]];
            let lut_valid = az.is_finite() && az >= 0.0;
            let height_valid = h.is_finite() && h >= min_valid_height;
            if lut_valid && height_valid {
                *delta = if relative_height { h } else { h - self.h0[[i, j]] };
            }
        }

        let mut new_az = lut_az.clone();
        let mut new_rg = lut_rg.clone();
        for ((i, j), &dh) in delta_h.indexed_iter() {
            new_az[[i, j]] += dh * self.o1_az[[i, j]] + dh * dh * self.o2_az[[i, j]];
            new_rg[[i, j]] += dh * self.o1_rg[[i, j]] + dh * dh * self.o2_rg[[i, j]];
        }

        Lut::new(
            [
                self.lut.min_x1(),
                self.lut.max_x1(),
                self.lut.min_x2(),
                self.lut.max_x2(),
            ],
            new_rg,
            new_az,
            self.lut.projection().clone(),
        )
    }

    /// Flatten for a single height applied to every grid cell.
    pub fn generate_lut_at_constant_height(
        &self,
        height: f64,
        relative_height: bool,
    ) -> GeoResult<Lut> {
        let field = Array2::from_elem(self.lut.shape(), height);
        self.generate_lut_at_height(&field.view(), relative_height, DEFAULT_MIN_VALID_HEIGHT)
    }

    /// Load a LUT3D from a compressed archive; an archive without the
    /// full LUT3D field set is a structural error.
    pub fn from_npz_file<P: AsRef<Path>>(path: P) -> GeoResult<Self> {
        let mut reader = NpzReader::open(path.as_ref())?;
        if !reader.contains_all(&NPZ_FIELDS) {
            return Err(GeoError::InvalidFormat(format!(
                "archive {} does not contain the fields of a LUT3D",
                path.as_ref().display()
            )));
        }
        let corners: Array2<f64> = reader.array::<f64, Ix2>("corners")?;
        if corners.dim() != (2, 2) {
            return Err(GeoError::InvalidFormat(format!(
                "corners field has shape {:?}, expected (2, 2)",
                corners.dim()
            )));
        }
        let projection: MapProjection = reader.json("proj_params")?;
        Self::new(
            [
                corners[[0, 0]],
                corners[[1, 0]],
                corners[[0, 1]],
                corners[[1, 1]],
            ],
            reader.array::<f64, Ix2>("lut_rg")?,
            reader.array::<f64, Ix2>("lut_az")?,
            reader.array::<f64, Ix2>("lut3d_o1_rg")?,
            reader.array::<f64, Ix2>("lut3d_o1_az")?,
            reader.array::<f64, Ix2>("lut3d_o2_rg")?,
            reader.array::<f64, Ix2>("lut3d_o2_az")?,
            reader.array::<f64, Ix2>("lut3d_h0")?,
            projection,
        )
    }

    /// Save to a compressed archive.
    pub fn to_npz_file<P: AsRef<Path>>(&self, path: P) -> GeoResult<()> {
        let corners = ndarray::arr2(&[
            [self.lut.min_x1(), self.lut.min_x2()],
            [self.lut.max_x1(), self.lut.max_x2()],
        ]);
        let mut writer = NpzWriter::create(path)?;
        writer.add_array("lut_rg", self.lut.lut_rg())?;
        writer.add_array("lut_az", self.lut.lut_az())?;
        writer.add_array("lut3d_o1_rg", &self.o1_rg)?;
        writer.add_array("lut3d_o1_az", &self.o1_az)?;
        writer.add_array("lut3d_o2_rg", &self.o2_rg)?;
        writer.add_array("lut3d_o2_az", &self.o2_az)?;
        writer.add_array("lut3d_h0", &self.h0)?;
        writer.add_array("corners", &corners)?;
        writer.add_json("proj_params", self.lut.projection())?;
        writer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::types::Hemisphere;

    fn sample_lut3d() -> Lut3d {
        let n = 5;
        let lut_az = Array2::from_shape_fn((n, n), |(i, _)| 10.0 * i as f64);
        let lut_rg = Array2::from_shape_fn((n, n), |(_, j)| 10.0 * j as f64);
        let o1_az = Array2::from_elem((n, n), 0.5);
        let o1_rg = Array2::from_elem((n, n), 0.25);
        let o2_az = Array2::from_elem((n, n), 0.1);
        let o2_rg = Array2::from_elem((n, n), 0.05);
        let h0 = Array2::from_elem((n, n), 600.0);
        Lut3d::new(
            [0.0, 4.0, 0.0, 4.0],
            lut_rg,
            lut_az,
            o1_rg,
            o1_az,
            o2_rg,
            o2_az,
            h0,
            MapProjection::Geographic,
        )
        .unwrap()
    }

    #[test]
    fn test_height_at_h0_reproduces_reference_lut() {
        let lut3d = sample_lut3d();
        let height = lut3d.h0().clone();
        let lut = lut3d
            .generate_lut_at_height(&height.view(), false, DEFAULT_MIN_VALID_HEIGHT)
            .unwrap();
        assert_eq!(lut.lut_az(), lut3d.reference_lut().lut_az());
        assert_eq!(lut.lut_rg(), lut3d.reference_lut().lut_rg());
        assert_eq!(lut.extent(), lut3d.reference_lut().extent());
    }

    #[test]
    fn test_polynomial_correction_applied() {
        let lut3d = sample_lut3d();
        // relative height of 2 meters everywhere
        let lut = lut3d.generate_lut_at_constant_height(2.0, true).unwrap();
        // az' = az + 2 * 0.5 + 4 * 0.1
        assert_abs_diff_eq!(lut.lut_az()[[1, 1]], 10.0 + 1.0 + 0.4, epsilon = 1e-12);
        // rg' = rg + 2 * 0.25 + 4 * 0.05
        assert_abs_diff_eq!(lut.lut_rg()[[1, 1]], 10.0 + 0.5 + 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_height_cells_keep_reference_values() {
        let lut3d = sample_lut3d();
        let mut height = Array2::from_elem((5, 5), 700.0);
        height[[2, 2]] = f64::NAN;
        height[[3, 3]] = -5000.0; // below min_valid_height
        let lut = lut3d
            .generate_lut_at_height(&height.view(), false, DEFAULT_MIN_VALID_HEIGHT)
            .unwrap();
        // corrected where the height is valid (delta 100)
        assert_abs_diff_eq!(
            lut.lut_az()[[1, 1]],
            10.0 + 100.0 * 0.5 + 100.0 * 100.0 * 0.1,
            epsilon = 1e-9
        );
        // silently degraded to the reference value elsewhere
        assert_eq!(lut.lut_az()[[2, 2]], lut3d.reference_lut().lut_az()[[2, 2]]);
        assert_eq!(lut.lut_az()[[3, 3]], lut3d.reference_lut().lut_az()[[3, 3]]);
    }

    #[test]
    fn test_height_shape_mismatch_is_error() {
        let lut3d = sample_lut3d();
        let height = Array2::from_elem((3, 3), 0.0);
        assert!(matches!(
            lut3d.generate_lut_at_height(&height.view(), true, DEFAULT_MIN_VALID_HEIGHT),
            Err(GeoError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_coefficient_shape_mismatch_is_error() {
        let n = 4;
        let grid = Array2::<f64>::zeros((n, n));
        let result = Lut3d::new(
            [0.0, 3.0, 0.0, 3.0],
            grid.clone(),
            grid.clone(),
            grid.clone(),
            grid.clone(),
            grid.clone(),
            grid.clone(),
            Array2::<f64>::zeros((2, 2)),
            MapProjection::Geographic,
        );
        assert!(matches!(result, Err(GeoError::ShapeMismatch(_))));
    }

    #[test]
    fn test_from_utm_bands_flips_all_rasters() {
        let n = 3;
        let ramp = Array2::from_shape_fn((n, n), |(i, _)| i as f64);
        let header =
            UtmGeoHeader::from_embedded(1000.0, 2000.0, 1.0, 1.0, 32, Hemisphere::North);
        let lut3d = Lut3d::from_utm_bands(
            ramp.clone(),
            ramp.clone(),
            ramp.clone(),
            ramp.clone(),
            ramp.clone(),
            ramp.clone(),
            ramp,
            &header,
        )
        .unwrap();
        assert_eq!(lut3d.reference_lut().lut_az()[[0, 0]], 2.0);
        assert_eq!(lut3d.h0()[[0, 0]], 2.0);
    }

    #[test]
    fn test_npz_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lut3d.npz");
        let lut3d = sample_lut3d();
        lut3d.to_npz_file(&path).unwrap();

        let loaded = Lut3d::from_npz_file(&path).unwrap();
        assert_eq!(loaded.shape(), lut3d.shape());
        assert_eq!(loaded.h0()[[0, 0]], 600.0);
        assert_eq!(
            loaded.reference_lut().extent(),
            lut3d.reference_lut().extent()
        );
    }

    #[test]
    fn test_npz_missing_fields_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain_lut.npz");
        // a plain LUT archive is not a LUT3D
        let lut_az = Array2::from_shape_fn((3, 3), |(i, _)| i as f64);
        let lut_rg = Array2::from_shape_fn((3, 3), |(_, j)| j as f64);
        Lut::new([0.0, 2.0, 0.0, 2.0], lut_rg, lut_az, MapProjection::Geographic)
            .unwrap()
            .to_npz_file(&path)
            .unwrap();
        assert!(matches!(
            Lut3d::from_npz_file(&path),
            Err(GeoError::InvalidFormat(_))
        ));
    }
}
