//! Coordinate transformation between map projections.
//!
//! Thin capability wrapper around PROJ: resolved once when a lookup
//! table is constructed or queried, then applied point-wise. A failed
//! CRS resolution is a structural error; a failed conversion of an
//! individual point is routine data invalidity and yields NaN.

use crate::types::{GeoError, GeoResult, MapProjection};
use proj::Proj;

/// One-way coordinate transform between two projections.
///
/// Coordinates are always (x, y) ordered: easting/longitude first,
/// northing/latitude second.
pub struct CoordTransform {
    proj: Proj,
}

impl CoordTransform {
    pub fn new(src: &MapProjection, dst: &MapProjection) -> GeoResult<Self> {
        let from = src.to_proj_string();
        let to = dst.to_proj_string();
        let proj = Proj::new_known_crs(&from, &to, None).map_err(|e| {
            GeoError::Projection(format!(
                "failed to create transform {} -> {}: {}",
                from, to, e
            ))
        })?;
        Ok(Self { proj })
    }

    /// Transform a single coordinate pair; NaN on failure.
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        if !x.is_finite() || !y.is_finite() {
            return (f64::NAN, f64::NAN);
        }
        match self.proj.convert((x, y)) {
            Ok((tx, ty)) if tx.is_finite() && ty.is_finite() => (tx, ty),
            _ => (f64::NAN, f64::NAN),
        }
    }

    /// Transform coordinate arrays element-wise.
    pub fn transform_arrays(&self, xs: &[f64], ys: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let n = xs.len().min(ys.len());
        let mut out_x = vec![f64::NAN; n];
        let mut out_y = vec![f64::NAN; n];
        for i in 0..n {
            let (x, y) = self.transform_point(xs[i], ys[i]);
            out_x[i] = x;
            out_y[i] = y;
        }
        (out_x, out_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_geographic_to_utm() {
        let transform = CoordTransform::new(
            &MapProjection::Geographic,
            &MapProjection::Utm {
                zone: 33,
                south: false,
            },
        )
        .unwrap();
        // central meridian of zone 33 is 15 degrees east
        let (easting, northing) = transform.transform_point(15.0, 0.0);
        assert_abs_diff_eq!(easting, 500_000.0, epsilon = 1.0);
        assert_abs_diff_eq!(northing, 0.0, epsilon = 1.0);
    }

    #[test]
    fn test_nan_input_stays_nan() {
        let transform = CoordTransform::new(
            &MapProjection::Geographic,
            &MapProjection::Utm {
                zone: 33,
                south: false,
            },
        )
        .unwrap();
        let (x, y) = transform.transform_point(f64::NAN, f64::NAN);
        assert!(x.is_nan() && y.is_nan());
    }

    #[test]
    fn test_array_transform_length() {
        let transform =
            CoordTransform::new(&MapProjection::Geographic, &MapProjection::Geographic).unwrap();
        let (xs, ys) = transform.transform_arrays(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]);
        assert_eq!(xs.len(), 3);
        assert_abs_diff_eq!(ys[2], 6.0, epsilon = 1e-6);
    }
}
