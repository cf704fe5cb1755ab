//! Interpolation primitives shared by LUT construction and resampling.

use crate::types::{GeoError, GeoResult};
use delaunator::{triangulate, Point};
use ndarray::{Array2, ArrayView2};

/// Barycentric tolerance for deciding whether a grid node lies inside a
/// triangle; slightly negative so nodes on shared edges are not dropped.
const BARYCENTRIC_EPS: f64 = 1e-10;

/// Scattered-data interpolation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMethod {
    /// Barycentric interpolation within each Delaunay triangle
    Linear,
    /// Value of the nearest vertex of the containing triangle
    Nearest,
}

/// Uniformly spaced destination grid axis (`start + i * step`).
#[derive(Debug, Clone, Copy)]
pub struct GridAxis {
    pub start: f64,
    pub step: f64,
    pub len: usize,
}

impl GridAxis {
    pub fn new(start: f64, step: f64, len: usize) -> Self {
        Self { start, step, len }
    }
}

/// Area-preserving bilinear rescale of a 2D array.
///
/// Output dimensions are `round(dim * factor)`, clamped to at least one
/// pixel. Sample positions align the first and last source pixels with
/// the first and last output pixels, so index corrections of the form
/// `(src_dim - 1) / (out_dim - 1)` restore original index units. NaN
/// cells propagate into every output pixel they touch.
pub fn zoom_bilinear(arr: &ArrayView2<'_, f64>, factor: f64) -> Array2<f64> {
    let (rows, cols) = arr.dim();
    let out_rows = ((rows as f64 * factor).round() as usize).max(1);
    let out_cols = ((cols as f64 * factor).round() as usize).max(1);
    let row_scale = if out_rows > 1 {
        (rows - 1) as f64 / (out_rows - 1) as f64
    } else {
        0.0
    };
    let col_scale = if out_cols > 1 {
        (cols - 1) as f64 / (out_cols - 1) as f64
    } else {
        0.0
    };

    let mut out = Array2::zeros((out_rows, out_cols));
    for i in 0..out_rows {
        let src_row = i as f64 * row_scale;
        for j in 0..out_cols {
            let src_col = j as f64 * col_scale;
            out[[i, j]] = sample_bilinear(arr, src_row, src_col);
        }
    }
    out
}

/// Bilinear sample at a fractional (row, col) position, clamped to the
/// array edges.
pub fn sample_bilinear(arr: &ArrayView2<'_, f64>, row: f64, col: f64) -> f64 {
    let (rows, cols) = arr.dim();
    let row = row.clamp(0.0, (rows - 1) as f64);
    let col = col.clamp(0.0, (cols - 1) as f64);

    let r0 = row.floor() as usize;
    let c0 = col.floor() as usize;
    let r1 = (r0 + 1).min(rows - 1);
    let c1 = (c0 + 1).min(cols - 1);

    let dr = row - r0 as f64;
    let dc = col - c0 as f64;

    let v00 = arr[[r0, c0]];
    let v01 = arr[[r0, c1]];
    let v10 = arr[[r1, c0]];
    let v11 = arr[[r1, c1]];

    v00 * (1.0 - dr) * (1.0 - dc)
        + v01 * (1.0 - dr) * dc
        + v10 * dr * (1.0 - dc)
        + v11 * dr * dc
}

/// Degree-1 bivariate interpolant over a uniformly spaced source grid.
///
/// Evaluation outside the source extent clamps to the edge value.
pub struct BilinearGridInterp<'a> {
    min1: f64,
    step1: f64,
    min2: f64,
    step2: f64,
    values: ArrayView2<'a, f64>,
}

impl<'a> BilinearGridInterp<'a> {
    pub fn new(
        min1: f64,
        step1: f64,
        min2: f64,
        step2: f64,
        values: ArrayView2<'a, f64>,
    ) -> Self {
        Self {
            min1,
            step1,
            min2,
            step2,
            values,
        }
    }

    pub fn eval(&self, x1: f64, x2: f64) -> f64 {
        let row = (x1 - self.min1) / self.step1;
        let col = (x2 - self.min2) / self.step2;
        sample_bilinear(&self.values, row, col)
    }

    /// Evaluate on the tensor grid spanned by the destination axes.
    pub fn eval_grid(&self, x1_dest: &[f64], x2_dest: &[f64]) -> Array2<f64> {
        let mut out = Array2::zeros((x1_dest.len(), x2_dest.len()));
        for (i, &x1) in x1_dest.iter().enumerate() {
            for (j, &x2) in x2_dest.iter().enumerate() {
                out[[i, j]] = self.eval(x1, x2);
            }
        }
        out
    }
}

/// Scattered-data interpolator backed by a Delaunay triangulation.
///
/// Sample coordinates are rescaled to the unit square before
/// triangulation so that axes with very different units (e.g. degrees
/// of latitude against thousands of range pixels) produce well-shaped
/// triangles. Grid nodes outside the convex hull of the samples are
/// left at NaN.
pub struct ScatteredInterpolator {
    points: Vec<Point>,
    triangles: Vec<usize>,
    off_y: f64,
    scale_y: f64,
    off_x: f64,
    scale_x: f64,
}

impl ScatteredInterpolator {
    /// Triangulate the sample points. Coordinates must be finite;
    /// callers filter invalid cells beforehand.
    pub fn new(ys: &[f64], xs: &[f64]) -> GeoResult<Self> {
        if ys.len() != xs.len() {
            return Err(GeoError::ShapeMismatch(format!(
                "scattered point coordinate counts differ: {} vs {}",
                ys.len(),
                xs.len()
            )));
        }
        let (off_y, scale_y) = rescale_params(ys);
        let (off_x, scale_x) = rescale_params(xs);
        let points: Vec<Point> = ys
            .iter()
            .zip(xs.iter())
            .map(|(&y, &x)| Point {
                x: (x - off_x) * scale_x,
                y: (y - off_y) * scale_y,
            })
            .collect();
        let triangulation = triangulate(&points);
        log::debug!(
            "triangulated {} scattered points into {} triangles",
            points.len(),
            triangulation.triangles.len() / 3
        );
        Ok(Self {
            points,
            triangles: triangulation.triangles,
            off_y,
            scale_y,
            off_x,
            scale_x,
        })
    }

    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    /// Interpolate two value fields onto a regular grid in one sweep.
    ///
    /// Both value slices must match the sample point count; the output
    /// arrays have shape `(y_axis.len, x_axis.len)` and start out NaN.
    pub fn interpolate_pair_to_grid(
        &self,
        values_a: &[f64],
        values_b: &[f64],
        y_axis: GridAxis,
        x_axis: GridAxis,
        method: InterpolationMethod,
    ) -> GeoResult<(Array2<f64>, Array2<f64>)> {
        if values_a.len() != self.points.len() || values_b.len() != self.points.len() {
            return Err(GeoError::ShapeMismatch(format!(
                "value field length {}/{} does not match {} sample points",
                values_a.len(),
                values_b.len(),
                self.points.len()
            )));
        }

        let mut out_a = Array2::from_elem((y_axis.len, x_axis.len), f64::NAN);
        let mut out_b = Array2::from_elem((y_axis.len, x_axis.len), f64::NAN);

        // Destination axes in the rescaled coordinate frame.
        let sy0 = (y_axis.start - self.off_y) * self.scale_y;
        let sdy = y_axis.step * self.scale_y;
        let sx0 = (x_axis.start - self.off_x) * self.scale_x;
        let sdx = x_axis.step * self.scale_x;

        for tri in self.triangles.chunks_exact(3) {
            let (ia, ib, ic) = (tri[0], tri[1], tri[2]);
            let pa = &self.points[ia];
            let pb = &self.points[ib];
            let pc = &self.points[ic];

            let denom = (pb.y - pc.y) * (pa.x - pc.x) + (pc.x - pb.x) * (pa.y - pc.y);
            if denom.abs() < f64::MIN_POSITIVE {
                continue; // degenerate triangle
            }

            let y_lo = pa.y.min(pb.y).min(pc.y);
            let y_hi = pa.y.max(pb.y).max(pc.y);
            let x_lo = pa.x.min(pb.x).min(pc.x);
            let x_hi = pa.x.max(pb.x).max(pc.x);

            let i_lo = grid_range_start(y_lo, sy0, sdy);
            let i_hi = grid_range_end(y_hi, sy0, sdy, y_axis.len);
            let j_lo = grid_range_start(x_lo, sx0, sdx);
            let j_hi = grid_range_end(x_hi, sx0, sdx, x_axis.len);

            for i in i_lo..i_hi {
                let py = sy0 + i as f64 * sdy;
                for j in j_lo..j_hi {
                    let px = sx0 + j as f64 * sdx;
                    let w_a = ((pb.y - pc.y) * (px - pc.x) + (pc.x - pb.x) * (py - pc.y))
                        / denom;
                    let w_b = ((pc.y - pa.y) * (px - pc.x) + (pa.x - pc.x) * (py - pc.y))
                        / denom;
                    let w_c = 1.0 - w_a - w_b;
                    if w_a < -BARYCENTRIC_EPS
                        || w_b < -BARYCENTRIC_EPS
                        || w_c < -BARYCENTRIC_EPS
                    {
                        continue;
                    }
                    match method {
                        InterpolationMethod::Linear => {
                            out_a[[i, j]] = w_a * values_a[ia]
                                + w_b * values_a[ib]
                                + w_c * values_a[ic];
                            out_b[[i, j]] = w_a * values_b[ia]
                                + w_b * values_b[ib]
                                + w_c * values_b[ic];
                        }
                        InterpolationMethod::Nearest => {
                            let idx = if w_a >= w_b && w_a >= w_c {
                                ia
                            } else if w_b >= w_c {
                                ib
                            } else {
                                ic
                            };
                            out_a[[i, j]] = values_a[idx];
                            out_b[[i, j]] = values_b[idx];
                        }
                    }
                }
            }
        }

        Ok((out_a, out_b))
    }
}

/// Offset/scale normalizing a coordinate slice to the unit interval.
fn rescale_params(values: &[f64]) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values {
        if v.is_finite() {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if !lo.is_finite() || hi - lo <= 0.0 {
        (0.0, 1.0)
    } else {
        (lo, 1.0 / (hi - lo))
    }
}

/// First grid index at or above the given coordinate.
fn grid_range_start(coord: f64, start: f64, step: f64) -> usize {
    let idx = ((coord - start) / step - 1e-12).ceil();
    if idx < 0.0 {
        0
    } else {
        idx as usize
    }
}

/// One past the last grid index at or below the given coordinate.
fn grid_range_end(coord: f64, start: f64, step: f64, len: usize) -> usize {
    let idx = ((coord - start) / step + 1e-12).floor();
    if idx < 0.0 {
        0
    } else {
        ((idx as usize) + 1).min(len)
    }
}
