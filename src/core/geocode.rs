//! Pixel lookup primitives shared by all geocoding paths.
//!
//! Forward geocoding samples a slant-range image at the indices stored
//! in a lookup table (nearest neighbor). Backward geocoding turns grid
//! indices into azimuth/range values with the fail-soft invalid
//! handling described in the crate documentation: bad indices and
//! out-of-coverage cells become NaN, never errors.

use crate::types::{GeoError, GeoResult};
use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayView3};

/// Geocode an image from slant-range to the geometry of a lookup table.
///
/// `img` has shape (azimuth, range); `lut_az` and `lut_rg` store
/// float-valued indices into the image and may contain NaN or negative
/// sentinels for cells outside radar coverage. Indices are rounded to
/// the nearest integer. Output pixels whose indices are invalid (NaN or
/// outside the image) are set to `invalid_fill`.
///
/// The element type is generic so amplitude, intensity, and complex
/// SLC data all go through the same primitive.
pub fn nearest_neighbor_lookup<A: Copy>(
    img: &ArrayView2<'_, A>,
    lut_az: &ArrayView2<'_, f64>,
    lut_rg: &ArrayView2<'_, f64>,
    invalid_fill: A,
) -> GeoResult<Array2<A>> {
    if lut_az.dim() != lut_rg.dim() {
        return Err(GeoError::ShapeMismatch(format!(
            "lut_az shape {:?} != lut_rg shape {:?}",
            lut_az.dim(),
            lut_rg.dim()
        )));
    }
    let (max_az, max_rg) = img.dim();
    let mut geocoded = Array2::from_elem(lut_az.dim(), invalid_fill);
    for ((i, j), out) in geocoded.indexed_iter_mut() {
        if let Some((az, rg)) = checked_image_index(lut_az[[i, j]], lut_rg[[i, j]], max_az, max_rg)
        {
            *out = img[[az, rg]];
        }
    }
    Ok(geocoded)
}

/// Multi-channel variant of [`nearest_neighbor_lookup`].
///
/// `img` has shape (azimuth, range, channels); the output keeps the
/// trailing channel dimension: (rows, cols, channels).
pub fn nearest_neighbor_lookup_bands<A: Copy>(
    img: &ArrayView3<'_, A>,
    lut_az: &ArrayView2<'_, f64>,
    lut_rg: &ArrayView2<'_, f64>,
    invalid_fill: A,
) -> GeoResult<Array3<A>> {
    if lut_az.dim() != lut_rg.dim() {
        return Err(GeoError::ShapeMismatch(format!(
            "lut_az shape {:?} != lut_rg shape {:?}",
            lut_az.dim(),
            lut_rg.dim()
        )));
    }
    let (max_az, max_rg, channels) = img.dim();
    let (rows, cols) = lut_az.dim();
    let mut geocoded = Array3::from_elem((rows, cols, channels), invalid_fill);
    for i in 0..rows {
        for j in 0..cols {
            if let Some((az, rg)) =
                checked_image_index(lut_az[[i, j]], lut_rg[[i, j]], max_az, max_rg)
            {
                for c in 0..channels {
                    geocoded[[i, j, c]] = img[[az, rg, c]];
                }
            }
        }
    }
    Ok(geocoded)
}

/// Round a float index pair and bounds-check it against the image.
fn checked_image_index(az: f64, rg: f64, max_az: usize, max_rg: usize) -> Option<(usize, usize)> {
    let az = az.round_ties_even();
    let rg = rg.round_ties_even();
    if az.is_nan() || rg.is_nan() || az < 0.0 || az >= max_az as f64 || rg < 0.0 || rg >= max_rg as f64
    {
        return None;
    }
    Some((az as usize, rg as usize))
}

/// Second stage of backward geocoding: lookup-table indices to
/// azimuth/range values.
///
/// An entry is invalid when its index is NaN or outside the table, or
/// when the looked-up azimuth or range is negative (the area is not
/// covered by the SLC); invalid entries come back as NaN. `rows` and
/// `cols` must already be integral-valued (rounded or floored by the
/// caller).
pub fn rowcol_to_azrg(
    lut_az: &ArrayView2<'_, f64>,
    lut_rg: &ArrayView2<'_, f64>,
    rows: &[f64],
    cols: &[f64],
) -> (Array1<f64>, Array1<f64>) {
    let (max_row, max_col) = lut_az.dim();
    let n = rows.len().min(cols.len());
    let mut az = Array1::from_elem(n, f64::NAN);
    let mut rg = Array1::from_elem(n, f64::NAN);
    for i in 0..n {
        let (r, c) = (rows[i], cols[i]);
        if r.is_nan() || c.is_nan() || r < 0.0 || r >= max_row as f64 || c < 0.0 || c >= max_col as f64
        {
            continue;
        }
        let az_value = lut_az[[r as usize, c as usize]];
        let rg_value = lut_rg[[r as usize, c as usize]];
        if az_value < 0.0 || rg_value < 0.0 {
            continue;
        }
        az[i] = az_value;
        rg[i] = rg_value;
    }
    (az, rg)
}
