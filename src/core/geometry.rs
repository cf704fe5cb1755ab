//! Coordinate transforms over vector geometries.
//!
//! Mirrors the behavior of applying a coordinate function to every
//! vertex: a geometry with an unmappable vertex is absent from the
//! result rather than partially transformed, and multi-geometries keep
//! only their fully-valid members. Passing an unsupported geometry
//! type is a structural error.

use crate::types::{GeoError, GeoResult};
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};

/// Apply a coordinate function to every vertex of a geometry.
///
/// Returns `Ok(None)` when the transformed geometry contains invalid
/// (NaN) vertices: a Point or LineString with any NaN vertex, a Polygon
/// with a NaN vertex in its exterior or any interior ring, or a
/// MultiPolygon whose member polygons are all invalid. A MultiPolygon
/// with at least one valid member keeps exactly the valid members.
pub fn transform_geometry<F>(
    geometry: &Geometry<f64>,
    transform: &mut F,
) -> GeoResult<Option<Geometry<f64>>>
where
    F: FnMut(f64, f64) -> (f64, f64),
{
    match geometry {
        Geometry::Point(point) => {
            let (x, y) = transform(point.x(), point.y());
            if x.is_nan() || y.is_nan() {
                Ok(None)
            } else {
                Ok(Some(Geometry::Point(Point::new(x, y))))
            }
        }
        Geometry::LineString(line) => {
            Ok(transform_line_string(line, transform).map(Geometry::LineString))
        }
        Geometry::Polygon(polygon) => {
            Ok(transform_polygon(polygon, transform).map(Geometry::Polygon))
        }
        Geometry::MultiPolygon(multi) => {
            let valid: Vec<Polygon<f64>> = multi
                .iter()
                .filter_map(|polygon| transform_polygon(polygon, transform))
                .collect();
            if valid.is_empty() {
                Ok(None)
            } else {
                Ok(Some(Geometry::MultiPolygon(MultiPolygon(valid))))
            }
        }
        other => Err(GeoError::UnsupportedGeometry(format!("{:?}", other))),
    }
}

fn transform_line_string<F>(line: &LineString<f64>, transform: &mut F) -> Option<LineString<f64>>
where
    F: FnMut(f64, f64) -> (f64, f64),
{
    let mut coords = Vec::with_capacity(line.0.len());
    for coord in line.coords() {
        let (x, y) = transform(coord.x, coord.y);
        if x.is_nan() || y.is_nan() {
            return None;
        }
        coords.push(Coord { x, y });
    }
    Some(LineString::from(coords))
}

fn transform_polygon<F>(polygon: &Polygon<f64>, transform: &mut F) -> Option<Polygon<f64>>
where
    F: FnMut(f64, f64) -> (f64, f64),
{
    let exterior = transform_line_string(polygon.exterior(), transform)?;
    let mut interiors = Vec::with_capacity(polygon.interiors().len());
    for ring in polygon.interiors() {
        interiors.push(transform_line_string(ring, transform)?);
    }
    Some(Polygon::new(exterior, interiors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    fn shift(x: f64, y: f64) -> (f64, f64) {
        (x + 10.0, y - 5.0)
    }

    fn nan_above_two(x: f64, y: f64) -> (f64, f64) {
        if x > 2.0 {
            (f64::NAN, f64::NAN)
        } else {
            (x, y)
        }
    }

    #[test]
    fn test_polygon_all_vertices_valid() {
        let poly: Polygon<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ];
        let n_before = poly.exterior().0.len();
        let result = transform_geometry(&Geometry::Polygon(poly), &mut shift)
            .unwrap()
            .unwrap();
        match result {
            Geometry::Polygon(p) => {
                assert_eq!(p.exterior().0.len(), n_before);
                assert_eq!(p.exterior().0[0], Coord { x: 10.0, y: -5.0 });
            }
            _ => panic!("expected polygon"),
        }
    }

    #[test]
    fn test_polygon_with_invalid_vertex_is_discarded() {
        let poly: Polygon<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 5.0, y: 0.0),
            (x: 0.0, y: 1.0),
        ];
        let result = transform_geometry(&Geometry::Polygon(poly), &mut nan_above_two).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_multipolygon_keeps_valid_members_only() {
        let good: Polygon<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 0.0, y: 1.0),
        ];
        let bad: Polygon<f64> = polygon![
            (x: 4.0, y: 0.0),
            (x: 5.0, y: 0.0),
            (x: 4.0, y: 1.0),
        ];
        let multi = Geometry::MultiPolygon(MultiPolygon(vec![good, bad.clone()]));
        let result = transform_geometry(&multi, &mut nan_above_two)
            .unwrap()
            .unwrap();
        match result {
            Geometry::MultiPolygon(mp) => assert_eq!(mp.0.len(), 1),
            _ => panic!("expected multipolygon"),
        }

        let all_bad = Geometry::MultiPolygon(MultiPolygon(vec![bad]));
        assert!(transform_geometry(&all_bad, &mut nan_above_two)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_unsupported_geometry_is_structural_error() {
        let line = Geometry::Line(geo_types::Line::new(
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 1.0 },
        ));
        assert!(matches!(
            transform_geometry(&line, &mut shift),
            Err(GeoError::UnsupportedGeometry(_))
        ));
    }

    #[test]
    fn test_point_outside_coverage_is_none() {
        let point = Geometry::Point(Point::new(5.0, 5.0));
        assert!(transform_geometry(&point, &mut nan_above_two)
            .unwrap()
            .is_none());
    }
}
