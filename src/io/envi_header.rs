//! Auxiliary text header parser for native UTM lookup-table files.
//!
//! The header is a `key = value` text file carrying the geocoding
//! metadata of the raster pair. Header files always spell "North" in
//! their map info line; the southern hemisphere is indicated by a
//! negative projection zone instead, which is normalized here.

use crate::types::{GeoError, GeoResult, Hemisphere, UtmGeoHeader};
use std::fs;
use std::path::Path;

/// Parse an auxiliary `.hdr` file into a [`UtmGeoHeader`].
///
/// Recognized keys: `min_easting`, `min_northing`,
/// `pixel_spacing_east`, `pixel_spacing_north`, `projection_zone`, and
/// `map info` (hemisphere from the presence of "North"). Missing
/// required keys are a structural error.
pub fn parse_hdr_file<P: AsRef<Path>>(path: P) -> GeoResult<UtmGeoHeader> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_hdr_str(&contents).map_err(|e| {
        GeoError::InvalidFormat(format!(
            "header file {}: {}",
            path.as_ref().display(),
            e
        ))
    })
}

fn parse_hdr_str(contents: &str) -> Result<UtmGeoHeader, String> {
    let mut min_east = None;
    let mut min_north = None;
    let mut ps_east = None;
    let mut ps_north = None;
    let mut zone: Option<i32> = None;
    let mut hemisphere = None;

    for line in contents.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        match key {
            "min_easting" => min_east = Some(parse_float(key, value)?),
            "min_northing" => min_north = Some(parse_float(key, value)?),
            "pixel_spacing_east" => ps_east = Some(parse_float(key, value)?),
            "pixel_spacing_north" => ps_north = Some(parse_float(key, value)?),
            "projection_zone" => {
                zone = Some(
                    value
                        .parse::<i32>()
                        .map_err(|_| format!("invalid integer for {}: '{}'", key, value))?,
                )
            }
            "map info" => {
                hemisphere = Some(if value.contains("North") {
                    Hemisphere::North
                } else {
                    Hemisphere::South
                })
            }
            _ => {}
        }
    }

    let mut zone = zone.ok_or("missing key 'projection_zone'")?;
    let mut hemisphere = hemisphere.ok_or("missing key 'map info'")?;
    // Header files set "North" even for southern acquisitions; a
    // negative zone is the actual hemisphere marker.
    if zone < 0 {
        hemisphere = Hemisphere::South;
        zone = -zone;
    }

    Ok(UtmGeoHeader {
        min_north: min_north.ok_or("missing key 'min_northing'")?,
        min_east: min_east.ok_or("missing key 'min_easting'")?,
        ps_north: ps_north.ok_or("missing key 'pixel_spacing_north'")?,
        ps_east: ps_east.ok_or("missing key 'pixel_spacing_east'")?,
        zone,
        hemisphere,
    })
}

fn parse_float(key: &str, value: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .map_err(|_| format!("invalid number for {}: '{}'", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HDR_NORTH: &str = "\
description = UTM geocoding header
min_easting = 604000.5
min_northing = 5371000.25
pixel_spacing_east = 1.0
pixel_spacing_north = 2.0
projection_zone = 32
map info = {UTM, 1.0, 1.0, 604000.5, 5371000.25, North, WGS-84}
";

    const HDR_SOUTH: &str = "\
min_easting = 300000.0
min_northing = 6000000.0
pixel_spacing_east = 1.5
pixel_spacing_north = 1.5
projection_zone = -19
map info = {UTM, 1.0, 1.0, 300000.0, 6000000.0, North, WGS-84}
";

    #[test]
    fn test_parse_northern_header() {
        let header = parse_hdr_str(HDR_NORTH).unwrap();
        assert_eq!(header.min_east, 604000.5);
        assert_eq!(header.min_north, 5371000.25);
        assert_eq!(header.ps_east, 1.0);
        assert_eq!(header.ps_north, 2.0);
        assert_eq!(header.zone, 32);
        assert_eq!(header.hemisphere, Hemisphere::North);
    }

    #[test]
    fn test_negative_zone_means_southern_hemisphere() {
        let header = parse_hdr_str(HDR_SOUTH).unwrap();
        assert_eq!(header.zone, 19);
        assert_eq!(header.hemisphere, Hemisphere::South);
    }

    #[test]
    fn test_missing_key_is_error() {
        let partial = "min_easting = 1.0\nprojection_zone = 32\n";
        assert!(parse_hdr_str(partial).is_err());
    }

    #[test]
    fn test_hdr_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lut_az.hdr");
        std::fs::write(&path, HDR_NORTH).unwrap();
        let header = parse_hdr_file(&path).unwrap();
        assert_eq!(header.zone, 32);
    }
}
