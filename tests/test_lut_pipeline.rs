use geo_types::{polygon, Geometry, MultiPolygon, Polygon};
use ndarray::{Array2, Array3};
use slantgeo::{
    CoordTransform, GeoTable, Lut, Lut3d, MapProjection, SlcComplex, DEFAULT_MIN_VALID_HEIGHT,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn utm_projection() -> MapProjection {
    MapProjection::Utm {
        zone: 33,
        south: false,
    }
}

/// UTM LUT with 5 m spacing: cell (i, j) maps to image position (i, j).
fn utm_lut() -> Lut {
    let lut_az = Array2::from_shape_fn((21, 21), |(i, _)| i as f64);
    let lut_rg = Array2::from_shape_fn((21, 21), |(_, j)| j as f64);
    Lut::new(
        [5_000_000.0, 5_000_100.0, 500_000.0, 500_100.0],
        lut_rg,
        lut_az,
        utm_projection(),
    )
    .expect("valid LUT")
}

/// Longitude/latitude of a UTM position in the LUT's projection.
fn to_lon_lat(easting: f64, northing: f64) -> (f64, f64) {
    let transform = CoordTransform::new(&utm_projection(), &MapProjection::Geographic)
        .expect("transform");
    transform.transform_point(easting, northing)
}

#[test]
fn test_geocode_lon_lat_projects_into_lut() {
    init_logs();
    let lut = utm_lut();
    let (lon, lat) = to_lon_lat(500_050.0, 5_000_050.0);
    let (az, rg) = lut.geocode_lon_lat(&[lon], &[lat]).expect("geocode");
    assert_eq!(az[0], 10.0);
    assert_eq!(rg[0], 10.0);

    // a point far outside the LUT is data-invalid, not an error
    let (az, rg) = lut.geocode_lon_lat(&[100.0], &[0.0]).expect("geocode");
    assert!(az[0].is_nan() && rg[0].is_nan());
}

#[test]
fn test_geocode_geometry_lon_lat_discards_uncovered_polygons() {
    let lut = utm_lut();
    let (lon_a, lat_a) = to_lon_lat(500_010.0, 5_000_010.0);
    let (lon_b, lat_b) = to_lon_lat(500_090.0, 5_000_010.0);
    let (lon_c, lat_c) = to_lon_lat(500_050.0, 5_000_090.0);

    let covered: Polygon<f64> = polygon![
        (x: lon_a, y: lat_a),
        (x: lon_b, y: lat_b),
        (x: lon_c, y: lat_c),
    ];
    let n_vertices = covered.exterior().0.len();
    let result = lut
        .geocode_geometry_lon_lat(&Geometry::Polygon(covered.clone()))
        .expect("geocode")
        .expect("covered polygon survives");
    match result {
        Geometry::Polygon(p) => assert_eq!(p.exterior().0.len(), n_vertices),
        other => panic!("expected polygon, got {:?}", other),
    }

    // one vertex outside the LUT discards the whole polygon
    let partly_outside: Polygon<f64> = polygon![
        (x: lon_a, y: lat_a),
        (x: lon_b + 1.0, y: lat_b),
        (x: lon_c, y: lat_c),
    ];
    assert!(lut
        .geocode_geometry_lon_lat(&Geometry::Polygon(partly_outside.clone()))
        .expect("geocode")
        .is_none());

    // a multipolygon keeps only its fully-covered members
    let multi = Geometry::MultiPolygon(MultiPolygon(vec![covered, partly_outside]));
    let result = lut
        .geocode_geometry_lon_lat(&multi)
        .expect("geocode")
        .expect("one member survives");
    match result {
        Geometry::MultiPolygon(mp) => assert_eq!(mp.0.len(), 1),
        other => panic!("expected multipolygon, got {:?}", other),
    }
}

#[test]
fn test_geocode_table_appends_projected_intermediates() {
    let lut = utm_lut();
    let (lon_in, lat_in) = to_lon_lat(500_025.0, 5_000_075.0);
    let table = GeoTable::from_columns(vec![
        ("point_id", vec![1.0, 2.0]),
        ("longitude", vec![lon_in, 100.0]),
        ("latitude", vec![lat_in, 0.0]),
    ])
    .expect("table");

    let geocoded = lut.geocode_table(&table).expect("geocode");
    let names: Vec<&str> = geocoded.column_names().collect();
    assert_eq!(
        names,
        vec![
            "point_id",
            "longitude",
            "latitude",
            "northing",
            "easting",
            "azimuth",
            "range"
        ]
    );
    assert_eq!(geocoded.n_rows(), table.n_rows());
    // first row geocodes to LUT cell (15, 5)
    assert_eq!(geocoded.column("azimuth").expect("column")[0], 15.0);
    assert_eq!(geocoded.column("range").expect("column")[0], 5.0);
    assert!((geocoded.column("northing").expect("column")[0] - 5_000_075.0).abs() < 1e-3);
    // second row is out of coverage
    assert!(geocoded.column("azimuth").expect("column")[1].is_nan());
    // input order and content survive untouched
    assert_eq!(
        geocoded.column("point_id").expect("column"),
        [1.0, 2.0].as_slice()
    );
}

#[test]
fn test_forward_geocoding_multichannel_and_complex() {
    let lut = utm_lut();

    let cube = Array3::from_shape_fn((21, 21, 3), |(i, j, c)| (i * 100 + j * 3 + c) as f64);
    let geocoded = lut
        .geocode_image_bands(&cube.view(), f64::NAN)
        .expect("bands lookup");
    assert_eq!(geocoded.dim(), (21, 21, 3));
    assert_eq!(geocoded[[4, 7, 2]], cube[[4, 7, 2]]);

    let slc = Array2::from_elem((21, 21), SlcComplex::new(0.5, -0.5));
    let geocoded = lut
        .geocode_image(&slc.view(), SlcComplex::new(f32::NAN, f32::NAN))
        .expect("complex lookup");
    assert_eq!(geocoded[[10, 10]], SlcComplex::new(0.5, -0.5));
}

#[test]
fn test_lut3d_flattening_feeds_forward_geocoding() {
    let n = 21;
    let lut_az = Array2::from_shape_fn((n, n), |(i, _)| i as f64);
    let lut_rg = Array2::from_shape_fn((n, n), |(_, j)| j as f64);
    let zeros = Array2::zeros((n, n));
    let lut3d = Lut3d::new(
        [5_000_000.0, 5_000_100.0, 500_000.0, 500_100.0],
        lut_rg.clone(),
        lut_az.clone(),
        zeros.clone(),
        zeros.clone(),
        zeros.clone(),
        zeros.clone(),
        Array2::from_elem((n, n), 650.0),
        utm_projection(),
    )
    .expect("LUT3D");

    // zero coefficients: any height reproduces the reference mapping
    let height = Array2::from_elem((n, n), 1200.0);
    let lut = lut3d
        .generate_lut_at_height(&height.view(), false, DEFAULT_MIN_VALID_HEIGHT)
        .expect("flatten");

    let img = Array2::from_shape_fn((n, n), |(i, j)| (i * n + j) as f64);
    let geocoded = lut.geocode_image(&img.view(), f64::NAN).expect("lookup");
    assert_eq!(geocoded, img);
}

#[test]
fn test_resample_aligns_acquisitions_for_comparison() {
    let lut = utm_lut();
    // second acquisition on a coarser, shifted grid
    let dest = Lut::new(
        [5_000_010.0, 5_000_090.0, 500_010.0, 500_090.0],
        Array2::zeros((9, 9)),
        Array2::zeros((9, 9)),
        utm_projection(),
    )
    .expect("destination LUT");

    let aligned = lut.resample_to_lut(&dest).expect("resample");
    assert_eq!(aligned.shape(), dest.shape());
    assert_eq!(aligned.extent(), dest.extent());
    // cell (0, 0) of the aligned LUT sits at (5000010, 500010),
    // i.e. image position (2, 2) of the original
    assert!((aligned.lut_az()[[0, 0]] - 2.0).abs() < 1e-9);
    assert!((aligned.lut_rg()[[0, 0]] - 2.0).abs() < 1e-9);
}
