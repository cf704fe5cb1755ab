use ndarray::Array2;
use num_complex::Complex;
use serde::{Deserialize, Serialize};

/// Complex-valued SLC pixel type (I + jQ)
pub type SlcComplex = Complex<f32>;

/// 2D complex SLC image (azimuth x range)
pub type SlcImage = Array2<SlcComplex>;

/// 2D lookup-table grid holding azimuth or range indices
pub type LutGrid = Array2<f64>;

/// Hemisphere flag of a UTM projection zone.
///
/// The native header convention encodes north as 1 and south as 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hemisphere {
    North,
    South,
}

impl Hemisphere {
    /// Decode the native header convention (1 = north, 2 = south).
    pub fn from_header_code(code: i32) -> GeoResult<Self> {
        match code {
            1 => Ok(Hemisphere::North),
            2 => Ok(Hemisphere::South),
            _ => Err(GeoError::InvalidFormat(format!(
                "unknown hemisphere code: {}",
                code
            ))),
        }
    }
}

/// Map projection descriptor carried alongside every lookup table.
///
/// Resolved once at construction time; the actual coordinate math is
/// delegated to PROJ (see `core::transform`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MapProjection {
    /// Unprojected longitude/latitude on the WGS84 ellipsoid (the default)
    Geographic,
    /// UTM zone on the WGS84 ellipsoid
    Utm { zone: u32, south: bool },
    /// Arbitrary projected CRS, as a PROJ string or "EPSG:xxxx" code
    ProjString(String),
}

impl Default for MapProjection {
    fn default() -> Self {
        MapProjection::Geographic
    }
}

impl MapProjection {
    /// Render the PROJ definition string for this projection.
    pub fn to_proj_string(&self) -> String {
        match self {
            MapProjection::Geographic => {
                "+proj=longlat +ellps=WGS84 +datum=WGS84".to_string()
            }
            MapProjection::Utm { zone, south } => {
                if *south {
                    format!("+proj=utm +zone={} +ellps=WGS84 +south", zone)
                } else {
                    format!("+proj=utm +zone={} +ellps=WGS84", zone)
                }
            }
            MapProjection::ProjString(def) => def.clone(),
        }
    }
}

/// Geocoding metadata of a native UTM lookup-table file pair.
///
/// Read either from the raster's own header or from an auxiliary text
/// header file (see `io::envi_header`).
#[derive(Debug, Clone, PartialEq)]
pub struct UtmGeoHeader {
    pub min_north: f64,
    pub min_east: f64,
    /// Pixel spacing in northing direction (meters)
    pub ps_north: f64,
    /// Pixel spacing in easting direction (meters)
    pub ps_east: f64,
    pub zone: i32,
    pub hemisphere: Hemisphere,
}

impl UtmGeoHeader {
    /// Build from fields embedded in the raster header.
    ///
    /// A negative zone together with a southern hemisphere flag is
    /// redundant; the zone is normalized to its positive value.
    pub fn from_embedded(
        min_north: f64,
        min_east: f64,
        ps_north: f64,
        ps_east: f64,
        zone: i32,
        hemisphere: Hemisphere,
    ) -> Self {
        let zone = if zone < 0 && hemisphere == Hemisphere::South {
            -zone
        } else {
            zone
        };
        Self {
            min_north,
            min_east,
            ps_north,
            ps_east,
            zone,
            hemisphere,
        }
    }

    /// UTM projection described by this header.
    pub fn projection(&self) -> MapProjection {
        MapProjection::Utm {
            zone: self.zone.unsigned_abs(),
            south: self.hemisphere == Hemisphere::South,
        }
    }
}

/// Geospatial affine transformation in GDAL coefficient order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(gt: &[f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    /// Coordinate of the given fractional pixel position.
    pub fn xy(&self, row: f64, col: f64) -> (f64, f64) {
        let x = self.top_left_x + col * self.pixel_width + row * self.rotation_x;
        let y = self.top_left_y + col * self.rotation_y + row * self.pixel_height;
        (x, y)
    }

    /// Determinant of the 2x2 linear part; zero means the transform
    /// cannot be inverted.
    pub fn determinant(&self) -> f64 {
        self.pixel_width * self.pixel_height - self.rotation_x * self.rotation_y
    }

    /// Solve the affine for fractional (row, col) of a coordinate.
    ///
    /// NaN inputs propagate to NaN outputs. Callers that need integer
    /// indices floor the result, matching the raster convention.
    pub fn rowcol(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.determinant();
        let dx = x - self.top_left_x;
        let dy = y - self.top_left_y;
        let col = (self.pixel_height * dx - self.rotation_x * dy) / det;
        let row = (self.pixel_width * dy - self.rotation_y * dx) / det;
        (row, col)
    }

    /// Geographic bounding box of a raster with the given shape.
    pub fn array_bounds(&self, rows: usize, cols: usize) -> GeoBounds {
        let corners = [
            self.xy(0.0, 0.0),
            self.xy(0.0, cols as f64),
            self.xy(rows as f64, 0.0),
            self.xy(rows as f64, cols as f64),
        ];
        let mut bounds = GeoBounds {
            west: f64::INFINITY,
            south: f64::INFINITY,
            east: f64::NEG_INFINITY,
            north: f64::NEG_INFINITY,
        };
        for (x, y) in corners {
            bounds.west = bounds.west.min(x);
            bounds.east = bounds.east.max(x);
            bounds.south = bounds.south.min(y);
            bounds.north = bounds.north.max(y);
        }
        bounds
    }
}

/// Geographic bounding box in the coordinates of the owning raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

/// Ordered-column numeric table.
///
/// Stands in for the tabular ground-truth data handed over by external
/// campaign loaders. Geocoding operations return a new table with
/// appended columns; the source table, its row order, and its column
/// order are never modified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoTable {
    columns: Vec<(String, Vec<f64>)>,
}

impl GeoTable {
    pub fn from_columns<I, S>(columns: I) -> GeoResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let columns: Vec<(String, Vec<f64>)> = columns
            .into_iter()
            .map(|(name, values)| (name.into(), values))
            .collect();
        if let Some(n_rows) = columns.first().map(|(_, v)| v.len()) {
            for (name, values) in &columns {
                if values.len() != n_rows {
                    return Err(GeoError::ShapeMismatch(format!(
                        "column '{}' has {} rows, expected {}",
                        name,
                        values.len(),
                        n_rows
                    )));
                }
            }
        }
        Ok(Self { columns })
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, v)| v.len())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Values of a named column; an unknown name is a structural error.
    pub fn column(&self, name: &str) -> GeoResult<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
            .ok_or_else(|| GeoError::UnknownColumn(name.to_string()))
    }

    /// New table with the given columns appended after the existing ones.
    pub fn with_columns<I, S>(&self, appended: I) -> GeoResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let n_rows = self.n_rows();
        let mut columns = self.columns.clone();
        for (name, values) in appended {
            let name = name.into();
            if values.len() != n_rows {
                return Err(GeoError::ShapeMismatch(format!(
                    "appended column '{}' has {} rows, expected {}",
                    name,
                    values.len(),
                    n_rows
                )));
            }
            if columns.iter().any(|(n, _)| *n == name) {
                return Err(GeoError::InvalidFormat(format!(
                    "column '{}' already exists",
                    name
                )));
            }
            columns.push((name, values));
        }
        Ok(Self { columns })
    }
}

/// Error types for geocoding operations.
///
/// These cover structural failures only; routine data-level invalidity
/// (out-of-coverage coordinates, NaN inputs) is represented in the data
/// itself and never raised.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Unsupported geometry type: {0}")]
    UnsupportedGeometry(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("NPY read error: {0}")]
    NpyRead(#[from] ndarray_npy::ReadNpyError),

    #[error("NPY write error: {0}")]
    NpyWrite(#[from] ndarray_npy::WriteNpyError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for geocoding operations.
pub type GeoResult<T> = Result<T, GeoError>;
