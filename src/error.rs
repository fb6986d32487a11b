use thiserror::Error;

/// Conditions the engine reports instead of panicking or producing `NaN`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("feature set is empty")]
    EmptyFeatureSet,

    #[error("need at least {required} features with neighbors, found {found}")]
    TooFewFeatures { required: usize, found: usize },

    #[error("length mismatch: {what} has {found} entries, expected {expected}")]
    LengthMismatch { what: &'static str, expected: usize, found: usize },

    #[error("non-finite attribute value at feature indices {indices:?}")]
    NonFiniteValues { indices: Vec<usize> },

    #[error("{count} feature(s) have no neighbors (islands): {indices:?}")]
    Islands { count: usize, indices: Vec<usize> },

    #[error("feature {index} is a point; the {rule} rule requires polygons")]
    NotAPolygon { index: usize, rule: &'static str },

    #[error("feature set has no coordinate reference system; assign or reproject one before {operation}")]
    MissingCrs { operation: &'static str },

    #[error("EPSG:{epsg} is geographic (degrees); reproject to a projected CRS before {operation}")]
    GeographicCrs { epsg: u32, operation: &'static str },

    #[error("CRS mismatch: EPSG:{left} vs EPSG:{right}")]
    CrsMismatch { left: u32, right: u32 },

    #[error("unsupported CRS: EPSG:{0}")]
    UnsupportedCrs(u32),

    #[error("reprojection from EPSG:{from} to EPSG:{to} failed: {reason}")]
    Reprojection { from: u32, to: u32, reason: String },

    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter { name: &'static str, value: String, reason: String },
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
