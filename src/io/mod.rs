//! Format-specific reading and writing.
//!
//! - `shp` - Shapefile polygons/points with dBase attributes and `.prj` CRS
//! - `csv` - point tables in, per-feature LISA results out
//! - `json` - global summaries

pub(crate) mod csv;
pub(crate) mod json;
pub(crate) mod shp;
