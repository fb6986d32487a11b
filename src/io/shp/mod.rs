//! Shapefile reading: geometry, dBase attributes and `.prj` CRS.

mod polygon;
mod prj;
mod read;

pub use read::read_shapefile;
