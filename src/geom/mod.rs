mod algorithm;
mod bbox;
mod crs;
mod geom;

pub(crate) use bbox::BoundingBox;
pub use crs::Crs;
pub use geom::{FeatureSet, Geometry};
