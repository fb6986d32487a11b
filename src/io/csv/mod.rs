//! CSV point input and per-feature result output.

mod read;
mod write;

pub use read::{read_points_csv, PointColumns};
pub use write::write_local_csv;
