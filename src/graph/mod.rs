mod bridge;
mod components;
mod contiguity;
mod graph;
mod weights;

pub use bridge::bridge_islands;
pub use contiguity::Contiguity;
pub use graph::{AdjacencyGraph, GraphSummary};
pub use weights::{SpatialWeights, Transform};
