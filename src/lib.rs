#![doc = "geomoran: spatial weights and Moran's I autocorrelation statistics for vector geodata"]
mod config;
mod engine;
mod error;
mod geom;
mod graph;
mod io;
mod stats;

#[doc(inline)]
pub use config::AnalysisConfig;

#[doc(inline)]
pub use engine::{Analysis, SpatialAutocorrelationEngine};

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use geom::{Crs, FeatureSet, Geometry};

#[doc(inline)]
pub use graph::{bridge_islands, AdjacencyGraph, Contiguity, GraphSummary, SpatialWeights, Transform};

#[doc(inline)]
pub use stats::{Cluster, ClusterCounts, GlobalMoran, IslandPolicy, LocalMoran, LocalStatistic, Quadrant};

#[doc(inline)]
pub use io::{csv::{read_points_csv, write_local_csv, PointColumns}, json::write_json, shp::read_shapefile};
