mod global;
mod inference;
mod local;
mod prepare;

pub use global::GlobalMoran;
pub use local::{Cluster, ClusterCounts, LocalMoran, LocalStatistic, Quadrant};
pub use prepare::IslandPolicy;

pub(crate) use prepare::Prepared;
