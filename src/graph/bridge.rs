use rstar::{primitives::GeomWithData, RTree};
use tracing::{info, warn};

use crate::error::Result;
use crate::geom::FeatureSet;
use crate::graph::AdjacencyGraph;

/// Link every island to the feature with the nearest representative point.
///
/// Islands without a representative point (empty geometry) are left alone.
/// Returns the patched graph and the links that were added.
pub fn bridge_islands(features: &FeatureSet, graph: &AdjacencyGraph) -> Result<(AdjacencyGraph, Vec<(usize, usize)>)> {
    if !graph.has_islands() || features.len() < 2 {
        return Ok((graph.clone(), Vec::new()));
    }

    if features.crs().is_some_and(|crs| crs.is_geographic()) {
        warn!("bridging islands by planar distance in geographic coordinates");
    }

    let centroids = features.centroids();
    let tree = RTree::bulk_load(
        centroids.iter().enumerate()
            .filter(|(_, p)| p.x().is_finite() && p.y().is_finite())
            .map(|(i, p)| GeomWithData::new([p.x(), p.y()], i))
            .collect::<Vec<_>>()
    );

    let links = graph.islands().iter()
        .filter_map(|&island| {
            let p = centroids[island];
            if !(p.x().is_finite() && p.y().is_finite()) { return None }
            tree.nearest_neighbor_iter(&[p.x(), p.y()])
                .map(|hit| hit.data)
                .find(|&j| j != island)
                .map(|j| (island, j))
        })
        .collect::<Vec<_>>();

    for &(island, target) in &links {
        info!(island, target, "bridged island to nearest feature");
    }

    Ok((graph.with_links(&links)?, links))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Geometry;
    use geo::point;

    #[test]
    fn islands_join_nearest_feature() {
        let geoms: Vec<Geometry> = [(0.0, 0.0), (1.0, 0.0), (4.0, 0.0), (20.0, 0.0)].iter()
            .map(|&(x, y)| point!(x: x, y: y).into())
            .collect();
        let fs = FeatureSet::new(geoms, vec![0.0; 4], None).unwrap();
        let graph = AdjacencyGraph::from_neighbors(&[vec![1], vec![0], vec![], vec![]]).unwrap();

        let (bridged, links) = bridge_islands(&fs, &graph).unwrap();
        assert_eq!(links, vec![(2, 1), (3, 2)]);
        assert!(!bridged.has_islands());
        assert!(bridged.is_symmetric());
        assert!(bridged.contains(1, 2));
    }

    #[test]
    fn no_islands_is_a_no_op() {
        let fs = FeatureSet::new(vec![point!(x: 0.0, y: 0.0).into(), point!(x: 1.0, y: 0.0).into()], vec![1.0, 2.0], None).unwrap();
        let graph = AdjacencyGraph::from_neighbors(&[vec![1], vec![0]]).unwrap();
        let (bridged, links) = bridge_islands(&fs, &graph).unwrap();
        assert!(links.is_empty());
        assert_eq!(bridged, graph);
    }
}
