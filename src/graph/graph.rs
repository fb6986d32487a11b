use serde::Serialize;

use crate::error::{Error, Result};

/// A neighbor structure over feature indices in compressed sparse row format.
///
/// Rows are sorted and free of self loops and duplicates. A feature with an
/// empty row is an island; islands are recorded at construction time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdjacencyGraph {
    size: usize,
    offsets: Vec<u32>,
    edges: Vec<u32>,
    islands: Vec<usize>,
}

impl AdjacencyGraph {
    /// Construct a graph from per-feature neighbor lists.
    ///
    /// Neighbor lists are sorted and deduplicated; self references are dropped.
    /// Fails if any neighbor index is out of range.
    pub fn from_neighbors<N: AsRef<[u32]>>(neighbors: &[N]) -> Result<Self> {
        let size = neighbors.len();
        let mut offsets = Vec::with_capacity(size + 1);
        let mut edges = Vec::new();
        offsets.push(0u32);

        for (i, row) in neighbors.iter().enumerate() {
            let start = edges.len();
            for &j in row.as_ref() {
                if j as usize >= size {
                    return Err(Error::InvalidParameter {
                        name: "neighbors",
                        value: format!("{i} -> {j}"),
                        reason: format!("index out of range for {size} features"),
                    });
                }
                if j as usize != i { edges.push(j) }
            }
            edges[start..].sort_unstable();
            let mut row = edges.split_off(start);
            row.dedup();
            edges.extend(row);
            offsets.push(edges.len() as u32);
        }

        let islands = offsets.windows(2)
            .enumerate()
            .filter_map(|(i, w)| (w[0] == w[1]).then_some(i))
            .collect();

        Ok(Self { size, offsets, edges, islands })
    }

    /// Get the number of features (nodes) in the graph.
    #[inline] pub fn node_count(&self) -> usize { self.size }

    /// Get the number of directed neighbor entries (twice the link count for symmetric graphs).
    #[inline] pub fn edge_count(&self) -> usize { self.edges.len() }

    /// Get the range of edges for a given node.
    #[inline]
    pub(crate) fn range(&self, node: usize) -> std::ops::Range<usize> {
        self.offsets[node] as usize .. self.offsets[node + 1] as usize
    }

    /// Get the degree (number of neighbors) of a given node.
    #[inline] pub fn degree(&self, node: usize) -> usize { self.range(node).len() }

    /// Get the sorted neighbor slice of a given node.
    #[inline] pub fn neighbor_slice(&self, node: usize) -> &[u32] { &self.edges[self.range(node)] }

    /// Get an iterator over the neighbors of a given node.
    #[inline]
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.neighbor_slice(node).iter().map(|&v| v as usize)
    }

    /// Check whether `other` is a neighbor of `node` (binary search).
    #[inline]
    pub fn contains(&self, node: usize, other: usize) -> bool {
        self.neighbor_slice(node).binary_search(&(other as u32)).is_ok()
    }

    /// Get the features with no neighbors.
    #[inline] pub fn islands(&self) -> &[usize] { &self.islands }

    /// Check if any feature has no neighbors.
    #[inline] pub fn has_islands(&self) -> bool { !self.islands.is_empty() }

    /// Check if every link `i -> j` has a matching `j -> i`.
    pub fn is_symmetric(&self) -> bool {
        (0..self.size).all(|i| self.neighbors(i).all(|j| self.contains(j, i)))
    }

    /// Export per-feature neighbor lists.
    pub fn to_neighbors(&self) -> Vec<Vec<u32>> {
        (0..self.size).map(|i| self.neighbor_slice(i).to_vec()).collect()
    }

    /// Return a copy with additional undirected links.
    pub fn with_links(&self, links: &[(usize, usize)]) -> Result<Self> {
        let mut neighbors = self.to_neighbors();
        for &(a, b) in links {
            if a >= self.size || b >= self.size {
                return Err(Error::InvalidParameter {
                    name: "links",
                    value: format!("({a}, {b})"),
                    reason: format!("index out of range for {} features", self.size),
                });
            }
            neighbors[a].push(b as u32);
            neighbors[b].push(a as u32);
        }
        Self::from_neighbors(&neighbors)
    }

    /// Restrict the graph to the `keep` features, re-indexed in the given order.
    /// Links to features outside `keep` are dropped.
    pub fn subgraph(&self, keep: &[usize]) -> Result<Self> {
        let mut remap = vec![u32::MAX; self.size];
        for (new, &old) in keep.iter().enumerate() {
            remap[old] = new as u32;
        }

        let neighbors = keep.iter()
            .map(|&old| self.neighbors(old)
                .map(|j| remap[j])
                .filter(|&j| j != u32::MAX)
                .collect::<Vec<_>>())
            .collect::<Vec<_>>();

        Self::from_neighbors(&neighbors)
    }

    /// Summary statistics for diagnostics output.
    pub fn summary(&self) -> GraphSummary {
        let degrees = (0..self.size).map(|i| self.degree(i));
        let components = self.components();
        GraphSummary {
            features: self.size,
            links: self.edge_count(),
            symmetric: self.is_symmetric(),
            min_neighbors: degrees.clone().min().unwrap_or(0),
            max_neighbors: degrees.max().unwrap_or(0),
            mean_neighbors: if self.size == 0 { 0.0 } else { self.edge_count() as f64 / self.size as f64 },
            islands: self.islands.clone(),
            components: components.len(),
            largest_component: components.iter().map(Vec::len).max().unwrap_or(0),
        }
    }
}

/// Adjacency diagnostics: size, degree range, islands and connectivity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSummary {
    pub features: usize,
    pub links: usize,
    pub symmetric: bool,
    pub min_neighbors: usize,
    pub max_neighbors: usize,
    pub mean_neighbors: f64,
    pub islands: Vec<usize>,
    pub components: usize,
    pub largest_component: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_graph() -> AdjacencyGraph {
        AdjacencyGraph::from_neighbors(&[
            vec![2, 1],       // 0
            vec![0, 2, 2],    // 1
            vec![0, 1, 3],    // 2
            vec![2],          // 3
            vec![],           // 4
        ]).unwrap()
    }

    #[test]
    fn csr_graph_construction() {
        let graph = make_test_graph();

        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 8);

        // Offsets are cumulative neighbor counts, len = nodes + 1
        assert_eq!(graph.offsets, vec![0, 2, 4, 7, 8, 8]);

        // Rows are sorted and deduplicated
        assert_eq!(graph.edges, vec![1, 2, 0, 2, 0, 1, 3, 2]);

        for window in graph.offsets.windows(2) { assert!(window[0] <= window[1]) }
    }

    #[test]
    fn islands_are_recorded() {
        let graph = make_test_graph();
        assert_eq!(graph.islands(), &[4]);
        assert!(graph.has_islands());
        assert_eq!(graph.degree(4), 0);
        assert!(graph.neighbors(4).next().is_none());
    }

    #[test]
    fn self_loops_are_dropped() {
        let graph = AdjacencyGraph::from_neighbors(&[vec![0, 1], vec![1]]).unwrap();
        assert_eq!(graph.neighbor_slice(0), &[1]);
        assert_eq!(graph.islands(), &[1]);
    }

    #[test]
    fn out_of_range_neighbor_is_rejected() {
        let err = AdjacencyGraph::from_neighbors(&[vec![3u32]]).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "neighbors", .. }));
    }

    #[test]
    fn membership_and_symmetry() {
        let graph = make_test_graph();
        assert!(graph.contains(2, 3));
        assert!(!graph.contains(3, 1));
        assert!(graph.is_symmetric());

        let directed = AdjacencyGraph::from_neighbors(&[vec![1], vec![]]).unwrap();
        assert!(!directed.is_symmetric());
    }

    #[test]
    fn with_links_bridges_islands() {
        let graph = make_test_graph().with_links(&[(4, 3)]).unwrap();
        assert!(!graph.has_islands());
        assert!(graph.contains(4, 3) && graph.contains(3, 4));
        assert!(make_test_graph().with_links(&[(9, 0)]).is_err());
    }

    #[test]
    fn subgraph_reindexes_and_drops_outside_links() {
        let graph = make_test_graph();
        let sub = graph.subgraph(&[3, 2, 0]).unwrap();
        assert_eq!(sub.to_neighbors(), vec![vec![1], vec![0, 2], vec![1]]);
        assert!(!sub.has_islands());
    }

    #[test]
    fn summary_reports_degrees_and_components() {
        let summary = make_test_graph().summary();
        assert_eq!(summary.features, 5);
        assert_eq!(summary.links, 8);
        assert_eq!(summary.min_neighbors, 0);
        assert_eq!(summary.max_neighbors, 3);
        assert!((summary.mean_neighbors - 1.6).abs() < 1e-12);
        assert_eq!(summary.islands, vec![4]);
        assert_eq!(summary.components, 2);
        assert_eq!(summary.largest_component, 4);
    }

    #[test]
    fn empty_graph_is_valid() {
        let graph = AdjacencyGraph::from_neighbors::<Vec<u32>>(&[]).unwrap();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.offsets, vec![0]);
        assert_eq!(graph.summary().components, 0);
    }

    #[test]
    #[should_panic]
    fn degree_panics_for_out_of_bounds_node() {
        let graph = make_test_graph();
        graph.degree(graph.node_count());
    }
}
