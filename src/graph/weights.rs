use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::AdjacencyGraph;

/// How raw adjacency is turned into weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Every link has weight 1.
    Binary,
    /// Each row sums to 1 (w_ij = 1 / neighbors(i)); island rows stay zero.
    #[default]
    Row,
}

/// Sparse spatial weights sharing the CSR layout of an [`AdjacencyGraph`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialWeights {
    graph: AdjacencyGraph,
    weights: Vec<f64>,
    transform: Transform,
}

impl SpatialWeights {
    /// Derive weights from adjacency with the given transform.
    pub fn new(graph: AdjacencyGraph, transform: Transform) -> Self {
        let weights = (0..graph.node_count())
            .flat_map(|i| {
                let degree = graph.degree(i);
                let w = match transform {
                    Transform::Binary => 1.0,
                    Transform::Row => 1.0 / degree as f64,
                };
                std::iter::repeat_n(w, degree)
            })
            .collect();

        Self { graph, weights, transform }
    }

    /// Binary (0/1) weights.
    pub fn binary(graph: AdjacencyGraph) -> Self { Self::new(graph, Transform::Binary) }

    /// Row-standardized weights.
    pub fn row_standardized(graph: AdjacencyGraph) -> Self { Self::new(graph, Transform::Row) }

    /// Get the underlying adjacency.
    #[inline] pub fn graph(&self) -> &AdjacencyGraph { &self.graph }

    /// Get the transform the weights were built with.
    #[inline] pub fn transform(&self) -> Transform { self.transform }

    /// Get the number of features.
    #[inline] pub fn len(&self) -> usize { self.graph.node_count() }

    /// Check if the weights cover no features.
    #[inline] pub fn is_empty(&self) -> bool { self.graph.node_count() == 0 }

    /// Get the features with no neighbors (zero rows).
    #[inline] pub fn islands(&self) -> &[usize] { self.graph.islands() }

    /// Get an iterator over (neighbor, weight) pairs of a row.
    #[inline]
    pub fn neighbors_with_weights(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.graph.neighbors(node).zip(self.weights[self.graph.range(node)].iter().copied())
    }

    /// Get w_ij, zero if `j` is not a neighbor of `i`.
    pub fn weight(&self, i: usize, j: usize) -> f64 {
        let row = self.graph.range(i);
        match self.graph.neighbor_slice(i).binary_search(&(j as u32)) {
            Ok(pos) => self.weights[row.start + pos],
            Err(_) => 0.0,
        }
    }

    /// Sum of row `i`.
    pub fn row_sum(&self, i: usize) -> f64 {
        self.weights[self.graph.range(i)].iter().sum()
    }

    /// Column sums (w_.j) of the whole matrix.
    pub fn column_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.len()];
        for i in 0..self.len() {
            for (j, w) in self.neighbors_with_weights(i) { sums[j] += w }
        }
        sums
    }

    /// S0: the sum of all weights.
    pub fn s0(&self) -> f64 { self.weights.iter().sum() }

    /// S1: half the sum over all ordered pairs of (w_ij + w_ji)^2.
    pub fn s1(&self) -> f64 {
        let mut total = 0.0;
        for i in 0..self.len() {
            for (j, w_ij) in self.neighbors_with_weights(i) {
                total += if self.graph.contains(j, i) {
                    (w_ij + self.weight(j, i)).powi(2)
                } else {
                    // (i, j) and (j, i) both contribute w_ij^2 when the reverse link is absent
                    2.0 * w_ij * w_ij
                };
            }
        }
        0.5 * total
    }

    /// S2: sum over features of (row sum + column sum)^2.
    pub fn s2(&self) -> f64 {
        self.column_sums().iter().enumerate()
            .map(|(i, col)| (self.row_sum(i) + col).powi(2))
            .sum()
    }

    /// Spatial lag: the weighted sum of neighbor values for every feature.
    pub fn lag(&self, values: &[f64]) -> Result<Vec<f64>> {
        if values.len() != self.len() {
            return Err(Error::LengthMismatch { what: "values", expected: self.len(), found: values.len() });
        }
        Ok((0..self.len())
            .map(|i| self.neighbors_with_weights(i).map(|(j, w)| w * values[j]).sum())
            .collect())
    }

    /// Restrict to the `keep` features and re-derive weights with the same transform.
    pub fn subset(&self, keep: &[usize]) -> Result<Self> {
        Ok(Self::new(self.graph.subgraph(keep)?, self.transform))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Path 0 - 1 - 2 - 3 plus island 4.
    fn path() -> AdjacencyGraph {
        AdjacencyGraph::from_neighbors(&[vec![1], vec![0, 2], vec![1, 3], vec![2], vec![]]).unwrap()
    }

    #[test]
    fn row_standardized_rows_sum_to_one() {
        let w = SpatialWeights::row_standardized(path());
        for i in 0..4 { assert!((w.row_sum(i) - 1.0).abs() < 1e-12) }
        assert_eq!(w.row_sum(4), 0.0);
        assert_eq!(w.weight(1, 0), 0.5);
        assert_eq!(w.weight(0, 3), 0.0);
        assert_eq!(w.islands(), &[4]);
    }

    #[test]
    fn binary_constants() {
        let w = SpatialWeights::binary(path());
        assert_eq!(w.s0(), 6.0);
        // symmetric binary: S1 = 2 * S0
        assert_eq!(w.s1(), 12.0);
        // degrees 1, 2, 2, 1, 0 -> (2d)^2
        assert_eq!(w.s2(), 4.0 + 16.0 + 16.0 + 4.0);
    }

    #[test]
    fn row_standardized_constants() {
        let w = SpatialWeights::row_standardized(path());
        assert!((w.s0() - 4.0).abs() < 1e-12);
        // pairs (0,1) and (3,2): (1 + 0.5)^2; pair (1,2): (0.5 + 0.5)^2
        let s1 = 0.5 * 2.0 * (2.25 + 2.25 + 1.0);
        assert!((w.s1() - s1).abs() < 1e-12);
        // column sums 0.5, 1.5, 1.5, 0.5
        let s2 = 1.5f64.powi(2) + 2.5f64.powi(2) + 2.5f64.powi(2) + 1.5f64.powi(2);
        assert!((w.s2() - s2).abs() < 1e-12);
    }

    #[test]
    fn asymmetric_s1_counts_both_orders() {
        let graph = AdjacencyGraph::from_neighbors(&[vec![1], vec![], vec![0]]).unwrap();
        let w = SpatialWeights::binary(graph);
        assert_eq!(w.s0(), 2.0);
        assert_eq!(w.s1(), 2.0);
    }

    #[test]
    fn lag_is_weighted_neighbor_mean() {
        let w = SpatialWeights::row_standardized(path());
        let lag = w.lag(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(lag, vec![2.0, 2.0, 3.0, 3.0, 0.0]);
        assert!(w.lag(&[1.0]).is_err());
    }

    #[test]
    fn subset_restandardizes() {
        let w = SpatialWeights::row_standardized(path()).subset(&[0, 1, 2]).unwrap();
        assert_eq!(w.len(), 3);
        assert_eq!(w.weight(2, 1), 1.0);
        assert_eq!(w.transform(), Transform::Row);
    }
}
