use geo::{Coord, MapCoords, MultiPolygon, Relate};
use rstar::{primitives::GeomWithData, RTree};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::geom::FeatureSet;
use crate::graph::AdjacencyGraph;

/// Rule deciding which features count as neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Contiguity {
    /// Polygons sharing at least one boundary point.
    Queen {
        /// Grid size vertices are snapped to before comparison (0 = exact).
        #[serde(default)]
        tolerance: f64,
    },
    /// Polygons sharing at least one boundary segment.
    Rook {
        #[serde(default)]
        tolerance: f64,
    },
    /// Features whose representative points lie within `threshold` CRS units.
    DistanceBand { threshold: f64 },
    /// Each feature's `k` nearest representative points.
    KNearest { k: usize },
}

impl Default for Contiguity {
    fn default() -> Self { Self::Queen { tolerance: 0.0 } }
}

impl Contiguity {
    /// Get a short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Queen { .. } => "queen",
            Self::Rook { .. } => "rook",
            Self::DistanceBand { .. } => "distance band",
            Self::KNearest { .. } => "k-nearest",
        }
    }

    /// Check rule parameters.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Queen { tolerance } | Self::Rook { tolerance } if !(tolerance >= 0.0 && tolerance.is_finite()) =>
                Err(Error::InvalidParameter {
                    name: "tolerance",
                    value: tolerance.to_string(),
                    reason: "must be finite and >= 0".to_string(),
                }),
            Self::DistanceBand { threshold } if !(threshold > 0.0 && threshold.is_finite()) =>
                Err(Error::InvalidParameter {
                    name: "threshold",
                    value: threshold.to_string(),
                    reason: "must be finite and > 0".to_string(),
                }),
            Self::KNearest { k: 0 } =>
                Err(Error::InvalidParameter { name: "k", value: "0".to_string(), reason: "must be >= 1".to_string() }),
            _ => Ok(()),
        }
    }

    /// Build the adjacency graph of `features` under this rule.
    ///
    /// Islands are permitted and recorded on the returned graph.
    pub fn build(&self, features: &FeatureSet) -> Result<AdjacencyGraph> {
        self.validate()?;
        if features.is_empty() {
            return Err(Error::EmptyFeatureSet);
        }

        let neighbors = match *self {
            Self::Queen { tolerance } => touching(features, tolerance, BoundaryContact::Point)?,
            Self::Rook { tolerance } => touching(features, tolerance, BoundaryContact::Segment)?,
            Self::DistanceBand { threshold } => distance_band(features, threshold)?,
            Self::KNearest { k } => k_nearest(features, k)?,
        };

        let graph = AdjacencyGraph::from_neighbors(&neighbors)?;
        debug!(rule = self.name(), features = graph.node_count(), links = graph.edge_count(), "built adjacency");
        if graph.has_islands() {
            warn!(
                rule = self.name(),
                count = graph.islands().len(),
                islands = ?graph.islands(),
                "features without neighbors",
            );
        }
        Ok(graph)
    }
}

/// How much shared boundary two polygons need to be neighbors.
#[derive(Clone, Copy)]
enum BoundaryContact { Point, Segment }

impl BoundaryContact {
    /// DE-9IM mask on the boundary/boundary cell.
    fn mask(self) -> &'static str {
        match self {
            Self::Point => "****T****",
            Self::Segment => "****1****",
        }
    }

    fn rule(self) -> &'static str {
        match self {
            Self::Point => "queen",
            Self::Segment => "rook",
        }
    }
}

/// Snap vertices to a grid of size `tolerance` so near-coincident borders match.
fn snap(polygon: &MultiPolygon<f64>, tolerance: f64) -> MultiPolygon<f64> {
    if tolerance == 0.0 { return polygon.clone() }
    polygon.map_coords(|c| Coord {
        x: (c.x / tolerance).round() * tolerance,
        y: (c.y / tolerance).round() * tolerance,
    })
}

/// Polygon contiguity: R-tree candidates, then a DE-9IM boundary test.
fn touching(features: &FeatureSet, tolerance: f64, contact: BoundaryContact) -> Result<Vec<SmallVec<[u32; 8]>>> {
    let polygons = features.geometries().iter().enumerate()
        .map(|(i, geom)| geom.as_polygon()
            .map(|polygon| snap(polygon, tolerance))
            .ok_or(Error::NotAPolygon { index: i, rule: contact.rule() }))
        .collect::<Result<Vec<_>>>()?;

    if features.crs().is_none() {
        warn!("building {} contiguity on features without a CRS", contact.rule());
    }

    let mut neighbors = vec![SmallVec::<[u32; 8]>::new(); features.len()];
    for bbox in features.boxes() {
        let i = bbox.idx();
        for candidate in features.query(&bbox.padded(tolerance)) {
            let j = candidate.idx();
            if j <= i { continue } // check each unordered pair once

            let matrix = polygons[i].relate(&polygons[j]);
            if matrix.matches(contact.mask()).unwrap_or(false) {
                neighbors[i].push(j as u32);
                neighbors[j].push(i as u32);
            }
        }
    }

    Ok(neighbors)
}

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// Index representative points; features without one (empty polygons) are skipped.
fn point_index(features: &FeatureSet) -> (Vec<Option<[f64; 2]>>, RTree<IndexedPoint>) {
    let points = features.centroids().into_iter()
        .map(|p| (p.x().is_finite() && p.y().is_finite()).then_some([p.x(), p.y()]))
        .collect::<Vec<_>>();

    let tree = RTree::bulk_load(
        points.iter().enumerate()
            .filter_map(|(i, p)| p.map(|p| IndexedPoint::new(p, i)))
            .collect()
    );

    (points, tree)
}

fn distance_band(features: &FeatureSet, threshold: f64) -> Result<Vec<SmallVec<[u32; 8]>>> {
    features.require_projected("building a distance band")?;
    let (points, tree) = point_index(features);

    Ok(points.iter().enumerate()
        .map(|(i, point)| match point {
            Some(p) => tree.locate_within_distance(*p, threshold * threshold)
                .map(|hit| hit.data)
                .filter(|&j| j != i)
                .map(|j| j as u32)
                .collect(),
            None => SmallVec::new(),
        })
        .collect())
}

fn k_nearest(features: &FeatureSet, k: usize) -> Result<Vec<SmallVec<[u32; 8]>>> {
    features.require_projected("building k-nearest neighbors")?;
    let (points, tree) = point_index(features);

    if k >= tree.size() {
        return Err(Error::InvalidParameter {
            name: "k",
            value: k.to_string(),
            reason: format!("must be less than the number of located features ({})", tree.size()),
        });
    }

    Ok(points.iter().enumerate()
        .map(|(i, point)| match point {
            Some(p) => tree.nearest_neighbor_iter(p)
                .map(|hit| hit.data)
                .filter(|&j| j != i)
                .take(k)
                .map(|j| j as u32)
                .collect(),
            None => SmallVec::new(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Crs, Geometry};
    use geo::{point, polygon};

    fn square(x: f64, y: f64) -> Geometry {
        polygon![(x: x, y: y), (x: x + 1.0, y: y), (x: x + 1.0, y: y + 1.0), (x: x, y: y + 1.0), (x: x, y: y)].into()
    }

    /// 3x3 lattice of unit squares, row-major from the bottom left.
    fn lattice() -> FeatureSet {
        let geoms = (0..9).map(|i| square((i % 3) as f64, (i / 3) as f64)).collect();
        FeatureSet::new(geoms, vec![0.0; 9], Some(Crs::WEB_MERCATOR)).unwrap()
    }

    #[test]
    fn rook_lattice_degrees() {
        let graph = Contiguity::Rook { tolerance: 0.0 }.build(&lattice()).unwrap();
        let degrees = (0..9).map(|i| graph.degree(i)).collect::<Vec<_>>();
        assert_eq!(degrees, vec![2, 3, 2, 3, 4, 3, 2, 3, 2]);
        assert_eq!(graph.neighbor_slice(4), &[1, 3, 5, 7]);
        assert!(graph.is_symmetric());
    }

    #[test]
    fn queen_lattice_degrees() {
        let graph = Contiguity::Queen { tolerance: 0.0 }.build(&lattice()).unwrap();
        let degrees = (0..9).map(|i| graph.degree(i)).collect::<Vec<_>>();
        assert_eq!(degrees, vec![3, 5, 3, 5, 8, 5, 3, 5, 3]);
    }

    #[test]
    fn queen_is_superset_of_rook() {
        let queen = Contiguity::default().build(&lattice()).unwrap();
        let rook = Contiguity::Rook { tolerance: 0.0 }.build(&lattice()).unwrap();
        for i in 0..9 {
            assert!(rook.neighbors(i).all(|j| queen.contains(i, j)));
        }
    }

    #[test]
    fn detached_polygon_is_an_island() {
        let fs = FeatureSet::new(
            vec![square(0.0, 0.0), square(1.0, 0.0), square(5.0, 5.0)],
            vec![1.0, 2.0, 3.0],
            None,
        ).unwrap();
        let graph = Contiguity::default().build(&fs).unwrap();
        assert_eq!(graph.islands(), &[2]);
    }

    #[test]
    fn tolerance_closes_slivers() {
        let fs = FeatureSet::new(
            vec![square(0.0, 0.0), square(1.0 + 1e-9, 0.0)],
            vec![1.0, 2.0],
            None,
        ).unwrap();
        assert!(Contiguity::Rook { tolerance: 0.0 }.build(&fs).unwrap().has_islands());
        assert!(!Contiguity::Rook { tolerance: 1e-6 }.build(&fs).unwrap().has_islands());
    }

    #[test]
    fn contiguity_rejects_points() {
        let fs = FeatureSet::new(vec![square(0.0, 0.0), point!(x: 1.0, y: 1.0).into()], vec![1.0, 2.0], None).unwrap();
        let err = Contiguity::default().build(&fs).unwrap_err();
        assert_eq!(err, Error::NotAPolygon { index: 1, rule: "queen" });
    }

    fn row_of_points(crs: Option<Crs>) -> FeatureSet {
        let geoms = [0.0, 1.0, 2.0, 10.0].iter().map(|&x| point!(x: x, y: 0.0).into()).collect();
        FeatureSet::new(geoms, vec![1.0, 2.0, 3.0, 4.0], crs).unwrap()
    }

    #[test]
    fn distance_band_links_close_points() {
        let graph = Contiguity::DistanceBand { threshold: 1.5 }.build(&row_of_points(Some(Crs::WEB_MERCATOR))).unwrap();
        assert_eq!(graph.to_neighbors(), vec![vec![1], vec![0, 2], vec![1], vec![]]);
        assert_eq!(graph.islands(), &[3]);
    }

    #[test]
    fn distance_rules_need_projected_crs() {
        let rule = Contiguity::DistanceBand { threshold: 1.5 };
        assert!(matches!(rule.build(&row_of_points(None)), Err(Error::MissingCrs { .. })));
        assert!(matches!(rule.build(&row_of_points(Some(Crs::WGS84))), Err(Error::GeographicCrs { epsg: 4326, .. })));
    }

    #[test]
    fn k_nearest_rows_have_k_entries() {
        let graph = Contiguity::KNearest { k: 2 }.build(&row_of_points(Some(Crs::WEB_MERCATOR))).unwrap();
        assert!((0..4).all(|i| graph.degree(i) == 2));
        assert_eq!(graph.neighbor_slice(3), &[1, 2]);
        assert!(!graph.is_symmetric());
        assert!(!graph.has_islands());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let fs = row_of_points(Some(Crs::WEB_MERCATOR));
        assert!(Contiguity::KNearest { k: 0 }.build(&fs).is_err());
        assert!(Contiguity::KNearest { k: 4 }.build(&fs).is_err());
        assert!(Contiguity::DistanceBand { threshold: -1.0 }.build(&fs).is_err());
        assert!(Contiguity::Queen { tolerance: f64::NAN }.validate().is_err());
    }

    #[test]
    fn serde_tagged_rules() {
        let rule: Contiguity = serde_json::from_str(r#"{"rule": "distance_band", "threshold": 500.0}"#).unwrap();
        assert_eq!(rule, Contiguity::DistanceBand { threshold: 500.0 });
        let rule: Contiguity = serde_json::from_str(r#"{"rule": "rook"}"#).unwrap();
        assert_eq!(rule, Contiguity::Rook { tolerance: 0.0 });
        let rule: Contiguity = serde_json::from_str(r#"{"rule": "k_nearest", "k": 4}"#).unwrap();
        assert_eq!(rule, Contiguity::KNearest { k: 4 });
    }
}
