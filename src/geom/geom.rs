use geo::{BoundingRect, Centroid, Coord, MultiPolygon, Point, Polygon, Rect};
use rstar::{RTree, AABB};

use crate::error::{Error, Result};
use crate::geom::{BoundingBox, Crs};

/// A single feature geometry: a point or an areal unit.
///
/// Areal units are always stored as multipolygons, since one shapefile record
/// may carry several exterior rings (e.g. a county with offshore islands).
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point<f64>),
    Polygon(MultiPolygon<f64>),
}

impl Geometry {
    /// Check if the geometry is areal.
    #[inline] pub fn is_polygon(&self) -> bool { matches!(self, Self::Polygon(_)) }

    /// Get the multipolygon, if this is an areal geometry.
    #[inline]
    pub fn as_polygon(&self) -> Option<&MultiPolygon<f64>> {
        match self {
            Self::Polygon(polygon) => Some(polygon),
            Self::Point(_) => None,
        }
    }

    /// Representative point: the point itself, or the centroid of a polygon.
    /// Returns `None` for an empty polygon.
    pub fn centroid(&self) -> Option<Point<f64>> {
        match self {
            Self::Point(point) => Some(*point),
            Self::Polygon(polygon) => polygon.centroid(),
        }
    }

    /// Axis-aligned bounding rectangle (degenerate for points).
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        match self {
            Self::Point(point) => Some(Rect::new(point.0, point.0)),
            Self::Polygon(polygon) => polygon.bounding_rect(),
        }
    }
}

impl From<Point<f64>> for Geometry {
    fn from(point: Point<f64>) -> Self { Self::Point(point) }
}

impl From<Polygon<f64>> for Geometry {
    fn from(polygon: Polygon<f64>) -> Self { Self::Polygon(MultiPolygon(vec![polygon])) }
}

impl From<MultiPolygon<f64>> for Geometry {
    fn from(polygon: MultiPolygon<f64>) -> Self { Self::Polygon(polygon) }
}

/// An ordered, immutable collection of (geometry, value) pairs.
///
/// Feature order defines the index space shared by adjacency graphs, weights
/// and statistics. Operations that change geometry or attributes return a new
/// `FeatureSet`.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    geoms: Vec<Geometry>,
    values: Vec<f64>,
    labels: Option<Vec<String>>,
    crs: Option<Crs>,
    rtree: RTree<BoundingBox>,
}

impl FeatureSet {
    /// Construct a FeatureSet from parallel geometry and value vectors.
    pub fn new(geoms: Vec<Geometry>, values: Vec<f64>, crs: Option<Crs>) -> Result<Self> {
        if values.len() != geoms.len() {
            return Err(Error::LengthMismatch { what: "values", expected: geoms.len(), found: values.len() });
        }

        Ok(Self {
            rtree: RTree::bulk_load(
                geoms.iter().enumerate()
                    .filter_map(|(i, geom)| geom.bounding_rect().map(|rect| BoundingBox::new(i, rect)))
                    .collect()
            ),
            geoms,
            values,
            labels: None,
            crs,
        })
    }

    /// Attach a per-feature label (e.g. a FIPS code or listing id).
    pub fn with_labels(mut self, labels: Vec<String>) -> Result<Self> {
        if labels.len() != self.len() {
            return Err(Error::LengthMismatch { what: "labels", expected: self.len(), found: labels.len() });
        }
        self.labels = Some(labels);
        Ok(self)
    }

    /// Return a copy carrying a different attribute vector over the same geometries.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.len() {
            return Err(Error::LengthMismatch { what: "values", expected: self.len(), found: values.len() });
        }
        Ok(Self { values, ..self.clone() })
    }

    /// Declare the CRS of the coordinates without transforming them.
    pub fn with_crs(self, crs: Crs) -> Self {
        Self { crs: Some(crs), ..self }
    }

    /// Get the number of features.
    #[inline] pub fn len(&self) -> usize { self.geoms.len() }

    /// Check if there are no features.
    #[inline] pub fn is_empty(&self) -> bool { self.geoms.is_empty() }

    /// Get a reference to the geometries.
    #[inline] pub fn geometries(&self) -> &[Geometry] { &self.geoms }

    /// Get a reference to the attribute values.
    #[inline] pub fn values(&self) -> &[f64] { &self.values }

    /// Get the CRS, if known.
    #[inline] pub fn crs(&self) -> Option<Crs> { self.crs }

    /// Get the label of a feature, if labels were attached.
    #[inline]
    pub fn label(&self, idx: usize) -> Option<&str> {
        self.labels.as_ref().and_then(|labels| labels.get(idx)).map(String::as_str)
    }

    /// Check if every geometry is a polygon.
    pub fn all_polygons(&self) -> bool { self.geoms.iter().all(Geometry::is_polygon) }

    /// Query the R-tree for features whose bounding boxes intersect the envelope.
    #[inline]
    pub(crate) fn query(&self, envelope: &AABB<[f64; 2]>) -> impl Iterator<Item = &BoundingBox> {
        self.rtree.locate_in_envelope_intersecting(envelope)
    }

    /// Iterate the indexed bounding boxes (features with empty geometry are absent).
    pub(crate) fn boxes(&self) -> impl Iterator<Item = &BoundingBox> {
        self.rtree.iter()
    }

    /// Compute the bounding rectangle of all features.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.geoms.iter()
            .filter_map(Geometry::bounding_rect)
            .reduce(|a, b| Rect::new(
                Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            ))
    }

    /// Compute representative points of all features (NaN for empty polygons).
    pub fn centroids(&self) -> Vec<Point<f64>> {
        self.geoms.iter()
            .map(|geom| geom.centroid().unwrap_or(Point::new(f64::NAN, f64::NAN)))
            .collect()
    }

    /// Require a known, projected CRS before a distance-based operation.
    pub fn require_projected(&self, operation: &'static str) -> Result<Crs> {
        let crs = self.crs.ok_or(Error::MissingCrs { operation })?;
        if crs.is_geographic() {
            return Err(Error::GeographicCrs { epsg: crs.epsg(), operation });
        }
        Ok(crs)
    }

    /// Replace geometries, keeping values, labels and (optionally new) CRS.
    pub(crate) fn with_geometries(&self, geoms: Vec<Geometry>, crs: Option<Crs>) -> Result<Self> {
        let mut out = Self::new(geoms, self.values.clone(), crs)?;
        out.labels = self.labels.clone();
        Ok(out)
    }
}
