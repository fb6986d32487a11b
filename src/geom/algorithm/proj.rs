use geo::{Coord, MapCoords};
use proj4rs::{proj::Proj as Proj4, transform::transform};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geom::{Crs, FeatureSet, Geometry};

/// A source/target pair of PROJ.4 definitions.
struct Transformer {
    from: Crs,
    to: Crs,
    src: Proj4,
    dst: Proj4,
}

impl Transformer {
    fn new(from: Crs, to: Crs) -> Result<Self> {
        let build = |crs: Crs| {
            Proj4::from_proj_string(&crs.proj4()).map_err(|e| Error::Reprojection {
                from: from.epsg(),
                to: to.epsg(),
                reason: format!("failed to build PROJ.4 for {crs}: {e}"),
            })
        };
        Ok(Self { from, to, src: build(from)?, dst: build(to)? })
    }

    /// Transform one coordinate; geographic systems take and return degrees.
    fn coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = if self.from.is_geographic() {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };

        transform(&self.src, &self.dst, &mut point).map_err(|e| Error::Reprojection {
            from: self.from.epsg(),
            to: self.to.epsg(),
            reason: format!("({}, {}): {e}", coord.x, coord.y),
        })?;

        let out = if self.to.is_geographic() {
            Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
        } else {
            Coord { x: point.0, y: point.1 }
        };

        if !(out.x.is_finite() && out.y.is_finite()) {
            return Err(Error::Reprojection {
                from: self.from.epsg(),
                to: self.to.epsg(),
                reason: format!("({}, {}) has no finite image", coord.x, coord.y),
            });
        }
        Ok(out)
    }

    fn geometry(&self, geom: &Geometry) -> Result<Geometry> {
        Ok(match geom {
            Geometry::Point(point) => Geometry::Point(point.try_map_coords(|c| self.coord(c))?),
            Geometry::Polygon(polygon) => Geometry::Polygon(polygon.try_map_coords(|c| self.coord(c))?),
        })
    }
}

impl FeatureSet {
    /// Reproject every geometry into `to`, returning a new FeatureSet.
    /// Fails if this set has no CRS to reproject from.
    pub fn reproject(&self, to: Crs) -> Result<FeatureSet> {
        let from = self.crs().ok_or(Error::MissingCrs { operation: "reprojecting" })?;
        if from == to {
            return Ok(self.clone());
        }

        debug!(%from, %to, features = self.len(), "reprojecting feature set");
        let transformer = Transformer::new(from, to)?;
        let geoms = self.geometries().iter()
            .map(|geom| transformer.geometry(geom))
            .collect::<Result<Vec<_>>>()?;

        self.with_geometries(geoms, Some(to))
    }

    /// Reproject into the local WGS84 UTM zone of the data's center.
    pub fn reproject_to_utm(&self) -> Result<FeatureSet> {
        let from = self.crs().ok_or(Error::MissingCrs { operation: "choosing a UTM zone" })?;
        let center = self.bounds()
            .map(|b| b.center())
            .unwrap_or(Coord { x: 0.0, y: 0.0 });

        // Zone selection needs lon/lat; take the center through WGS84 first.
        let center = if from.is_geographic() { center }
            else { Transformer::new(from, Crs::WGS84)?.coord(center)? };

        self.reproject(Crs::utm_for(center.x, center.y))
    }

    /// Bring `other` into this set's CRS so the two can be compared or overlaid.
    ///
    /// Both sets must declare a CRS; an absent CRS is never assumed.
    pub fn reconcile(&self, other: &FeatureSet) -> Result<FeatureSet> {
        let ours = self.crs().ok_or(Error::MissingCrs { operation: "reconciling datasets" })?;
        let theirs = other.crs().ok_or(Error::MissingCrs { operation: "reconciling datasets" })?;
        if ours != theirs {
            info!(from = %theirs, to = %ours, "CRS mismatch between datasets, reprojecting");
        }
        other.reproject(ours)
    }

    /// Check that `other` shares this set's CRS without transforming anything.
    pub fn ensure_same_crs(&self, other: &FeatureSet) -> Result<Crs> {
        match (self.crs(), other.crs()) {
            (Some(a), Some(b)) if a == b => Ok(a),
            (Some(a), Some(b)) => Err(Error::CrsMismatch { left: a.epsg(), right: b.epsg() }),
            _ => Err(Error::MissingCrs { operation: "comparing datasets" }),
        }
    }
}
