use std::path::Path;

use anyhow::{bail, Context, Result};
use geo::{Coord, MultiPolygon, Point};
use shapefile::{dbase::{FieldValue, Record}, Reader, Shape};
use tracing::info;

use crate::geom::{FeatureSet, Geometry};
use crate::io::shp::{polygon::rings_to_geo, prj::crs_from_prj};

/// Get a numeric attribute from a dBase record.
///
/// Character fields are parsed, since many exports store numbers as text.
fn get_numeric_field(record: &Record, field: &str) -> Result<f64> {
    match record.get(field) {
        Some(FieldValue::Numeric(Some(n))) => Ok(*n),
        Some(FieldValue::Float(Some(f))) => Ok(*f as f64),
        Some(FieldValue::Integer(i)) => Ok(*i as f64),
        Some(FieldValue::Double(d)) | Some(FieldValue::Currency(d)) => Ok(*d),
        Some(FieldValue::Character(Some(s))) => s.trim().parse()
            .with_context(|| format!("field {field} value {s:?} is not a number")),
        Some(FieldValue::Numeric(None) | FieldValue::Float(None) | FieldValue::Character(None)) =>
            bail!("field {field} is null"),
        Some(other) => bail!("field {field} is not numeric: {other:?}"),
        None => bail!("missing field: {field}"),
    }
}

/// Get an attribute as text, for labels.
fn get_label_field(record: &Record, field: &str) -> Result<String> {
    match record.get(field) {
        Some(FieldValue::Character(Some(s))) => Ok(s.trim().to_string()),
        Some(FieldValue::Character(None)) => Ok(String::new()),
        Some(FieldValue::Integer(i)) => Ok(i.to_string()),
        Some(FieldValue::Numeric(Some(n))) => Ok(n.to_string()),
        Some(other) => bail!("field {field} cannot be used as a label: {other:?}"),
        None => bail!("missing field: {field}"),
    }
}

/// Convert a shapefile record geometry into a [`Geometry`].
fn shape_to_geometry(shape: Shape) -> Result<Geometry> {
    let xy = |x: f64, y: f64| Coord { x, y };
    Ok(match shape {
        Shape::Point(p) => Point::new(p.x, p.y).into(),
        Shape::PointM(p) => Point::new(p.x, p.y).into(),
        Shape::PointZ(p) => Point::new(p.x, p.y).into(),
        Shape::Polygon(p) => rings_to_geo(p.rings(), |p| xy(p.x, p.y)).into(),
        Shape::PolygonM(p) => rings_to_geo(p.rings(), |p| xy(p.x, p.y)).into(),
        Shape::PolygonZ(p) => rings_to_geo(p.rings(), |p| xy(p.x, p.y)).into(),
        // An empty record keeps its index and ends up without neighbors.
        Shape::NullShape => MultiPolygon::<f64>(vec![]).into(),
        other => bail!("unsupported shape type: {:?}", other.shapetype()),
    })
}

/// Read a shapefile into a [`FeatureSet`], taking `value_field` from the
/// attribute table and the CRS from the `.prj` sidecar when present.
///
/// Without a value field every value is 0, which is enough for adjacency work.
pub fn read_shapefile(path: &Path, value_field: Option<&str>, label_field: Option<&str>) -> Result<FeatureSet> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("[io::shp::read] Failed to open shapefile: {}", path.display()))?;

    let mut geoms = Vec::new();
    let mut values = Vec::new();
    let mut labels = Vec::new();
    for (i, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result
            .with_context(|| format!("[io::shp::read] Error reading record {i} of {}", path.display()))?;

        geoms.push(shape_to_geometry(shape)
            .with_context(|| format!("[io::shp::read] Record {i} of {}", path.display()))?);
        values.push(match value_field {
            Some(field) => get_numeric_field(&record, field)
                .with_context(|| format!("[io::shp::read] Record {i} of {}", path.display()))?,
            None => 0.0,
        });
        if let Some(field) = label_field {
            labels.push(get_label_field(&record, field)
                .with_context(|| format!("[io::shp::read] Record {i} of {}", path.display()))?);
        }
    }

    let crs = crs_from_prj(path);
    info!(path = %path.display(), features = geoms.len(), field = ?value_field, crs = ?crs.map(|c| c.epsg()), "read shapefile");

    let features = FeatureSet::new(geoms, values, crs)?;
    Ok(match label_field {
        Some(_) => features.with_labels(labels)?,
        None => features,
    })
}
