use std::{fs::File, path::Path};

use anyhow::{bail, Context, Result};
use geo::Point;
use polars::{frame::DataFrame, io::SerReader, prelude::{CsvReader, DataType}};
use tracing::info;

use crate::geom::{Crs, FeatureSet, Geometry};

/// Column names of a point table.
#[derive(Debug, Clone)]
pub struct PointColumns<'a> {
    pub x: &'a str,
    pub y: &'a str,
    /// Attribute column; all values are 0 when absent.
    pub value: Option<&'a str>,
    pub label: Option<&'a str>,
}

impl Default for PointColumns<'_> {
    fn default() -> Self {
        Self { x: "longitude", y: "latitude", value: None, label: None }
    }
}

/// Reads a CSV file from `path` into a Polars DataFrame.
fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[io::csv::read] Failed to open CSV file: {}", path.display()))?;
    CsvReader::new(file)
        .finish()
        .with_context(|| format!("[io::csv::read] Failed to read CSV from {:?}", path))
}

/// Extract a column as `f64`, rejecting nulls.
fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df.column(name)
        .with_context(|| format!("[io::csv::read] Missing column: {name}"))?
        .cast(&DataType::Float64)
        .with_context(|| format!("[io::csv::read] Column {name} is not numeric"))?;

    column.f64()?.into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(value) => Ok(value),
            None => bail!("[io::csv::read] Column {name} is empty at row {row}"),
        })
        .collect()
}

/// Read a table of points (e.g. listings) into a [`FeatureSet`].
///
/// Coordinates are interpreted in `crs`; CSV carries no CRS metadata, so the
/// caller must state it.
pub fn read_points_csv(path: &Path, columns: &PointColumns, crs: Option<Crs>) -> Result<FeatureSet> {
    let df = read_csv(path)?;

    let xs = float_column(&df, columns.x)?;
    let ys = float_column(&df, columns.y)?;
    let values = match columns.value {
        Some(value) => float_column(&df, value)?,
        None => vec![0.0; xs.len()],
    };

    let geoms = xs.into_iter().zip(ys)
        .map(|(x, y)| Geometry::Point(Point::new(x, y)))
        .collect::<Vec<_>>();

    info!(path = %path.display(), features = geoms.len(), field = ?columns.value, "read point table");
    let features = FeatureSet::new(geoms, values, crs)?;

    let Some(label) = columns.label else { return Ok(features) };
    let labels = df.column(label)
        .with_context(|| format!("[io::csv::read] Missing column: {label}"))?
        .cast(&DataType::String)?;
    let labels = labels.str()?.into_iter()
        .map(|s| s.unwrap_or_default().to_string())
        .collect();
    Ok(features.with_labels(labels)?)
}
