use std::{fs::File, path::Path};

use anyhow::{ensure, Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::{Column, CsvWriter}};

use crate::engine::Analysis;
use crate::geom::FeatureSet;
use crate::stats::LocalStatistic;

/// Write a DataFrame to a CSV file.
fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[io::csv::write] Failed to create CSV file: {}", path.display()))?;
    CsvWriter::new(file)
        .finish(df)
        .with_context(|| format!("[io::csv::write] Failed to write CSV to {:?}", path))
}

/// Build the per-feature result table: one row per feature, in feature order.
fn local_frame(features: &FeatureSet, analysis: &Analysis) -> Result<DataFrame> {
    let local = &analysis.local;
    ensure!(
        local.len() == features.len(),
        "[io::csv::write] {} local results for {} features", local.len(), features.len(),
    );

    let field = |f: fn(&LocalStatistic) -> Option<f64>| local.stats.iter().map(f).collect::<Vec<_>>();

    let mut columns = vec![Column::new("feature".into(), (0..features.len() as u32).collect::<Vec<_>>())];
    if features.label(0).is_some() {
        columns.push(Column::new(
            "label".into(),
            (0..features.len()).map(|i| features.label(i).unwrap_or_default().to_string()).collect::<Vec<_>>(),
        ));
    }
    columns.extend([
        Column::new("value".into(), features.values().to_vec()),
        Column::new("lag".into(), analysis.lag.clone()),
        Column::new("local_i".into(), field(LocalStatistic::value)),
        Column::new("z".into(), field(|s| match s {
            LocalStatistic::Defined { z, .. } => Some(*z),
            LocalStatistic::Undefined => None,
        })),
        Column::new("p_sim".into(), field(LocalStatistic::p_sim)),
        Column::new(
            "quadrant".into(),
            local.stats.iter().map(|s| s.quadrant().map(|q| q.label())).collect::<Vec<_>>(),
        ),
        Column::new(
            "cluster".into(),
            local.clusters(analysis.alpha).iter().map(|c| c.label()).collect::<Vec<_>>(),
        ),
    ]);

    Ok(DataFrame::new(columns)?)
}

/// Write local Moran's I results, one row per feature, to a CSV file.
///
/// Islands keep their row, with empty statistic columns and cluster `undefined`.
pub fn write_local_csv(path: &Path, features: &FeatureSet, analysis: &Analysis) -> Result<()> {
    let mut df = local_frame(features, analysis)?;
    write_csv(&mut df, path)
}
