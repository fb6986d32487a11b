pub mod moran;
pub mod weights;

use anyhow::{bail, Context, Result};
use geomoran::{read_points_csv, read_shapefile, AnalysisConfig, Contiguity, Crs, FeatureSet, IslandPolicy, PointColumns};
use tracing::info;

use crate::cli::{InputArgs, Islands, Rule};

/// Load features from a shapefile or CSV point table, applying `--epsg` and `--to-epsg utm`.
pub(crate) fn load_features(args: &InputArgs) -> Result<FeatureSet> {
    let extension = args.input.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let declared = args.epsg.as_deref()
        .map(str::parse::<Crs>)
        .transpose()
        .context("[commands] Invalid --epsg")?;

    let features = match extension.as_deref() {
        Some("shp") => {
            let features = read_shapefile(&args.input, args.field.as_deref(), args.label.as_deref())?;
            match declared {
                Some(crs) => features.with_crs(crs),
                None => features,
            }
        }
        Some("csv") => {
            let columns = PointColumns {
                x: &args.x,
                y: &args.y,
                value: args.field.as_deref(),
                label: args.label.as_deref(),
            };
            read_points_csv(&args.input, &columns, declared)?
        }
        _ => bail!("[commands] Unsupported input {}: expected .shp or .csv", args.input.display()),
    };

    if args.to_epsg.as_deref().is_some_and(|to| to.eq_ignore_ascii_case("utm")) {
        let projected = features.reproject_to_utm()?;
        info!(crs = ?projected.crs().map(|crs| crs.epsg()), "reprojected to local UTM zone");
        return Ok(projected);
    }
    Ok(features)
}

/// Start from `--config` (or defaults) and apply neighbor and island flags on top.
pub(crate) fn load_config(args: &InputArgs) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };

    if let Some(rule) = args.rule {
        config.contiguity = match rule {
            Rule::Queen => Contiguity::Queen { tolerance: 0.0 },
            Rule::Rook => Contiguity::Rook { tolerance: 0.0 },
            Rule::Distance => Contiguity::DistanceBand {
                threshold: args.threshold.context("[commands] --rule distance requires --threshold")?,
            },
            Rule::Knn => Contiguity::KNearest {
                k: args.k.context("[commands] --rule knn requires -k")?,
            },
        };
    }
    config.contiguity = apply_rule_flags(config.contiguity, args)?;

    match args.islands {
        Some(Islands::Exclude) => config.island_policy = IslandPolicy::Exclude,
        Some(Islands::Fail) => config.island_policy = IslandPolicy::Fail,
        Some(Islands::Bridge) => config.bridge_islands = true,
        None => {}
    }

    if let Some(to) = args.to_epsg.as_deref().filter(|to| !to.eq_ignore_ascii_case("utm")) {
        config.target_crs = Some(to.parse().context("[commands] Invalid --to-epsg")?);
    }

    Ok(config)
}

/// Apply `--tolerance`, `--threshold` and `-k` to the active rule, rejecting
/// the ones it has no use for.
fn apply_rule_flags(contiguity: Contiguity, args: &InputArgs) -> Result<Contiguity> {
    let (tolerance, threshold, k) = (args.tolerance, args.threshold, args.k);
    let unused = match contiguity {
        Contiguity::Queen { .. } | Contiguity::Rook { .. } => threshold.map(|_| "--threshold").or(k.map(|_| "-k")),
        Contiguity::DistanceBand { .. } => tolerance.map(|_| "--tolerance").or(k.map(|_| "-k")),
        Contiguity::KNearest { .. } => tolerance.map(|_| "--tolerance").or(threshold.map(|_| "--threshold")),
    };
    if let Some(flag) = unused {
        bail!("[commands] {flag} does not apply to the {} rule", contiguity.name());
    }

    Ok(match contiguity {
        Contiguity::Queen { tolerance: current } => Contiguity::Queen { tolerance: tolerance.unwrap_or(current) },
        Contiguity::Rook { tolerance: current } => Contiguity::Rook { tolerance: tolerance.unwrap_or(current) },
        Contiguity::DistanceBand { threshold: current } => Contiguity::DistanceBand { threshold: threshold.unwrap_or(current) },
        Contiguity::KNearest { k: current } => Contiguity::KNearest { k: k.unwrap_or(current) },
    })
}
