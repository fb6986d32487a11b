use std::fs;

use anyhow::{Context, Result};
use geomoran::{write_json, write_local_csv, SpatialAutocorrelationEngine, Transform};
use tracing::info;

use crate::commands::{load_config, load_features};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::MoranArgs) -> Result<()> {
    anyhow::ensure!(args.input.field.is_some(), "[moran] --field is required");

    let mut config = load_config(&args.input)?;
    if let Some(permutations) = args.permutations { config.permutations = permutations }
    if let Some(seed) = args.seed { config.seed = Some(seed) }
    if let Some(alpha) = args.alpha { config.alpha = alpha }
    if args.binary { config.transform = Transform::Binary }

    let engine = SpatialAutocorrelationEngine::new(config)?;
    let features = load_features(&args.input)?;

    info!("[moran] analyzing {} features with {} permutations", features.len(), engine.config().permutations);
    let analysis = engine.analyze(&features)?;
    let global = &analysis.global;

    println!("Moran's I:         {:.6}", global.i);
    println!("E[I]:              {:.6}", global.expected);
    if let (Some(z), Some(p)) = (global.z_normal, global.p_normal) {
        println!("z (normal):        {z:.4}  p = {p:.4}");
    }
    if let (Some(z), Some(p)) = (global.z_sim, global.p_sim) {
        println!("z (permutation):   {z:.4}  p = {p:.4}");
    }
    if !global.excluded.is_empty() {
        println!("excluded islands:  {:?}", global.excluded);
    }
    let c = &analysis.clusters;
    println!(
        "clusters (p <= {}): HH {}  LL {}  HL {}  LH {}  ns {}  undefined {}",
        analysis.alpha, c.high_high, c.low_low, c.high_low, c.low_high, c.not_significant, c.undefined,
    );

    let out_dir = args.output.clone().unwrap_or(".".into());
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("[moran] Failed to create output directory {}", out_dir.display()))?;

    write_json(&out_dir.join("summary.json"), &analysis)?;
    write_local_csv(&out_dir.join("local.csv"), &features, &analysis)?;
    info!("[moran] wrote summary.json and local.csv to {}", out_dir.display());

    Ok(())
}
