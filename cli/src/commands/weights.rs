use anyhow::Result;
use geomoran::{write_json, SpatialAutocorrelationEngine};
use tracing::info;

use crate::commands::{load_config, load_features};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::WeightsArgs) -> Result<()> {
    let engine = SpatialAutocorrelationEngine::new(load_config(&args.input)?)?;
    let features = engine.prepare(&load_features(&args.input)?)?;

    info!("[weights] building {} adjacency for {} features", engine.config().contiguity.name(), features.len());
    let graph = engine.build_adjacency(&features)?;
    let summary = graph.summary();

    println!("features:          {}", summary.features);
    println!("links:             {}", summary.links);
    println!("symmetric:         {}", summary.symmetric);
    println!("neighbors:         min {} / mean {:.2} / max {}", summary.min_neighbors, summary.mean_neighbors, summary.max_neighbors);
    println!("islands:           {} {:?}", summary.islands.len(), summary.islands);
    println!("components:        {} (largest {})", summary.components, summary.largest_component);

    if let Some(path) = &args.output {
        write_json(path, &graph.to_neighbors())?;
        info!("[weights] wrote neighbor lists to {}", path.display());
    }

    Ok(())
}
