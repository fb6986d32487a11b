use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::geom::Crs;
use crate::graph::{Contiguity, Transform};
use crate::stats::IslandPolicy;

/// Settings for one autocorrelation run.
///
/// Every field has a default, so a config file only needs the keys it changes:
///
/// ```json
/// { "contiguity": { "rule": "distance_band", "threshold": 2500.0 }, "seed": 42 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub contiguity: Contiguity,
    pub transform: Transform,
    /// Random relabelings per test; 0 skips permutation inference.
    pub permutations: usize,
    /// Fixed seed for reproducible permutations.
    pub seed: Option<u64>,
    /// Significance level for LISA cluster labels.
    pub alpha: f64,
    pub island_policy: IslandPolicy,
    /// Link each island to its nearest feature before computing weights.
    pub bridge_islands: bool,
    /// Reproject features into this CRS before building adjacency.
    pub target_crs: Option<Crs>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            contiguity: Contiguity::default(),
            transform: Transform::default(),
            permutations: 999,
            seed: None,
            alpha: 0.05,
            island_policy: IslandPolicy::default(),
            bridge_islands: false,
            target_crs: None,
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .context("[config] Failed to parse analysis config")?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("[config] Failed to read config file: {}", path.display()))?;
        Self::from_json_str(&json)
            .with_context(|| format!("[config] Invalid config file: {}", path.display()))
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> std::result::Result<(), Error> {
        self.contiguity.validate()?;
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(Error::InvalidParameter {
                name: "alpha",
                value: self.alpha.to_string(),
                reason: "must lie strictly between 0 and 1".to_string(),
            });
        }
        Ok(())
    }
}
