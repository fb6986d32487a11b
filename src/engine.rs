use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::geom::{Crs, FeatureSet};
use crate::graph::{bridge_islands, AdjacencyGraph, GraphSummary, SpatialWeights, Transform};
use crate::stats::{ClusterCounts, GlobalMoran, IslandPolicy, LocalMoran, Prepared};

/// Builds spatial adjacency over a [`FeatureSet`] and tests its attribute for
/// spatial autocorrelation (global Moran's I and LISA).
#[derive(Debug, Clone, Default)]
pub struct SpatialAutocorrelationEngine {
    config: AnalysisConfig,
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    /// CRS the adjacency was built in.
    pub crs: Option<Crs>,
    pub adjacency: GraphSummary,
    /// Links added to connect islands, if bridging was enabled.
    pub bridged: Vec<(usize, usize)>,
    pub global: GlobalMoran,
    pub alpha: f64,
    pub clusters: ClusterCounts,
    #[serde(skip)]
    pub local: LocalMoran,
    /// Spatial lag of the raw attribute under the weights the statistics
    /// used (`None` for excluded features).
    #[serde(skip)]
    pub lag: Vec<Option<f64>>,
}

impl SpatialAutocorrelationEngine {
    /// Create an engine after validating the config.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the active configuration.
    #[inline] pub fn config(&self) -> &AnalysisConfig { &self.config }

    /// Reproject into the configured target CRS, if any.
    pub fn prepare(&self, features: &FeatureSet) -> Result<FeatureSet> {
        match self.config.target_crs {
            Some(crs) => features.reproject(crs),
            None => Ok(features.clone()),
        }
    }

    /// Build the adjacency graph under the configured rule.
    ///
    /// Islands are kept as empty rows unless island bridging is enabled.
    pub fn build_adjacency(&self, features: &FeatureSet) -> Result<AdjacencyGraph> {
        Ok(self.build_bridged(features)?.0)
    }

    fn build_bridged(&self, features: &FeatureSet) -> Result<(AdjacencyGraph, Vec<(usize, usize)>)> {
        let graph = self.config.contiguity.build(features)?;
        if self.config.bridge_islands && graph.has_islands() {
            return bridge_islands(features, &graph);
        }
        Ok((graph, Vec::new()))
    }

    /// Weights with each non-island row summing to 1; islands stay empty.
    pub fn row_standardize(&self, graph: AdjacencyGraph) -> SpatialWeights {
        SpatialWeights::new(graph, Transform::Row)
    }

    /// Adjacency plus the configured weight transform.
    pub fn weights(&self, features: &FeatureSet) -> Result<SpatialWeights> {
        Ok(SpatialWeights::new(self.build_adjacency(features)?, self.config.transform))
    }

    /// Global Moran's I of `values` under `weights`.
    pub fn global(&self, values: &[f64], weights: &SpatialWeights) -> Result<GlobalMoran> {
        GlobalMoran::compute(values, weights, self.config.island_policy, self.config.permutations, &mut self.rng())
    }

    /// Local Moran's I of `values` under `weights`.
    pub fn local(&self, values: &[f64], weights: &SpatialWeights) -> Result<LocalMoran> {
        LocalMoran::compute(values, weights, self.config.island_policy, self.config.permutations, &mut self.rng())
    }

    /// Weighted neighbor sum of `values` for every feature.
    pub fn spatial_lag(&self, values: &[f64], weights: &SpatialWeights) -> Result<Vec<f64>> {
        weights.lag(values)
    }

    /// Full run: reproject, build weights, then global and local statistics.
    pub fn analyze(&self, features: &FeatureSet) -> Result<Analysis> {
        let features = self.prepare(features)?;
        let (graph, bridged) = self.build_bridged(&features)?;
        let adjacency = graph.summary();
        debug!(?adjacency, "adjacency summary");

        let weights = SpatialWeights::new(graph, self.config.transform);
        let values = features.values();

        let global = self.global(values, &weights)?;
        let local = self.local(values, &weights)?;
        let lag = analyzed_lag(values, &weights, self.config.island_policy)?;
        let clusters = local.counts(self.config.alpha);

        info!(
            i = global.i,
            p = ?global.p_value(),
            hh = clusters.high_high,
            ll = clusters.low_low,
            hl = clusters.high_low,
            lh = clusters.low_high,
            "analysis complete",
        );

        Ok(Analysis {
            crs: features.crs(),
            adjacency,
            bridged,
            global,
            alpha: self.config.alpha,
            clusters,
            local,
            lag,
        })
    }

    /// Seeded when configured, otherwise fresh from the thread RNG.
    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }
}

/// Spatial lag under the weights the statistics were computed on, i.e. after
/// island exclusion and re-standardization; `None` for excluded features.
fn analyzed_lag(values: &[f64], weights: &SpatialWeights, policy: IslandPolicy) -> Result<Vec<Option<f64>>> {
    let prepared = Prepared::new(values, weights, policy)?;
    let kept_values = prepared.kept.iter().map(|&i| values[i]).collect::<Vec<_>>();

    let mut lag = vec![None; values.len()];
    for (&feature, value) in prepared.kept.iter().zip(prepared.weights.lag(&kept_values)?) {
        lag[feature] = Some(value);
    }
    Ok(lag)
}
