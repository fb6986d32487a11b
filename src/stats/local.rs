use rand::{seq::index, Rng};
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::stats::inference::{pseudo_p, TIE_TOLERANCE};
use crate::stats::{IslandPolicy, Prepared};
use crate::graph::SpatialWeights;

/// Moran scatterplot quadrant of a feature: its own deviation against its lag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    /// High value among high neighbors (hot spot).
    HighHigh,
    /// Low value among high neighbors.
    LowHigh,
    /// Low value among low neighbors (cold spot).
    LowLow,
    /// High value among low neighbors.
    HighLow,
}

impl Quadrant {
    /// Classify by sign; zero counts as low.
    pub fn classify(z: f64, lag: f64) -> Self {
        match (z > 0.0, lag > 0.0) {
            (true, true) => Self::HighHigh,
            (false, true) => Self::LowHigh,
            (false, false) => Self::LowLow,
            (true, false) => Self::HighLow,
        }
    }

    /// Conventional quadrant number (1 = HH, 2 = LH, 3 = LL, 4 = HL).
    pub fn code(self) -> u8 {
        match self {
            Self::HighHigh => 1,
            Self::LowHigh => 2,
            Self::LowLow => 3,
            Self::HighLow => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::HighHigh => "HH",
            Self::LowHigh => "LH",
            Self::LowLow => "LL",
            Self::HighLow => "HL",
        }
    }
}

/// Per-feature outcome of local Moran's I.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LocalStatistic {
    Defined {
        i: f64,
        /// Centered value.
        z: f64,
        /// Spatial lag of the centered values.
        lag: f64,
        quadrant: Quadrant,
        /// Conditional permutation pseudo p-value (absent without permutations).
        p_sim: Option<f64>,
    },
    /// The feature had no neighbors and was left out.
    Undefined,
}

impl LocalStatistic {
    #[inline] pub fn is_defined(&self) -> bool { matches!(self, Self::Defined { .. }) }

    /// Get the statistic value, if defined.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Defined { i, .. } => Some(*i),
            Self::Undefined => None,
        }
    }

    pub fn quadrant(&self) -> Option<Quadrant> {
        match self {
            Self::Defined { quadrant, .. } => Some(*quadrant),
            Self::Undefined => None,
        }
    }

    pub fn p_sim(&self) -> Option<f64> {
        match self {
            Self::Defined { p_sim, .. } => *p_sim,
            Self::Undefined => None,
        }
    }
}

/// Cluster membership after significance filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cluster {
    Significant(Quadrant),
    NotSignificant,
    Undefined,
}

impl Cluster {
    pub fn label(self) -> &'static str {
        match self {
            Self::Significant(quadrant) => quadrant.label(),
            Self::NotSignificant => "ns",
            Self::Undefined => "undefined",
        }
    }
}

/// Number of features per cluster class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterCounts {
    pub high_high: usize,
    pub low_high: usize,
    pub low_low: usize,
    pub high_low: usize,
    pub not_significant: usize,
    pub undefined: usize,
}

/// Local Moran's I (LISA) for every feature, in the caller's index order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalMoran {
    pub stats: Vec<LocalStatistic>,
    /// Number of features that entered the computation.
    pub n: usize,
    pub excluded: Vec<usize>,
    pub permutations: usize,
    pub zero_variance: bool,
}

impl LocalMoran {
    /// Compute local Moran's I of `values` over `weights`.
    ///
    /// Significance uses conditional permutation: each feature keeps its own
    /// value while its neighbor set is redrawn, without replacement, from the
    /// remaining features.
    pub fn compute<R: Rng + ?Sized>(
        values: &[f64],
        weights: &SpatialWeights,
        policy: IslandPolicy,
        permutations: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let prepared = Prepared::new(values, weights, policy)?;
        let Prepared { weights, z, m2, kept, excluded, zero_variance } = &prepared;
        let n = prepared.n();
        let scale = (n - 1) as f64 / m2;
        let spread = (m2 / n as f64).sqrt();

        let lag = weights.lag(z)?;
        let mut stats = vec![LocalStatistic::Undefined; values.len()];

        for (k, &feature) in kept.iter().enumerate() {
            if *zero_variance {
                stats[feature] = LocalStatistic::Defined {
                    i: 0.0,
                    z: 0.0,
                    lag: 0.0,
                    quadrant: Quadrant::LowLow,
                    p_sim: (permutations > 0).then_some(1.0),
                };
                continue;
            }

            // at the mean: no sign to classify, nothing to test
            if z[k].abs() <= TIE_TOLERANCE * spread {
                stats[feature] = LocalStatistic::Defined {
                    i: 0.0,
                    z: 0.0,
                    lag: lag[k],
                    quadrant: Quadrant::classify(0.0, lag[k]),
                    p_sim: (permutations > 0).then_some(1.0),
                };
                continue;
            }

            let i = scale * z[k] * lag[k];
            let p_sim = (permutations > 0).then(|| {
                let row = weights.neighbors_with_weights(k).map(|(_, w)| w).collect::<Vec<_>>();
                let sims = (0..permutations)
                    .map(|_| {
                        // draw from the n - 1 other features, skipping k itself
                        let lag = index::sample(rng, n - 1, row.len()).iter()
                            .map(|idx| if idx >= k { idx + 1 } else { idx })
                            .zip(&row)
                            .map(|(j, w)| w * z[j])
                            .sum::<f64>();
                        scale * z[k] * lag
                    })
                    .collect::<Vec<_>>();
                pseudo_p(i, &sims)
            });

            stats[feature] = LocalStatistic::Defined {
                i,
                z: z[k],
                lag: lag[k],
                quadrant: Quadrant::classify(z[k], lag[k]),
                p_sim,
            };
        }

        let local = Self {
            stats,
            n,
            excluded: excluded.clone(),
            permutations,
            zero_variance: *zero_variance,
        };
        info!(n, permutations, excluded = local.excluded.len(), "local Moran's I");
        Ok(local)
    }

    #[inline] pub fn len(&self) -> usize { self.stats.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.stats.is_empty() }

    /// Get the statistic of a feature.
    #[inline] pub fn get(&self, idx: usize) -> Option<&LocalStatistic> { self.stats.get(idx) }

    /// Cluster membership of a feature at significance level `alpha`.
    ///
    /// Without permutations no feature is significant, and neither is a
    /// feature sitting exactly at the mean.
    pub fn cluster(&self, idx: usize, alpha: f64) -> Cluster {
        match self.stats.get(idx) {
            Some(LocalStatistic::Defined { quadrant, z, p_sim: Some(p), .. })
                if *p <= alpha && *z != 0.0 && !self.zero_variance =>
                Cluster::Significant(*quadrant),
            Some(LocalStatistic::Defined { .. }) => Cluster::NotSignificant,
            Some(LocalStatistic::Undefined) | None => Cluster::Undefined,
        }
    }

    /// Cluster membership of every feature.
    pub fn clusters(&self, alpha: f64) -> Vec<Cluster> {
        (0..self.len()).map(|idx| self.cluster(idx, alpha)).collect()
    }

    /// Count features per cluster class.
    pub fn counts(&self, alpha: f64) -> ClusterCounts {
        let mut counts = ClusterCounts::default();
        for cluster in self.clusters(alpha) {
            match cluster {
                Cluster::Significant(Quadrant::HighHigh) => counts.high_high += 1,
                Cluster::Significant(Quadrant::LowHigh) => counts.low_high += 1,
                Cluster::Significant(Quadrant::LowLow) => counts.low_low += 1,
                Cluster::Significant(Quadrant::HighLow) => counts.high_low += 1,
                Cluster::NotSignificant => counts.not_significant += 1,
                Cluster::Undefined => counts.undefined += 1,
            }
        }
        counts
    }
}
