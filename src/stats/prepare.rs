use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::graph::SpatialWeights;

/// Moran's I variance is undefined below this many features.
pub(crate) const MIN_FEATURES: usize = 3;

/// What to do with features that have no neighbors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IslandPolicy {
    /// Drop islands from the computation and report them.
    #[default]
    Exclude,
    /// Refuse to compute while any island is present.
    Fail,
}

/// Validated attribute vector and the weights it will be tested against.
///
/// `kept[k]` maps position `k` of the analysis back to the caller's feature index.
#[derive(Debug, Clone)]
pub(crate) struct Prepared {
    pub(crate) weights: SpatialWeights,
    pub(crate) z: Vec<f64>,
    pub(crate) m2: f64,
    pub(crate) kept: Vec<usize>,
    pub(crate) excluded: Vec<usize>,
    pub(crate) zero_variance: bool,
}

impl Prepared {
    pub(crate) fn new(values: &[f64], weights: &SpatialWeights, policy: IslandPolicy) -> Result<Self> {
        if weights.is_empty() {
            return Err(Error::EmptyFeatureSet);
        }
        if values.len() != weights.len() {
            return Err(Error::LengthMismatch { what: "values", expected: weights.len(), found: values.len() });
        }

        let bad = values.iter().enumerate()
            .filter_map(|(i, v)| (!v.is_finite()).then_some(i))
            .collect::<Vec<_>>();
        if !bad.is_empty() {
            return Err(Error::NonFiniteValues { indices: bad });
        }

        if weights.islands().is_empty() {
            return Self::from_parts(values.to_vec(), weights.clone(), (0..values.len()).collect(), Vec::new());
        }

        if policy == IslandPolicy::Fail {
            return Err(Error::Islands { count: weights.islands().len(), indices: weights.islands().to_vec() });
        }

        // Dropping islands can strand features whose only links pointed at them,
        // so repeat until the remaining rows are all non-empty.
        let mut kept = (0..values.len()).collect::<Vec<_>>();
        let mut excluded = Vec::new();
        let mut current = weights.clone();
        while !current.islands().is_empty() {
            let islands = current.islands();
            excluded.extend(islands.iter().map(|&k| kept[k]));

            let survivors = (0..kept.len())
                .filter(|k| islands.binary_search(k).is_err())
                .collect::<Vec<_>>();
            current = current.subset(&survivors)?;
            kept = survivors.iter().map(|&k| kept[k]).collect();
        }
        excluded.sort_unstable();
        warn!(count = excluded.len(), indices = ?excluded, "excluding features without neighbors");

        let values = kept.iter().map(|&i| values[i]).collect();
        Self::from_parts(values, current, kept, excluded)
    }

    fn from_parts(values: Vec<f64>, weights: SpatialWeights, kept: Vec<usize>, excluded: Vec<usize>) -> Result<Self> {
        let n = values.len();
        if n < MIN_FEATURES {
            return Err(Error::TooFewFeatures { required: MIN_FEATURES, found: n });
        }

        let mean = values.iter().sum::<f64>() / n as f64;
        let z = values.iter().map(|v| v - mean).collect::<Vec<_>>();
        let m2 = z.iter().map(|d| d * d).sum::<f64>();

        // tolerance scales with the magnitude of the data
        let scale = 1e-12 * mean.abs().max(1.0);
        let zero_variance = m2 / n as f64 <= scale * scale;

        Ok(Self { weights, z, m2, kept, excluded, zero_variance })
    }

    #[inline] pub(crate) fn n(&self) -> usize { self.z.len() }
}
