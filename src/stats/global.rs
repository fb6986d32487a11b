use rand::{seq::SliceRandom, Rng};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::graph::SpatialWeights;
use crate::stats::inference::{mean_std, pseudo_p, sim_z, two_sided_p, z_score};
use crate::stats::{IslandPolicy, Prepared};

/// Global Moran's I with analytical and permutation inference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalMoran {
    /// Observed statistic.
    pub i: f64,
    /// Number of features that entered the computation.
    pub n: usize,
    /// E[I] = -1 / (n - 1).
    pub expected: f64,

    /// Variance under the normality assumption.
    pub variance_normal: f64,
    pub z_normal: Option<f64>,
    pub p_normal: Option<f64>,

    /// Variance under the randomization assumption (requires n >= 4).
    pub variance_random: Option<f64>,
    pub z_random: Option<f64>,
    pub p_random: Option<f64>,

    /// Number of random relabelings drawn (0 disables permutation inference).
    pub permutations: usize,
    pub p_sim: Option<f64>,
    pub mean_sim: Option<f64>,
    pub std_sim: Option<f64>,
    pub z_sim: Option<f64>,

    /// Caller indices of features left out because they had no neighbors.
    pub excluded: Vec<usize>,
    /// The attribute had no variance; the statistic is reported as 0.
    pub zero_variance: bool,
}

/// `(n / S0) * sum_i z_i lag_i / sum_i z_i^2`.
fn statistic(weights: &SpatialWeights, z: &[f64], m2: f64, s0: f64) -> f64 {
    let cross = (0..z.len())
        .map(|i| z[i] * weights.neighbors_with_weights(i).map(|(j, w)| w * z[j]).sum::<f64>())
        .sum::<f64>();
    (z.len() as f64 / s0) * cross / m2
}

impl GlobalMoran {
    /// Compute global Moran's I of `values` over `weights`.
    ///
    /// Islands are handled per `policy`; permutations draw from `rng`.
    pub fn compute<R: Rng + ?Sized>(
        values: &[f64],
        weights: &SpatialWeights,
        policy: IslandPolicy,
        permutations: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let prepared = Prepared::new(values, weights, policy)?;
        let Prepared { weights, z, m2, excluded, zero_variance, .. } = &prepared;
        let n = prepared.n();
        let nf = n as f64;

        let s0 = weights.s0();
        let s1 = weights.s1();
        let s2 = weights.s2();
        let s02 = s0 * s0;
        let expected = -1.0 / (nf - 1.0);

        let variance_normal = (nf * nf * s1 - nf * s2 + 3.0 * s02) / ((nf * nf - 1.0) * s02) - expected * expected;
        debug!(n, s0, s1, s2, "weight constants");

        if *zero_variance {
            info!(n, "attribute has no variance; Moran's I is 0");
            return Ok(Self {
                i: 0.0,
                n,
                expected,
                variance_normal,
                z_normal: None,
                p_normal: Some(1.0),
                variance_random: None,
                z_random: None,
                p_random: Some(1.0),
                permutations,
                p_sim: (permutations > 0).then_some(1.0),
                mean_sim: None,
                std_sim: None,
                z_sim: None,
                excluded: excluded.clone(),
                zero_variance: true,
            });
        }

        let i = statistic(weights, z, *m2, s0);

        let z_normal = z_score(i, expected, variance_normal);
        let variance_random = (n >= 4).then(|| {
            let m4 = z.iter().map(|d| d.powi(4)).sum::<f64>() / nf;
            let kurtosis = m4 / (m2 / nf).powi(2);
            let a = nf * ((nf * nf - 3.0 * nf + 3.0) * s1 - nf * s2 + 3.0 * s02);
            let b = kurtosis * ((nf * nf - nf) * s1 - 2.0 * nf * s2 + 6.0 * s02);
            (a - b) / ((nf - 1.0) * (nf - 2.0) * (nf - 3.0) * s02) - expected * expected
        });
        let z_random = variance_random.and_then(|v| z_score(i, expected, v));

        let mut result = Self {
            i,
            n,
            expected,
            variance_normal,
            z_normal,
            p_normal: z_normal.map(two_sided_p),
            variance_random,
            z_random,
            p_random: z_random.map(two_sided_p),
            permutations,
            p_sim: None,
            mean_sim: None,
            std_sim: None,
            z_sim: None,
            excluded: excluded.clone(),
            zero_variance: false,
        };

        if permutations > 0 {
            let mut shuffled = z.clone();
            let sims = (0..permutations)
                .map(|_| {
                    shuffled.shuffle(rng);
                    statistic(weights, &shuffled, *m2, s0)
                })
                .collect::<Vec<_>>();

            let (mean, std) = mean_std(&sims);
            result.p_sim = Some(pseudo_p(i, &sims));
            result.mean_sim = Some(mean);
            result.std_sim = Some(std);
            result.z_sim = sim_z(i, mean, std);
        }

        info!(i = result.i, p_sim = ?result.p_sim, z_normal = ?result.z_normal, excluded = result.excluded.len(), "global Moran's I");
        Ok(result)
    }

    /// Best available p-value: permutation if drawn, otherwise normality.
    pub fn p_value(&self) -> Option<f64> {
        self.p_sim.or(self.p_normal)
    }
}
