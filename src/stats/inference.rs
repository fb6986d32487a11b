/// Standard normal CDF (Abramowitz & Stegun 26.2.17, |error| < 7.5e-8).
pub(crate) fn normal_cdf(x: f64) -> f64 {
    if x < -8.0 { return 0.0 }
    if x > 8.0 { return 1.0 }

    let t = 1.0 / (1.0 + 0.2316419 * x.abs());
    let d = 0.3989422804014327; // 1/sqrt(2*pi)
    let p = d * (-x * x / 2.0).exp()
        * (t * (0.319381530
            + t * (-0.356563782
                + t * (1.781477937
                    + t * (-1.821255978
                        + t * 1.330274429)))));

    if x > 0.0 { 1.0 - p } else { p }
}

/// Two-sided p-value of a standard normal score.
pub(crate) fn two_sided_p(z: f64) -> f64 {
    (2.0 * (1.0 - normal_cdf(z.abs()))).clamp(0.0, 1.0)
}

/// Standard score against a variance, `None` when the variance is degenerate.
pub(crate) fn z_score(observed: f64, expected: f64, variance: f64) -> Option<f64> {
    (variance > 0.0 && variance.is_finite()).then(|| (observed - expected) / variance.sqrt())
}

/// Folded pseudo p-value of `observed` against a reference distribution.
///
/// Counts simulations at least as extreme as the observed value in each tail
/// and keeps the smaller count. Simulations within a relative tolerance of the
/// observed value are ties and count toward both tails, so a statistic that
/// cannot vary under permutation gets p = 1. The result is
/// `(count + 1) / (sims + 1)`, so it is never zero.
pub(crate) fn pseudo_p(observed: f64, sims: &[f64]) -> f64 {
    let tol = TIE_TOLERANCE * observed.abs().max(1.0);
    let upper = sims.iter().filter(|&&s| s >= observed - tol).count();
    let lower = sims.iter().filter(|&&s| s <= observed + tol).count();
    (upper.min(lower) + 1) as f64 / (sims.len() + 1) as f64
}

/// Relative tolerance under which two statistics are considered equal.
pub(crate) const TIE_TOLERANCE: f64 = 1e-10;

/// Standard score of `observed` against the reference distribution, `None`
/// when the simulations are constant up to rounding noise.
pub(crate) fn sim_z(observed: f64, mean: f64, std: f64) -> Option<f64> {
    (std > 1e-12 * observed.abs().max(1.0)).then(|| (observed - mean) / std)
}

/// Mean and population standard deviation of the reference distribution.
pub(crate) fn mean_std(sims: &[f64]) -> (f64, f64) {
    let n = sims.len() as f64;
    let mean = sims.iter().sum::<f64>() / n;
    let var = sims.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
