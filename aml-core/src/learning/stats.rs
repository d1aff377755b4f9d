//! Small statistical primitives shared by the pattern-recognition and
//! success-weighting modules: Wilson score intervals and a
//! Pearson's χ² significance test on a 2×2 table.

/// Wilson score interval for a binomial proportion, more accurate than the
/// normal approximation for small samples (GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WilsonInterval {
    /// Lower bound of the interval.
    pub lower: f64,
    /// Wilson score center.
    pub center: f64,
    /// Upper bound of the interval.
    pub upper: f64,
}

/// Computes the Wilson score interval for `successes` out of
/// `successes + failures` trials, using the default `z = 1.96` (95%
/// confidence) unless `z` overrides it.
#[must_use]
pub fn wilson_interval(successes: u64, failures: u64, z: f64) -> WilsonInterval {
    let n = (successes + failures) as f64;
    if n == 0.0 {
        return WilsonInterval {
            lower: 0.0,
            center: 0.5,
            upper: 1.0,
        };
    }
    let p_hat = successes as f64 / n;
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let center = (p_hat + z2 / (2.0 * n)) / denom;
    let margin = (z / denom) * ((p_hat * (1.0 - p_hat) / n) + z2 / (4.0 * n * n)).sqrt();
    WilsonInterval {
        lower: (center - margin).clamp(0.0, 1.0),
        center: center.clamp(0.0, 1.0),
        upper: (center + margin).clamp(0.0, 1.0),
    }
}

/// Default `z` value for Wilson intervals (95% confidence).
pub const DEFAULT_Z: f64 = 1.96;

/// Pearson's χ² statistic and p-value for a 2×2 contingency table of
/// `(observedSuccess, observedFailure)` vs. `(baseSuccess, baseFailure)`.
/// Uses the one-degree-of-freedom
/// closed-form relationship `p = erfc(sqrt(chi2 / 2))`, since χ² with one
/// degree of freedom is the square of a standard normal variate.
#[must_use]
pub fn chi_square_2x2(observed_success: u64, observed_failure: u64, base_success: u64, base_failure: u64) -> (f64, f64) {
    let a = observed_success as f64;
    let b = observed_failure as f64;
    let c = base_success as f64;
    let d = base_failure as f64;
    let n = a + b + c + d;
    if n == 0.0 || (a + b) == 0.0 || (c + d) == 0.0 || (a + c) == 0.0 || (b + d) == 0.0 {
        return (0.0, 1.0);
    }
    let numerator = n * (a * d - b * c).powi(2);
    let denominator = (a + b) * (c + d) * (a + c) * (b + d);
    let chi2 = numerator / denominator;
    let p = erfc((chi2 / 2.0).sqrt());
    (chi2, p)
}

/// Complementary error function via the Abramowitz & Stegun 7.1.26
/// rational approximation (max absolute error ~1.5e-7), avoiding a
/// dependency on a special-functions crate for a single call site.
fn erfc(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
    * (0.254_829_592
        + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    let erf = 1.0 - poly * (-x * x).exp();
    1.0 - sign * erf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wilson_bounds_contain_observed_rate() {
        for (s, f) in [(8u64, 2u64), (1, 0), (0, 1), (50, 50), (3, 97)] {
            let interval = wilson_interval(s, f, DEFAULT_Z);
            let observed = s as f64 / (s + f) as f64;
            assert!(interval.lower <= observed + 1e-9);
            assert!(observed <= interval.upper + 1e-9);
        }
    }

    #[test]
    fn wilson_interval_narrows_with_more_samples() {
        let small = wilson_interval(5, 5, DEFAULT_Z);
        let large = wilson_interval(500, 500, DEFAULT_Z);
        assert!((large.upper - large.lower) < (small.upper - small.lower));
    }

    #[test]
    fn identical_tables_are_not_significant() {
        let (_, p) = chi_square_2x2(10, 10, 10, 10);
        assert!(p > 0.9);
    }

    #[test]
    fn strongly_divergent_tables_are_significant() {
        let (_, p) = chi_square_2x2(95, 5, 20, 80);
        assert!(p < 0.05);
    }

    #[test]
    fn erfc_matches_known_values() {
        assert!((erfc(0.0) - 1.0).abs() < 1e-6);
        assert!(erfc(3.0) < 1e-3);
    }
}
