//! Log-domain scoring helpers shared by the observation models.

/// `ln(p_false + (1 - p_false) * exp(log_g))`, evaluated without
/// exponentiating `log_g` when it is very negative.
pub(crate) fn log_mix(p_false: f64, log_g: f64) -> f64 {
    let a = p_false.ln();
    let b = (1.0 - p_false).ln() + log_g;
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    hi + (lo - hi).exp().ln_1p()
}

/// Log of an unnormalized 2D Gaussian on the errors `(e1, e2)`.
pub(crate) fn log_gauss2(e1: f64, s1: f64, e2: f64, s2: f64) -> f64 {
    let a = e1 / s1;
    let b = e2 / s2;
    -0.5 * (a * a + b * b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_mix_matches_direct_evaluation() {
        for &(p, g) in &[(0.1, 1.0), (0.1, 0.5), (0.01, 0.0001), (0.5, 0.9)] {
            let direct = (p + (1.0f64 - p) * g).ln();
            assert!((log_mix(p, f64::ln(g)) - direct).abs() < 1e-12);
        }
    }

    #[test]
    fn log_mix_saturates_at_floor() {
        let v = log_mix(0.1, -1.0e6);
        assert!((v - 0.1f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn log_gauss_is_zero_at_mean() {
        assert_eq!(log_gauss2(0.0, 1.0, 0.0, 2.0), 0.0);
        assert!((log_gauss2(1.0, 1.0, 0.0, 1.0) + 0.5).abs() < 1e-12);
    }
}
