//! Numeric helpers shared by mappers and engines.

use rand::Rng;

/// Logistic sigmoid with adjustable steepness and midpoint.
pub fn sigmoid(x: f64, steepness: f64, midpoint: f64) -> f64 {
    1.0 / (1.0 + (-steepness * (x - midpoint)).exp())
}

/// One draw from the standard normal distribution (Box–Muller).
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // gen::<f64>() lies in [0, 1); shift to (0, 1] so ln stays finite
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Increment of a Wiener process with scale `sigma` over a step `dt`.
pub fn wiener_increment<R: Rng + ?Sized>(rng: &mut R, sigma: f64, dt: f64) -> f64 {
    sigma * dt.sqrt() * standard_normal(rng)
}

/// Exponential decay of `x` at `rate` per unit step.
pub fn exponential_decay(x: f64, rate: f64) -> f64 {
    x * (-rate).exp()
}

/// Move `x` towards `target`, closing the gap exponentially at `rate`.
pub fn exponential_convergence(x: f64, target: f64, rate: f64) -> f64 {
    target + exponential_decay(x - target, rate)
}

/// A Bernoulli trial. `p` is clamped into `[0, 1]`.
pub fn bernoulli<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.gen_bool(p.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::rng_from_seed;

    #[test]
    fn sigmoid_is_half_at_midpoint() {
        assert!((sigmoid(2.0, 3.0, 2.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(10.0, 1.0, 0.0) > 0.99);
    }

    #[test]
    fn convergence_approaches_target() {
        let x = exponential_convergence(10.0, 0.0, 1.0);
        assert!((x - 10.0 * (-1.0f64).exp()).abs() < 1e-12);
        assert_eq!(exponential_convergence(3.0, 3.0, 0.5), 3.0);
    }

    #[test]
    fn normal_draws_are_roughly_centred() {
        let mut rng = rng_from_seed(Some(11));
        let n = 4000;
        let mean: f64 = (0..n).map(|_| standard_normal(&mut rng)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.1, "mean was {}", mean);
    }

    #[test]
    fn bernoulli_extremes() {
        let mut rng = rng_from_seed(Some(1));
        assert!(bernoulli(&mut rng, 1.0));
        assert!(!bernoulli(&mut rng, 0.0));
        assert!(bernoulli(&mut rng, 7.0));
    }
}
