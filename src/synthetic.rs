//! Seeded synthetic series for exercising the fits.
//!
//! Every generator takes an explicit seed, so the same arguments always give
//! the same series.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Observation, XYPoint};
use crate::error::{FitError, FitResult};

/// `count` evenly spaced values starting at `start`.
pub fn linspace(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

fn noise(noise_sd: f64) -> FitResult<Normal<f64>> {
    Normal::new(0.0, noise_sd)
        .map_err(|e| FitError::invalid_option(format!("noise distribution error: {e}")))
}

/// Evaluate `model` at every x and add `N(0, noise_sd)` noise.
///
/// `noise_sd == 0` gives the exact curve.
pub fn from_model(
    xs: &[f64],
    model: impl Fn(f64) -> f64,
    noise_sd: f64,
    seed: u64,
) -> FitResult<Vec<XYPoint>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = noise(noise_sd)?;
    Ok(xs
        .iter()
        .map(|&x| XYPoint::new(x, model(x) + normal.sample(&mut rng)))
        .collect())
}

/// Multi-variable version of [`from_model`].
pub fn observations_from_model(
    xs: &[Vec<f64>],
    model: impl Fn(&[f64]) -> f64,
    noise_sd: f64,
    seed: u64,
) -> FitResult<Vec<Observation>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = noise(noise_sd)?;
    Ok(xs
        .iter()
        .map(|x| Observation {
            y: model(x) + normal.sample(&mut rng),
            x: x.clone(),
        })
        .collect())
}

/// `y = asymptote + amplitude·e^(-x/time_constant)` on an even grid.
pub fn decay_series(
    amplitude: f64,
    time_constant: f64,
    asymptote: f64,
    xs: &[f64],
    noise_sd: f64,
    seed: u64,
) -> FitResult<Vec<XYPoint>> {
    if !(time_constant.is_finite() && time_constant > 0.0) {
        return Err(FitError::invalid_option(format!(
            "time constant must be finite and positive, got {time_constant}"
        )));
    }
    from_model(
        xs,
        |x| asymptote + amplitude * (-x / time_constant).exp(),
        noise_sd,
        seed,
    )
}

/// `y = Σ coefficients[j]·x^j`.
pub fn polynomial_series(
    coefficients: &[f64],
    xs: &[f64],
    noise_sd: f64,
    seed: u64,
) -> FitResult<Vec<XYPoint>> {
    if coefficients.is_empty() {
        return Err(FitError::invalid_option("polynomial needs at least one coefficient"));
    }
    from_model(
        xs,
        |x| coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c),
        noise_sd,
        seed,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn same_seed_same_series() {
        let xs = linspace(0.0, 0.5, 20);
        let a = decay_series(2.0, 5.0, 1.0, &xs, 0.1, 7).unwrap();
        let b = decay_series(2.0, 5.0, 1.0, &xs, 0.1, 7).unwrap();
        let c = decay_series(2.0, 5.0, 1.0, &xs, 0.1, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn zero_noise_is_exact() {
        let xs = linspace(-1.0, 1.0, 4);
        let s = polynomial_series(&[1.0, 0.0, 2.0], &xs, 0.0, 1).unwrap();
        assert_eq!(s.len(), 4);
        assert_relative_eq!(s[3].x, 2.0);
        assert_relative_eq!(s[3].y, 9.0);
    }

    #[test]
    fn invalid_arguments() {
        let xs = linspace(0.0, 1.0, 3);
        assert!(from_model(&xs, |x| x, -1.0, 0).is_err());
        assert!(decay_series(1.0, 0.0, 0.0, &xs, 0.0, 0).is_err());
        assert!(polynomial_series(&[], &xs, 0.0, 0).is_err());
    }

    #[test]
    fn multi_variable_observations() {
        let xs = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let obs = observations_from_model(&xs, |v| v[0] * v[1], 0.0, 3).unwrap();
        assert_eq!(obs[1].x, vec![3.0, 4.0]);
        assert_relative_eq!(obs[1].y, 12.0);
    }
}
