//! Exponential decay towards an asymptote, `y = Y0 + A·e^(-x/t)`.
//!
//! The fit is closed form apart from a short window refinement:
//!
//! 1. `Y0` is estimated from trapezoidal sums of `y` and `y²` (assumes evenly
//!    spaced x).
//! 2. `z = ln|y - Y0|` is linear in x: `z = ln(A) + rate·x` with `rate = -1/t`.
//! 3. A line is fitted to a prefix of the transformed series. The prefix starts
//!    at 50 points and is resized to half a time constant after each fit, for up
//!    to ten rounds, so the fit concentrates on the part of the curve that still
//!    carries signal.
//!
//! If the suggested prefix drops below two points the fit fails. The legacy
//! convention for that case (`A = 0`, `rate = -999999`) is available through
//! [`exponential_decay_regression_or_sentinel`].

use log::{trace, warn};
use serde::{Deserialize, Serialize};

use crate::domain::XYPoint;
use crate::error::{FitError, FitResult};
use crate::fit::multiple::multiple_linear_regression;
use crate::stats;

/// Prefix length used by the first linear fit.
pub const INITIAL_WINDOW: f64 = 50.0;

/// Number of window refinement rounds.
pub const WINDOW_ROUNDS: usize = 10;

/// Fraction of a time constant used as the next window.
const WINDOW_SCALE: f64 = 0.5;

/// Rate reported by the legacy failure sentinel.
pub const SENTINEL_RATE: f64 = -999_999.0;

/// Output of [`exponential_decay_regression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpDecayFit {
    /// Model prediction at every input x.
    pub points: Vec<XYPoint>,
    /// `A`.
    pub amplitude: f64,
    /// `t = -1 / rate`.
    pub time_constant: f64,
    /// Fitted exponent coefficient (`-1/t`).
    pub rate: f64,
    /// `Σ(ŷ - y)² / (n - 1)` over the full series.
    pub error: f64,
    /// Estimated `Y0`.
    pub asymptote: f64,
    /// R² of the last linear fit on the transformed prefix.
    pub rsquared: f64,
    /// `-1 / rate`.
    pub lifetime: f64,
    /// `-A · rate`, the magnitude of the initial slope.
    pub slope: f64,
}

impl ExpDecayFit {
    /// `[A, t]`.
    pub fn results(&self) -> [f64; 2] {
        [self.amplitude, self.time_constant]
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.amplitude * (x * self.rate).exp() + self.asymptote
    }

    /// Whether this is the legacy failure sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.amplitude == 0.0 && self.rate == SENTINEL_RATE
    }

    fn assemble(
        series: &[XYPoint],
        asymptote: f64,
        amplitude: f64,
        rate: f64,
        rsquared: f64,
    ) -> Self {
        let mut fit = Self {
            points: Vec::with_capacity(series.len()),
            amplitude,
            time_constant: -1.0 / rate,
            rate,
            error: 0.0,
            asymptote,
            rsquared,
            lifetime: -1.0 / rate,
            slope: -amplitude * rate,
        };

        let mut sq = 0.0;
        for p in series {
            let y_hat = fit.predict(p.x);
            fit.points.push(XYPoint::new(p.x, y_hat));
            sq += (y_hat - p.y) * (y_hat - p.y);
        }
        fit.error = sq / (series.len() as f64 - 1.0);
        fit
    }
}

/// Estimate the asymptote of an evenly sampled decay from trapezoidal sums.
///
/// With `R = Σ(yᵢ + yᵢ₊₁)/2`, `S = Σ(yᵢ² + yᵢ₊₁²)/2` and `e = (y₀ + yₙ₋₁)/2`:
///
/// ```text
/// Y0 = (S - R·e) / (R - n·e)
/// ```
///
/// The estimate is biased by the trapezoid rule; the bias shrinks as the
/// sampling step gets small relative to the time constant.
pub fn estimate_asymptote(y: &[f64]) -> f64 {
    let (mut riemann, mut riemann_sq) = (0.0, 0.0);
    for w in y.windows(2) {
        riemann += (w[0] + w[1]) / 2.0;
        riemann_sq += (w[0] * w[0] + w[1] * w[1]) / 2.0;
    }
    let Some((first, last)) = y.first().zip(y.last()) else {
        return f64::NAN;
    };
    let ends = (first + last) / 2.0;
    (riemann_sq - riemann * ends) / (riemann - y.len() as f64 * ends)
}

/// Fit `y = Y0 + A·e^(-x/t)`.
///
/// # Errors
/// - [`FitError::Dimension`] for fewer than three points.
/// - [`FitError::DecayWindowCollapsed`] when the window refinement fails.
/// - [`FitError::SingularMatrix`] if a transformed prefix is degenerate.
pub fn exponential_decay_regression(series: &[XYPoint]) -> FitResult<ExpDecayFit> {
    if series.len() < 3 {
        return Err(FitError::dimension(format!(
            "exponential decay needs at least 3 points, got {}",
            series.len()
        )));
    }

    let y: Vec<f64> = series.iter().map(|p| p.y).collect();
    let asymptote = estimate_asymptote(&y);

    let transformed: Vec<Vec<f64>> = series
        .iter()
        .map(|p| vec![p.x, (p.y - asymptote).abs().ln()])
        .collect();
    let prefix = |window: f64| {
        // `as` saturates, so an infinite window means the whole series.
        let len = (window as usize).min(transformed.len());
        &transformed[..len]
    };

    let mut window = INITIAL_WINDOW;
    let (mut intercept, mut rate, mut rsquared) = (f64::NAN, f64::NAN, f64::NAN);

    for round in 0..WINDOW_ROUNDS {
        // Written so that a NaN window also fails.
        if !(window >= 2.0) {
            warn!("exponential decay: window collapsed to {window} in round {round}");
            return Err(FitError::DecayWindowCollapsed {
                window,
                asymptote,
                rsquared,
            });
        }

        let previous = window;
        let mut reg = multiple_linear_regression(prefix(window))?;
        window = stats::round(-1.0 / reg.slopes[1] * WINDOW_SCALE, 0);

        if round == WINDOW_ROUNDS - 1 {
            window = window.max(previous);
            reg = multiple_linear_regression(prefix(window))?;
        }
        trace!(
            "exponential decay round {round}: rate={:.6} next window={window}",
            reg.slopes[1]
        );

        intercept = reg.slopes[0];
        rate = reg.slopes[1];
        rsquared = reg.rsquared;
    }

    Ok(ExpDecayFit::assemble(
        series,
        asymptote,
        intercept.exp(),
        rate,
        rsquared,
    ))
}

/// Like [`exponential_decay_regression`], but a collapsed window yields the
/// legacy sentinel fit (`A = 0`, `rate = -999999`, points on the asymptote)
/// instead of an error.
pub fn exponential_decay_regression_or_sentinel(series: &[XYPoint]) -> FitResult<ExpDecayFit> {
    match exponential_decay_regression(series) {
        Err(FitError::DecayWindowCollapsed {
            asymptote,
            rsquared,
            ..
        }) => Ok(ExpDecayFit::assemble(
            series,
            asymptote,
            0.0,
            SENTINEL_RATE,
            rsquared,
        )),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn decay(xs: impl Iterator<Item = f64>, a: f64, t: f64, y0: f64) -> Vec<XYPoint> {
        xs.map(|x| XYPoint::new(x, y0 + a * (-x / t).exp())).collect()
    }

    #[test]
    fn asymptote_of_fine_grid_is_close() {
        let s = decay((0..200).map(|i| i as f64 * 0.25), 2.0, 5.0, 1.0);
        let y: Vec<f64> = s.iter().map(|p| p.y).collect();
        assert_relative_eq!(estimate_asymptote(&y), 1.0, epsilon = 0.02);
    }

    #[test]
    fn recovers_unit_spaced_decay() {
        let s = decay((0..50).map(f64::from), 2.0, 5.0, 1.0);
        let fit = exponential_decay_regression(&s).unwrap();

        let [a, t] = fit.results();
        assert_relative_eq!(a, 2.0, max_relative = 0.05);
        assert_relative_eq!(t, 5.0, max_relative = 0.05);
        // Trapezoid bias puts Y0 near 0.949 on this grid.
        assert_relative_eq!(fit.asymptote, 1.0, epsilon = 0.06);
        assert_relative_eq!(fit.lifetime, fit.time_constant);
        assert_relative_eq!(fit.slope, -a * fit.rate);
        assert_eq!(fit.points.len(), 50);
        assert!(fit.rsquared > 0.99);
    }

    #[test]
    fn collapsed_window_is_typed_and_has_sentinel_translation() {
        // A growing series suggests a negative window on the first round.
        let s: Vec<XYPoint> = (0..20)
            .map(|i| XYPoint::new(i as f64, 1.0 + 0.1 * (i as f64 / 4.0).exp()))
            .collect();

        let err = exponential_decay_regression(&s).unwrap_err();
        assert!(matches!(err, FitError::DecayWindowCollapsed { .. }));

        let fit = exponential_decay_regression_or_sentinel(&s).unwrap();
        assert!(fit.is_sentinel());
        assert_eq!(fit.amplitude, 0.0);
        assert_eq!(fit.slope, 0.0);
        assert!(fit.points.iter().all(|p| p.y == fit.asymptote));
    }

    #[test]
    fn too_short_series_is_rejected() {
        let s = [XYPoint::new(0.0, 1.0), XYPoint::new(1.0, 0.5)];
        assert!(matches!(
            exponential_decay_regression(&s),
            Err(FitError::Dimension(_))
        ));
    }
}
