//! Polynomial regression `y = s0 + s1·x + s2·x² + ...` via multiple regression.
//!
//! Each x becomes the predictor row `[x, x², ..., x^degree]`; the intercept is
//! added by [`multiple_linear_regression`].

use serde::{Deserialize, Serialize};

use crate::domain::XYPoint;
use crate::error::{FitError, FitResult};
use crate::fit::multiple::multiple_linear_regression;

/// How fitted values are evaluated from the coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolynomialEvaluation {
    /// `Σ slopes[j] · x^j`.
    #[default]
    Standard,
    /// `Σ slopes[j] · x^degree`: every coefficient weighted by the highest power.
    ///
    /// This reproduces fitted points and `error` produced by older releases.
    /// The coefficients themselves are identical in both modes.
    LegacyHighestPower,
}

/// Output of [`polynomial_regression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolynomialFit {
    /// `(x, ŷ)` for every input point.
    pub points: Vec<XYPoint>,
    /// Coefficients, constant term first (`degree + 1` values).
    pub slopes: Vec<f64>,
    /// Mean squared residual, `Σ(ŷ - y)² / (n - 1)`.
    pub error: f64,
    /// R² of the underlying multiple regression.
    pub rsquared: f64,
}

impl PolynomialFit {
    /// Evaluate the polynomial at `x` with the standard formula.
    pub fn predict(&self, x: f64) -> f64 {
        // Horner, highest power first.
        self.slopes.iter().rev().fold(0.0, |acc, s| acc * x + s)
    }
}

/// Fit a polynomial of `degree` (>= 1) with standard evaluation.
pub fn polynomial_regression(series: &[XYPoint], degree: usize) -> FitResult<PolynomialFit> {
    polynomial_regression_with(series, degree, PolynomialEvaluation::Standard)
}

/// Fit a polynomial of `degree` (>= 1) and evaluate fitted points with `eval`.
///
/// # Errors
/// - [`FitError::InvalidOption`] if `degree` is zero.
/// - Any error of [`multiple_linear_regression`] (too few points, duplicate x
///   values making the design singular, ...).
pub fn polynomial_regression_with(
    series: &[XYPoint],
    degree: usize,
    eval: PolynomialEvaluation,
) -> FitResult<PolynomialFit> {
    if degree == 0 {
        return Err(FitError::invalid_option("polynomial degree must be at least 1"));
    }
    let power = i32::try_from(degree)
        .map_err(|_| FitError::invalid_option(format!("polynomial degree {degree} is too large")))?;

    let rows: Vec<Vec<f64>> = series
        .iter()
        .map(|p| {
            let mut row: Vec<f64> = (1..=power).map(|j| p.x.powi(j)).collect();
            row.push(p.y);
            row
        })
        .collect();

    let reg = multiple_linear_regression(&rows)?;
    let slopes = reg.slopes;

    let mut points = Vec::with_capacity(series.len());
    let mut sq = 0.0;
    for p in series {
        let y_hat: f64 = match eval {
            PolynomialEvaluation::Standard => slopes
                .iter()
                .enumerate()
                .map(|(j, s)| s * p.x.powi(j as i32))
                .sum(),
            PolynomialEvaluation::LegacyHighestPower => {
                let top = p.x.powi(power);
                slopes.iter().map(|s| top * s).sum()
            }
        };
        points.push(XYPoint::new(p.x, y_hat));
        sq += (y_hat - p.y) * (y_hat - p.y);
    }

    Ok(PolynomialFit {
        points,
        slopes,
        error: sq / (series.len() as f64 - 1.0),
        rsquared: reg.rsquared,
    })
}
