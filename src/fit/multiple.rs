//! Ordinary least squares through QR.
//!
//! For a design matrix `X = [1 | X1 | ... | Xk]` and response `y` we solve
//!
//! ```text
//! slopes = R⁻¹ · Qᵗ · y        where X = Q·R
//! ```
//!
//! and report `R² = SSM / SSTO`, both sums taken around the mean of `y`.
//! A constant response makes `SSTO = 0` and `R²` NaN; that is returned as is.

use serde::{Deserialize, Serialize};

use crate::domain::{Matrix, Vector};
use crate::error::{FitError, FitResult};
use crate::math::{dot_mv, dot_vm, gram_schmidt, invert, matrix_from_rows};
use crate::stats;

/// Predictor series alongside the fitted response, for plots and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedSeries {
    /// One series per predictor, in input order.
    pub predictors: Vec<Vec<f64>>,
    /// Fitted value `ŷ` for each row.
    pub fitted: Vec<f64>,
}

/// Output of [`multiple_linear_regression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    /// `SSM / SSTO`. Not clamped to `[0, 1]`; NaN for a constant response.
    pub rsquared: f64,
    /// Intercept first, then one slope per predictor.
    pub slopes: Vec<f64>,
    pub points: FittedSeries,
}

impl RegressionResult {
    pub fn intercept(&self) -> f64 {
        self.slopes[0]
    }

    /// Evaluate the fitted plane at `predictors` (length `k`).
    pub fn predict(&self, predictors: &[f64]) -> f64 {
        self.slopes[0]
            + self.slopes[1..]
                .iter()
                .zip(predictors)
                .map(|(s, x)| s * x)
                .sum::<f64>()
    }
}

/// Multiple linear regression with an automatic intercept.
///
/// Each row holds `k` predictor values followed by the response, so every row
/// has length `k + 1`.
///
/// # Errors
/// - [`FitError::Dimension`] for empty or ragged input, rows shorter than two
///   values, or fewer rows than fitted coefficients.
/// - [`FitError::SingularMatrix`] when predictors are collinear.
pub fn multiple_linear_regression(rows: &[Vec<f64>]) -> FitResult<RegressionResult> {
    let data = matrix_from_rows(rows)?;
    let (m, width) = data.shape();
    if width < 2 {
        return Err(FitError::dimension(
            "each row needs at least one predictor and a response",
        ));
    }
    let k = width - 1;
    if m < k + 1 {
        return Err(FitError::dimension(format!(
            "{m} rows cannot determine {} coefficients",
            k + 1
        )));
    }

    let x = Matrix::from_fn(m, k + 1, |i, j| if j == 0 { 1.0 } else { data[(i, j - 1)] });
    let y: Vector = data.column(k).into_owned();

    let (q, r) = gram_schmidt(&x)?;
    let r_inv = invert(&r)?;
    let qty = dot_vm(&y, &q)?;
    let slopes = dot_mv(&r_inv, &qty)?;

    let y_hat = dot_mv(&x, &slopes)?;
    let response_avg = stats::mean(y.as_slice());

    let mut ssm = 0.0;
    let mut ssto = 0.0;
    for (yh, yi) in y_hat.iter().zip(y.iter()) {
        ssm += (yh - response_avg) * (yh - response_avg);
        ssto += (yi - response_avg) * (yi - response_avg);
    }

    let predictors = (0..k)
        .map(|j| data.column(j).iter().copied().collect())
        .collect();

    Ok(RegressionResult {
        rsquared: ssm / ssto,
        slopes: slopes.iter().copied().collect(),
        points: FittedSeries {
            predictors,
            fitted: y_hat.iter().copied().collect(),
        },
    })
}

/// Closed-form simple regression `y = m·x + b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    /// Slope.
    pub m: f64,
    /// Intercept.
    pub b: f64,
    /// Correlation coefficient.
    pub r: f64,
    /// Coefficient of determination (`r * r`).
    pub r2: f64,
}

/// Simple linear regression from sums, without a design matrix.
///
/// # Errors
/// [`FitError::Dimension`] if `x` and `y` differ in length or are empty.
pub fn linear_regression(x: &[f64], y: &[f64]) -> FitResult<LinearFit> {
    if x.len() != y.len() {
        return Err(FitError::dimension(format!(
            "x has {} values but y has {}",
            x.len(),
            y.len()
        )));
    }
    if x.is_empty() {
        return Err(FitError::dimension("no points to fit"));
    }

    let n = x.len() as f64;
    let x_sum = stats::sum(x);
    let y_sum = stats::sum(y);
    let (mut xx, mut xy, mut yy) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        xy += xi * yi;
        xx += xi * xi;
        yy += yi * yi;
    }

    let m = (n * xy - x_sum * y_sum) / (n * xx - x_sum * x_sum);
    let b = (y_sum - m * x_sum) / n;
    let r = (xy - x_sum * y_sum / n)
        / ((xx - x_sum * x_sum / n) * (yy - y_sum * y_sum / n)).sqrt();

    Ok(LinearFit { m, b, r, r2: r * r })
}
