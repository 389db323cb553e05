//! Plain-text reports for nonlinear fits.
//!
//! Formatting lives here so the solver only produces numbers.

use crate::domain::Matrix;
use crate::nonlinear::solver::{FittedPoint, ParameterEstimate};

const CELL: usize = 12;

fn cell(v: f64) -> String {
    format!("{v:>width$.4}", width = CELL)
}

fn head(label: &str) -> String {
    format!("{label:>width$}", width = CELL)
}

/// Fit diagnostics printed under the point table.
pub(crate) struct Summary {
    pub correlation: f64,
    pub rsquared: f64,
    pub rms_error: f64,
    pub degrees_of_freedom: usize,
    pub sum_of_squares: f64,
    pub aic: f64,
    pub aicc: f64,
}

/// Equation line followed by one row per point:
/// `x1..xk  Y  yc  Y-yc  SEest  YcLo  YcHi`.
pub(crate) fn point_table(equation: &str, n_vars: usize, points: &[FittedPoint]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Y = {equation}\n"));

    for j in 1..=n_vars {
        out.push_str(&head(&format!("x{j}")));
    }
    for label in ["Y", "yc", "Y-yc", "SEest", "YcLo", "YcHi"] {
        out.push_str(&head(label));
    }
    out.push('\n');

    for p in points {
        for &x in &p.x {
            out.push_str(&cell(x));
        }
        for v in [p.y, p.fitted, p.residual, p.std_error, p.lower, p.upper] {
            out.push_str(&cell(v));
        }
        out.push('\n');
    }
    out
}

pub(crate) fn fit_summary(s: &Summary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\nCorr. Coeff. = {:.6}; r*r = {:.6}\n",
        s.correlation, s.rsquared
    ));
    out.push_str(&format!(
        "RMS Error = {:.6}; d.f. = {}; SSq = {:.6}\n",
        s.rms_error, s.degrees_of_freedom, s.sum_of_squares
    ));
    out.push_str(&format!("AIC = {:.4}; AICc = {:.4}\n", s.aic, s.aicc));
    out
}

pub(crate) fn parameter_table(parameters: &[ParameterEstimate]) -> String {
    let mut out = String::from("Parameter Estimates\n");
    for p in parameters {
        out.push_str(&format!(
            "{} = {:.6} +/- {:.6}; p = {:.4}\n",
            p.name, p.value, p.std_error, p.p_value
        ));
    }
    out
}

/// Upper triangle of the covariance matrix with the matching error correlation.
pub(crate) fn covariance_table(
    parameters: &[ParameterEstimate],
    covariance: &Matrix,
    correlations: &Matrix,
) -> String {
    let mut out = String::from("Covariance Matrix Terms and Error-Correlations\n");
    for (b, pb) in parameters.iter().enumerate() {
        for (k, pk) in parameters.iter().enumerate().skip(b) {
            let term = if b == k {
                format!("B({},{})", pb.name, pb.name)
            } else {
                format!("B({},{}) = B({},{})", pb.name, pk.name, pk.name, pb.name)
            };
            out.push_str(&format!(
                "{term} = {:.6e}; r = {:.4}\n",
                covariance[(b, k)],
                correlations[(b, k)]
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(name: &str, value: f64) -> ParameterEstimate {
        ParameterEstimate {
            name: name.to_string(),
            value,
            std_error: 0.5,
            p_value: 0.01,
        }
    }

    #[test]
    fn point_table_has_one_column_per_variable() {
        let points = [FittedPoint {
            x: vec![1.0, 2.0],
            y: 3.0,
            fitted: 2.5,
            residual: 0.5,
            std_error: 0.1,
            lower: 2.3,
            upper: 2.7,
        }];
        let text = point_table("a + b * x", 2, &points);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Y = a + b * x");
        assert!(lines[1].contains("x2"));
        assert_eq!(lines[1].len(), 8 * CELL);
        assert_eq!(lines[2].len(), 8 * CELL);
        assert!(lines[2].contains("2.5000"));
    }

    #[test]
    fn covariance_lists_upper_triangle() {
        let params = [estimate("a", 1.0), estimate("b", 2.0)];
        let cov = Matrix::from_row_slice(2, 2, &[1.0, 0.5, 0.5, 4.0]);
        let corr = Matrix::from_row_slice(2, 2, &[1.0, 0.25, 0.25, 1.0]);
        let text = covariance_table(&params, &cov, &corr);
        assert_eq!(text.lines().count(), 4);
        assert!(text.contains("B(a,b) = B(b,a) = 5.000000e-1; r = 0.2500"));
    }

    #[test]
    fn parameter_lines() {
        let text = parameter_table(&[estimate("a", 1.25)]);
        assert!(text.contains("a = 1.250000 +/- 0.500000; p = 0.0100"));
    }
}
