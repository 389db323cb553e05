//! Student-t tail probabilities for parameter p-values and confidence bands.
//!
//! Degrees of freedom are integral, which allows the closed-form series for
//! the t distribution instead of an incomplete beta function.

use std::f64::consts::FRAC_PI_2;

/// Two-sided tail probability `P(|T| > t)` for `df` degrees of freedom.
///
/// `df` must be at least 1.
pub(crate) fn student_t_cdf(t: f64, df: usize) -> f64 {
    let t = t.abs();
    let angle = (t / (df as f64).sqrt()).atan();
    if df == 1 {
        return 1.0 - angle / FRAC_PI_2;
    }
    let (sin, cos) = angle.sin_cos();
    let last = df as i64 - 3;
    if df % 2 == 1 {
        1.0 - (angle + sin * cos * series(cos * cos, 2, last)) / FRAC_PI_2
    } else {
        1.0 - sin * series(cos * cos, 1, last)
    }
}

/// `1 + Σ Π r·c/(c + 1)` for `c = start, start + 2, ..., <= last`.
fn series(r: f64, start: i64, last: i64) -> f64 {
    let mut term = 1.0;
    let mut total = 1.0;
    let mut c = start;
    while c <= last {
        term *= r * c as f64 / (c as f64 + 1.0);
        total += term;
        c += 2;
    }
    total
}

/// Critical value `t` with `student_t_cdf(t, df) == p`, found by bisection.
pub(crate) fn inverse_student_t_cdf(p: f64, df: usize) -> f64 {
    // Bisect on n = 1 / (1 + t), which maps t in [0, inf) onto (0, 1].
    let mut n = 0.5;
    let mut step = 0.5;
    let mut t = 0.0;
    while step > 1e-15 {
        t = 1.0 / n - 1.0;
        step /= 2.0;
        if student_t_cdf(t, df) > p {
            n -= step;
        } else {
            n += step;
        }
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn critical_values_match_tables() {
        assert_relative_eq!(inverse_student_t_cdf(0.05, 1), 12.706, epsilon = 1e-3);
        assert_relative_eq!(inverse_student_t_cdf(0.05, 2), 4.303, epsilon = 1e-3);
        assert_relative_eq!(inverse_student_t_cdf(0.05, 10), 2.228, epsilon = 1e-3);
        assert_relative_eq!(inverse_student_t_cdf(0.05, 30), 2.042, epsilon = 1e-3);
    }

    #[test]
    fn tail_probability_inverts_critical_value() {
        assert_relative_eq!(student_t_cdf(2.228, 10), 0.05, epsilon = 1e-4);
        assert_relative_eq!(student_t_cdf(1.0, 1), 0.5, epsilon = 1e-12);
        assert_relative_eq!(student_t_cdf(0.0, 7), 1.0, epsilon = 1e-12);
        assert_eq!(student_t_cdf(-2.0, 5), student_t_cdf(2.0, 5));
    }

    #[test]
    fn infinite_statistic_has_zero_tail() {
        assert!(student_t_cdf(f64::INFINITY, 4).abs() < 1e-12);
        assert!(student_t_cdf(f64::NAN, 4).is_nan());
    }
}
