//! Descriptive statistics over plain slices.
//!
//! Every function is total: inputs for which a statistic is undefined (empty
//! slices, too few values) give `NaN` rather than an error, so results can be
//! dropped into tables without special casing.

/// Sum of all values (`0.0` for an empty slice).
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    sum(values) / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Sample variance (`n - 1` denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    ss / (values.len() as f64 - 1.0)
}

/// Population standard deviation. Needs more than two values.
pub fn stdev(values: &[f64]) -> f64 {
    if values.len() <= 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / values.len() as f64).sqrt()
}

/// Sample standard deviation. Needs more than two values.
pub fn stdevs(values: &[f64]) -> f64 {
    if values.len() <= 2 {
        return f64::NAN;
    }
    variance(values).sqrt()
}

/// Standard error of the mean, from the population standard deviation.
pub fn stderr(values: &[f64]) -> f64 {
    stdev(values) / (values.len() as f64).sqrt()
}

pub fn min(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

pub fn max(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Round to `digits` decimals, halves towards positive infinity.
///
/// `round(2.5, 0) == 3.0` and `round(-2.5, 0) == -2.0`. This is the rounding
/// rule the exponential-decay window refinement is calibrated against.
pub fn round(value: f64, digits: i32) -> f64 {
    if value == 0.0 {
        return 0.0;
    }
    let scale = 10f64.powi(digits);
    (value * scale + 0.5).floor() / scale
}

/// Natural logarithm of each value.
pub fn ln(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v.ln()).collect()
}

/// Base-10 logarithm of each value.
pub fn log10(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v.log10()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn central_tendency() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(sum(&v), 10.0);
        assert_eq!(mean(&v), 2.5);
        assert_eq!(median(&v), 2.5);
        assert_eq!(median(&[5.0, 1.0, 3.0]), 3.0);
        assert_eq!(min(&v), 1.0);
        assert_eq!(max(&v), 4.0);
    }

    #[test]
    fn spread() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(stdev(&v), 2.0, epsilon = 1e-12);
        assert_relative_eq!(variance(&v), 32.0 / 7.0, epsilon = 1e-12);
        assert_relative_eq!(stdevs(&v), (32.0_f64 / 7.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(stderr(&v), 2.0 / 8f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn undefined_inputs_are_nan() {
        assert!(mean(&[]).is_nan());
        assert!(median(&[]).is_nan());
        assert!(stdev(&[1.0, 2.0]).is_nan());
        assert!(min(&[]).is_nan());
        assert_eq!(sum(&[]), 0.0);
    }

    #[test]
    fn round_half_up() {
        assert_eq!(round(2.5, 0), 3.0);
        assert_eq!(round(-2.5, 0), -2.0);
        assert_eq!(round(1.23456, 2), 1.23);
        assert_eq!(round(0.0, 3), 0.0);
    }

    #[test]
    fn logs() {
        assert_relative_eq!(ln(&[std::f64::consts::E])[0], 1.0);
        assert_relative_eq!(log10(&[1000.0])[0], 3.0);
    }
}
