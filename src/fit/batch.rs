//! Fit many independent series in parallel.
//!
//! Each series is fitted on the rayon pool; results come back in input order
//! with one `FitResult` per series, so one bad series does not hide the rest.

use log::debug;
use rayon::prelude::*;

use crate::domain::XYPoint;
use crate::error::FitResult;
use crate::fit::exp_decay::{ExpDecayFit, exponential_decay_regression};
use crate::fit::polynomial::{PolynomialFit, polynomial_regression};
use crate::nonlinear::{NonlinearFit, NonlinearOptions, nonlinear_regression};

/// Apply `fit` to every series in parallel.
pub fn fit_all<T, F>(series: &[Vec<XYPoint>], fit: F) -> Vec<FitResult<T>>
where
    T: Send,
    F: Fn(&[XYPoint]) -> FitResult<T> + Sync + Send,
{
    debug!("batch fit of {} series", series.len());
    series.par_iter().map(|s| fit(s)).collect()
}

pub fn polynomial_batch(series: &[Vec<XYPoint>], degree: usize) -> Vec<FitResult<PolynomialFit>> {
    fit_all(series, |s| polynomial_regression(s, degree))
}

pub fn exponential_decay_batch(series: &[Vec<XYPoint>]) -> Vec<FitResult<ExpDecayFit>> {
    fit_all(series, exponential_decay_regression)
}

/// Nonlinear fits sharing one set of options.
pub fn nonlinear_batch(
    series: &[Vec<XYPoint>],
    options: &NonlinearOptions,
) -> Vec<FitResult<NonlinearFit>> {
    fit_all(series, |s| nonlinear_regression(s, options))
}
