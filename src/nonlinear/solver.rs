//! Iterative weighted least squares for arbitrary models.
//!
//! Every iteration linearizes the model around the current parameters with
//! finite differences, accumulates the normal equations of the weighted
//! residuals and solves them by in-place Gauss-Jordan elimination. The same
//! elimination leaves the inverse of the information matrix behind, which
//! gives standard errors, covariances and error correlations.
//!
//! The loop stops when
//! - the RMS error becomes NaN ([`SolverState::Diverged`]),
//! - from the third iteration on, the RMS error stops decreasing
//!   ([`SolverState::Converged`]), or
//! - the iteration budget runs out ([`SolverState::MaxIterationsReached`]).
//!
//! An iteration that triggers a stop is discarded; the reported fit is the last
//! accepted one. All state lives in the call, so concurrent fits are
//! independent and repeated calls with the same input give identical results.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::domain::{MAX_PARAMETERS, Matrix, Observation, XYPoint, matrix_to_rows};
use crate::error::{FitError, FitResult};
use crate::nonlinear::equation::{Equation, Param};
use crate::nonlinear::options::{ErrorWeighting, MIN_STD_ERROR, NonlinearOptions, SolverSettings};
use crate::nonlinear::report;
use crate::nonlinear::student_t::{inverse_student_t_cdf, student_t_cdf};

/// Forward-difference step as a fraction of the parameter value.
const DERIVATIVE_FRACTION: f64 = 1e-3;

/// Step used for a parameter that is exactly zero.
const ZERO_PARAMETER_STEP: f64 = 1e-4;

/// Two-sided level of the confidence band around fitted values.
const CONFIDENCE_LEVEL: f64 = 0.05;

/// Lifecycle of a nonlinear fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverState {
    Initializing,
    Iterating,
    Converged,
    MaxIterationsReached,
    Diverged,
}

impl SolverState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SolverState::Converged | SolverState::MaxIterationsReached | SolverState::Diverged
        )
    }
}

/// One fitted parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterEstimate {
    pub name: String,
    pub value: f64,
    pub std_error: f64,
    /// Two-sided p-value of `value / std_error` against zero.
    pub p_value: f64,
}

/// Per-observation output of the last accepted iteration.
///
/// `fitted`, `lower` and `upper` are back-transformed to the scale of `y`;
/// `std_error` stays on the transformed scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPoint {
    /// Untransformed independent variables.
    pub x: Vec<f64>,
    pub y: f64,
    pub fitted: f64,
    /// `y - fitted`.
    pub residual: f64,
    pub std_error: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Result of [`nonlinear_regression`].
///
/// The last accepted iteration linearizes at one parameter vector and then
/// steps away from it. `points`, `rms_error`, `text` and the other
/// diagnostics describe the vector the step started from, while `parameters`
/// hold the values after the step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonlinearFit {
    /// How the loop ended. On [`SolverState::Diverged`], `parameters` are the
    /// values whose evaluation produced the NaN, and the diagnostics belong to
    /// the step before.
    pub state: SolverState,
    /// Equation label.
    pub equation: String,
    /// Point table followed by the fit summary.
    pub text: String,
    pub parameter_estimates: String,
    pub covariance_report: String,
    pub rsquared: f64,
    pub correlation: f64,
    /// Values after the last accepted step, one ahead of `points`.
    pub parameters: Vec<ParameterEstimate>,
    pub covariance: Vec<Vec<f64>>,
    pub correlations: Vec<Vec<f64>>,
    pub rms_error: f64,
    pub sum_of_squares: f64,
    pub aic: f64,
    /// Small-sample corrected AIC; equal to `aic` when `n <= p + 2`.
    pub aicc: f64,
    pub degrees_of_freedom: usize,
    /// Accepted iterations.
    pub iterations: usize,
    /// RMS error of every accepted iteration.
    pub rms_history: Vec<f64>,
    pub points: Vec<FittedPoint>,
}

impl NonlinearFit {
    pub fn converged(&self) -> bool {
        self.state == SolverState::Converged
    }

    /// Fitted value of `param`, if the fit has that many parameters.
    pub fn value(&self, param: Param) -> Option<f64> {
        self.parameters.get(param.index()).map(|p| p.value)
    }

    pub fn values(&self) -> Vec<f64> {
        self.parameters.iter().map(|p| p.value).collect()
    }

    /// Turn a diverged fit into [`FitError::Convergence`].
    pub fn into_converged(self) -> FitResult<Self> {
        match self.state {
            SolverState::Diverged => Err(FitError::Convergence {
                iterations: self.iterations,
            }),
            _ => Ok(self),
        }
    }
}

/// Fit `options.equation` to an xy series.
pub fn nonlinear_regression(series: &[XYPoint], options: &NonlinearOptions) -> FitResult<NonlinearFit> {
    let observations: Vec<Observation> = series.iter().copied().map(Observation::from).collect();
    nonlinear_regression_observations(&observations, options)
}

/// Fit `options.equation` to observations with up to eight variables each.
///
/// Divergence is reported through [`NonlinearFit::state`], not as an error;
/// use [`NonlinearFit::into_converged`] to treat it as one.
///
/// # Errors
/// - [`FitError::Dimension`] for empty or inconsistent observations, a bad
///   parameter count, or no remaining degree of freedom.
/// - [`FitError::InvalidOption`] for unusable settings, equation bindings or
///   missing external weights.
pub fn nonlinear_regression_observations(
    observations: &[Observation],
    options: &NonlinearOptions,
) -> FitResult<NonlinearFit> {
    let problem = Problem::prepare(observations, options)?;
    let budget = options.settings.effective_iterations();
    debug!(
        "nonlinear regression \"{}\": {} points, {} parameters, budget {budget}",
        options.equation.label(),
        problem.points.len(),
        problem.n_params
    );

    let mut carry = Carry::new(problem.n_params);
    let mut params = options.initial.clone();
    let mut history: Vec<f64> = Vec::new();
    let mut accepted: Option<Iteration> = None;
    let mut state = SolverState::Iterating;

    for it in 0..budget {
        let step = problem.iterate(&params, &mut carry);
        if step.rms.is_nan() {
            warn!("nonlinear regression diverged at iteration {it}");
            state = SolverState::Diverged;
            break;
        }
        if it > 1 && history.last().is_some_and(|&prev| prev <= step.rms) {
            state = SolverState::Converged;
            break;
        }
        debug!("iteration {it}: rms={:.6e}", step.rms);
        history.push(step.rms);
        params.clone_from(&step.params);
        accepted = Some(step);
    }
    if state == SolverState::Iterating {
        state = SolverState::MaxIterationsReached;
    }
    debug!("nonlinear regression finished: {state:?} after {} iterations", history.len());

    let last = accepted.unwrap_or_else(|| Iteration::unfitted(&options.initial));
    Ok(problem.finish(state, last, history))
}

/// Observation after replicate pooling, weighting and transforms.
struct PreparedPoint {
    x: Vec<f64>,
    /// Transformed variables passed to the equation.
    vars: Vec<f64>,
    y: f64,
    /// Transformed response.
    y_fit: f64,
    /// Standard error of `y_fit`.
    u: f64,
}

struct Problem<'a> {
    equation: &'a Equation,
    settings: &'a SolverSettings,
    points: Vec<PreparedPoint>,
    n_params: usize,
    n_vars: usize,
    dgf: usize,
    /// Two-sided critical t for the confidence band; depends only on `dgf`.
    t_crit: f64,
}

/// Values one iteration hands to the next.
struct Carry {
    covariance: Matrix,
    weighted_mean: f64,
}

impl Carry {
    fn new(n_params: usize) -> Self {
        Self {
            covariance: Matrix::zeros(n_params, n_params),
            weighted_mean: 0.0,
        }
    }
}

struct Iteration {
    params: Vec<f64>,
    std_errors: Vec<f64>,
    p_values: Vec<f64>,
    covariance: Matrix,
    correlations: Matrix,
    rms: f64,
    ssq: f64,
    rsquared: f64,
    correlation: f64,
    aic: f64,
    aicc: f64,
    points: Vec<FittedPoint>,
}

impl Iteration {
    /// Placeholder when no iteration was accepted.
    fn unfitted(initial: &[f64]) -> Self {
        let p = initial.len();
        Self {
            params: initial.to_vec(),
            std_errors: vec![f64::NAN; p],
            p_values: vec![f64::NAN; p],
            covariance: Matrix::from_element(p, p, f64::NAN),
            correlations: Matrix::from_element(p, p, f64::NAN),
            rms: f64::NAN,
            ssq: f64::NAN,
            rsquared: f64::NAN,
            correlation: f64::NAN,
            aic: f64::NAN,
            aicc: f64::NAN,
            points: Vec::new(),
        }
    }
}

impl<'a> Problem<'a> {
    fn prepare(observations: &[Observation], options: &'a NonlinearOptions) -> FitResult<Self> {
        let settings = &options.settings;
        settings.validate()?;

        let Some(first) = observations.first() else {
            return Err(FitError::dimension("no observations to fit"));
        };
        let n_vars = first.x.len();
        if n_vars == 0 || n_vars > MAX_PARAMETERS {
            return Err(FitError::dimension(format!(
                "observations need 1..={MAX_PARAMETERS} variables, got {n_vars}"
            )));
        }
        if let Some(bad) = observations.iter().position(|o| o.x.len() != n_vars) {
            return Err(FitError::dimension(format!(
                "observation {bad} has {} variables, expected {n_vars}",
                observations[bad].x.len()
            )));
        }

        let n_params = options.initial.len();
        if n_params == 0 || n_params > MAX_PARAMETERS {
            return Err(FitError::dimension(format!(
                "need 1..={MAX_PARAMETERS} initial values, got {n_params}"
            )));
        }
        options.equation.validate(n_params, n_vars)?;

        let raw: Vec<(Vec<f64>, f64, f64)> = match settings.error_weighting {
            ErrorWeighting::Equal => observations.iter().map(|o| (o.x.clone(), o.y, 1.0)).collect(),
            ErrorWeighting::Relative => observations
                .iter()
                .map(|o| (o.x.clone(), o.y, o.y.abs()))
                .collect(),
            ErrorWeighting::Counts => observations
                .iter()
                .map(|o| (o.x.clone(), o.y, o.y.sqrt()))
                .collect(),
            ErrorWeighting::ExternalWeights => {
                let weights = options.weights.as_deref().ok_or_else(|| {
                    FitError::invalid_option("external weighting requires per-point weights")
                })?;
                if weights.len() != observations.len() {
                    return Err(FitError::dimension(format!(
                        "{} weights for {} observations",
                        weights.len(),
                        observations.len()
                    )));
                }
                observations
                    .iter()
                    .zip(weights)
                    .map(|(o, &u)| (o.x.clone(), o.y, u))
                    .collect()
            }
            ErrorWeighting::Replicates => pool_replicates(observations),
        };

        let points: Vec<PreparedPoint> = raw
            .into_iter()
            .map(|(x, y, u)| {
                let u = if u == 0.0 { MIN_STD_ERROR } else { u };
                let vars = x
                    .iter()
                    .zip(&settings.x_transforms)
                    .map(|(&v, t)| t.apply(v))
                    .collect();
                PreparedPoint {
                    vars,
                    y_fit: settings.y_transform.apply(y),
                    u: settings.y_transform.propagate(u, y),
                    x,
                    y,
                }
            })
            .collect();

        if points.len() <= n_params {
            return Err(FitError::dimension(format!(
                "{} points leave no degree of freedom for {n_params} parameters",
                points.len()
            )));
        }
        let dgf = points.len() - n_params;

        Ok(Self {
            equation: &options.equation,
            settings,
            points,
            n_params,
            n_vars,
            dgf,
            t_crit: inverse_student_t_cdf(CONFIDENCE_LEVEL, dgf),
        })
    }

    fn iterate(&self, params: &[f64], carry: &mut Carry) -> Iteration {
        let p = self.n_params;
        let settings = self.settings;
        let t_crit = self.t_crit;
        let quantile = settings.percentile / 100.0;

        let mut info = Matrix::zeros(p, p + 1);
        let mut der = vec![0.0; p + 1];
        let mut shifted = params.to_vec();
        let mut scratch = Vec::new();
        let (mut ssq, mut sw, mut sc, mut sx) = (0.0, 0.0, 0.0, 0.0);
        let mut points = Vec::with_capacity(self.points.len());

        for pt in &self.points {
            let yc = self.equation.evaluate(params, &pt.vars, &mut scratch);

            let mut u = pt.u;
            if settings.least_absolute_value {
                let gap = (pt.y_fit - yc).abs();
                let share = if pt.y_fit < yc { quantile } else { 1.0 - quantile };
                u *= (share * gap).sqrt().max(MIN_STD_ERROR * pt.y_fit);
            }

            let w = 1.0 / (u * u);
            sw += w;
            sc += yc * w;
            sx += (pt.y_fit - carry.weighted_mean).powi(2) * w;

            for b in 0..p {
                let base = params[b];
                let step = if base == 0.0 {
                    ZERO_PARAMETER_STEP
                } else {
                    base * DERIVATIVE_FRACTION
                };
                shifted[b] = base + step;
                let up = self.equation.evaluate(&shifted, &pt.vars, &mut scratch);
                der[b] = if settings.centered_derivatives {
                    shifted[b] = base - step;
                    let down = self.equation.evaluate(&shifted, &pt.vars, &mut scratch);
                    (up - down) / (2.0 * step * u)
                } else {
                    (up - yc) / (step * u)
                };
                shifted[b] = base;
            }
            der[p] = (pt.y_fit - yc) / u;
            ssq += der[p] * der[p];

            for b in 0..p {
                for k in 0..=p {
                    info[(b, k)] += der[b] * der[k];
                }
            }

            // Band from the previous iteration's covariance.
            let mut var = 0.0;
            for b in 0..p {
                var += carry.covariance[(b, b)] * der[b] * der[b];
                for k in b + 1..p {
                    var += 2.0 * carry.covariance[(b, k)] * der[b] * der[k];
                }
            }
            let std_error = u * var.sqrt();

            let y_transform = settings.y_transform;
            let fitted = y_transform.invert(yc);
            let lo = y_transform.invert(yc - t_crit * std_error);
            let hi = y_transform.invert(yc + t_crit * std_error);
            let (lower, upper) = if lo <= hi { (lo, hi) } else { (hi, lo) };

            points.push(FittedPoint {
                x: pt.x.clone(),
                y: pt.y,
                fitted,
                residual: pt.y - fitted,
                std_error,
                lower,
                upper,
            });
        }

        let spread = sx / sw;
        carry.weighted_mean = sc / sw;
        let rsquared = (spread - ssq / sw) / spread;
        let rms = (ssq / self.dgf.max(1) as f64).sqrt();

        let n = self.points.len() as f64;
        let k = (p + 1) as f64;
        let aic = n * (ssq / n).ln() + 2.0 * k;
        let aicc = if self.points.len() > p + 2 {
            aic + 2.0 * k * (k + 1.0) / (n - k - 1.0)
        } else {
            aic
        };

        reduce_in_place(&mut info);

        let rms_sq = rms * rms;
        let mut new_params = Vec::with_capacity(p);
        let mut std_errors = Vec::with_capacity(p);
        let mut p_values = Vec::with_capacity(p);
        for i in 0..p {
            let value = params[i] + settings.relaxation_factor * info[(i, p)];
            let se = rms * info[(i, i)].sqrt();
            new_params.push(value);
            std_errors.push(se);
            p_values.push(student_t_cdf(value / se, self.dgf));
        }

        let mut covariance = Matrix::zeros(p, p);
        let mut correlations = Matrix::zeros(p, p);
        for b in 0..p {
            for k in b..p {
                let c = info[(b, k)] * rms_sq;
                let r = info[(b, k)] / (info[(b, b)] * info[(k, k)]).sqrt();
                covariance[(b, k)] = c;
                covariance[(k, b)] = c;
                correlations[(b, k)] = r;
                correlations[(k, b)] = r;
            }
        }
        carry.covariance.clone_from(&covariance);

        Iteration {
            params: new_params,
            std_errors,
            p_values,
            covariance,
            correlations,
            rms,
            ssq,
            rsquared,
            correlation: rsquared.sqrt(),
            aic,
            aicc,
            points,
        }
    }

    fn finish(&self, state: SolverState, last: Iteration, rms_history: Vec<f64>) -> NonlinearFit {
        let parameters: Vec<ParameterEstimate> = last
            .params
            .iter()
            .zip(Param::ALL)
            .enumerate()
            .map(|(i, (&value, param))| ParameterEstimate {
                name: param.name().to_string(),
                value,
                std_error: last.std_errors[i],
                p_value: last.p_values[i],
            })
            .collect();

        let label = self.equation.label();
        let mut text = report::point_table(label, self.n_vars, &last.points);
        text.push_str(&report::fit_summary(&report::Summary {
            correlation: last.correlation,
            rsquared: last.rsquared,
            rms_error: last.rms,
            degrees_of_freedom: self.dgf,
            sum_of_squares: last.ssq,
            aic: last.aic,
            aicc: last.aicc,
        }));

        NonlinearFit {
            state,
            equation: label.to_string(),
            text,
            parameter_estimates: report::parameter_table(&parameters),
            covariance_report: report::covariance_table(
                &parameters,
                &last.covariance,
                &last.correlations,
            ),
            rsquared: last.rsquared,
            correlation: last.correlation,
            parameters,
            covariance: matrix_to_rows(&last.covariance),
            correlations: matrix_to_rows(&last.correlations),
            rms_error: last.rms,
            sum_of_squares: last.ssq,
            aic: last.aic,
            aicc: last.aicc,
            degrees_of_freedom: self.dgf,
            iterations: rms_history.len(),
            rms_history,
            points: last.points,
        }
    }
}

/// Pool observations with identical x into one point at the group mean, with
/// the standard error of that mean as its `U`. Groups keep first-seen order.
fn pool_replicates(observations: &[Observation]) -> Vec<(Vec<f64>, f64, f64)> {
    // (x, Σy, Σy², count)
    let mut groups: Vec<(Vec<f64>, f64, f64, usize)> = Vec::new();
    for o in observations {
        match groups.iter_mut().find(|g| g.0 == o.x) {
            Some(g) => {
                g.1 += o.y;
                g.2 += o.y * o.y;
                g.3 += 1;
            }
            None => groups.push((o.x.clone(), o.y, o.y * o.y, 1)),
        }
    }
    groups
        .into_iter()
        .map(|(x, sum, sum_sq, count)| {
            let c = count as f64;
            let mean = sum / c;
            let u = ((sum_sq / c - mean * mean).abs() / c).sqrt();
            (x, mean, u)
        })
        .collect()
}

/// Gauss-Jordan elimination without pivoting on the augmented `p x (p+1)`
/// system. Afterwards the left block holds the inverse of the original left
/// block and the last column holds the solution.
///
/// A zero pivot produces non-finite entries, which surface as a NaN RMS error
/// on the next iteration.
fn reduce_in_place(a: &mut Matrix) {
    let (rows, cols) = a.shape();
    for i in 0..rows {
        let pivot = a[(i, i)];
        a[(i, i)] = 1.0;
        for k in 0..cols {
            a[(i, k)] /= pivot;
        }
        for b in 0..rows {
            if b == i {
                continue;
            }
            let g = a[(b, i)];
            a[(b, i)] = 0.0;
            for k in 0..cols {
                a[(b, k)] -= g * a[(i, k)];
            }
        }
    }
}
