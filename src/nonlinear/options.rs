//! Solver options.
//!
//! [`SolverSettings`] holds every tunable that is plain data and can be loaded
//! from JSON; [`NonlinearOptions`] adds the equation, the initial guesses and
//! optional external weights.

use serde::{Deserialize, Serialize};

use crate::domain::MAX_PARAMETERS;
use crate::error::{FitError, FitResult};
use crate::nonlinear::equation::Equation;

/// Iteration budget when none (or an excessive one) is requested.
pub const DEFAULT_ITERATIONS: usize = 200;

/// Largest accepted iteration budget.
pub const MAX_ITERATIONS: usize = 2000;

/// Floor applied to a zero per-point standard error.
pub(crate) const MIN_STD_ERROR: f64 = 0.001;

/// How the per-point standard error `U` is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorWeighting {
    /// `U = 1`.
    #[default]
    Equal,
    /// `U = |y|`.
    Relative,
    /// `U = √y`, for count data.
    Counts,
    /// `U` read from [`NonlinearOptions::weights`].
    ExternalWeights,
    /// Observations sharing the same x are pooled: `y` becomes the group mean
    /// and `U` its standard error.
    Replicates,
}

/// Transform applied to y or to an independent variable before fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    #[default]
    Identity,
    Ln,
    Sqrt,
    Reciprocal,
}

impl Transform {
    pub fn apply(self, v: f64) -> f64 {
        match self {
            Transform::Identity => v,
            Transform::Ln => v.ln(),
            Transform::Sqrt => v.sqrt(),
            Transform::Reciprocal => 1.0 / v,
        }
    }

    pub fn invert(self, v: f64) -> f64 {
        match self {
            Transform::Identity => v,
            Transform::Ln => v.exp(),
            Transform::Sqrt => v * v,
            Transform::Reciprocal => 1.0 / v,
        }
    }

    /// Standard error of `apply(y)` given standard error `u` of `y`
    /// (first-order propagation).
    pub fn propagate(self, u: f64, y: f64) -> f64 {
        match self {
            Transform::Identity => u,
            Transform::Ln => u / y.abs(),
            Transform::Sqrt => u / (2.0 * y.sqrt()),
            Transform::Reciprocal => u / (y * y),
        }
    }
}

/// Serializable solver tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Iteration budget. Values above [`MAX_ITERATIONS`] fall back to
    /// [`DEFAULT_ITERATIONS`].
    pub iterations: usize,
    /// Multiplier on each parameter update. Must be finite and positive.
    pub relaxation_factor: f64,
    pub error_weighting: ErrorWeighting,
    pub y_transform: Transform,
    /// One transform per independent variable `x1..x8`.
    pub x_transforms: [Transform; MAX_PARAMETERS],
    /// Use centered instead of forward finite differences.
    pub centered_derivatives: bool,
    /// Reweight each point by its distance from the fit so the solution tracks
    /// `percentile` instead of the mean.
    pub least_absolute_value: bool,
    /// Target percentile for least-absolute-value fitting, `0..=100`.
    pub percentile: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            relaxation_factor: 1.0,
            error_weighting: ErrorWeighting::Equal,
            y_transform: Transform::Identity,
            x_transforms: [Transform::Identity; MAX_PARAMETERS],
            centered_derivatives: false,
            least_absolute_value: false,
            percentile: 50.0,
        }
    }
}

impl SolverSettings {
    /// Iteration budget after applying the upper bound.
    pub fn effective_iterations(&self) -> usize {
        if self.iterations > MAX_ITERATIONS {
            DEFAULT_ITERATIONS
        } else {
            self.iterations
        }
    }

    pub(crate) fn validate(&self) -> FitResult<()> {
        if !(self.relaxation_factor.is_finite() && self.relaxation_factor > 0.0) {
            return Err(FitError::invalid_option(format!(
                "relaxation factor must be finite and positive, got {}",
                self.relaxation_factor
            )));
        }
        if !(0.0..=100.0).contains(&self.percentile) {
            return Err(FitError::invalid_option(format!(
                "percentile must be within 0..=100, got {}",
                self.percentile
            )));
        }
        Ok(())
    }
}

/// Everything the nonlinear solver needs besides the data.
#[derive(Debug, Clone)]
pub struct NonlinearOptions {
    pub equation: Equation,
    /// Initial guesses for `a, b, ...`; the length sets the parameter count.
    pub initial: Vec<f64>,
    /// Per-point standard errors for [`ErrorWeighting::ExternalWeights`].
    pub weights: Option<Vec<f64>>,
    pub settings: SolverSettings,
}

impl NonlinearOptions {
    pub fn new(equation: impl Into<Equation>, initial: Vec<f64>) -> Self {
        Self {
            equation: equation.into(),
            initial,
            weights: None,
            settings: SolverSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SolverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }
}
