//! Nonlinear least squares with custom equations, weighting schemes and
//! variable transforms.

pub mod equation;
pub mod options;
mod report;
pub mod solver;
mod student_t;

pub use equation::{BuiltinEquation, CustomEquation, Equation, EquationFn, Param, Role};
pub use options::{
    DEFAULT_ITERATIONS, ErrorWeighting, MAX_ITERATIONS, NonlinearOptions, SolverSettings, Transform,
};
pub use solver::{
    FittedPoint, NonlinearFit, ParameterEstimate, SolverState, nonlinear_regression,
    nonlinear_regression_observations,
};
