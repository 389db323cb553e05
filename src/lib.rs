//! `xyfit`: regression and curve fitting for x/y data series.
//!
//! - [`math`]: dense linear algebra and Gram-Schmidt QR
//! - [`fit`]: multiple linear, polynomial and exponential-decay regression
//! - [`nonlinear`]: iterative least squares for arbitrary equations
//! - [`stats`], [`synthetic`], [`messages`]: helpers around the fits
//!
//! Every routine is synchronous and keeps its state on the stack, so fits can
//! run concurrently (see [`fit::batch`]). Diagnostics go through the `log`
//! facade; the crate never installs a logger.

pub mod domain;
pub mod error;
pub mod fit;
pub mod math;
pub mod messages;
pub mod nonlinear;
pub mod stats;
pub mod synthetic;

pub use domain::{Matrix, Observation, Vector, XYPoint};
pub use error::{FitError, FitResult};
pub use fit::{
    ExpDecayFit, LinearFit, PolynomialEvaluation, PolynomialFit, RegressionResult,
    exponential_decay_regression, exponential_decay_regression_or_sentinel, linear_regression,
    multiple_linear_regression, polynomial_regression, polynomial_regression_with,
};
pub use math::{QrResult, invert as invert_matrix, qr_decompose};
pub use messages::MessageBag;
pub use nonlinear::{
    NonlinearFit, NonlinearOptions, nonlinear_regression, nonlinear_regression_observations,
};
