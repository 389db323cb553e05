//! Model equations for the nonlinear solver.
//!
//! An [`Equation`] is either one of four closed-form models or a caller
//! supplied function. Custom functions do not get their arguments by name:
//! the caller declares, in order, which value each argument receives
//! ([`Role`]), and the solver packs a slice accordingly.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::MAX_PARAMETERS;
use crate::error::{FitError, FitResult};

/// Fitted parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Param {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl Param {
    pub const ALL: [Param; MAX_PARAMETERS] = [
        Param::A,
        Param::B,
        Param::C,
        Param::D,
        Param::E,
        Param::F,
        Param::G,
        Param::H,
    ];

    /// Position in the initial-guess vector.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Param::A => "a",
            Param::B => "b",
            Param::C => "c",
            Param::D => "d",
            Param::E => "e",
            Param::F => "f",
            Param::G => "g",
            Param::H => "h",
        }
    }
}

/// What a custom equation receives in one argument position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Current value of a fitted parameter.
    Param(Param),
    /// The (transformed) first independent variable.
    X,
    /// Alias of [`Role::X`], for models written in terms of time.
    T,
    /// The (transformed) k-th independent variable, 1-based.
    Variable(usize),
}

/// The closed-form models available by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinEquation {
    /// `b + a * e(- x / c)`
    OffsetDecay,
    /// `( a - c ) * e( - b * t ) + c`
    ApproachDecay,
    /// `( c + a / ( 1 + b / x ) )`
    Saturation,
    /// `( c + a * a / ( 1 + b / x ) )`
    SquaredSaturation,
}

impl BuiltinEquation {
    pub const ALL: [BuiltinEquation; 4] = [
        BuiltinEquation::OffsetDecay,
        BuiltinEquation::ApproachDecay,
        BuiltinEquation::Saturation,
        BuiltinEquation::SquaredSaturation,
    ];

    /// Formula string, as used in reports and for lookup.
    pub fn formula(self) -> &'static str {
        match self {
            BuiltinEquation::OffsetDecay => "b + a * e(- x / c)",
            BuiltinEquation::ApproachDecay => "( a - c ) * e( - b * t ) + c",
            BuiltinEquation::Saturation => "( c + a / ( 1 + b / x ) )",
            BuiltinEquation::SquaredSaturation => "( c + a * a / ( 1 + b / x ) )",
        }
    }

    /// Look up a model by formula. Whitespace is ignored.
    pub fn from_formula(formula: &str) -> Option<Self> {
        let wanted = squash(formula);
        Self::ALL
            .into_iter()
            .find(|eq| squash(eq.formula()) == wanted)
    }

    /// Number of parameters the formula reads (`a`, `b`, `c`).
    pub fn parameter_count(self) -> usize {
        3
    }

    fn evaluate(self, p: &[f64], x: f64, t: f64) -> f64 {
        let param = |i: usize| p.get(i).copied().unwrap_or(0.0);
        let (a, b, c) = (param(0), param(1), param(2));
        match self {
            BuiltinEquation::OffsetDecay => b + a * (-x / c).exp(),
            BuiltinEquation::ApproachDecay => (a - c) * (-b * t).exp() + c,
            BuiltinEquation::Saturation => c + a / (1.0 + b / x),
            BuiltinEquation::SquaredSaturation => c + a * a / (1.0 + b / x),
        }
    }
}

impl FromStr for BuiltinEquation {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_formula(s)
            .ok_or_else(|| FitError::invalid_option(format!("unknown equation \"{s}\"")))
    }
}

fn squash(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Signature of a custom model: arguments packed in declared [`Role`] order.
pub type EquationFn = dyn Fn(&[f64]) -> f64 + Send + Sync;

/// A caller-supplied model with an explicit argument layout.
///
/// ```
/// use xyfit::nonlinear::{CustomEquation, Param, Role};
///
/// // y = a * x^b
/// let power = CustomEquation::new(
///     "a * x ^ b",
///     vec![Role::X, Role::Param(Param::A), Role::Param(Param::B)],
///     |v| v[1] * v[0].powf(v[2]),
/// );
/// assert_eq!(power.roles().len(), 3);
/// ```
#[derive(Clone)]
pub struct CustomEquation {
    label: String,
    roles: Vec<Role>,
    func: Arc<EquationFn>,
}

impl CustomEquation {
    pub fn new(
        label: impl Into<String>,
        roles: Vec<Role>,
        func: impl Fn(&[f64]) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            roles,
            func: Arc::new(func),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    fn validate(&self, n_params: usize, n_vars: usize) -> FitResult<()> {
        if self.roles.is_empty() {
            return Err(FitError::invalid_option(format!(
                "custom equation \"{}\" declares no arguments",
                self.label
            )));
        }
        for role in &self.roles {
            match *role {
                Role::Param(p) if p.index() >= n_params => {
                    return Err(FitError::invalid_option(format!(
                        "custom equation reads parameter {} but only {n_params} initial values were given",
                        p.name()
                    )));
                }
                Role::Variable(k) if k == 0 || k > n_vars => {
                    return Err(FitError::invalid_option(format!(
                        "custom equation reads variable x{k} but observations have {n_vars}"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl fmt::Debug for CustomEquation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomEquation")
            .field("label", &self.label)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

/// Model fitted by the nonlinear solver.
#[derive(Debug, Clone)]
pub enum Equation {
    Builtin(BuiltinEquation),
    Custom(CustomEquation),
}

impl Equation {
    pub fn label(&self) -> &str {
        match self {
            Equation::Builtin(eq) => eq.formula(),
            Equation::Custom(eq) => eq.label(),
        }
    }

    /// Check the equation against the problem size.
    pub(crate) fn validate(&self, n_params: usize, n_vars: usize) -> FitResult<()> {
        match self {
            Equation::Builtin(eq) => {
                if n_params < eq.parameter_count() {
                    return Err(FitError::invalid_option(format!(
                        "\"{}\" needs {} initial values, got {n_params}",
                        eq.formula(),
                        eq.parameter_count()
                    )));
                }
                Ok(())
            }
            Equation::Custom(eq) => eq.validate(n_params, n_vars),
        }
    }

    /// Evaluate at `params` and transformed variables `vars`.
    ///
    /// `scratch` is reused between calls to avoid allocating per point.
    pub(crate) fn evaluate(&self, params: &[f64], vars: &[f64], scratch: &mut Vec<f64>) -> f64 {
        let x = vars[0];
        match self {
            Equation::Builtin(eq) => eq.evaluate(params, x, x),
            Equation::Custom(eq) => {
                scratch.clear();
                scratch.extend(eq.roles.iter().map(|role| match *role {
                    Role::Param(p) => params.get(p.index()).copied().unwrap_or(0.0),
                    Role::X | Role::T => x,
                    Role::Variable(k) => vars[k - 1],
                }));
                (eq.func)(scratch)
            }
        }
    }
}

impl From<BuiltinEquation> for Equation {
    fn from(eq: BuiltinEquation) -> Self {
        Equation::Builtin(eq)
    }
}

impl From<CustomEquation> for Equation {
    fn from(eq: CustomEquation) -> Self {
        Equation::Custom(eq)
    }
}
