//! Error type shared by every fitting and linear-algebra routine.
//!
//! Degenerate numeric results (NaN R² for a constant response, NaN columns in a
//! rank-deficient QR factorization) are *not* errors: they are returned as is.
//! The variants below cover shape problems, unusable pivots and invalid options.

/// Errors produced by the linear-algebra and regression routines.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum FitError {
    /// Mismatched lengths or shapes (ragged rows, too few points, ...).
    #[error("Dimension error: {0}")]
    Dimension(String),

    /// No pivot above the near-zero threshold was found while inverting.
    #[error("Matrix is singular: no usable pivot in column {column}")]
    SingularMatrix {
        /// Column in which elimination stalled.
        column: usize,
    },

    /// The operand pair is not supported by the dot product.
    #[error("Dot product is not defined for {left} . {right}")]
    InvalidOperand {
        /// Kind of the left operand.
        left: &'static str,
        /// Kind of the right operand.
        right: &'static str,
    },

    /// The nonlinear solver hit a non-finite RMS error.
    #[error("Nonlinear regression diverged after {iterations} accepted iterations")]
    Convergence {
        /// Number of iterations accepted before divergence.
        iterations: usize,
    },

    /// The exponential-decay window refinement shrank below two points.
    #[error("Exponential decay fit failed: suggested window {window} is below 2 points")]
    DecayWindowCollapsed {
        /// Window size suggested by the last linear fit.
        window: f64,
        /// Asymptote estimated before the window refinement.
        asymptote: f64,
        /// R² of the last successful linear fit.
        rsquared: f64,
    },

    /// A caller-supplied option is out of range or inconsistent.
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

impl FitError {
    pub(crate) fn dimension(message: impl Into<String>) -> Self {
        Self::Dimension(message.into())
    }

    pub(crate) fn invalid_option(message: impl Into<String>) -> Self {
        Self::InvalidOption(message.into())
    }
}

/// Result type for fitting operations.
pub type FitResult<T> = Result<T, FitError>;
