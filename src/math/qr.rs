//! QR factorization by classical Gram-Schmidt.
//!
//! Column `i` of `A` has its projections onto the already-computed orthonormal
//! columns `0..i` subtracted, and the residual is normalized to give column `i`
//! of `Q`. `R` is then `Qᵗ·A`, upper triangular by construction.
//!
//! Numerical notes:
//! - This is *classical*, not modified, Gram-Schmidt. Orthogonality degrades on
//!   ill-conditioned inputs (high-degree polynomial designs on wide x ranges).
//!   The regressions in this crate target low-degree fits where this is fine,
//!   and switching to Householder would change fitted values at the last bits.
//! - A linearly dependent column leaves a zero-norm residual. Rounding rarely
//!   makes it exactly zero, so residuals below [`DEPENDENCE_TOLERANCE`] of the
//!   column norm are flushed to zero. The division by zero is not masked: the
//!   corresponding column of `Q` becomes NaN and the problem surfaces when `R`
//!   is inverted.

use serde::{Deserialize, Serialize};

use crate::domain::{Matrix, Vector};
use crate::error::{FitError, FitResult};

/// Residual norm, relative to the column norm, treated as exact dependence.
pub const DEPENDENCE_TOLERANCE: f64 = 1e-12;

/// `A = Q·R` with orthonormal `Q` (`m x n`) and upper-triangular `R` (`n x n`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrResult {
    pub q: Vec<Vec<f64>>,
    pub r: Vec<Vec<f64>>,
}

/// Factor `a` (m rows, n columns, `m >= n`).
///
/// # Errors
/// [`FitError::Dimension`] if `a` has fewer rows than columns or is empty.
pub fn gram_schmidt(a: &Matrix) -> FitResult<(Matrix, Matrix)> {
    let (m, n) = a.shape();
    if n == 0 || m < n {
        return Err(FitError::dimension(format!(
            "QR needs at least as many rows as columns, got {m}x{n}"
        )));
    }

    let mut q = Matrix::zeros(m, n);
    for i in 0..n {
        let col = a.column(i);
        let mut sum = Vector::zeros(m);
        for j in 0..i {
            let e = q.column(j);
            // proj_e(a) = (e·a / e·e) e
            let coeff = e.dot(&col) / e.dot(&e);
            sum.axpy(coeff, &e, 1.0);
        }
        let mut u = &col - &sum;
        if u.norm() <= DEPENDENCE_TOLERANCE * col.norm() {
            u.fill(0.0);
        }
        let norm = u.norm();
        q.set_column(i, &(u / norm));
    }

    let r = q.tr_mul(a);
    Ok((q, r))
}

/// Factor `a` and return both factors as nested rows.
pub fn qr_decompose(a: &Matrix) -> FitResult<QrResult> {
    let (q, r) = gram_schmidt(a)?;
    Ok(QrResult {
        q: crate::domain::matrix_to_rows(&q),
        r: crate::domain::matrix_to_rows(&r),
    })
}
