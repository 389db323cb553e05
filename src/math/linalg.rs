//! Elementary dense linear algebra.
//!
//! Matrices are nalgebra `DMatrix<f64>` containers, but inversion is written out
//! as Gauss-Jordan elimination with partial pivoting so that results match the
//! row-by-row reduction the regression code has always relied on.
//!
//! The dot product is explicit about operand ranks: use the named function for a
//! known pair (`dot_mm`, `dot_mv`, ...) or [`dot`] with an [`Operand`] when the
//! rank is only known at runtime.

use log::debug;

use crate::domain::{Matrix, Vector};
use crate::error::{FitError, FitResult};

/// Relative pivot threshold used by [`invert`].
///
/// A pivot counts as zero when it is not larger than
/// `PIVOT_TOLERANCE * n * max|a_ij|`.
pub const PIVOT_TOLERANCE: f64 = f64::EPSILON;

/// Build a matrix from nested rows.
///
/// # Errors
/// [`FitError::Dimension`] if there are no rows, no columns, or the rows have
/// different lengths.
pub fn matrix_from_rows(rows: &[Vec<f64>]) -> FitResult<Matrix> {
    let Some(first) = rows.first() else {
        return Err(FitError::dimension("matrix has no rows"));
    };
    let n = first.len();
    if n == 0 {
        return Err(FitError::dimension("matrix has no columns"));
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n) {
        return Err(FitError::dimension(format!(
            "row {i} has {} columns, expected {n}",
            row.len()
        )));
    }
    Ok(Matrix::from_fn(rows.len(), n, |i, j| rows[i][j]))
}

/// `aᵗ`.
pub fn transpose(a: &Matrix) -> Matrix {
    a.transpose()
}

/// `n x n` identity matrix.
pub fn identity(n: usize) -> Matrix {
    Matrix::identity(n, n)
}

/// Square matrix with `d` on the diagonal.
pub fn diag(d: &[f64]) -> Matrix {
    Matrix::from_diagonal(&Vector::from_column_slice(d))
}

/// Vector · vector.
pub fn dot_vv(a: &Vector, b: &Vector) -> FitResult<f64> {
    if a.len() != b.len() {
        return Err(FitError::dimension(format!(
            "vector lengths differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(a.dot(b))
}

/// Matrix · vector.
pub fn dot_mv(a: &Matrix, v: &Vector) -> FitResult<Vector> {
    if a.ncols() != v.len() {
        return Err(FitError::dimension(format!(
            "cannot multiply {}x{} matrix by vector of length {}",
            a.nrows(),
            a.ncols(),
            v.len()
        )));
    }
    Ok(a * v)
}

/// Vector · matrix, treating the vector as a row.
pub fn dot_vm(v: &Vector, a: &Matrix) -> FitResult<Vector> {
    if v.len() != a.nrows() {
        return Err(FitError::dimension(format!(
            "cannot multiply vector of length {} by {}x{} matrix",
            v.len(),
            a.nrows(),
            a.ncols()
        )));
    }
    Ok(a.tr_mul(v))
}

/// Matrix · matrix.
pub fn dot_mm(a: &Matrix, b: &Matrix) -> FitResult<Matrix> {
    if a.ncols() != b.nrows() {
        return Err(FitError::dimension(format!(
            "cannot multiply {}x{} by {}x{}",
            a.nrows(),
            a.ncols(),
            b.nrows(),
            b.ncols()
        )));
    }
    Ok(a * b)
}

/// Every element of `v` times `s`.
pub fn scale_vector(v: &Vector, s: f64) -> Vector {
    v * s
}

/// Operand of the rank-polymorphic [`dot`].
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Scalar(f64),
    Vector(Vector),
    Matrix(Matrix),
}

impl Operand {
    fn kind(&self) -> &'static str {
        match self {
            Operand::Scalar(_) => "scalar",
            Operand::Vector(_) => "vector",
            Operand::Matrix(_) => "matrix",
        }
    }
}

/// Product of two operands of rank 0, 1 or 2.
///
/// Supported pairs: matrix·matrix, matrix·vector, vector·matrix, vector·vector,
/// vector·scalar, scalar·vector and scalar·scalar.
///
/// # Errors
/// - [`FitError::InvalidOperand`] for scalar·matrix and matrix·scalar.
/// - [`FitError::Dimension`] when inner dimensions disagree.
pub fn dot(a: &Operand, b: &Operand) -> FitResult<Operand> {
    match (a, b) {
        (Operand::Matrix(x), Operand::Matrix(y)) => dot_mm(x, y).map(Operand::Matrix),
        (Operand::Matrix(x), Operand::Vector(y)) => dot_mv(x, y).map(Operand::Vector),
        (Operand::Vector(x), Operand::Matrix(y)) => dot_vm(x, y).map(Operand::Vector),
        (Operand::Vector(x), Operand::Vector(y)) => dot_vv(x, y).map(Operand::Scalar),
        (Operand::Vector(x), Operand::Scalar(s)) | (Operand::Scalar(s), Operand::Vector(x)) => {
            Ok(Operand::Vector(scale_vector(x, *s)))
        }
        (Operand::Scalar(x), Operand::Scalar(y)) => Ok(Operand::Scalar(x * y)),
        (Operand::Scalar(_), Operand::Matrix(_)) | (Operand::Matrix(_), Operand::Scalar(_)) => {
            Err(FitError::InvalidOperand {
                left: a.kind(),
                right: b.kind(),
            })
        }
    }
}

/// Invert a square matrix by Gauss-Jordan elimination with partial pivoting.
///
/// The input is cloned; the caller's matrix is never modified.
///
/// # Errors
/// - [`FitError::Dimension`] if `a` is not square or is empty.
/// - [`FitError::SingularMatrix`] if a column has no pivot above the
///   near-zero threshold (including NaN columns).
pub fn invert(a: &Matrix) -> FitResult<Matrix> {
    let n = a.nrows();
    if n == 0 || a.ncols() != n {
        return Err(FitError::dimension(format!(
            "cannot invert a {}x{} matrix",
            a.nrows(),
            a.ncols()
        )));
    }

    let scale = a.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let tol = PIVOT_TOLERANCE * n as f64 * scale;

    let mut work = a.clone();
    let mut inv = identity(n);

    for j in 0..n {
        // Largest absolute value at or below the diagonal. NaN never wins.
        let mut i0 = j;
        let mut v0 = -1.0;
        for i in j..n {
            let k = work[(i, j)].abs();
            if k > v0 {
                i0 = i;
                v0 = k;
            }
        }
        if !(v0 > tol) {
            debug!("invert: no usable pivot in column {j} (best {v0:e}, tol {tol:e})");
            return Err(FitError::SingularMatrix { column: j });
        }

        work.swap_rows(i0, j);
        inv.swap_rows(i0, j);

        let pivot = work[(j, j)];
        for k in j..n {
            work[(j, k)] /= pivot;
        }
        for k in 0..n {
            inv[(j, k)] /= pivot;
        }

        for i in 0..n {
            if i == j {
                continue;
            }
            let x = work[(i, j)];
            if x == 0.0 {
                continue;
            }
            work[(i, j)] = 0.0;
            for k in (j + 1)..n {
                work[(i, k)] -= work[(j, k)] * x;
            }
            for k in 0..n {
                inv[(i, k)] -= inv[(j, k)] * x;
            }
        }
    }

    Ok(inv)
}
