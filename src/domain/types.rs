//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - handed to callers that report or store fit results themselves

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Dense row-major-indexed matrix of `f64`.
pub type Matrix = DMatrix<f64>;

/// Dense column vector of `f64`.
pub type Vector = DVector<f64>;

/// Maximum number of parameters (`a..h`) and independent variables (`x1..x8`).
pub const MAX_PARAMETERS: usize = 8;

/// A single measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XYPoint {
    pub x: f64,
    pub y: f64,
}

impl XYPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for XYPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for XYPoint {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

/// Build a series from `(x, y)` tuples, keeping measurement order.
pub fn series_from_pairs(pairs: &[(f64, f64)]) -> Vec<XYPoint> {
    pairs.iter().copied().map(XYPoint::from).collect()
}

/// An observation with up to eight independent variables.
///
/// Used by the nonlinear solver; plain x/y series are converted into
/// single-variable observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Independent variables `x1..xk`, `1 <= k <= 8`.
    pub x: Vec<f64>,
    /// Response.
    pub y: f64,
}

impl From<XYPoint> for Observation {
    fn from(p: XYPoint) -> Self {
        Self { x: vec![p.x], y: p.y }
    }
}

/// Nested-row view of a matrix, the shape callers usually hold data in.
pub fn matrix_to_rows(m: &Matrix) -> Vec<Vec<f64>> {
    (0..m.nrows())
        .map(|i| m.row(i).iter().copied().collect())
        .collect()
}
