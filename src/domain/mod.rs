//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - measurement points (`XYPoint`, `Observation`)
//! - the `Matrix` / `Vector` aliases used by the linear-algebra layer

pub mod types;

pub use types::*;
