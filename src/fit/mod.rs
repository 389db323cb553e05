//! Curve fits built on multiple linear regression.
//!
//! Responsibilities:
//!
//! - ordinary least squares through QR (`multiple`)
//! - polynomial and exponential-decay fits that transform data for it
//! - running many fits in parallel (`batch`)

pub mod batch;
pub mod exp_decay;
pub mod multiple;
pub mod polynomial;

pub use batch::*;
pub use exp_decay::*;
pub use multiple::*;
pub use polynomial::*;
