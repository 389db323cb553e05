//! Mathematical building blocks: dense linear algebra and QR factorization.

pub mod linalg;
pub mod qr;

pub use linalg::*;
pub use qr::*;
