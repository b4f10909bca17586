//! Mathematical functions module
//!
//! Complex-number conversions and the dense linear algebra used by the fitting engine.

pub mod conversions;
pub mod linalg;

pub use conversions::*;
