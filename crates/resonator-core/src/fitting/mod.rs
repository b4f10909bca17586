//! Least-squares fitting of resonator models
//!
//! - [`options`]: solver and weighting configuration
//! - [`least_squares`]: Levenberg-Marquardt / Gauss-Newton engine
//! - [`result`]: fit statistics and report
//! - [`fitter`]: the resonator fitter wrapping a composite model

pub mod fitter;
pub mod least_squares;
pub mod options;
pub mod result;

pub use fitter::{ResonatorFitter, TLResonatorFitter};
pub use options::{FitOptions, Solver, Weighting};
pub use result::FitResult;
