//! Numerical constants for parameter transforms and least-squares fitting
//!
//! Provides standardized tolerance values and solver defaults used
//! throughout the library.

/// Relative step for forward-difference Jacobians (sqrt of machine epsilon).
pub const FD_STEP: f64 = 1.490_116_119_384_765_6e-8;

/// Default relative tolerance on the reduction of chi-square.
pub const DEFAULT_FTOL: f64 = 1.5e-8;

/// Default relative tolerance on the scaled parameter step.
pub const DEFAULT_XTOL: f64 = 1.5e-8;

/// Default tolerance on the scaled gradient (disabled at zero).
pub const DEFAULT_GTOL: f64 = 0.0;

/// Function evaluation budget per varying parameter (plus one).
pub const MAX_NFEV_PER_PARAM: usize = 2000;

/// Damping applied to the first Levenberg-Marquardt step.
pub const LM_INITIAL_DAMPING: f64 = 0.1;

/// Factor by which damping grows on a rejected step and shrinks on an accepted one.
pub const LM_DAMPING_FACTOR: f64 = 10.0;

/// Lower bound on damping after repeated accepted steps.
pub const LM_MIN_DAMPING: f64 = 1e-15;

/// Damping above which no descent direction is left to try.
pub const LM_MAX_DAMPING: f64 = 1e16;

/// Maximum number of step halvings per Gauss-Newton iteration.
pub const GN_MAX_HALVINGS: usize = 30;

/// Relative singular value cutoff for pseudo-inverses and covariance.
pub const SVD_TOLERANCE: f64 = 1e-14;

/// Tolerance for detecting zero-norm Jacobian columns.
pub const NORM_TOLERANCE: f64 = 1e-300;
