//! Fit configuration

use crate::constants::{DEFAULT_FTOL, DEFAULT_GTOL, DEFAULT_XTOL, MAX_NFEV_PER_PARAM};

/// Minimization algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Solver {
    /// Damped Gauss-Newton with adaptive damping
    #[default]
    LevenbergMarquardt,
    /// Undamped Gauss-Newton steps with step halving
    GaussNewton,
}

impl Solver {
    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "lm" | "leastsq" | "levenberg_marquardt" => Some(Solver::LevenbergMarquardt),
            "gn" | "gauss_newton" => Some(Solver::GaussNewton),
            _ => None,
        }
    }
}

/// How per-point standard errors weight the residual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Weighting {
    /// Divide real and imaginary residuals by the matching error parts
    #[default]
    InverseErrors,
    /// Ignore errors; every point has unit weight
    Uniform,
}

impl Weighting {
    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "errors" | "inverse_errors" => Some(Weighting::InverseErrors),
            "uniform" | "none" => Some(Weighting::Uniform),
            _ => None,
        }
    }
}

/// Options forwarded to the least-squares engine
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    pub solver: Solver,
    pub weighting: Weighting,
    /// Maximum residual evaluations; `None` means 2000·(nvarys + 1)
    pub max_nfev: Option<usize>,
    /// Relative tolerance on the chi-square reduction
    pub ftol: f64,
    /// Relative tolerance on the scaled step
    pub xtol: f64,
    /// Tolerance on the scaled gradient
    pub gtol: f64,
    /// Scale the covariance by the reduced chi-square
    pub scale_covar: bool,
    /// Estimate the covariance at the solution
    pub calc_covar: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            solver: Solver::default(),
            weighting: Weighting::default(),
            max_nfev: None,
            ftol: DEFAULT_FTOL,
            xtol: DEFAULT_XTOL,
            gtol: DEFAULT_GTOL,
            scale_covar: true,
            calc_covar: true,
        }
    }
}

impl FitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_max_nfev(mut self, max_nfev: usize) -> Self {
        self.max_nfev = Some(max_nfev);
        self
    }

    /// Evaluation budget for a fit with `nvarys` varying parameters
    pub fn nfev_budget(&self, nvarys: usize) -> usize {
        self.max_nfev.unwrap_or(MAX_NFEV_PER_PARAM * (nvarys + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = FitOptions::default();
        assert_eq!(options.solver, Solver::LevenbergMarquardt);
        assert_eq!(options.weighting, Weighting::InverseErrors);
        assert_eq!(options.nfev_budget(7), 16000);
        assert!(options.scale_covar);
    }

    #[test]
    fn test_builders() {
        let options = FitOptions::new()
            .with_solver(Solver::GaussNewton)
            .with_weighting(Weighting::Uniform)
            .with_max_nfev(50);
        assert_eq!(options.nfev_budget(7), 50);
        assert_eq!(options.solver, Solver::GaussNewton);
    }

    #[test]
    fn test_parse() {
        assert_eq!(Solver::parse("LM"), Some(Solver::LevenbergMarquardt));
        assert_eq!(Solver::parse("gauss_newton"), Some(Solver::GaussNewton));
        assert_eq!(Solver::parse("nelder"), None);
        assert_eq!(Weighting::parse("uniform"), Some(Weighting::Uniform));
    }
}
