//! Fit results and statistics

use std::fmt;

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::error::Result;
use crate::parameters::Parameters;

/// Outcome of a least-squares fit
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Best-fit parameters with standard errors
    pub params: Parameters,
    /// Parameters the fit started from
    pub init_params: Parameters,
    /// Names of the varying parameters, in covariance order
    pub var_names: Vec<String>,
    /// Covariance of the varying parameters, or None if it could not be estimated
    pub covariance: Option<Array2<f64>>,
    pub success: bool,
    pub message: String,
    /// Number of residual evaluations, covariance Jacobian included
    pub nfev: usize,
    /// Number of real residuals (twice the number of complex points)
    pub ndata: usize,
    pub nvarys: usize,
    pub nfree: usize,
    pub chisqr: f64,
    pub redchi: f64,
    /// Akaike information criterion
    pub aic: f64,
    /// Bayesian information criterion
    pub bic: f64,
    /// Weighted residual, real and imaginary parts interleaved
    pub residual: Array1<f64>,
    /// Model evaluated at the best-fit parameters
    pub best_fit: Array1<Complex64>,
    /// Wall-clock time of the fit (in seconds)
    pub wall_clock_time: f64,
}

/// Goodness-of-fit statistics: (nfree, redchi, aic, bic)
pub(crate) fn statistics(chisqr: f64, ndata: usize, nvarys: usize) -> (usize, f64, f64, f64) {
    let nfree = ndata.saturating_sub(nvarys);
    let redchi = chisqr / nfree.max(1) as f64;

    let n = ndata as f64;
    // Keep the log finite for an exact fit
    let neg2_log_likelihood = n * (chisqr / n).max(f64::MIN_POSITIVE).ln();
    let aic = neg2_log_likelihood + 2.0 * nvarys as f64;
    let bic = neg2_log_likelihood + n.ln() * nvarys as f64;

    (nfree, redchi, aic, bic)
}

impl FitResult {
    /// Best-fit value of the named parameter
    pub fn best_value(&self, name: &str) -> Result<f64> {
        self.params.value(name)
    }

    /// Standard error of the named parameter, if it varied and covariance exists
    pub fn stderr(&self, name: &str) -> Option<f64> {
        self.params.get(name).ok().and_then(|p| p.stderr)
    }

    /// Correlation coefficient between two varying parameters
    pub fn correlation(&self, a: &str, b: &str) -> Option<f64> {
        let covar = self.covariance.as_ref()?;
        let i = self.var_names.iter().position(|n| n == a)?;
        let j = self.var_names.iter().position(|n| n == b)?;
        let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
        if denom > 0.0 {
            Some(covar[[i, j]] / denom)
        } else {
            None
        }
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[[Fit Statistics]]")?;
        writeln!(f, "    # function evals   = {}", self.nfev)?;
        writeln!(f, "    # data points      = {}", self.ndata)?;
        writeln!(f, "    # variables        = {}", self.nvarys)?;
        writeln!(f, "    chi-square         = {:.7e}", self.chisqr)?;
        writeln!(f, "    reduced chi-square = {:.7e}", self.redchi)?;
        writeln!(f, "    Akaike info crit   = {:.5}", self.aic)?;
        writeln!(f, "    Bayesian info crit = {:.5}", self.bic)?;
        writeln!(f, "    success            = {}", self.success)?;
        writeln!(f, "    message            = {}", self.message)?;
        writeln!(f, "[[Variables]]")?;

        for p in self.params.iter() {
            let init = self
                .init_params
                .get(p.name())
                .map(|q| q.value())
                .unwrap_or(f64::NAN);
            if !p.is_free() {
                writeln!(f, "    {:<22} {:.8e} (fixed)", p.name(), p.value())?;
                continue;
            }
            match p.stderr {
                Some(stderr) if p.value() != 0.0 => writeln!(
                    f,
                    "    {:<22} {:.8e} +/- {:.8e} ({:.2}%) (init = {:.8e})",
                    p.name(),
                    p.value(),
                    stderr,
                    (stderr / p.value()).abs() * 100.0,
                    init
                )?,
                Some(stderr) => writeln!(
                    f,
                    "    {:<22} {:.8e} +/- {:.8e} (init = {:.8e})",
                    p.name(),
                    p.value(),
                    stderr,
                    init
                )?,
                None => writeln!(
                    f,
                    "    {:<22} {:.8e} (init = {:.8e})",
                    p.name(),
                    p.value(),
                    init
                )?,
            }
        }

        if self.covariance.is_some() {
            writeln!(f, "[[Correlations]] (unreported correlations are < 0.100)")?;
            for (i, a) in self.var_names.iter().enumerate() {
                for b in self.var_names.iter().skip(i + 1) {
                    if let Some(c) = self.correlation(a, b) {
                        if c.abs() >= 0.1 {
                            writeln!(f, "    C({}, {}) = {:+.4}", a, b, c)?;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_statistics() {
        let (nfree, redchi, aic, bic) = statistics(8.0, 10, 2);
        assert_eq!(nfree, 8);
        assert_relative_eq!(redchi, 1.0);
        assert_relative_eq!(aic, 10.0 * (0.8_f64).ln() + 4.0, epsilon = 1e-12);
        assert_relative_eq!(bic, 10.0 * (0.8_f64).ln() + 2.0 * (10.0_f64).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_statistics_exact_fit_is_finite() {
        let (_, redchi, aic, bic) = statistics(0.0, 10, 2);
        assert_eq!(redchi, 0.0);
        assert!(aic.is_finite());
        assert!(bic.is_finite());
    }
}
