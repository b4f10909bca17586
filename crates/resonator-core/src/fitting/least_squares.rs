//! Nonlinear least-squares engine
//!
//! Minimizes `|r(x)|²` for a real residual vector over unconstrained
//! coordinates. The Jacobian is built by forward differences and its columns
//! are scaled to unit norm before each solve, so parameters of very
//! different magnitude (farads next to ohms) share one damping value.

use log::debug;
use ndarray::{Array1, Array2, Zip};

use super::options::{FitOptions, Solver};
use crate::constants::{
    FD_STEP, GN_MAX_HALVINGS, LM_DAMPING_FACTOR, LM_INITIAL_DAMPING, LM_MAX_DAMPING,
    LM_MIN_DAMPING, NORM_TOLERANCE, SVD_TOLERANCE,
};
use crate::error::{ResonatorError, Result};
use crate::math::linalg::{self, Svd};

/// Outcome of a minimization in internal coordinates
#[derive(Debug, Clone)]
pub struct Minimization {
    /// Best internal coordinates
    pub x: Array1<f64>,
    /// Residual at `x`
    pub residual: Array1<f64>,
    pub chisqr: f64,
    /// Residual evaluations, including the Jacobian used for the covariance
    pub nfev: usize,
    pub success: bool,
    pub message: String,
    /// `(JᵀJ)⁻¹` at `x`, or None if singular or not requested
    pub inverse_hessian: Option<Array2<f64>>,
}

enum Step {
    Accepted { previous_chisqr: f64, step_norm: f64 },
    Stalled,
    Exhausted,
}

struct Minimizer<'o, F> {
    residual_fn: F,
    options: &'o FitOptions,
    max_nfev: usize,
    x: Array1<f64>,
    residual: Array1<f64>,
    chisqr: f64,
    nfev: usize,
    damping: f64,
}

impl<'o, F> Minimizer<'o, F>
where
    F: FnMut(&Array1<f64>) -> Result<Array1<f64>>,
{
    fn evaluate(&mut self, x: &Array1<f64>) -> Result<Array1<f64>> {
        self.nfev += 1;
        (self.residual_fn)(x)
    }

    fn jacobian(&mut self) -> Result<Array2<f64>> {
        let (m, n) = (self.residual.len(), self.x.len());
        let mut jac = Array2::<f64>::zeros((m, n));

        for j in 0..n {
            let mut shifted = self.x.clone();
            shifted[j] += if self.x[j] == 0.0 {
                FD_STEP
            } else {
                FD_STEP * self.x[j].abs()
            };
            // Use the representable step, not the requested one
            let h = shifted[j] - self.x[j];

            let r_shifted = self.evaluate(&shifted)?;
            Zip::from(jac.column_mut(j))
                .and(&r_shifted)
                .and(&self.residual)
                .for_each(|d, &rh, &r| *d = (rh - r) / h);
        }

        Ok(jac)
    }

    /// Try a trial point; keep it if chi-square decreases
    fn try_step(&mut self, step_scaled: &Array1<f64>, scale: &Array1<f64>) -> Result<Option<Step>> {
        let trial = &self.x + &(step_scaled / scale);
        let r_trial = self.evaluate(&trial)?;
        let chisqr_trial = r_trial.dot(&r_trial);

        if chisqr_trial.is_finite() && chisqr_trial < self.chisqr {
            let previous_chisqr = self.chisqr;
            self.x = trial;
            self.residual = r_trial;
            self.chisqr = chisqr_trial;
            return Ok(Some(Step::Accepted {
                previous_chisqr,
                step_norm: step_scaled.dot(step_scaled).sqrt(),
            }));
        }
        Ok(None)
    }

    fn levenberg_marquardt_step(&mut self, svd: &Svd, scale: &Array1<f64>) -> Result<Step> {
        let target = self.residual.mapv(|r| -r);
        loop {
            if self.nfev >= self.max_nfev {
                return Ok(Step::Exhausted);
            }

            let step_scaled = svd.solve_damped(&target, self.damping, SVD_TOLERANCE);
            if let Some(step) = self.try_step(&step_scaled, scale)? {
                self.damping = (self.damping / LM_DAMPING_FACTOR).max(LM_MIN_DAMPING);
                return Ok(step);
            }

            self.damping *= LM_DAMPING_FACTOR;
            if self.damping > LM_MAX_DAMPING {
                return Ok(Step::Stalled);
            }
        }
    }

    fn gauss_newton_step(&mut self, svd: &Svd, scale: &Array1<f64>) -> Result<Step> {
        let target = self.residual.mapv(|r| -r);
        let full_step = svd.solve_damped(&target, 0.0, SVD_TOLERANCE);

        let mut fraction = 1.0;
        for _ in 0..=GN_MAX_HALVINGS {
            if self.nfev >= self.max_nfev {
                return Ok(Step::Exhausted);
            }
            if let Some(step) = self.try_step(&(&full_step * fraction), scale)? {
                return Ok(step);
            }
            fraction *= 0.5;
        }
        Ok(Step::Stalled)
    }

    fn run(&mut self) -> Result<(bool, String)> {
        let n = self.x.len();

        loop {
            if self.chisqr == 0.0 {
                return Ok((true, "Chi-square is zero".to_string()));
            }
            if self.nfev + n >= self.max_nfev {
                return Ok((false, exhausted_message(self.max_nfev)));
            }

            let jac = self.jacobian()?;
            let (scaled, scale) = scale_columns(&jac);

            if self.options.gtol > 0.0 {
                let r_norm = self.chisqr.sqrt();
                let max_cosine = scaled
                    .t()
                    .dot(&self.residual)
                    .iter()
                    .fold(0.0_f64, |acc, g| acc.max(g.abs() / r_norm));
                if max_cosine <= self.options.gtol {
                    return Ok((true, "Residual is orthogonal to the Jacobian (gtol)".to_string()));
                }
            }

            let svd = linalg::svd_real(&scaled).map_err(ResonatorError::Linalg)?;
            let step = match self.options.solver {
                Solver::LevenbergMarquardt => self.levenberg_marquardt_step(&svd, &scale)?,
                Solver::GaussNewton => self.gauss_newton_step(&svd, &scale)?,
            };

            match step {
                Step::Accepted {
                    previous_chisqr,
                    step_norm,
                } => {
                    debug!(
                        "accepted step: chisqr {:.6e} -> {:.6e}, damping {:.1e}, nfev {}",
                        previous_chisqr, self.chisqr, self.damping, self.nfev
                    );

                    if previous_chisqr - self.chisqr <= self.options.ftol * previous_chisqr {
                        return Ok((
                            true,
                            "Relative reduction of chi-square is below ftol".to_string(),
                        ));
                    }
                    let x_norm = (&self.x * &scale).dot(&(&self.x * &scale)).sqrt();
                    if step_norm <= self.options.xtol * (x_norm + self.options.xtol) {
                        return Ok((true, "Relative step size is below xtol".to_string()));
                    }
                }
                Step::Stalled => {
                    return Ok((true, "Chi-square cannot be reduced further".to_string()));
                }
                Step::Exhausted => {
                    return Ok((false, exhausted_message(self.max_nfev)));
                }
            }
        }
    }

    /// `(JᵀJ)⁻¹` in internal coordinates, undoing the column scaling
    fn inverse_hessian(&mut self) -> Result<Option<Array2<f64>>> {
        let jac = self.jacobian()?;
        let (scaled, scale) = scale_columns(&jac);
        let svd = match linalg::svd_real(&scaled) {
            Ok(svd) => svd,
            Err(_) => return Ok(None),
        };

        Ok(svd.gram_inverse(SVD_TOLERANCE).map(|mut inv| {
            let n = scale.len();
            for i in 0..n {
                for j in 0..n {
                    inv[[i, j]] /= scale[i] * scale[j];
                }
            }
            inv
        }))
    }
}

fn exhausted_message(max_nfev: usize) -> String {
    format!(
        "Fit aborted: maximum number of function evaluations ({}) exceeded",
        max_nfev
    )
}

/// Scale Jacobian columns to unit norm; zero columns keep scale 1
fn scale_columns(jac: &Array2<f64>) -> (Array2<f64>, Array1<f64>) {
    let scale: Array1<f64> = jac
        .columns()
        .into_iter()
        .map(|col| {
            let norm = col.dot(&col).sqrt();
            if norm > NORM_TOLERANCE && norm.is_finite() {
                norm
            } else {
                1.0
            }
        })
        .collect();

    let scaled = jac / &scale;
    (scaled, scale)
}

/// Minimize `|residual_fn(x)|²` starting from `x0`
///
/// Errors from `residual_fn` and linear algebra failures are propagated.
/// Running out of evaluations is not an error; it is reported through
/// `success = false`.
pub fn minimize<F>(residual_fn: F, x0: Array1<f64>, options: &FitOptions) -> Result<Minimization>
where
    F: FnMut(&Array1<f64>) -> Result<Array1<f64>>,
{
    if x0.is_empty() {
        return Err(ResonatorError::NoVaryingParameters);
    }

    let mut minimizer = Minimizer {
        residual_fn,
        options,
        max_nfev: options.nfev_budget(x0.len()),
        x: x0.clone(),
        residual: Array1::zeros(0),
        chisqr: f64::INFINITY,
        nfev: 0,
        damping: match options.solver {
            Solver::LevenbergMarquardt => LM_INITIAL_DAMPING,
            Solver::GaussNewton => 0.0,
        },
    };

    let r0 = minimizer.evaluate(&x0)?;
    if r0.iter().any(|v| !v.is_finite()) {
        return Err(ResonatorError::NonFiniteResidual);
    }
    minimizer.chisqr = r0.dot(&r0);
    minimizer.residual = r0;

    let (success, message) = minimizer.run()?;

    let inverse_hessian = if options.calc_covar {
        minimizer.inverse_hessian()?
    } else {
        None
    };
    let nfev = minimizer.nfev;

    Ok(Minimization {
        x: minimizer.x,
        residual: minimizer.residual,
        chisqr: minimizer.chisqr,
        nfev,
        success,
        message,
        inverse_hessian,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Residuals of y = a·exp(-b·t) against exact data
    fn exponential_problem(a: f64, b: f64) -> impl FnMut(&Array1<f64>) -> Result<Array1<f64>> {
        let t: Vec<f64> = (0..40).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = t.iter().map(|&ti| a * (-b * ti).exp()).collect();
        move |x: &Array1<f64>| {
            Ok(t.iter()
                .zip(y.iter())
                .map(|(&ti, &yi)| x[0] * (-x[1] * ti).exp() - yi)
                .collect())
        }
    }

    #[test]
    fn test_linear_model_exact() {
        // y = 3 + 0.5 t
        let t: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let residual = |x: &Array1<f64>| -> Result<Array1<f64>> {
            Ok(t.iter().map(|&ti| x[0] + x[1] * ti - (3.0 + 0.5 * ti)).collect())
        };

        let result = minimize(residual, Array1::from_vec(vec![0.0, 0.0]), &FitOptions::default())
            .unwrap();
        assert!(result.success, "{}", result.message);
        assert_relative_eq!(result.x[0], 3.0, epsilon = 1e-6);
        assert_relative_eq!(result.x[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_exponential_lm() {
        let result = minimize(
            exponential_problem(2.5, 1.3),
            Array1::from_vec(vec![1.0, 0.5]),
            &FitOptions::default(),
        )
        .unwrap();

        assert!(result.success, "{}", result.message);
        assert_relative_eq!(result.x[0], 2.5, max_relative = 1e-6);
        assert_relative_eq!(result.x[1], 1.3, max_relative = 1e-6);
        assert!(result.chisqr < 1e-12);
    }

    #[test]
    fn test_exponential_gauss_newton() {
        let options = FitOptions::default().with_solver(Solver::GaussNewton);
        let result = minimize(
            exponential_problem(2.5, 1.3),
            Array1::from_vec(vec![2.0, 1.0]),
            &options,
        )
        .unwrap();

        assert!(result.success, "{}", result.message);
        assert_relative_eq!(result.x[0], 2.5, max_relative = 1e-6);
        assert_relative_eq!(result.x[1], 1.3, max_relative = 1e-6);
    }

    #[test]
    fn test_evaluation_budget() {
        let options = FitOptions::default().with_max_nfev(4);
        let result = minimize(
            exponential_problem(2.5, 1.3),
            Array1::from_vec(vec![1.0, 0.5]),
            &options,
        )
        .unwrap();

        assert!(!result.success);
        assert!(result.message.contains("maximum number of function evaluations"));
        // Search budget plus one Jacobian for the covariance
        assert!(result.nfev <= 4 + 2);
    }

    #[test]
    fn test_nfev_counts_covariance_jacobian() {
        let mut options = FitOptions::default();
        let with_covar = minimize(
            exponential_problem(2.5, 1.3),
            Array1::from_vec(vec![1.0, 0.5]),
            &options,
        )
        .unwrap();

        options.calc_covar = false;
        let without_covar = minimize(
            exponential_problem(2.5, 1.3),
            Array1::from_vec(vec![1.0, 0.5]),
            &options,
        )
        .unwrap();

        assert!(with_covar.inverse_hessian.is_some());
        assert!(without_covar.inverse_hessian.is_none());
        assert_eq!(with_covar.nfev, without_covar.nfev + 2);
    }

    #[test]
    fn test_inverse_hessian_of_linear_model() {
        // For r = A x - b the inverse Hessian is (AᵀA)⁻¹ exactly
        let residual = |x: &Array1<f64>| -> Result<Array1<f64>> {
            Ok(Array1::from_vec(vec![x[0] - 1.0, x[1] - 2.0, x[0] + x[1] - 3.5]))
        };
        let result = minimize(residual, Array1::from_vec(vec![0.0, 0.0]), &FitOptions::default())
            .unwrap();

        let inv = result.inverse_hessian.unwrap();
        // AᵀA = [[2, 1], [1, 2]] → inverse = [[2, -1], [-1, 2]] / 3
        assert_relative_eq!(inv[[0, 0]], 2.0 / 3.0, max_relative = 1e-6);
        assert_relative_eq!(inv[[0, 1]], -1.0 / 3.0, max_relative = 1e-6);
        assert_relative_eq!(inv[[1, 1]], 2.0 / 3.0, max_relative = 1e-6);
    }

    #[test]
    fn test_non_finite_start_is_error() {
        let residual = |_: &Array1<f64>| -> Result<Array1<f64>> {
            Ok(Array1::from_vec(vec![f64::NAN, 1.0]))
        };
        let result = minimize(residual, Array1::from_vec(vec![1.0]), &FitOptions::default());
        assert!(matches!(result, Err(ResonatorError::NonFiniteResidual)));
    }

    #[test]
    fn test_no_parameters_is_error() {
        let residual = |_: &Array1<f64>| -> Result<Array1<f64>> { Ok(Array1::zeros(3)) };
        let result = minimize(residual, Array1::zeros(0), &FitOptions::default());
        assert!(matches!(result, Err(ResonatorError::NoVaryingParameters)));
    }
}
