//! Resonator fitter
//!
//! Wraps a [`CompositeModel`] of a background and a resonator foreground,
//! validates the measured data, seeds the parameters from the model guesses
//! and runs the least-squares engine. A fitter is always fitted: the
//! constructor runs the first fit and stores its [`FitResult`].

use std::time::Instant;

use log::{debug, warn};
use ndarray::{Array1, Array2};
use num_complex::Complex64;

use super::least_squares::{self, Minimization};
use super::options::{FitOptions, Weighting};
use super::result::{self, FitResult};
use crate::background::MagnitudePhase;
use crate::error::{ResonatorError, Result};
use crate::frequency::Frequency;
use crate::model::{CompositeModel, Model};
use crate::parameters::Parameters;
use crate::resonator::{ResonatorConstants, ResonatorModel, TLResonator};

/// Fitter for a resonator foreground `M` times a background model
#[derive(Debug)]
pub struct ResonatorFitter<M> {
    frequency: Frequency,
    data: Array1<Complex64>,
    errors: Option<Array1<Complex64>>,
    model: CompositeModel<M>,
    options: FitOptions,
    result: FitResult,
}

/// Fitter for the shunt-coupled transmission-line resonator
pub type TLResonatorFitter = ResonatorFitter<TLResonator>;

impl<M: ResonatorModel> ResonatorFitter<M> {
    /// Build a fitter for arbitrary foreground and background models and fit it
    ///
    /// `errors` holds the standard error of the real and imaginary parts of
    /// each data point; with [`Weighting::InverseErrors`] each residual part
    /// is divided by the matching error part.
    pub fn with_models(
        frequency: Array1<f64>,
        data: Array1<Complex64>,
        foreground: M,
        background: Box<dyn Model>,
        errors: Option<Array1<Complex64>>,
        options: FitOptions,
    ) -> Result<Self> {
        let frequency = Frequency::from_hz(frequency.to_vec())?;
        check_length("data", frequency.npoints(), data.len())?;
        if let Some(errors) = &errors {
            check_length("errors", frequency.npoints(), errors.len())?;
            validate_errors(errors)?;
        }

        let model = CompositeModel::new(background, foreground)?;
        let initial = model.guess(&data.to_vec(), frequency.f())?;
        debug!(
            "fitting {} points with {} background and {} foreground",
            frequency.npoints(),
            model.background().name(),
            model.foreground().name()
        );
        let result = run_fit(
            &model,
            frequency.f(),
            &data,
            weights(errors.as_ref(), options.weighting).as_ref(),
            &initial,
            &options,
        )?;

        Ok(Self {
            frequency,
            data,
            errors,
            model,
            options,
            result,
        })
    }

    /// Refit, starting from `initial` or from a fresh guess
    pub fn fit(&mut self, initial: Option<Parameters>) -> Result<&FitResult> {
        let initial = match initial {
            Some(params) => params,
            None => self.model.guess(&self.data.to_vec(), self.frequency.f())?,
        };
        self.result = run_fit(
            &self.model,
            self.frequency.f(),
            &self.data,
            weights(self.errors.as_ref(), self.options.weighting).as_ref(),
            &initial,
            &self.options,
        )?;
        Ok(&self.result)
    }

    /// Frequencies of the data (Hz)
    pub fn frequency(&self) -> &[f64] {
        self.frequency.f()
    }

    pub fn data(&self) -> &Array1<Complex64> {
        &self.data
    }

    pub fn errors(&self) -> Option<&Array1<Complex64>> {
        self.errors.as_ref()
    }

    pub fn model(&self) -> &CompositeModel<M> {
        &self.model
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    /// Result of the most recent fit
    pub fn result(&self) -> &FitResult {
        &self.result
    }

    pub fn constants(&self) -> ResonatorConstants {
        self.model.foreground().constants()
    }

    pub fn best_value(&self, name: &str) -> Result<f64> {
        self.result.best_value(name)
    }

    pub fn stderr(&self, name: &str) -> Option<f64> {
        self.result.stderr(name)
    }

    /// Background times foreground at the best-fit parameters
    pub fn evaluate_composite_model(&self, frequency: &[f64]) -> Result<Array1<Complex64>> {
        self.model.eval(&self.result.params, frequency)
    }

    pub fn evaluate_foreground_model(&self, frequency: &[f64]) -> Result<Array1<Complex64>> {
        self.model.eval_foreground(&self.result.params, frequency)
    }

    pub fn evaluate_background_model(&self, frequency: &[f64]) -> Result<Array1<Complex64>> {
        self.model.eval_background(&self.result.params, frequency)
    }

    /// The fitted data with the fitted background divided out
    pub fn foreground_data(&self) -> Result<Array1<Complex64>> {
        Ok(&self.data / &self.evaluate_background_model(self.frequency.f())?)
    }

    /// Divide `data` measured at `frequency` by the fitted background
    pub fn remove_background(
        &self,
        frequency: &[f64],
        data: &Array1<Complex64>,
    ) -> Result<Array1<Complex64>> {
        check_length("data", frequency.len(), data.len())?;
        Ok(data / &self.evaluate_background_model(frequency)?)
    }
}

impl ResonatorFitter<TLResonator> {
    /// Fit `data` measured at `frequency` (Hz)
    ///
    /// The background defaults to [`MagnitudePhase`].
    ///
    /// # Example
    /// ```no_run
    /// use ndarray::Array1;
    /// use resonator_core::{FitOptions, TLCircuit, TLResonatorFitter};
    /// use num_complex::Complex64;
    ///
    /// let circuit = TLCircuit {
    ///     rl: 50.0, cc: 10e-12, ls: 3e-9, rs: 1.0, cs: 0.4e-12, gs: 1.0,
    ///     imp_load: Complex64::new(0.0, 0.0), length: 4e-3,
    /// };
    /// let f = Array1::linspace(1e9, 10e9, 201);
    /// let data = circuit.impedance_array(f.as_slice().unwrap());
    /// let fitter = TLResonatorFitter::new(f, data, None, None, FitOptions::default()).unwrap();
    /// println!("{}", fitter.result());
    /// ```
    pub fn new(
        frequency: Array1<f64>,
        data: Array1<Complex64>,
        background: Option<Box<dyn Model>>,
        errors: Option<Array1<Complex64>>,
        options: FitOptions,
    ) -> Result<Self> {
        let background = background.unwrap_or_else(|| Box::new(MagnitudePhase));
        Self::with_models(frequency, data, TLResonator, background, errors, options)
    }

    /// Closed-form recovery of the circuit parameters from scattering data
    ///
    /// Not available for this resonator; always returns
    /// [`ResonatorError::NotImplemented`].
    pub fn invert(&self, _scattering_data: &[Complex64]) -> Result<Parameters> {
        Err(ResonatorError::NotImplemented("invert"))
    }
}

fn check_length(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(ResonatorError::LengthMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

fn validate_errors(errors: &Array1<Complex64>) -> Result<()> {
    let valid = |x: f64| x.is_finite() && x > 0.0;
    match errors.iter().position(|e| !(valid(e.re) && valid(e.im))) {
        Some(index) => Err(ResonatorError::InvalidErrors(index)),
        None => Ok(()),
    }
}

/// Per-part residual weights `1/σ_re + j/σ_im`, or None for unit weights
fn weights(errors: Option<&Array1<Complex64>>, weighting: Weighting) -> Option<Array1<Complex64>> {
    match (errors, weighting) {
        (Some(errors), Weighting::InverseErrors) => {
            Some(errors.mapv(|e| Complex64::new(1.0 / e.re, 1.0 / e.im)))
        }
        _ => None,
    }
}

/// Weighted residual with real and imaginary parts interleaved
fn weighted_residual(
    model: &Array1<Complex64>,
    data: &Array1<Complex64>,
    weights: Option<&Array1<Complex64>>,
) -> Array1<f64> {
    let mut residual = Array1::zeros(2 * data.len());
    for (i, (m, d)) in model.iter().zip(data.iter()).enumerate() {
        let diff = m - d;
        let w = weights.map_or(Complex64::new(1.0, 1.0), |w| w[i]);
        residual[2 * i] = diff.re * w.re;
        residual[2 * i + 1] = diff.im * w.im;
    }
    residual
}

/// Copy internal coordinates back into the varying parameters of `params`
fn apply_internal(params: &mut Parameters, var_names: &[String], x: &Array1<f64>) -> Result<()> {
    for (name, &xi) in var_names.iter().zip(x.iter()) {
        let param = params.get_mut(name)?;
        let value = param.from_internal(xi);
        param.set_value(value);
    }
    Ok(())
}

fn run_fit<M: ResonatorModel>(
    model: &CompositeModel<M>,
    frequency: &[f64],
    data: &Array1<Complex64>,
    weights: Option<&Array1<Complex64>>,
    initial: &Parameters,
    options: &FitOptions,
) -> Result<FitResult> {
    let start = Instant::now();

    let var_names: Vec<String> = initial.varying().map(|p| p.name().to_string()).collect();
    let x0: Array1<f64> = initial.varying().map(|p| p.to_internal()).collect();

    let mut work = initial.clone();
    let residual_fn = |x: &Array1<f64>| -> Result<Array1<f64>> {
        apply_internal(&mut work, &var_names, x)?;
        let values = model.eval(&work, frequency)?;
        Ok(weighted_residual(&values, data, weights))
    };
    let minimization = least_squares::minimize(residual_fn, x0, options)?;

    let mut params = initial.clone();
    apply_internal(&mut params, &var_names, &minimization.x)?;
    for param in params.iter_mut() {
        param.init_value = initial.value(param.name()).ok();
        param.stderr = None;
    }

    let ndata = minimization.residual.len();
    let nvarys = var_names.len();
    let (nfree, redchi, aic, bic) = result::statistics(minimization.chisqr, ndata, nvarys);

    let covariance = external_covariance(&minimization, initial, &var_names, options, redchi)?;
    match &covariance {
        Some(covar) => {
            for (i, name) in var_names.iter().enumerate() {
                params.get_mut(name)?.stderr = Some(covar[[i, i]].max(0.0).sqrt());
            }
        }
        None if options.calc_covar => {
            warn!("could not estimate the covariance; standard errors are unavailable");
        }
        None => {}
    }

    if !minimization.success {
        warn!("fit did not converge: {}", minimization.message);
    }

    let best_fit = model.eval(&params, frequency)?;
    let wall_clock_time = start.elapsed().as_secs_f64();
    debug!(
        "fit finished in {:.3} s: chisqr {:.6e}, nfev {}, {}",
        wall_clock_time, minimization.chisqr, minimization.nfev, minimization.message
    );

    Ok(FitResult {
        params,
        init_params: initial.clone(),
        var_names,
        covariance,
        success: minimization.success,
        message: minimization.message,
        nfev: minimization.nfev,
        ndata,
        nvarys,
        nfree,
        chisqr: minimization.chisqr,
        redchi,
        aic,
        bic,
        residual: minimization.residual,
        best_fit,
        wall_clock_time,
    })
}

/// Covariance in parameter space: `D (JᵀJ)⁻¹ D`, with `D` the diagonal of
/// value-to-internal gradients, optionally scaled by the reduced chi-square
fn external_covariance(
    minimization: &Minimization,
    initial: &Parameters,
    var_names: &[String],
    options: &FitOptions,
    redchi: f64,
) -> Result<Option<Array2<f64>>> {
    let inverse_hessian = match &minimization.inverse_hessian {
        Some(inv) => inv,
        None => return Ok(None),
    };

    let mut gradient = Vec::with_capacity(var_names.len());
    for (name, &xi) in var_names.iter().zip(minimization.x.iter()) {
        gradient.push(initial.get(name)?.internal_gradient(xi));
    }

    let scale = if options.scale_covar && redchi > 0.0 {
        redchi
    } else {
        1.0
    };
    let n = gradient.len();
    let covar = Array2::from_shape_fn((n, n), |(i, j)| {
        inverse_hessian[[i, j]] * gradient[i] * gradient[j] * scale
    });

    if covar.iter().all(|v| v.is_finite()) {
        Ok(Some(covar))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::One;
    use crate::parameters::Parameter;
    use approx::assert_relative_eq;

    #[test]
    fn test_weighted_residual_interleaves_parts() {
        let model = Array1::from_vec(vec![Complex64::new(3.0, 1.0), Complex64::new(0.0, 0.0)]);
        let data = Array1::from_vec(vec![Complex64::new(1.0, 2.0), Complex64::new(1.0, -1.0)]);

        let r = weighted_residual(&model, &data, None);
        assert_eq!(r.to_vec(), vec![2.0, -1.0, -1.0, 1.0]);

        let w = Array1::from_vec(vec![Complex64::new(0.5, 4.0), Complex64::new(1.0, 2.0)]);
        let r = weighted_residual(&model, &data, Some(&w));
        assert_eq!(r.to_vec(), vec![1.0, -4.0, -1.0, 2.0]);
    }

    #[test]
    fn test_weights_follow_weighting() {
        let errors = Array1::from_vec(vec![Complex64::new(0.5, 0.25)]);
        let w = weights(Some(&errors), Weighting::InverseErrors).unwrap();
        assert_eq!(w[0], Complex64::new(2.0, 4.0));
        assert!(weights(Some(&errors), Weighting::Uniform).is_none());
        assert!(weights(None, Weighting::InverseErrors).is_none());
    }

    #[test]
    fn test_validate_errors() {
        let good = Array1::from_vec(vec![Complex64::new(0.1, 0.2); 3]);
        assert!(validate_errors(&good).is_ok());

        let bad = Array1::from_vec(vec![
            Complex64::new(0.1, 0.2),
            Complex64::new(0.1, 0.0),
        ]);
        assert!(matches!(
            validate_errors(&bad),
            Err(ResonatorError::InvalidErrors(1))
        ));
    }

    #[test]
    fn test_apply_internal_respects_bounds() {
        let mut params = Parameters::new();
        params.insert(Parameter::new("a", 5.0).with_bounds(0.0, 10.0).unwrap());
        params.insert(Parameter::new("b", 1.0).fixed());

        let names = vec!["a".to_string()];
        apply_internal(&mut params, &names, &Array1::from_vec(vec![100.0])).unwrap();
        let a = params.value("a").unwrap();
        assert!((0.0..=10.0).contains(&a));
        assert_eq!(params.value("b").unwrap(), 1.0);
    }

    #[test]
    fn test_fit_recovers_coupling_capacitance() {
        let foreground = TLResonator;
        let mut truth = foreground.guess(&[], &[]).unwrap();
        truth.get_mut("Cc").unwrap().set_value(12e-12);

        let f = Array1::linspace(1e9, 10e9, 101);
        let model = CompositeModel::new(Box::new(One), TLResonator).unwrap();
        let data = model.eval(&truth, f.as_slice().unwrap()).unwrap();

        let mut initial = truth.clone();
        for p in initial.iter_mut() {
            if p.name() != "Cc" {
                p.set_vary(false);
            }
        }
        initial.get_mut("Cc").unwrap().set_value(10e-12);

        let mut fitter = ResonatorFitter::with_models(
            f,
            data,
            TLResonator,
            Box::new(One),
            None,
            FitOptions::default(),
        )
        .unwrap();
        let result = fitter.fit(Some(initial)).unwrap();

        assert!(result.success, "{}", result.message);
        assert_eq!(result.nvarys, 1);
        assert_relative_eq!(result.best_value("Cc").unwrap(), 12e-12, max_relative = 1e-6);
        assert_eq!(result.params.get("Cc").unwrap().init_value, Some(10e-12));
    }
}
