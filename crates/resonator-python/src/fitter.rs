//! Python bindings for TLResonatorFitter class

use std::collections::HashMap;

use ndarray::Array1;
use num_complex::Complex64;
use numpy::{PyArray1, PyReadonlyArray1, ToPyArray};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use resonator_core::background::{Magnitude, MagnitudePhase, MagnitudePhaseDelay, One};
use resonator_core::fitting::{Solver, Weighting};
use resonator_core::{FitOptions, Model, TLResonatorFitter};

use crate::to_py_err;

fn parse_background(name: &str) -> PyResult<Box<dyn Model>> {
    match name.to_lowercase().as_str() {
        "one" | "none" => Ok(Box::new(One)),
        "magnitude" => Ok(Box::new(Magnitude)),
        "magnitude_phase" => Ok(Box::new(MagnitudePhase)),
        "magnitude_phase_delay" => Ok(Box::new(MagnitudePhaseDelay)),
        _ => Err(PyValueError::new_err(format!(
            "Invalid background: {}. Use 'one', 'magnitude', 'magnitude_phase' or 'magnitude_phase_delay'",
            name
        ))),
    }
}

/// Python wrapper for TLResonatorFitter
#[pyclass(name = "TLResonatorFitter")]
pub struct PyTLResonatorFitter {
    inner: TLResonatorFitter,
}

#[pymethods]
impl PyTLResonatorFitter {
    /// Fit a transmission-line resonator to complex data
    ///
    /// Args:
    ///     frequency: Frequencies (Hz)
    ///     data: Complex response at each frequency
    ///     background: Background model name (default: 'magnitude_phase')
    ///     errors: Complex standard errors of the real and imaginary parts (default: None)
    ///     solver: 'lm' or 'gauss_newton' (default: 'lm')
    ///     weighting: 'errors' or 'uniform' (default: 'errors')
    ///     max_nfev: Maximum number of function evaluations (default: 2000 * (nvarys + 1))
    #[new]
    #[pyo3(signature = (frequency, data, background="magnitude_phase", errors=None, solver="lm", weighting="errors", max_nfev=None))]
    pub fn new(
        frequency: Vec<f64>,
        data: PyReadonlyArray1<Complex64>,
        background: &str,
        errors: Option<PyReadonlyArray1<Complex64>>,
        solver: &str,
        weighting: &str,
        max_nfev: Option<usize>,
    ) -> PyResult<Self> {
        let solver = Solver::parse(solver).ok_or_else(|| {
            PyValueError::new_err(format!("Invalid solver: {}. Use 'lm' or 'gauss_newton'", solver))
        })?;
        let weighting = Weighting::parse(weighting).ok_or_else(|| {
            PyValueError::new_err(format!(
                "Invalid weighting: {}. Use 'errors' or 'uniform'",
                weighting
            ))
        })?;

        let mut options = FitOptions::default()
            .with_solver(solver)
            .with_weighting(weighting);
        options.max_nfev = max_nfev;

        TLResonatorFitter::new(
            Array1::from_vec(frequency),
            data.as_array().to_owned(),
            Some(parse_background(background)?),
            errors.map(|e| e.as_array().to_owned()),
            options,
        )
        .map(|inner| Self { inner })
        .map_err(to_py_err)
    }

    /// Best-fit value of every parameter
    #[getter]
    pub fn best_values(&self) -> HashMap<String, f64> {
        self.inner
            .result()
            .params
            .iter()
            .map(|p| (p.name().to_string(), p.value()))
            .collect()
    }

    /// Standard error of every parameter that varied, if the covariance exists
    #[getter]
    pub fn standard_errors(&self) -> HashMap<String, f64> {
        self.inner
            .result()
            .params
            .iter()
            .filter_map(|p| p.stderr.map(|s| (p.name().to_string(), s)))
            .collect()
    }

    #[getter]
    pub fn chisqr(&self) -> f64 {
        self.inner.result().chisqr
    }

    #[getter]
    pub fn redchi(&self) -> f64 {
        self.inner.result().redchi
    }

    #[getter]
    pub fn success(&self) -> bool {
        self.inner.result().success
    }

    #[getter]
    pub fn message(&self) -> String {
        self.inner.result().message.clone()
    }

    #[getter]
    pub fn nfev(&self) -> usize {
        self.inner.result().nfev
    }

    /// Get the frequencies of the data (Hz) as numpy array
    #[getter]
    pub fn frequency<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.inner.frequency().to_pyarray(py)
    }

    /// Get the fitted model at the data frequencies as numpy array
    #[getter]
    pub fn best_fit<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<Complex64>> {
        self.inner.result().best_fit.to_pyarray(py)
    }

    /// Evaluate the fitted composite model
    ///
    /// Args:
    ///     frequency: Frequencies at which to evaluate (Hz)
    ///
    /// Returns:
    ///     Complex response as numpy array
    pub fn evaluate<'py>(
        &self,
        py: Python<'py>,
        frequency: Vec<f64>,
    ) -> PyResult<Bound<'py, PyArray1<Complex64>>> {
        self.inner
            .evaluate_composite_model(&frequency)
            .map(|z| z.to_pyarray(py))
            .map_err(to_py_err)
    }

    /// Evaluate the fitted resonator alone
    pub fn evaluate_foreground<'py>(
        &self,
        py: Python<'py>,
        frequency: Vec<f64>,
    ) -> PyResult<Bound<'py, PyArray1<Complex64>>> {
        self.inner
            .evaluate_foreground_model(&frequency)
            .map(|z| z.to_pyarray(py))
            .map_err(to_py_err)
    }

    /// Get the data with the fitted background divided out
    pub fn foreground_data<'py>(
        &self,
        py: Python<'py>,
    ) -> PyResult<Bound<'py, PyArray1<Complex64>>> {
        self.inner
            .foreground_data()
            .map(|z| z.to_pyarray(py))
            .map_err(to_py_err)
    }

    /// Refit from a fresh guess
    pub fn fit(&mut self) -> PyResult<()> {
        self.inner.fit(None).map(|_| ()).map_err(to_py_err)
    }

    /// Text report of the fit statistics and parameters
    pub fn fit_report(&self) -> String {
        self.inner.result().to_string()
    }

    /// Closed-form recovery of circuit parameters (not implemented)
    ///
    /// Raises:
    ///     NotImplementedError: always
    pub fn invert(
        &self,
        scattering_data: PyReadonlyArray1<Complex64>,
    ) -> PyResult<HashMap<String, f64>> {
        let data = scattering_data.as_array().to_vec();
        self.inner
            .invert(&data)
            .map(|params| params.values().into_iter().collect())
            .map_err(to_py_err)
    }

    fn __repr__(&self) -> String {
        let result = self.inner.result();
        format!(
            "TLResonatorFitter(npoints={}, success={}, chisqr={:.3e})",
            self.inner.frequency().len(),
            result.success,
            result.chisqr
        )
    }
}
