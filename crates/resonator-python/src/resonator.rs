//! Python bindings for the TLResonator model

use std::collections::HashMap;

use num_complex::Complex64;
use numpy::{PyArray1, ToPyArray};
use pyo3::prelude::*;
use resonator_core::{Model, Parameter, Parameters, TLResonator};

use crate::to_py_err;

/// Python wrapper for TLResonator
#[pyclass(name = "TLResonator")]
#[derive(Default)]
pub struct PyTLResonator {
    inner: TLResonator,
}

#[pymethods]
impl PyTLResonator {
    #[new]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the model parameters, in evaluation order
    pub fn param_names(&self) -> Vec<String> {
        self.inner
            .param_names()
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Evaluate the impedance at each frequency
    ///
    /// Args:
    ///     params: Mapping of every parameter name to its value
    ///     frequency: Frequencies (Hz)
    ///
    /// Returns:
    ///     Complex impedance as numpy array
    pub fn eval<'py>(
        &self,
        py: Python<'py>,
        params: HashMap<String, f64>,
        frequency: Vec<f64>,
    ) -> PyResult<Bound<'py, PyArray1<Complex64>>> {
        let mut parameters = Parameters::new();
        for (name, value) in params {
            parameters.insert(Parameter::new(name, value));
        }
        self.inner
            .eval(&parameters, &frequency)
            .map(|z| z.to_pyarray(py))
            .map_err(to_py_err)
    }

    /// Initial values for a fit
    ///
    /// Returns:
    ///     Dict of name -> (value, min, max, vary)
    pub fn guess(&self) -> PyResult<HashMap<String, (f64, f64, f64, bool)>> {
        let params = self.inner.guess(&[], &[]).map_err(to_py_err)?;
        Ok(params
            .iter()
            .map(|p| (p.name().to_string(), (p.value(), p.min(), p.max(), p.vary())))
            .collect())
    }

    fn __repr__(&self) -> String {
        format!("TLResonator(params={:?})", self.inner.param_names())
    }
}
