//! Python bindings for resonator-core
//!
//! This module exposes resonator-core functionality to Python via PyO3.
//!
//! ## Classes
//!
//! - `TLResonator` - Shunt-coupled transmission-line resonator model
//! - `TLResonatorFitter` - Least-squares fitter for the resonator model

use pyo3::exceptions::{PyKeyError, PyNotImplementedError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use resonator_core::ResonatorError;

mod fitter;
mod resonator;

pub use fitter::PyTLResonatorFitter;
pub use resonator::PyTLResonator;

/// Map a core error onto the closest Python exception
pub(crate) fn to_py_err(err: ResonatorError) -> PyErr {
    match err {
        ResonatorError::NotImplemented(_) => PyNotImplementedError::new_err(err.to_string()),
        ResonatorError::UnknownParameter(_) => PyKeyError::new_err(err.to_string()),
        ResonatorError::LengthMismatch { .. }
        | ResonatorError::EmptyData
        | ResonatorError::InvalidFrequency { .. }
        | ResonatorError::InvalidErrors(_)
        | ResonatorError::DuplicateParameter(_)
        | ResonatorError::InvalidBounds { .. } => PyValueError::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

/// resonator_python - Python bindings for transmission-line resonator fitting
///
/// Example:
///     >>> import numpy as np
///     >>> import resonator_python as rp
///     >>> f = np.linspace(5e9, 11e9, 201)
///     >>> fitter = rp.TLResonatorFitter(f, data, background="magnitude_phase")
///     >>> print(fitter.fit_report())
#[pymodule]
fn resonator_python(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Add classes with clean names (no Py prefix in Python)
    m.add_class::<PyTLResonator>()?;
    m.add_class::<PyTLResonatorFitter>()?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
