//! Model capability trait and model composition
//!
//! A model maps a frequency array and a parameter set to a complex response.
//! Resonator fits use the product of a background model (the measurement
//! chain) and a foreground model (the resonator itself).

use std::fmt;

use ndarray::Array1;
use num_complex::Complex64;

use crate::error::{ResonatorError, Result};
use crate::parameters::{Parameter, Parameters};
use crate::resonator::ResonatorModel;

/// A complex-valued model of frequency with named parameters
pub trait Model: fmt::Debug + Send + Sync {
    /// Short display name
    fn name(&self) -> &str;

    /// Names of the parameters this model reads, in a fixed order
    fn param_names(&self) -> Vec<&'static str>;

    /// Evaluate the response at each frequency (Hz)
    fn eval(&self, params: &Parameters, frequency: &[f64]) -> Result<Array1<Complex64>>;

    /// Initial values and bounds for a fit of `data` measured at `frequency`
    fn guess(&self, data: &[Complex64], frequency: &[f64]) -> Result<Parameters>;

    /// Placeholder parameters: every name at value 0, unbounded and varying
    fn make_params(&self) -> Parameters {
        let mut params = Parameters::new();
        for name in self.param_names() {
            params.insert(Parameter::new(name, 0.0));
        }
        params
    }
}

/// Product of a background model and a resonator foreground model
#[derive(Debug)]
pub struct CompositeModel<F> {
    background: Box<dyn Model>,
    foreground: F,
}

impl<F: ResonatorModel> CompositeModel<F> {
    /// Compose two models; their parameter names must not overlap
    pub fn new(background: Box<dyn Model>, foreground: F) -> Result<Self> {
        let fg_names = foreground.param_names();
        if let Some(dup) = background
            .param_names()
            .into_iter()
            .find(|name| fg_names.contains(name))
        {
            return Err(ResonatorError::DuplicateParameter(dup.to_string()));
        }

        Ok(Self {
            background,
            foreground,
        })
    }

    pub fn background(&self) -> &dyn Model {
        self.background.as_ref()
    }

    pub fn foreground(&self) -> &F {
        &self.foreground
    }

    pub fn eval_background(
        &self,
        params: &Parameters,
        frequency: &[f64],
    ) -> Result<Array1<Complex64>> {
        self.background.eval(params, frequency)
    }

    pub fn eval_foreground(
        &self,
        params: &Parameters,
        frequency: &[f64],
    ) -> Result<Array1<Complex64>> {
        self.foreground.eval(params, frequency)
    }
}

impl<F: ResonatorModel> Model for CompositeModel<F> {
    fn name(&self) -> &str {
        "composite"
    }

    fn param_names(&self) -> Vec<&'static str> {
        let mut names = self.background.param_names();
        names.extend(self.foreground.param_names());
        names
    }

    fn eval(&self, params: &Parameters, frequency: &[f64]) -> Result<Array1<Complex64>> {
        Ok(self.eval_background(params, frequency)? * self.eval_foreground(params, frequency)?)
    }

    /// Seed the background from data far from resonance, then the foreground
    ///
    /// Off resonance the foreground equals its reference point, so the
    /// background is guessed from `data / reference_point` and the foreground
    /// from the data with that background divided out.
    fn guess(&self, data: &[Complex64], frequency: &[f64]) -> Result<Parameters> {
        let reference_point = self.foreground.constants().reference_point;
        let referenced: Vec<Complex64> = data.iter().map(|&d| d / reference_point).collect();
        let mut params = self.background.guess(&referenced, frequency)?;

        let background = self.background.eval(&params, frequency)?;
        let foreground_data: Vec<Complex64> = data
            .iter()
            .zip(background.iter())
            .map(|(&d, &b)| d / b)
            .collect();
        params.extend(self.foreground.guess(&foreground_data, frequency)?);

        Ok(params)
    }
}
