//! Background models
//!
//! The background is the response of the measurement chain with no
//! resonator present (cable loss, amplifier gain and phase, electrical
//! delay). It multiplies the resonator response.

use std::f64::consts::PI;

use ndarray::Array1;
use num_complex::Complex64;

use crate::error::Result;
use crate::math::conversions::{complex_2_magnitude, complex_2_radian, magrad_2_reim, unwrap_radian};
use crate::model::Model;
use crate::parameters::{Parameter, Parameters};

pub const MAGNITUDE: &str = "background_magnitude";
pub const PHASE: &str = "background_phase";
pub const DELAY: &str = "background_delay";

/// Unit background with no parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct One;

impl Model for One {
    fn name(&self) -> &str {
        "one"
    }

    fn param_names(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn eval(&self, _params: &Parameters, frequency: &[f64]) -> Result<Array1<Complex64>> {
        Ok(Array1::from_elem(frequency.len(), Complex64::new(1.0, 0.0)))
    }

    fn guess(&self, _data: &[Complex64], _frequency: &[f64]) -> Result<Parameters> {
        Ok(Parameters::new())
    }
}

/// Real gain constant across frequency
#[derive(Debug, Clone, Copy, Default)]
pub struct Magnitude;

impl Model for Magnitude {
    fn name(&self) -> &str {
        "magnitude"
    }

    fn param_names(&self) -> Vec<&'static str> {
        vec![MAGNITUDE]
    }

    fn eval(&self, params: &Parameters, frequency: &[f64]) -> Result<Array1<Complex64>> {
        let magnitude = params.value(MAGNITUDE)?;
        Ok(Array1::from_elem(
            frequency.len(),
            Complex64::new(magnitude, 0.0),
        ))
    }

    fn guess(&self, data: &[Complex64], _frequency: &[f64]) -> Result<Parameters> {
        let mut params = Parameters::new();
        params.insert(magnitude_guess(data)?);
        Ok(params)
    }
}

/// Complex constant across frequency: `m·exp(jφ)`
///
/// This is the default background of the resonator fitters.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagnitudePhase;

impl Model for MagnitudePhase {
    fn name(&self) -> &str {
        "magnitude_phase"
    }

    fn param_names(&self) -> Vec<&'static str> {
        vec![MAGNITUDE, PHASE]
    }

    fn eval(&self, params: &Parameters, frequency: &[f64]) -> Result<Array1<Complex64>> {
        let value = magrad_2_reim(params.value(MAGNITUDE)?, params.value(PHASE)?);
        Ok(Array1::from_elem(frequency.len(), value))
    }

    fn guess(&self, data: &[Complex64], _frequency: &[f64]) -> Result<Parameters> {
        let mut params = Parameters::new();
        params.insert(magnitude_guess(data)?);
        params.insert(Parameter::new(PHASE, complex_2_radian(mean(data))));
        Ok(params)
    }
}

/// Complex constant with electrical delay: `m·exp(j(φ - 2πfτ))`
#[derive(Debug, Clone, Copy, Default)]
pub struct MagnitudePhaseDelay;

impl Model for MagnitudePhaseDelay {
    fn name(&self) -> &str {
        "magnitude_phase_delay"
    }

    fn param_names(&self) -> Vec<&'static str> {
        vec![MAGNITUDE, PHASE, DELAY]
    }

    fn eval(&self, params: &Parameters, frequency: &[f64]) -> Result<Array1<Complex64>> {
        let magnitude = params.value(MAGNITUDE)?;
        let phase = params.value(PHASE)?;
        let delay = params.value(DELAY)?;

        Ok(frequency
            .iter()
            .map(|&f| magrad_2_reim(magnitude, phase - 2.0 * PI * f * delay))
            .collect())
    }

    /// Delay from the slope of the unwrapped phase, phase from its intercept
    fn guess(&self, data: &[Complex64], frequency: &[f64]) -> Result<Parameters> {
        let phase: Vec<f64> = data.iter().map(|&d| complex_2_radian(d)).collect();
        let phase = unwrap_radian(&phase);
        let omega: Vec<f64> = frequency.iter().map(|&f| 2.0 * PI * f).collect();

        let (slope, intercept) = match linear_regression(&omega, &phase) {
            Some(line) => line,
            None => (0.0, complex_2_radian(mean(data))),
        };

        let mut params = Parameters::new();
        params.insert(magnitude_guess(data)?);
        params.insert(Parameter::new(PHASE, intercept));
        params.insert(Parameter::new(DELAY, -slope));
        Ok(params)
    }
}

fn mean(data: &[Complex64]) -> Complex64 {
    if data.is_empty() {
        return Complex64::new(0.0, 0.0);
    }
    data.iter().sum::<Complex64>() / data.len() as f64
}

fn magnitude_guess(data: &[Complex64]) -> Result<Parameter> {
    let magnitude = if data.is_empty() {
        1.0
    } else {
        data.iter().map(|&d| complex_2_magnitude(d)).sum::<f64>() / data.len() as f64
    };
    Parameter::new(MAGNITUDE, magnitude).with_min(0.0)
}

/// Least squares line `y = slope·x + intercept`; None for fewer than two distinct x
fn linear_regression(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }

    let x_mean = x[..n].iter().sum::<f64>() / n as f64;
    let y_mean = y[..n].iter().sum::<f64>() / n as f64;
    let sxx: f64 = x[..n].iter().map(|&xi| (xi - x_mean).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = x[..n]
        .iter()
        .zip(y[..n].iter())
        .map(|(&xi, &yi)| (xi - x_mean) * (yi - y_mean))
        .sum();

    let slope = sxy / sxx;
    Some((slope, y_mean - slope * x_mean))
}
