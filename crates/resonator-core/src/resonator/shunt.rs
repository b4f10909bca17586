//! Shunt-coupled transmission-line resonator
//!
//! A section of transmission line, terminated in a load impedance, coupled to
//! the measurement port through a resistor and a capacitor in series. The
//! model output is the impedance seen at the coupling port:
//!
//! ```text
//! ω      = 2πf
//! Z_c    = Rl/2 + 1/(jωCc)
//! Z0     = sqrt((Rs + jωLs) / (Gs + jωCs))
//! γ      = sqrt((Rs + jωLs) (Gs + jωCs))
//! Z_line = Z0 (Z_load + Z0 tanh(γ l)) / (Z0 + Z_load tanh(γ l))
//! Z      = Z_c + Z_line
//! ```

use std::f64::consts::PI;

use ndarray::Array1;
use num_complex::Complex64;

use super::{ResonatorConstants, ResonatorModel, SHUNT};
use crate::error::Result;
use crate::model::Model;
use crate::parameters::{Parameter, Parameters};

pub const RL: &str = "Rl";
pub const CC: &str = "Cc";
pub const LS: &str = "Ls";
pub const RS: &str = "Rs";
pub const CS: &str = "Cs";
pub const GS: &str = "Gs";
pub const IMP_LOAD: &str = "imp_load";
pub const LENGTH: &str = "length";

/// Circuit values of a loaded transmission-line resonator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TLCircuit {
    /// Coupling resistance (Ω)
    pub rl: f64,
    /// Coupling capacitance (F)
    pub cc: f64,
    /// Series inductance (H)
    pub ls: f64,
    /// Series resistance (Ω)
    pub rs: f64,
    /// Shunt capacitance (F)
    pub cs: f64,
    /// Shunt conductance (S)
    pub gs: f64,
    /// Terminating load impedance (Ω)
    pub imp_load: Complex64,
    /// Line length (m)
    pub length: f64,
}

impl TLCircuit {
    /// Read circuit values from a parameter set
    pub fn from_params(params: &Parameters) -> Result<Self> {
        Ok(Self {
            rl: params.value(RL)?,
            cc: params.value(CC)?,
            ls: params.value(LS)?,
            rs: params.value(RS)?,
            cs: params.value(CS)?,
            gs: params.value(GS)?,
            imp_load: Complex64::new(params.value(IMP_LOAD)?, 0.0),
            length: params.value(LENGTH)?,
        })
    }

    /// Impedance of the coupling network, `Rl/2 + 1/(jωCc)`
    #[inline]
    pub fn coupling_impedance(&self, frequency: f64) -> Complex64 {
        let omega = 2.0 * PI * frequency;
        Complex64::new(self.rl / 2.0, 0.0) + Complex64::new(0.0, omega * self.cc).inv()
    }

    /// Characteristic impedance Z0 and propagation constant γ of the line
    #[inline]
    pub fn line_constants(&self, frequency: f64) -> (Complex64, Complex64) {
        let omega = 2.0 * PI * frequency;
        let series = Complex64::new(self.rs, omega * self.ls);
        let shunt = Complex64::new(self.gs, omega * self.cs);
        ((series / shunt).sqrt(), (series * shunt).sqrt())
    }

    /// Input impedance of the terminated line section
    #[inline]
    pub fn line_impedance(&self, frequency: f64) -> Complex64 {
        let (imp_char, prop_const) = self.line_constants(frequency);
        let t = (prop_const * self.length).tanh();
        imp_char * (self.imp_load + imp_char * t) / (imp_char + self.imp_load * t)
    }

    /// Total impedance seen at the coupling port
    #[inline]
    pub fn impedance(&self, frequency: f64) -> Complex64 {
        self.coupling_impedance(frequency) + self.line_impedance(frequency)
    }

    /// Total impedance at each frequency (Hz)
    pub fn impedance_array(&self, frequency: &[f64]) -> Array1<Complex64> {
        frequency.iter().map(|&f| self.impedance(f)).collect()
    }
}

/// Linear transmission-line resonator in the shunt configuration
///
/// Parameters: `Rl`, `Cc`, `Ls`, `Rs`, `Cs`, `Gs`, `imp_load`, `length`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TLResonator;

impl Model for TLResonator {
    fn name(&self) -> &str {
        "tl_resonator"
    }

    fn param_names(&self) -> Vec<&'static str> {
        vec![RL, CC, LS, RS, CS, GS, IMP_LOAD, LENGTH]
    }

    fn eval(&self, params: &Parameters, frequency: &[f64]) -> Result<Array1<Complex64>> {
        Ok(TLCircuit::from_params(params)?.impedance_array(frequency))
    }

    /// Fixed starting point bracketing typical superconducting geometries
    ///
    /// The data and frequency are not used. `imp_load` is held at 0.
    fn guess(&self, _data: &[Complex64], _frequency: &[f64]) -> Result<Parameters> {
        let mut params = self.make_params();
        params.insert(Parameter::new(RL, 50.0).with_bounds(0.0, 100.0)?);
        params.insert(Parameter::new(CC, 10e-12).with_bounds(0.5e-12, 100e-12)?);
        params.insert(Parameter::new(LS, 3e-9).with_bounds(0.3e-9, 30e-9)?);
        params.insert(Parameter::new(RS, 1.0));
        params.insert(Parameter::new(CS, 0.4e-12).with_bounds(0.04e-12, 40e-12)?);
        params.insert(Parameter::new(GS, 1.0));
        params.insert(Parameter::new(IMP_LOAD, 0.0).fixed());
        params.insert(Parameter::new(LENGTH, 4000e-6).with_bounds(2525e-6, 6755e-6)?);
        Ok(params)
    }
}

impl ResonatorModel for TLResonator {
    fn constants(&self) -> ResonatorConstants {
        SHUNT
    }
}
