//! Resonator models
//!
//! A resonator model is a [`Model`] that also carries the constants of its
//! coupling family. Every variant in a family shares one
//! [`ResonatorConstants`] value.

pub mod shunt;

use num_complex::Complex64;

use crate::model::Model;

pub use shunt::{TLCircuit, TLResonator};

/// Constants shared by every resonator in a coupling family
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResonatorConstants {
    /// Value of the normalized response far from resonance
    pub reference_point: Complex64,
    /// Weight of input/output coupling in the Kerr detuning shift
    pub io_coupling_coefficient: f64,
}

/// Shunt-coupled family
pub const SHUNT: ResonatorConstants = ResonatorConstants {
    reference_point: Complex64::new(1.0, 0.0),
    io_coupling_coefficient: 0.5,
};

/// A foreground model describing a resonator
pub trait ResonatorModel: Model {
    fn constants(&self) -> ResonatorConstants;
}
