//! resonator-core: Shunt-coupled transmission-line resonator models
//!
//! Models the complex response of a resonator that loads a transmission line
//! through a coupling capacitor, and fits it to measured frequency-domain data
//! to extract circuit parameters.
//!
//! ## Modules
//!
//! - `frequency` - Frequency sweep representation and validation
//! - `parameters` - Named parameters with bounds and vary flags
//! - `model` - Model capability trait and background × foreground composition
//! - `background` - Background models for the measurement chain
//! - `resonator` - Resonator models (shunt-coupled transmission line)
//! - `fitting` - Least-squares engine, fit options, results and fitters

pub mod background;
pub mod constants;
pub mod error;
pub mod fitting;
pub mod frequency;
pub mod math;
pub mod model;
pub mod parameters;
pub mod resonator;

pub use error::{ResonatorError, Result};
pub use fitting::{FitOptions, FitResult, ResonatorFitter, TLResonatorFitter};
pub use frequency::Frequency;
pub use model::{CompositeModel, Model};
pub use parameters::{Parameter, Parameters};
pub use resonator::{ResonatorConstants, ResonatorModel, TLCircuit, TLResonator};
