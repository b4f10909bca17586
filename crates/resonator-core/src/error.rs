//! Error type shared across the crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResonatorError {
    #[error("{what} has {actual} points but the frequency array has {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("No data points to fit")]
    EmptyData,

    #[error("Invalid frequency at index {index}: {value} (must be finite and positive)")]
    InvalidFrequency { index: usize, value: f64 },

    #[error("Invalid standard error at index {0}: both parts must be finite and positive")]
    InvalidErrors(usize),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Duplicate parameter: {0}")]
    DuplicateParameter(String),

    #[error("Invalid bounds for {name}: min {min} > max {max}")]
    InvalidBounds { name: String, min: f64, max: f64 },

    #[error("No parameters are allowed to vary")]
    NoVaryingParameters,

    #[error("Residual is not finite at the initial parameter values")]
    NonFiniteResidual,

    #[error("Linear algebra failure: {0}")]
    Linalg(&'static str),

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

pub type Result<T> = std::result::Result<T, ResonatorError>;
