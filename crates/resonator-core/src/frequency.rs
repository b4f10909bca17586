//! Frequency module - the validated frequency axis of a measurement
//!
//! Values are stored in Hz.

use crate::error::{ResonatorError, Result};

/// A validated frequency axis
#[derive(Debug, Clone)]
pub struct Frequency {
    /// Frequency vector in Hz
    f: Vec<f64>,
}

impl Frequency {
    /// Create from frequencies in Hz, rejecting non-positive or non-finite values
    ///
    /// # Example
    /// ```
    /// use resonator_core::frequency::Frequency;
    /// let freq = Frequency::from_hz(vec![6e9, 7e9, 8e9]).unwrap();
    /// assert_eq!(freq.npoints(), 3);
    /// ```
    pub fn from_hz(f: impl Into<Vec<f64>>) -> Result<Self> {
        let f = f.into();
        validate(&f)?;
        Ok(Self { f })
    }

    /// Get frequency vector in Hz
    #[inline]
    pub fn f(&self) -> &[f64] {
        &self.f
    }

    #[inline]
    pub fn npoints(&self) -> usize {
        self.f.len()
    }
}

/// Check that a frequency array is non-empty with finite, positive entries
pub fn validate(f: &[f64]) -> Result<()> {
    if f.is_empty() {
        return Err(ResonatorError::EmptyData);
    }
    match f.iter().position(|&x| !(x.is_finite() && x > 0.0)) {
        Some(index) => Err(ResonatorError::InvalidFrequency {
            index,
            value: f[index],
        }),
        None => Ok(()),
    }
}
