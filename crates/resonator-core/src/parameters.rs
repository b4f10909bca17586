//! Parameter system
//!
//! Named real parameters with optional bounds and a vary flag, plus the
//! bounded-to-unbounded transforms used by the least-squares engine.
//!
//! Bounds are handled by mapping each varying parameter to an internal
//! unconstrained coordinate (the MINUIT convention):
//!
//! - both bounds: `x = asin(2 (v - min) / (max - min) - 1)`
//! - lower bound only: `x = sqrt((v - min + 1)² - 1)`
//! - upper bound only: `x = sqrt((max - v + 1)² - 1)`
//! - unbounded: `x = v`

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ResonatorError, Result};

/// A single named model parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    value: f64,
    min: f64,
    max: f64,
    vary: bool,
    /// Standard error estimated by the last fit
    pub stderr: Option<f64>,
    /// Value before the last fit
    pub init_value: Option<f64>,
}

impl Parameter {
    /// Create an unbounded, varying parameter
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            vary: true,
            stderr: None,
            init_value: None,
        }
    }

    /// Set both bounds; the value is clamped into them
    pub fn with_bounds(mut self, min: f64, max: f64) -> Result<Self> {
        self.set_bounds(min, max)?;
        Ok(self)
    }

    pub fn with_min(self, min: f64) -> Result<Self> {
        let max = self.max;
        self.with_bounds(min, max)
    }

    pub fn with_max(self, max: f64) -> Result<Self> {
        let min = self.min;
        self.with_bounds(min, max)
    }

    /// Hold the parameter at its value during a fit
    pub fn fixed(mut self) -> Self {
        self.vary = false;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[inline]
    pub fn vary(&self) -> bool {
        self.vary
    }

    pub fn set_vary(&mut self, vary: bool) {
        self.vary = vary;
    }

    /// True when `min == max`, leaving the value nowhere to move
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.min == self.max
    }

    /// Whether a fit moves this parameter: `vary` is set and the bounds are not pinned
    #[inline]
    pub fn is_free(&self) -> bool {
        self.vary && !self.is_pinned()
    }

    /// Set the value, clamped into `[min, max]`
    pub fn set_value(&mut self, value: f64) {
        self.value = value.clamp(self.min, self.max);
    }

    pub fn set_bounds(&mut self, min: f64, max: f64) -> Result<()> {
        if min > max || min.is_nan() || max.is_nan() {
            return Err(ResonatorError::InvalidBounds {
                name: self.name.clone(),
                min,
                max,
            });
        }
        self.min = min;
        self.max = max;
        self.value = self.value.clamp(min, max);
        Ok(())
    }

    /// Map the current value to the unconstrained internal coordinate
    ///
    /// Pinned bounds map to 0.
    pub fn to_internal(&self) -> f64 {
        let v = self.value;
        match (self.min.is_finite(), self.max.is_finite()) {
            (true, true) if self.is_pinned() => 0.0,
            (true, true) => (2.0 * (v - self.min) / (self.max - self.min) - 1.0)
                .clamp(-1.0, 1.0)
                .asin(),
            (true, false) => ((v - self.min + 1.0).powi(2) - 1.0).max(0.0).sqrt(),
            (false, true) => ((self.max - v + 1.0).powi(2) - 1.0).max(0.0).sqrt(),
            (false, false) => v,
        }
    }

    /// Map an internal coordinate back to a value inside the bounds
    pub fn from_internal(&self, x: f64) -> f64 {
        match (self.min.is_finite(), self.max.is_finite()) {
            (true, true) => self.min + (x.sin() + 1.0) * (self.max - self.min) / 2.0,
            (true, false) => self.min - 1.0 + (x * x + 1.0).sqrt(),
            (false, true) => self.max + 1.0 - (x * x + 1.0).sqrt(),
            (false, false) => x,
        }
    }

    /// Derivative of the value with respect to the internal coordinate
    pub fn internal_gradient(&self, x: f64) -> f64 {
        match (self.min.is_finite(), self.max.is_finite()) {
            (true, true) => x.cos() * (self.max - self.min) / 2.0,
            (true, false) => x / (x * x + 1.0).sqrt(),
            (false, true) => -x / (x * x + 1.0).sqrt(),
            (false, false) => 1.0,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Parameter '{}', value={:e}", self.name, self.value)?;
        if !self.vary {
            write!(f, " (fixed)")?;
        } else if let Some(stderr) = self.stderr {
            write!(f, " +/- {:.3e}", stderr)?;
        }
        write!(f, ", bounds=[{}:{}]>", self.min, self.max)
    }
}

/// An insertion-ordered set of parameters keyed by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    params: Vec<Parameter>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, rejecting names already present
    pub fn add(&mut self, param: Parameter) -> Result<()> {
        if self.contains(param.name()) {
            return Err(ResonatorError::DuplicateParameter(param.name));
        }
        self.params.push(param);
        Ok(())
    }

    /// Add a parameter, replacing any existing one with the same name in place
    pub fn insert(&mut self, param: Parameter) {
        match self.params.iter_mut().find(|p| p.name == param.name) {
            Some(existing) => *existing = param,
            None => self.params.push(param),
        }
    }

    /// Insert every parameter of `other`, replacing same-named entries
    pub fn extend(&mut self, other: Parameters) {
        for param in other.params {
            self.insert(param);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }

    pub fn get(&self, name: &str) -> Result<&Parameter> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ResonatorError::UnknownParameter(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Parameter> {
        self.params
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| ResonatorError::UnknownParameter(name.to_string()))
    }

    /// Value of the named parameter
    pub fn value(&self, name: &str) -> Result<f64> {
        self.get(name).map(Parameter::value)
    }

    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name()).collect()
    }

    /// Parameters that vary during a fit, in insertion order
    ///
    /// Parameters with pinned bounds are left out even when `vary` is set.
    pub fn varying(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(|p| p.is_free())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.params.iter_mut()
    }

    /// Name → value map
    pub fn values(&self) -> BTreeMap<String, f64> {
        self.params
            .iter()
            .map(|p| (p.name.clone(), p.value))
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bounds_clamp_value() {
        let p = Parameter::new("a", 150.0).with_bounds(0.0, 100.0).unwrap();
        assert_eq!(p.value(), 100.0);

        let mut q = Parameter::new("b", 1.0).with_min(0.0).unwrap();
        q.set_value(-3.0);
        assert_eq!(q.value(), 0.0);
    }

    #[test]
    fn test_invalid_bounds() {
        let err = Parameter::new("a", 1.0).with_bounds(2.0, 1.0);
        assert!(matches!(err, Err(ResonatorError::InvalidBounds { .. })));
    }

    #[test]
    fn test_internal_round_trip() {
        let cases = [
            Parameter::new("both", 30.0).with_bounds(0.0, 100.0).unwrap(),
            Parameter::new("lower", 3.5).with_min(1.0).unwrap(),
            Parameter::new("upper", -2.0).with_max(5.0).unwrap(),
            Parameter::new("free", -7.25),
        ];

        for p in cases.iter() {
            let x = p.to_internal();
            assert_relative_eq!(p.from_internal(x), p.value(), max_relative = 1e-12);
        }
    }

    #[test]
    fn test_internal_gradient_matches_finite_difference() {
        let cases = [
            Parameter::new("both", 30.0).with_bounds(0.0, 100.0).unwrap(),
            Parameter::new("lower", 3.5).with_min(1.0).unwrap(),
            Parameter::new("upper", -2.0).with_max(5.0).unwrap(),
        ];

        for p in cases.iter() {
            let x = p.to_internal();
            let h = 1e-6;
            let numeric = (p.from_internal(x + h) - p.from_internal(x - h)) / (2.0 * h);
            assert_relative_eq!(p.internal_gradient(x), numeric, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_from_internal_stays_in_bounds() {
        let p = Parameter::new("both", 1.0).with_bounds(0.5, 2.0).unwrap();
        for x in [-100.0, -3.0, 0.0, 1.7, 42.0] {
            let v = p.from_internal(x);
            assert!((0.5..=2.0).contains(&v));
        }
    }

    #[test]
    fn test_pinned_bounds_are_held_fixed() {
        let pinned = Parameter::new("Rl", 50.0).with_bounds(50.0, 50.0).unwrap();
        assert!(pinned.vary());
        assert!(pinned.is_pinned());
        assert!(!pinned.is_free());

        let x = pinned.to_internal();
        assert!(x.is_finite());
        assert_eq!(pinned.from_internal(x), 50.0);

        let mut params = Parameters::new();
        params.insert(pinned);
        params.insert(Parameter::new("Cc", 1e-12).with_bounds(0.5e-12, 2e-12).unwrap());
        let names: Vec<&str> = params.varying().map(|p| p.name()).collect();
        assert_eq!(names, vec!["Cc"]);
    }

    #[test]
    fn test_parameters_add_and_insert() {
        let mut params = Parameters::new();
        params.add(Parameter::new("a", 1.0)).unwrap();
        params.add(Parameter::new("b", 2.0).fixed()).unwrap();

        assert!(matches!(
            params.add(Parameter::new("a", 3.0)),
            Err(ResonatorError::DuplicateParameter(_))
        ));

        params.insert(Parameter::new("a", 5.0));
        assert_eq!(params.len(), 2);
        assert_eq!(params.names(), vec!["a", "b"]);
        assert_eq!(params.value("a").unwrap(), 5.0);
        assert_eq!(params.varying().count(), 1);
        assert!(matches!(
            params.value("c"),
            Err(ResonatorError::UnknownParameter(_))
        ));
    }
}
