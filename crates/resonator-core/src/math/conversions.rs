//! Unit conversion functions
//!
//! Conversions between complex responses and magnitude/phase representations.

use num_complex::Complex64;
use std::f64::consts::PI;

/// Convert complex number to magnitude
pub fn complex_2_magnitude(z: Complex64) -> f64 {
    z.norm()
}

/// Convert complex number to phase in radians
pub fn complex_2_radian(z: Complex64) -> f64 {
    z.arg()
}

/// Build a complex number from magnitude and phase in radians
pub fn magrad_2_reim(mag: f64, rad: f64) -> Complex64 {
    Complex64::from_polar(mag, rad)
}

/// Unwrap a phase sequence in radians
///
/// Adds multiples of 2π so that consecutive values never jump by more than π.
pub fn unwrap_radian(phase: &[f64]) -> Vec<f64> {
    let mut unwrapped = Vec::with_capacity(phase.len());
    let mut offset = 0.0;

    for (i, &p) in phase.iter().enumerate() {
        if i > 0 {
            let delta = p - phase[i - 1];
            if delta.abs() >= PI {
                let mut wrapped = (delta + PI).rem_euclid(2.0 * PI) - PI;
                if wrapped == -PI && delta > 0.0 {
                    wrapped = PI;
                }
                offset += wrapped - delta;
            }
        }
        unwrapped.push(p + offset);
    }

    unwrapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_phase_conversions() {
        let z = Complex64::new(0.0, 2.0);
        assert_relative_eq!(complex_2_radian(z), PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(complex_2_magnitude(z), 2.0, epsilon = 1e-12);

        let back = magrad_2_reim(2.0, PI / 2.0);
        assert_relative_eq!(back.re, 0.0, epsilon = 1e-12);
        assert_relative_eq!(back.im, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unwrap_radian() {
        // A steadily decreasing phase wrapped into (-π, π]
        let true_phase: Vec<f64> = (0..50).map(|i| -0.4 * i as f64).collect();
        let wrapped: Vec<f64> = true_phase
            .iter()
            .map(|&p| Complex64::from_polar(1.0, p).arg())
            .collect();

        let unwrapped = unwrap_radian(&wrapped);
        for (u, t) in unwrapped.iter().zip(true_phase.iter()) {
            assert_relative_eq!(*u, *t, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_unwrap_radian_empty() {
        assert!(unwrap_radian(&[]).is_empty());
    }
}
