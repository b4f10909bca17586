//! Linear algebra operations
//!
//! This module provides the dense decompositions used by the fitting engine.
//! nalgebra is the backend; every ndarray <-> nalgebra conversion is kept
//! here so the rest of the crate only sees ndarray.

use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// Thin singular value decomposition `A = U diag(σ) Vᵀ`
#[derive(Debug, Clone)]
pub struct Svd {
    /// Left singular vectors, m × k
    pub u: Array2<f64>,
    /// Singular values, length k
    pub singular_values: Array1<f64>,
    /// Right singular vectors (transposed), k × n
    pub vt: Array2<f64>,
}

impl Svd {
    /// Largest singular value (0 for an empty decomposition)
    pub fn max_singular_value(&self) -> f64 {
        self.singular_values.iter().cloned().fold(0.0, f64::max)
    }

    /// Solve the Tikhonov-damped least squares problem
    ///
    /// Minimizes `|A x - b|² + damping |x|²`. With `damping = 0` singular
    /// values below `rel_tol * σ_max` are dropped (pseudo-inverse).
    pub fn solve_damped(&self, b: &Array1<f64>, damping: f64, rel_tol: f64) -> Array1<f64> {
        let cutoff = rel_tol * self.max_singular_value();
        let utb = self.u.t().dot(b);

        let mut x = Array1::<f64>::zeros(self.vt.ncols());
        for (k, &sigma) in self.singular_values.iter().enumerate() {
            if damping == 0.0 && sigma <= cutoff {
                continue;
            }
            let factor = sigma / (sigma * sigma + damping) * utb[k];
            x.scaled_add(factor, &self.vt.row(k));
        }
        x
    }

    /// Inverse of the Gram matrix `(AᵀA)⁻¹ = V diag(σ⁻²) Vᵀ`
    ///
    /// Returns None if A is rank deficient relative to `rel_tol` or has
    /// fewer rows than columns.
    pub fn gram_inverse(&self, rel_tol: f64) -> Option<Array2<f64>> {
        let n = self.vt.ncols();
        if self.singular_values.len() < n || n == 0 {
            return None;
        }

        let cutoff = rel_tol * self.max_singular_value();
        if self.singular_values.iter().any(|&s| s <= cutoff || s == 0.0) {
            return None;
        }

        let mut inv = Array2::<f64>::zeros((n, n));
        for (k, &sigma) in self.singular_values.iter().enumerate() {
            let v = self.vt.row(k);
            let w = 1.0 / (sigma * sigma);
            for i in 0..n {
                for j in 0..n {
                    inv[[i, j]] += w * v[i] * v[j];
                }
            }
        }
        Some(inv)
    }
}

// ============================================================================
// Conversion helpers (internal)
// ============================================================================

/// Convert ndarray Array2<f64> to nalgebra DMatrix<f64>
#[inline]
fn to_na_real(a: &Array2<f64>) -> DMatrix<f64> {
    let (m, n) = a.dim();
    DMatrix::from_fn(m, n, |i, j| a[[i, j]])
}

/// Convert nalgebra DMatrix<f64> to ndarray Array2<f64>
#[inline]
fn from_na_real(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

// ============================================================================
// Decompositions
// ============================================================================

/// Thin SVD of a real matrix
pub fn svd_real(a: &Array2<f64>) -> Result<Svd, &'static str> {
    let (m, n) = a.dim();
    if m == 0 || n == 0 {
        return Err("Empty matrix");
    }
    if a.iter().any(|x| !x.is_finite()) {
        return Err("Matrix contains non-finite entries");
    }

    let svd = to_na_real(a).svd(true, true);

    let u = svd.u.ok_or("SVD failed: no U matrix")?;
    let vt = svd.v_t.ok_or("SVD failed: no Vh matrix")?;

    Ok(Svd {
        u: from_na_real(&u),
        singular_values: svd.singular_values.iter().cloned().collect(),
        vt: from_na_real(&vt),
    })
}
