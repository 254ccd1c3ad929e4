//! Crystal-momentum phase for complex periodic orbitals.
//!
//! The spline stores the cell-periodic amplitude; the physical orbital is
//! `ψ(u) = amp(u) exp(iπ k·u)` with `u` in fractional coordinates. The
//! derivatives returned here are still in the fractional frame.

use std::f64::consts::PI;

use nalgebra::{Matrix3, Vector3};
use num_complex::Complex;

const I: Complex<f64> = Complex::new(0.0, 1.0);

/// Phase factor at one fractional position.
#[derive(Debug, Clone, Copy)]
pub struct BlochPhase {
    phase: Complex<f64>,
    /// π k
    pik: Vector3<f64>,
}

impl BlochPhase {
    pub fn new(kpoint: &Vector3<f64>, u: &Vector3<f64>) -> Self {
        let pik = kpoint * PI;
        Self {
            phase: (I * pik.dot(u)).exp(),
            pik,
        }
    }

    pub fn value(&self, amp: Complex<f64>) -> Complex<f64> {
        self.phase * amp
    }

    /// `phase (iπk_d amp + ∂_d amp)`
    pub fn gradient(&self, amp: Complex<f64>, grad: &Vector3<Complex<f64>>) -> Vector3<Complex<f64>> {
        Vector3::from_fn(|d, _| self.phase * (I * self.pik[d] * amp + grad[d]))
    }

    /// `phase (-π²k_i k_j amp + iπk_i ∂_j amp + iπk_j ∂_i amp + ∂_ij amp)`
    pub fn hessian(
        &self,
        amp: Complex<f64>,
        grad: &Vector3<Complex<f64>>,
        hess: &Matrix3<Complex<f64>>,
    ) -> Matrix3<Complex<f64>> {
        let k = &self.pik;
        Matrix3::from_fn(|i, j| {
            self.phase
                * (-k[i] * k[j] * amp
                    + I * k[i] * grad[j]
                    + I * k[j] * grad[i]
                    + hess[(i, j)])
        })
    }
}
