//! Lattice frame for periodic orbitals.
//!
//! Maps Cartesian electron positions into fractional lattice coordinates and
//! carries spline derivatives taken in the fractional frame back into
//! Cartesian space.

use color_eyre::eyre::{ensure, eyre, Result};
use nalgebra::{ComplexField, Matrix3, Vector3};

/// Largest deviation from identity tolerated in `lattice * reciprocalᵀ`.
const CONSISTENCY_TOL: f64 = 1e-8;

/// Direct and reciprocal lattice of a periodic system, with origin and k-point.
///
/// Built once and never mutated; all accessors hand out copies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeFrame {
    /// Rows are the direct lattice vectors
    lattice_vector: Matrix3<f64>,
    /// Rows turn a Cartesian displacement into fractional coordinates
    reciprocal_vector: Matrix3<f64>,
    origin: Vector3<f64>,
    /// Crystal momentum, in units of π per lattice vector
    kpoint: Vector3<f64>,
}

impl LatticeFrame {
    /// Assemble a frame from externally supplied lattice data.
    ///
    /// The reciprocal matrix must invert the lattice, i.e.
    /// `lattice * reciprocalᵀ = 1`.
    pub fn new(
        lattice: Matrix3<f64>,
        reciprocal: Matrix3<f64>,
        origin: Vector3<f64>,
        kpoint: Vector3<f64>,
    ) -> Result<Self> {
        let deviation = (lattice * reciprocal.transpose() - Matrix3::identity()).amax();
        ensure!(
            deviation < CONSISTENCY_TOL,
            "reciprocal lattice does not match the lattice vectors (max deviation {:e})",
            deviation
        );
        Ok(Self {
            lattice_vector: lattice,
            reciprocal_vector: reciprocal,
            origin,
            kpoint,
        })
    }

    /// Build a frame from lattice vectors alone, deriving the reciprocal rows.
    pub fn from_lattice(
        lattice: Matrix3<f64>,
        origin: Vector3<f64>,
        kpoint: Vector3<f64>,
    ) -> Result<Self> {
        let reciprocal = reciprocal_of(&lattice)
            .ok_or_else(|| eyre!("lattice vectors are linearly dependent"))?;
        Self::new(lattice, reciprocal, origin, kpoint)
    }

    /// Unit cube at the origin; fractional and Cartesian coordinates coincide.
    pub fn identity() -> Self {
        Self {
            lattice_vector: Matrix3::identity(),
            reciprocal_vector: Matrix3::identity(),
            origin: Vector3::zeros(),
            kpoint: Vector3::zeros(),
        }
    }

    /// Same lattice with a different crystal momentum.
    pub fn with_kpoint(self, kpoint: Vector3<f64>) -> Self {
        Self { kpoint, ..self }
    }

    pub fn lattice(&self) -> Matrix3<f64> {
        self.lattice_vector
    }

    pub fn reciprocal(&self) -> Matrix3<f64> {
        self.reciprocal_vector
    }

    pub fn origin(&self) -> Vector3<f64> {
        self.origin
    }

    pub fn kpoint(&self) -> Vector3<f64> {
        self.kpoint
    }

    /// True away from the Γ point, where orbitals need complex splines.
    pub fn is_complex(&self) -> bool {
        self.kpoint.iter().any(|&k| k != 0.0)
    }

    /// Fractional coordinates `u_i = Σ_j (r_j - o_j) R_ij`.
    pub fn to_fractional(&self, r: &Vector3<f64>) -> Vector3<f64> {
        let mut u = Vector3::zeros();
        for i in 0..3 {
            for j in 0..3 {
                u[i] += (r[j] - self.origin[j]) * self.reciprocal_vector[(i, j)];
            }
        }
        u
    }

    /// Cartesian gradient `g_i = Σ_j g^frac_j R_ji`.
    pub fn gradient_to_cartesian<T>(&self, grad: &Vector3<T>) -> Vector3<T>
    where
        T: ComplexField<RealField = f64> + Copy,
    {
        let mut out = Vector3::from_element(T::zero());
        for i in 0..3 {
            for j in 0..3 {
                out[i] += grad[j] * T::from_real(self.reciprocal_vector[(j, i)]);
            }
        }
        out
    }

    /// Full Cartesian Hessian `H_ij = Σ_kl R_ki R_lj H^frac_kl`.
    pub fn hessian_to_cartesian<T>(&self, hess: &Matrix3<T>) -> Matrix3<T>
    where
        T: ComplexField<RealField = f64> + Copy,
    {
        let r = &self.reciprocal_vector;
        let mut out = Matrix3::from_element(T::zero());
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    for l in 0..3 {
                        out[(i, j)] += hess[(k, l)] * T::from_real(r[(k, i)] * r[(l, j)]);
                    }
                }
            }
        }
        out
    }

    /// Trace of [`hessian_to_cartesian`](Self::hessian_to_cartesian) without
    /// building the off-diagonal entries.
    pub fn laplacian_to_cartesian<T>(&self, hess: &Matrix3<T>) -> T
    where
        T: ComplexField<RealField = f64> + Copy,
    {
        let r = &self.reciprocal_vector;
        let mut lap = T::zero();
        for i in 0..3 {
            for k in 0..3 {
                for l in 0..3 {
                    lap += hess[(k, l)] * T::from_real(r[(k, i)] * r[(l, i)]);
                }
            }
        }
        lap
    }
}

/// Rows of `(Aᵀ)⁻¹` for a lattice `A` whose rows are lattice vectors.
pub(crate) fn reciprocal_of(lattice: &Matrix3<f64>) -> Option<Matrix3<f64>> {
    lattice.transpose().try_inverse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num_complex::Complex;
    use rand_distr::Normal;

    fn random_frame() -> LatticeFrame {
        let mut rng = rand::thread_rng();
        let dist = Normal::new(0.0, 1.0).unwrap();
        // diagonally dominant, so never singular
        let lattice = Matrix3::<f64>::from_distribution(&dist, &mut rng) * 0.3
            + Matrix3::identity() * 4.0;
        let origin = Vector3::<f64>::from_distribution(&dist, &mut rng);
        LatticeFrame::from_lattice(lattice, origin, Vector3::zeros()).unwrap()
    }

    #[test]
    fn test_identity_frame_round_trip() {
        let frame = LatticeFrame::identity();
        let r = Vector3::new(0.3, -1.7, 2.25);
        assert_eq!(frame.to_fractional(&r), r);

        let grad = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(frame.gradient_to_cartesian(&grad), grad);

        let hess = Matrix3::new(1.0, 2.0, 3.0, 2.0, 5.0, 6.0, 3.0, 6.0, 9.0);
        assert_eq!(frame.hessian_to_cartesian(&hess), hess);
        assert_eq!(frame.laplacian_to_cartesian(&hess), 15.0);
    }

    #[test]
    fn test_cubic_fractional_coordinates() {
        let frame = LatticeFrame::from_lattice(
            Matrix3::identity() * 2.0,
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::zeros(),
        )
        .unwrap();
        let u = frame.to_fractional(&Vector3::new(2.0, 1.0, -1.0));
        assert_relative_eq!(u.x, 0.5, epsilon = 1e-14);
        assert_relative_eq!(u.y, 0.5, epsilon = 1e-14);
        assert_relative_eq!(u.z, -0.5, epsilon = 1e-14);
    }

    #[test]
    fn test_lattice_vectors_map_to_unit_steps() {
        let frame = random_frame();
        let lattice = frame.lattice();
        for i in 0..3 {
            let a_i: Vector3<f64> = lattice.row(i).transpose();
            let u = frame.to_fractional(&a_i);
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(u[j], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_laplacian_matches_hessian_trace() {
        let mut rng = rand::thread_rng();
        let dist = Normal::new(0.0, 1.0).unwrap();
        for _ in 0..20 {
            let frame = random_frame();
            let a = Matrix3::<f64>::from_distribution(&dist, &mut rng);
            let hess = a + a.transpose();

            let full = frame.hessian_to_cartesian(&hess);
            let lap = frame.laplacian_to_cartesian(&hess);
            assert_relative_eq!(lap, full.trace(), epsilon = 1e-10);
        }
    }

    #[test]
    fn test_complex_contraction_is_componentwise() {
        let mut rng = rand::thread_rng();
        let dist = Normal::new(0.0, 1.0).unwrap();
        let frame = random_frame();
        let re = Matrix3::<f64>::from_distribution(&dist, &mut rng);
        let im = Matrix3::<f64>::from_distribution(&dist, &mut rng);
        let hess = re.zip_map(&im, Complex::new);

        let full = frame.hessian_to_cartesian(&hess);
        let full_re = frame.hessian_to_cartesian(&re);
        let full_im = frame.hessian_to_cartesian(&im);
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(full[(i, j)].re, full_re[(i, j)], epsilon = 1e-12);
                assert_relative_eq!(full[(i, j)].im, full_im[(i, j)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_chain_rule_against_finite_differences() {
        // f(u) = sin(2πu_x) + u_y² u_z, evaluated through the frame
        let f = |u: &Vector3<f64>| (2.0 * std::f64::consts::PI * u.x).sin() + u.y * u.y * u.z;
        let grad_frac = |u: &Vector3<f64>| {
            let tau = 2.0 * std::f64::consts::PI;
            Vector3::new(tau * (tau * u.x).cos(), 2.0 * u.y * u.z, u.y * u.y)
        };
        let hess_frac = |u: &Vector3<f64>| {
            let tau = 2.0 * std::f64::consts::PI;
            Matrix3::new(
                -tau * tau * (tau * u.x).sin(), 0.0, 0.0,
                0.0, 2.0 * u.z, 2.0 * u.y,
                0.0, 2.0 * u.y, 0.0,
            )
        };

        let frame = random_frame();
        let r = Vector3::new(0.4, -0.2, 1.1);
        let u = frame.to_fractional(&r);
        let grad = frame.gradient_to_cartesian(&grad_frac(&u));
        let hess = frame.hessian_to_cartesian(&hess_frac(&u));

        let h = 1e-4;
        for axis in 0..3 {
            let mut r_fwd = r;
            let mut r_bwd = r;
            r_fwd[axis] += h;
            r_bwd[axis] -= h;
            let numerical =
                (f(&frame.to_fractional(&r_fwd)) - f(&frame.to_fractional(&r_bwd))) / (2.0 * h);
            assert_relative_eq!(grad[axis], numerical, epsilon = 1e-6);

            let numerical_second = (f(&frame.to_fractional(&r_fwd)) - 2.0 * f(&u)
                + f(&frame.to_fractional(&r_bwd)))
                / (h * h);
            assert_relative_eq!(hess[(axis, axis)], numerical_second, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_inconsistent_reciprocal_is_rejected() {
        let lattice = Matrix3::identity() * 2.0;
        let result = LatticeFrame::new(lattice, Matrix3::identity(), Vector3::zeros(), Vector3::zeros());
        assert!(result.is_err());
    }

    #[test]
    fn test_singular_lattice_is_rejected() {
        let lattice = Matrix3::new(1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        assert!(LatticeFrame::from_lattice(lattice, Vector3::zeros(), Vector3::zeros()).is_err());
    }

    #[test]
    fn test_gamma_point_is_real() {
        let frame = random_frame();
        assert!(!frame.is_complex());
        assert!(frame.with_kpoint(Vector3::new(0.0, 0.0, 1.0)).is_complex());
    }
}
