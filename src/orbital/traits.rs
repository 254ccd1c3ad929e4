//! Spline provider interface for a single molecular orbital.
//!
//! A provider owns the interpolation data of one orbital and returns value,
//! gradient and second derivatives in its native coordinate frame: Cartesian
//! for molecules, fractional lattice coordinates for crystals.

use std::io::Read;

use color_eyre::eyre::Result;
use nalgebra::{ComplexField, Matrix3, Vector3};
use num_complex::Complex;

/// Scalar a spline can be built over: `f64` or `Complex<f64>`.
pub trait SplineScalar: ComplexField<RealField = f64> + Copy {
    /// Number of `f64` values stored per coefficient on disk.
    const COMPONENTS: usize;

    fn from_components(components: &[f64]) -> Self;
}

impl SplineScalar for f64 {
    const COMPONENTS: usize = 1;

    fn from_components(components: &[f64]) -> Self {
        components[0]
    }
}

impl SplineScalar for Complex<f64> {
    const COMPONENTS: usize = 2;

    fn from_components(components: &[f64]) -> Self {
        Complex::new(components[0], components[1])
    }
}

/// Grid metadata reported for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitalGrid {
    pub origin: Vector3<f64>,
    pub box_size: Vector3<f64>,
    pub spacing: Vector3<f64>,
}

/// Interpolated field for one orbital.
///
/// The lattice setters are called once, before [`load`](Self::load), and only
/// for periodic systems. Providers that do not need a piece of lattice data may
/// keep the default no-op.
pub trait SplineProvider<T: SplineScalar>: Send + Sync {
    fn set_periodic(&mut self, _periodic: bool) {}

    fn set_reciprocal_lattice(&mut self, _reciprocal: &Matrix3<f64>) {}

    fn set_bounds(&mut self, _lattice: &Matrix3<f64>) {}

    fn set_kpoint(&mut self, _kpoint: &Vector3<f64>) {}

    fn set_origin(&mut self, _origin: &Vector3<f64>) {}

    /// Read the interpolation data.
    fn load(&mut self, reader: &mut dyn Read) -> Result<()>;

    /// Value at `pos`.
    fn evaluate(&self, pos: &Vector3<f64>) -> T;

    /// Value, gradient and Hessian at `pos`.
    fn evaluate_hessian(&self, pos: &Vector3<f64>) -> (T, Vector3<T>, Matrix3<T>);

    /// Value, gradient and Laplacian at `pos`.
    fn evaluate_laplacian(&self, pos: &Vector3<f64>) -> (T, Vector3<T>, T) {
        let (value, grad, hess) = self.evaluate_hessian(pos);
        (value, grad, hess.trace())
    }

    fn grid(&self) -> Option<OrbitalGrid> {
        None
    }

    /// False until interpolation data is in place.
    fn is_loaded(&self) -> bool {
        true
    }
}

pub type RealSpline = Box<dyn SplineProvider<f64>>;
pub type ComplexSpline = Box<dyn SplineProvider<Complex<f64>>>;

/// Spline handle of one orbital; the arithmetic is fixed when it is built.
pub enum OrbitalSpline {
    Real(RealSpline),
    Complex(ComplexSpline),
}

impl OrbitalSpline {
    pub fn is_complex(&self) -> bool {
        matches!(self, OrbitalSpline::Complex(_))
    }

    pub fn grid(&self) -> Option<OrbitalGrid> {
        match self {
            OrbitalSpline::Real(spline) => spline.grid(),
            OrbitalSpline::Complex(spline) => spline.grid(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        match self {
            OrbitalSpline::Real(spline) => spline.is_loaded(),
            OrbitalSpline::Complex(spline) => spline.is_loaded(),
        }
    }
}

impl std::fmt::Debug for OrbitalSpline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrbitalSpline::Real(_) => f.write_str("OrbitalSpline::Real"),
            OrbitalSpline::Complex(_) => f.write_str("OrbitalSpline::Complex"),
        }
    }
}
