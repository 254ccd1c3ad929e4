//! Orbital module - per-orbital spline providers and the Bloch phase.

mod bloch;
mod bspline;
mod traits;

pub use bloch::BlochPhase;
pub use bspline::BsplineOrbital;
pub use traits::{ComplexSpline, OrbitalGrid, OrbitalSpline, RealSpline, SplineProvider, SplineScalar};
