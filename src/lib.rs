//! Spline orbitals - B-spline molecular orbitals for Quantum Monte Carlo.
//!
//! Evaluates orbital values, gradients, Laplacians and Hessians at electron
//! positions from per-orbital spline data, for isolated molecules and for
//! periodic crystals at any k-point.

pub mod evaluator;
pub mod io;
pub mod lattice;
pub mod lists;
pub mod orbital;

// Re-export commonly used types at crate root
pub use evaluator::{ElectronSample, EvalMode, OrbitalBatchEvaluator, Regime, MAX_ORBITALS};
pub use lattice::{Crystal, LatticeFrame, LatticeProvider, Molecule};
pub use lists::{ListId, OrbitalList, OrbitalListRegistry};
pub use orbital::{BlochPhase, BsplineOrbital, OrbitalGrid, OrbitalSpline, SplineProvider, SplineScalar};
