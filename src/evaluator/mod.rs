//! Evaluator module - batched orbital values and derivatives.

mod batch;
mod regime;
mod sample;

pub use batch::{OrbitalBatchEvaluator, MAX_ORBITALS};
pub use regime::{EvalMode, Regime};
pub use sample::ElectronSample;
