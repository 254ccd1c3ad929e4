//! Lattice module - coordinate frames for periodic orbitals.

mod frame;
mod provider;

pub use frame::LatticeFrame;
pub use provider::{Crystal, LatticeProvider, Molecule};
