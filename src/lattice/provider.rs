//! System descriptions that supply lattice data to the orbital evaluator.

use color_eyre::eyre::{eyre, Result};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use super::frame::{reciprocal_of, LatticeFrame};

/// Source of lattice information for a simulated system.
pub trait LatticeProvider {
    /// Direct lattice vectors as rows, or `None` for an isolated system.
    fn bounds(&self) -> Option<Matrix3<f64>>;

    /// Reciprocal lattice rows mapping Cartesian displacements to fractions.
    fn reciprocal_lattice(&self) -> Option<Matrix3<f64>>;

    fn kpoint(&self) -> Vector3<f64>;

    fn origin(&self) -> Vector3<f64>;
}

/// Isolated molecule: no lattice at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Molecule;

impl LatticeProvider for Molecule {
    fn bounds(&self) -> Option<Matrix3<f64>> {
        None
    }

    fn reciprocal_lattice(&self) -> Option<Matrix3<f64>> {
        None
    }

    fn kpoint(&self) -> Vector3<f64> {
        Vector3::zeros()
    }

    fn origin(&self) -> Vector3<f64> {
        Vector3::zeros()
    }
}

/// Periodic crystal as written in the `system` section of a config file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Crystal {
    /// Lattice vectors, one per row
    pub lattice: [[f64; 3]; 3],
    #[serde(default)]
    pub origin: [f64; 3],
    #[serde(default)]
    pub kpoint: [f64; 3],
}

impl Crystal {
    fn lattice_matrix(&self) -> Matrix3<f64> {
        let l = &self.lattice;
        Matrix3::new(
            l[0][0], l[0][1], l[0][2],
            l[1][0], l[1][1], l[1][2],
            l[2][0], l[2][1], l[2][2],
        )
    }
}

impl LatticeProvider for Crystal {
    fn bounds(&self) -> Option<Matrix3<f64>> {
        Some(self.lattice_matrix())
    }

    fn reciprocal_lattice(&self) -> Option<Matrix3<f64>> {
        reciprocal_of(&self.lattice_matrix())
    }

    fn kpoint(&self) -> Vector3<f64> {
        Vector3::from(self.kpoint)
    }

    fn origin(&self) -> Vector3<f64> {
        Vector3::from(self.origin)
    }
}

impl LatticeFrame {
    /// Query a system for its lattice. `Ok(None)` means the system is not periodic.
    pub fn from_provider(system: &dyn LatticeProvider) -> Result<Option<Self>> {
        let Some(lattice) = system.bounds() else {
            return Ok(None);
        };
        let reciprocal = system
            .reciprocal_lattice()
            .ok_or_else(|| eyre!("could not read reciprocal lattice vectors from system"))?;
        Self::new(lattice, reciprocal, system.origin(), system.kpoint()).map(Some)
    }
}
