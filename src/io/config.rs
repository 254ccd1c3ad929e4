//! YAML configuration for spline orbital runs.
//!
//! ```yaml
//! orbitals:
//!   nmo: 2
//!   magnify: 1.0
//!   valplt: [orb0.yaml, orb1.yaml]
//!   lists:
//!     - name: up
//!       orbitals: [0, 1]
//!     - name: down
//!       orbitals: [0]
//! system:
//!   lattice: [[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]]
//!   kpoint: [0.0, 0.0, 1.0]
//! electrons:
//!   - [0.1, 0.2, 0.3]
//! ```

use std::path::Path;

use color_eyre::eyre::{ensure, Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::evaluator::MAX_ORBITALS;
use crate::lattice::Crystal;

fn default_magnify() -> f64 {
    1.0
}

/// The `orbitals` section.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrbitalConfig {
    /// Number of molecular orbitals
    pub nmo: usize,
    /// Factor applied to every value and derivative
    #[serde(default = "default_magnify")]
    pub magnify: f64,
    /// Complex splines for a non-periodic system; crystals decide from the k-point
    #[serde(default)]
    pub complex: bool,
    /// One spline file per orbital, in orbital order
    pub valplt: Vec<String>,
    /// Named orbital lists, kept in the order they are written
    #[serde(default)]
    pub lists: Vec<ListConfig>,
}

/// One entry of the `lists` section.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ListConfig {
    pub name: String,
    pub orbitals: Vec<usize>,
}

impl OrbitalConfig {
    /// `(name, indices)` pairs in declaration order.
    pub fn named_lists(&self) -> impl Iterator<Item = (String, Vec<usize>)> + '_ {
        self.lists.iter().map(|l| (l.name.clone(), l.orbitals.clone()))
    }
}

impl OrbitalConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.nmo <= MAX_ORBITALS,
            "nmo = {} is more than {}; this seems a bit big and most likely can't be handled",
            self.nmo,
            MAX_ORBITALS
        );
        ensure!(
            self.valplt.len() == self.nmo,
            "valplt lists {} orbital files, must have the same number as nmo ({})",
            self.valplt.len(),
            self.nmo
        );
        Ok(())
    }
}

/// Whole configuration file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub orbitals: OrbitalConfig,
    /// Absent for molecules
    #[serde(default)]
    pub system: Option<Crystal>,
    /// Electron positions to evaluate at
    #[serde(default)]
    pub electrons: Vec<[f64; 3]>,
}

pub fn read_config(filename: &Path) -> Result<RunConfig> {
    let file = std::fs::File::open(filename)
        .wrap_err_with(|| format!("unable to open configuration file {}", filename.display()))?;
    let reader = std::io::BufReader::new(file);
    let config: RunConfig = serde_yaml::from_reader(reader)
        .wrap_err_with(|| format!("failed to parse configuration file {}", filename.display()))?;
    Ok(config)
}

/// Serialize the orbital section back to YAML.
pub fn write_input(config: &OrbitalConfig) -> Result<String> {
    serde_yaml::to_string(config).wrap_err("failed to serialize orbital section")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOLECULE: &str = "
orbitals:
  nmo: 2
  valplt: [a.yaml, b.yaml]
  lists:
    - name: up
      orbitals: [1, 0]
    - name: down
      orbitals: [0]
";

    #[test]
    fn test_defaults() {
        let config: RunConfig = serde_yaml::from_str(MOLECULE).unwrap();
        assert_eq!(config.orbitals.magnify, 1.0);
        assert!(!config.orbitals.complex);
        assert!(config.system.is_none());
        assert!(config.electrons.is_empty());
        assert_eq!(config.orbitals.lists[0].orbitals, vec![1, 0]);
        config.orbitals.validate().unwrap();
    }

    #[test]
    fn test_lists_keep_declaration_order() {
        let config: RunConfig = serde_yaml::from_str(MOLECULE).unwrap();
        let names: Vec<String> = config.orbitals.named_lists().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["up", "down"]);
    }

    #[test]
    fn test_missing_orbital_section() {
        let result: Result<RunConfig, _> = serde_yaml::from_str("electrons: []\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_valplt() {
        let result: Result<RunConfig, _> = serde_yaml::from_str("orbitals:\n  nmo: 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_file_count_must_match_nmo() {
        let mut config: RunConfig = serde_yaml::from_str(MOLECULE).unwrap();
        config.orbitals.nmo = 3;
        let err = config.orbitals.validate().unwrap_err();
        assert!(err.to_string().contains("same number as nmo"));
    }

    #[test]
    fn test_nmo_upper_bound() {
        let mut config: RunConfig = serde_yaml::from_str(MOLECULE).unwrap();
        config.orbitals.nmo = MAX_ORBITALS + 1;
        assert!(config.orbitals.validate().is_err());
    }

    #[test]
    fn test_write_input_round_trip() {
        let config: RunConfig = serde_yaml::from_str(MOLECULE).unwrap();
        let text = write_input(&config.orbitals).unwrap();
        let back: OrbitalConfig = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back, config.orbitals);
    }

    #[test]
    fn test_read_missing_file() {
        assert!(read_config(Path::new("/nonexistent/orbitals.yml")).is_err());
    }
}
