//! Build an evaluator from a configuration: lattice, spline files, lists.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use num_complex::Complex;
use tracing::{info, warn};

use crate::evaluator::OrbitalBatchEvaluator;
use crate::lattice::{LatticeFrame, LatticeProvider, Molecule};
use crate::orbital::{BsplineOrbital, OrbitalSpline, SplineProvider, SplineScalar};

use super::config::{OrbitalConfig, RunConfig};

/// Lattice frame of the configured system, `None` for a molecule.
pub fn system_frame(config: &RunConfig) -> Result<Option<LatticeFrame>> {
    let system: &dyn LatticeProvider = match &config.system {
        Some(crystal) => crystal,
        None => &Molecule,
    };
    LatticeFrame::from_provider(system)
}

fn open_spline<T: SplineScalar>(path: &Path, frame: Option<&LatticeFrame>) -> Result<BsplineOrbital<T>> {
    let file = File::open(path)
        .wrap_err_with(|| format!("couldn't find orbital file {}", path.display()))?;
    let mut spline = BsplineOrbital::<T>::new();
    spline.set_periodic(frame.is_some());
    if let Some(frame) = frame {
        spline.set_reciprocal_lattice(&frame.reciprocal());
        spline.set_bounds(&frame.lattice());
        spline.set_kpoint(&frame.kpoint());
        spline.set_origin(&frame.origin());
    }
    info!("Reading orbital file {}", path.display());
    spline
        .load(&mut BufReader::new(file))
        .wrap_err_with(|| format!("failed to load orbital file {}", path.display()))?;
    Ok(spline)
}

/// Load one B-spline per entry of `valplt`; relative paths resolve against `base_dir`.
pub fn load_orbitals(
    config: &OrbitalConfig,
    frame: Option<&LatticeFrame>,
    base_dir: &Path,
) -> Result<Vec<OrbitalSpline>> {
    let complex = frame.map_or(config.complex, LatticeFrame::is_complex);
    if frame.is_some() && config.complex {
        warn!("`complex` is ignored for periodic systems; the k-point decides");
    }

    info!("Bspline MO");
    config
        .valplt
        .iter()
        .map(|name| -> Result<OrbitalSpline> {
            let path = base_dir.join(name);
            let spline = if complex {
                OrbitalSpline::Complex(Box::new(open_spline::<Complex<f64>>(&path, frame)?))
            } else {
                OrbitalSpline::Real(Box::new(open_spline::<f64>(&path, frame)?))
            };
            Ok(spline)
        })
        .collect()
}

/// Validate the configuration and build a ready-to-use evaluator.
pub fn build_evaluator(config: &RunConfig, base_dir: &Path) -> Result<OrbitalBatchEvaluator> {
    config.orbitals.validate()?;
    let frame = system_frame(config)?;
    let orbitals = load_orbitals(&config.orbitals, frame.as_ref(), base_dir)?;
    let evaluator = OrbitalBatchEvaluator::new(frame, orbitals, config.orbitals.magnify)?
        .with_lists(config.orbitals.named_lists())?;

    let regime = evaluator.regime();
    info!(
        "Using {} and {} splines",
        if regime.is_periodic() { "periodic" } else { "non-periodic" },
        if regime.is_complex() { "complex" } else { "real" }
    );
    Ok(evaluator)
}

/// Human-readable summary of the loaded orbitals.
pub fn show_info(config: &OrbitalConfig, evaluator: &OrbitalBatchEvaluator) -> String {
    let indent = "  ";
    let mut out = format!("Bspline Molecular Orbital ({})\n", evaluator.regime());
    out.push_str("Using orbital value plotfiles :\n");
    for (mo, name) in config.valplt.iter().enumerate() {
        out.push_str(&format!("{indent}{name}\n"));
        if let Some(grid) = evaluator.orbital_grid(mo) {
            let o = grid.origin;
            let b = grid.box_size;
            let s = grid.spacing;
            out.push_str(&format!("{indent}origin:   {}  {}  {}\n", o.x, o.y, o.z));
            out.push_str(&format!("{indent}box_size: {}  {}  {}\n", b.x, b.y, b.z));
            out.push_str(&format!("{indent}spacing:  {}  {}  {}\n", s.x, s.y, s.z));
        }
    }
    out.push_str(&format!("Number of molecular orbitals: {}\n", evaluator.nmo()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{EvalMode, Regime};
    use crate::io::ListConfig;
    use crate::lattice::Crystal;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::path::PathBuf;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("spline_orbitals_{}_{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn constant_file(dir: &Path, name: &str, numbers: &[f64]) -> String {
        let coefficients: Vec<String> = numbers.iter().map(|x| x.to_string()).collect();
        let text = format!(
            "dims: [2, 2, 2]\norigin: [-1, -1, -1]\nbox_size: [2, 2, 2]\ncoefficients: [{}]\n",
            coefficients.join(", ")
        );
        std::fs::write(dir.join(name), text).unwrap();
        name.to_string()
    }

    fn molecule_config(dir: &Path) -> RunConfig {
        let a = constant_file(dir, "a.yaml", &[2.0; 8]);
        let b = constant_file(dir, "b.yaml", &[-3.0; 8]);
        let lists = vec![ListConfig { name: "up".to_string(), orbitals: vec![1, 0] }];
        RunConfig {
            orbitals: OrbitalConfig {
                nmo: 2,
                magnify: 0.5,
                complex: false,
                valplt: vec![a, b],
                lists,
            },
            system: None,
            electrons: vec![],
        }
    }

    #[test]
    fn test_build_molecule_from_files() {
        let dir = scratch_dir("molecule");
        let config = molecule_config(&dir);
        let evaluator = build_evaluator(&config, &dir).unwrap();
        assert_eq!(evaluator.regime(), Regime::Molecular);
        assert_eq!(evaluator.nmo(), 2);

        let up = evaluator.list_id("up").unwrap();
        let mut out = evaluator.table(up, EvalMode::Value).unwrap();
        evaluator.evaluate_values(&Vector3::new(0.1, 0.2, -0.3), up, &mut out).unwrap();
        assert_relative_eq!(out[(0, 0)], -1.5, epsilon = 1e-12);
        assert_relative_eq!(out[(1, 0)], 1.0, epsilon = 1e-12);

        let info = show_info(&config.orbitals, &evaluator);
        assert!(info.contains("a.yaml"));
        assert!(info.contains("Number of molecular orbitals: 2"));
        assert!(info.contains("  spacing:  2  2  2"));
    }

    #[test]
    fn test_missing_orbital_file() {
        let dir = scratch_dir("missing");
        let mut config = molecule_config(&dir);
        config.orbitals.valplt[1] = "nope.yaml".to_string();
        let err = build_evaluator(&config, &dir).err().unwrap();
        assert!(format!("{:?}", err).contains("nope.yaml"));
    }

    #[test]
    fn test_complex_molecule() {
        let dir = scratch_dir("complex");
        let mut config = molecule_config(&dir);
        let c = constant_file(&dir, "c.yaml", &[1.0, 4.0].repeat(8));
        config.orbitals.complex = true;
        config.orbitals.valplt = vec![c.clone(), c];
        let evaluator = build_evaluator(&config, &dir).unwrap();
        assert_eq!(evaluator.regime(), Regime::MolecularComplex);
    }

    #[test]
    fn test_periodic_kpoint_selects_bloch() {
        let dir = scratch_dir("crystal");
        std::fs::write(dir.join("p.yaml"), "dims: [1, 1, 1]\ncoefficients: [1.0, 0.0]\n").unwrap();
        let config = RunConfig {
            orbitals: OrbitalConfig {
                nmo: 1,
                magnify: 1.0,
                complex: false,
                valplt: vec!["p.yaml".to_string()],
                lists: vec![ListConfig { name: "all".to_string(), orbitals: vec![0] }],
            },
            system: Some(Crystal {
                lattice: [[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]],
                origin: [0.0; 3],
                kpoint: [1.0, 0.0, 0.0],
            }),
            electrons: vec![],
        };
        let evaluator = build_evaluator(&config, &dir).unwrap();
        assert_eq!(evaluator.regime(), Regime::Bloch);

        // unit amplitude: ψ = cos(π k·u) with u_x = x / 2
        let all = evaluator.list_id("all").unwrap();
        let mut out = evaluator.table(all, EvalMode::Laplacian).unwrap();
        evaluator.evaluate_value_grad_laplacian(&Vector3::new(0.5, 0.0, 0.0), all, &mut out).unwrap();
        let theta = std::f64::consts::PI * 0.25;
        let kx = std::f64::consts::PI / 2.0;
        assert_relative_eq!(out[(0, 0)], theta.cos(), epsilon = 1e-12);
        assert_relative_eq!(out[(0, 1)], -kx * theta.sin(), epsilon = 1e-12);
        assert_relative_eq!(out[(0, 4)], -kx * kx * theta.cos(), epsilon = 1e-12);
    }
}
