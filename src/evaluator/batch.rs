//! Batched orbital evaluation at a single electron position.
//!
//! For every orbital of a list the evaluator asks its spline for the value and,
//! depending on the mode, first and second derivatives. Periodic orbitals are
//! evaluated in fractional coordinates and their derivatives are carried back
//! to Cartesian space; Bloch orbitals additionally pick up the crystal-momentum
//! phase. Complex results are truncated to their real part. Every channel is
//! multiplied by the magnification factor before it is stored.

use color_eyre::eyre::{bail, ensure, eyre, Result};
use nalgebra::{DMatrix, Matrix3, Vector3};
use tracing::{debug, info};

use crate::lattice::LatticeFrame;
use crate::lists::{ListId, OrbitalListRegistry};
use crate::orbital::{BlochPhase, ComplexSpline, OrbitalGrid, OrbitalSpline, RealSpline};

use super::regime::{EvalMode, Regime};
use super::sample::ElectronSample;

/// Upper bound on the number of orbitals one evaluator accepts.
pub const MAX_ORBITALS: usize = 40_000;

/// Orbital handles together with the frame their regime needs.
enum Engine {
    Molecular(Vec<RealSpline>),
    MolecularComplex(Vec<ComplexSpline>),
    Periodic {
        frame: LatticeFrame,
        orbitals: Vec<RealSpline>,
    },
    Bloch {
        frame: LatticeFrame,
        orbitals: Vec<ComplexSpline>,
    },
}

/// Evaluates orbital lists at electron positions.
pub struct OrbitalBatchEvaluator {
    engine: Engine,
    grids: Vec<Option<OrbitalGrid>>,
    magnification: f64,
    lists: OrbitalListRegistry,
}

impl OrbitalBatchEvaluator {
    /// Build an evaluator over `orbitals`.
    ///
    /// A lattice frame makes the system periodic; its k-point then decides
    /// between real and complex arithmetic. Without a frame, the arithmetic of
    /// the supplied splines decides. Every spline must match the chosen regime.
    pub fn new(
        frame: Option<LatticeFrame>,
        orbitals: Vec<OrbitalSpline>,
        magnification: f64,
    ) -> Result<Self> {
        ensure!(
            orbitals.len() <= MAX_ORBITALS,
            "{} orbitals requested; more than {} cannot be handled",
            orbitals.len(),
            MAX_ORBITALS
        );
        ensure!(
            magnification.is_finite() && magnification > 0.0,
            "magnification factor must be positive, got {}",
            magnification
        );

        if let Some(mo) = orbitals.iter().position(|spline| !spline.is_loaded()) {
            bail!("orbital {} has no spline data loaded", mo);
        }

        let complex = match &frame {
            Some(frame) => frame.is_complex(),
            None => orbitals.first().is_some_and(OrbitalSpline::is_complex),
        };
        let regime = Regime::new(frame.is_some(), complex);
        let grids = orbitals.iter().map(OrbitalSpline::grid).collect();

        let engine = match (frame, complex) {
            (None, false) => Engine::Molecular(real_splines(orbitals, regime)?),
            (None, true) => Engine::MolecularComplex(complex_splines(orbitals, regime)?),
            (Some(frame), false) => Engine::Periodic {
                frame,
                orbitals: real_splines(orbitals, regime)?,
            },
            (Some(frame), true) => Engine::Bloch {
                frame,
                orbitals: complex_splines(orbitals, regime)?,
            },
        };

        let evaluator = Self {
            engine,
            grids,
            magnification,
            lists: OrbitalListRegistry::default(),
        };
        info!(
            "Spline orbitals: {} orbitals, {}",
            evaluator.nmo(),
            evaluator.regime()
        );
        Ok(evaluator)
    }

    /// Attach the orbital lists. Indices are checked against the orbital count.
    pub fn with_lists<I, S>(mut self, raw: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<usize>)>,
        S: Into<String>,
    {
        self.lists = OrbitalListRegistry::build(self.nmo(), raw)?;
        debug!("Built {} orbital lists", self.lists.len());
        Ok(self)
    }

    pub fn nmo(&self) -> usize {
        match &self.engine {
            Engine::Molecular(orbitals) | Engine::Periodic { orbitals, .. } => orbitals.len(),
            Engine::MolecularComplex(orbitals) | Engine::Bloch { orbitals, .. } => orbitals.len(),
        }
    }

    pub fn regime(&self) -> Regime {
        match &self.engine {
            Engine::Molecular(_) => Regime::Molecular,
            Engine::MolecularComplex(_) => Regime::MolecularComplex,
            Engine::Periodic { .. } => Regime::Periodic,
            Engine::Bloch { .. } => Regime::Bloch,
        }
    }

    pub fn frame(&self) -> Option<&LatticeFrame> {
        match &self.engine {
            Engine::Molecular(_) | Engine::MolecularComplex(_) => None,
            Engine::Periodic { frame, .. } | Engine::Bloch { frame, .. } => Some(frame),
        }
    }

    pub fn magnification(&self) -> f64 {
        self.magnification
    }

    pub fn lists(&self) -> &OrbitalListRegistry {
        &self.lists
    }

    pub fn list_id(&self, name: &str) -> Option<ListId> {
        self.lists.id(name)
    }

    /// Grid metadata of orbital `mo`, if its provider reports any.
    pub fn orbital_grid(&self, mo: usize) -> Option<OrbitalGrid> {
        self.grids.get(mo).copied().flatten()
    }

    /// Zeroed output table sized for `list` and `mode`.
    pub fn table(&self, list: ListId, mode: EvalMode) -> Result<DMatrix<f64>> {
        let rows = self.list_indices(list)?.len();
        Ok(DMatrix::zeros(rows, mode.columns()))
    }

    pub fn evaluate(
        &self,
        r: &Vector3<f64>,
        list: ListId,
        mode: EvalMode,
        out: &mut DMatrix<f64>,
    ) -> Result<()> {
        match mode {
            EvalMode::Value => self.evaluate_values(r, list, out),
            EvalMode::Laplacian => self.evaluate_value_grad_laplacian(r, list, out),
            EvalMode::Hessian => self.evaluate_value_grad_hessian(r, list, out),
        }
    }

    /// Values of every orbital in `list` at `r`; one column.
    pub fn evaluate_values(&self, r: &Vector3<f64>, list: ListId, out: &mut DMatrix<f64>) -> Result<()> {
        let indices = self.prepare(list, EvalMode::Value, out)?;
        let c = self.magnification;

        match &self.engine {
            Engine::Molecular(orbitals) => {
                for (row, &mo) in indices.iter().enumerate() {
                    out[(row, 0)] = c * orbitals[mo].evaluate(r);
                }
            }
            Engine::MolecularComplex(orbitals) => {
                for (row, &mo) in indices.iter().enumerate() {
                    out[(row, 0)] = c * orbitals[mo].evaluate(r).re;
                }
            }
            Engine::Periodic { frame, orbitals } => {
                let u = frame.to_fractional(r);
                for (row, &mo) in indices.iter().enumerate() {
                    out[(row, 0)] = c * orbitals[mo].evaluate(&u);
                }
            }
            Engine::Bloch { frame, orbitals } => {
                let u = frame.to_fractional(r);
                let bloch = BlochPhase::new(&frame.kpoint(), &u);
                for (row, &mo) in indices.iter().enumerate() {
                    out[(row, 0)] = c * bloch.value(orbitals[mo].evaluate(&u)).re;
                }
            }
        }
        Ok(())
    }

    /// Value, Cartesian gradient and Laplacian; five columns.
    pub fn evaluate_value_grad_laplacian(
        &self,
        r: &Vector3<f64>,
        list: ListId,
        out: &mut DMatrix<f64>,
    ) -> Result<()> {
        let indices = self.prepare(list, EvalMode::Laplacian, out)?;
        let c = self.magnification;

        match &self.engine {
            Engine::Molecular(orbitals) => {
                for (row, &mo) in indices.iter().enumerate() {
                    let (val, grad, lap) = orbitals[mo].evaluate_laplacian(r);
                    store_laplacian(out, row, c, val, &grad, lap);
                }
            }
            Engine::MolecularComplex(orbitals) => {
                for (row, &mo) in indices.iter().enumerate() {
                    let (val, grad, lap) = orbitals[mo].evaluate_laplacian(r);
                    store_laplacian(out, row, c, val.re, &grad.map(|g| g.re), lap.re);
                }
            }
            Engine::Periodic { frame, orbitals } => {
                let u = frame.to_fractional(r);
                for (row, &mo) in indices.iter().enumerate() {
                    let (val, grad, hess) = orbitals[mo].evaluate_hessian(&u);
                    let grad = frame.gradient_to_cartesian(&grad);
                    let lap = frame.laplacian_to_cartesian(&hess);
                    store_laplacian(out, row, c, val, &grad, lap);
                }
            }
            Engine::Bloch { frame, orbitals } => {
                let u = frame.to_fractional(r);
                let bloch = BlochPhase::new(&frame.kpoint(), &u);
                for (row, &mo) in indices.iter().enumerate() {
                    let (amp, amp_grad, amp_hess) = orbitals[mo].evaluate_hessian(&u);
                    let val = bloch.value(amp);
                    let grad = frame.gradient_to_cartesian(&bloch.gradient(amp, &amp_grad));
                    let lap = frame.laplacian_to_cartesian(&bloch.hessian(amp, &amp_grad, &amp_hess));
                    store_laplacian(out, row, c, val.re, &grad.map(|g| g.re), lap.re);
                }
            }
        }
        Ok(())
    }

    /// Value, Cartesian gradient and upper-triangular Hessian; ten columns.
    pub fn evaluate_value_grad_hessian(
        &self,
        r: &Vector3<f64>,
        list: ListId,
        out: &mut DMatrix<f64>,
    ) -> Result<()> {
        let indices = self.prepare(list, EvalMode::Hessian, out)?;
        let c = self.magnification;

        match &self.engine {
            Engine::Molecular(orbitals) => {
                for (row, &mo) in indices.iter().enumerate() {
                    let (val, grad, hess) = orbitals[mo].evaluate_hessian(r);
                    store_hessian(out, row, c, val, &grad, &hess);
                }
            }
            Engine::MolecularComplex(orbitals) => {
                for (row, &mo) in indices.iter().enumerate() {
                    let (val, grad, hess) = orbitals[mo].evaluate_hessian(r);
                    store_hessian(out, row, c, val.re, &grad.map(|g| g.re), &hess.map(|h| h.re));
                }
            }
            Engine::Periodic { frame, orbitals } => {
                let u = frame.to_fractional(r);
                for (row, &mo) in indices.iter().enumerate() {
                    let (val, grad, hess) = orbitals[mo].evaluate_hessian(&u);
                    let grad = frame.gradient_to_cartesian(&grad);
                    let hess = frame.hessian_to_cartesian(&hess);
                    store_hessian(out, row, c, val, &grad, &hess);
                }
            }
            Engine::Bloch { frame, orbitals } => {
                let u = frame.to_fractional(r);
                let bloch = BlochPhase::new(&frame.kpoint(), &u);
                for (row, &mo) in indices.iter().enumerate() {
                    let (amp, amp_grad, amp_hess) = orbitals[mo].evaluate_hessian(&u);
                    let val = bloch.value(amp);
                    let grad = frame.gradient_to_cartesian(&bloch.gradient(amp, &amp_grad));
                    let hess = frame.hessian_to_cartesian(&bloch.hessian(amp, &amp_grad, &amp_hess));
                    store_hessian(out, row, c, val.re, &grad.map(|g| g.re), &hess.map(|h| h.re));
                }
            }
        }
        Ok(())
    }

    /// [`evaluate_values`](Self::evaluate_values) at the position of electron `e`.
    pub fn update_val<S>(&self, sample: &S, e: usize, list: ListId, out: &mut DMatrix<f64>) -> Result<()>
    where
        S: ElectronSample + ?Sized,
    {
        self.evaluate_values(&electron(sample, e)?, list, out)
    }

    pub fn update_lap<S>(&self, sample: &S, e: usize, list: ListId, out: &mut DMatrix<f64>) -> Result<()>
    where
        S: ElectronSample + ?Sized,
    {
        self.evaluate_value_grad_laplacian(&electron(sample, e)?, list, out)
    }

    pub fn update_hessian<S>(
        &self,
        sample: &S,
        e: usize,
        list: ListId,
        out: &mut DMatrix<f64>,
    ) -> Result<()>
    where
        S: ElectronSample + ?Sized,
    {
        self.evaluate_value_grad_hessian(&electron(sample, e)?, list, out)
    }

    fn list_indices(&self, list: ListId) -> Result<&[usize]> {
        self.lists
            .get(list)
            .map(|l| l.indices())
            .ok_or_else(|| eyre!("no orbital list with id {}", list.0))
    }

    /// Check the table shape, clear it and return the list's orbitals.
    fn prepare<'a>(&'a self, list: ListId, mode: EvalMode, out: &mut DMatrix<f64>) -> Result<&'a [usize]> {
        let indices = self.list_indices(list)?;
        ensure!(
            out.ncols() == mode.columns() && out.nrows() >= indices.len(),
            "output table is {}x{}, need at least {}x{}",
            out.nrows(),
            out.ncols(),
            indices.len(),
            mode.columns()
        );
        out.fill(0.0);
        Ok(indices)
    }
}

fn electron<S: ElectronSample + ?Sized>(sample: &S, e: usize) -> Result<Vector3<f64>> {
    ensure!(
        e < sample.electron_count(),
        "electron {} requested, but the sample holds {}",
        e,
        sample.electron_count()
    );
    Ok(sample.electron_pos(e))
}

fn real_splines(orbitals: Vec<OrbitalSpline>, regime: Regime) -> Result<Vec<RealSpline>> {
    orbitals
        .into_iter()
        .enumerate()
        .map(|(mo, spline)| match spline {
            OrbitalSpline::Real(spline) => Ok(spline),
            OrbitalSpline::Complex(_) => {
                bail!("orbital {} has a complex spline, but the system is {}", mo, regime)
            }
        })
        .collect()
}

fn complex_splines(orbitals: Vec<OrbitalSpline>, regime: Regime) -> Result<Vec<ComplexSpline>> {
    orbitals
        .into_iter()
        .enumerate()
        .map(|(mo, spline)| match spline {
            OrbitalSpline::Complex(spline) => Ok(spline),
            OrbitalSpline::Real(_) => {
                bail!("orbital {} has a real spline, but the system is {}", mo, regime)
            }
        })
        .collect()
}

fn store_laplacian(out: &mut DMatrix<f64>, row: usize, c: f64, val: f64, grad: &Vector3<f64>, lap: f64) {
    out[(row, 0)] = c * val;
    for d in 0..3 {
        out[(row, d + 1)] = c * grad[d];
    }
    out[(row, 4)] = c * lap;
}

fn store_hessian(
    out: &mut DMatrix<f64>,
    row: usize,
    c: f64,
    val: f64,
    grad: &Vector3<f64>,
    hess: &Matrix3<f64>,
) {
    out[(row, 0)] = c * val;
    for d in 0..3 {
        out[(row, d + 1)] = c * grad[d];
    }
    let mut col = 4;
    for i in 0..3 {
        for j in i..3 {
            out[(row, col)] = c * hess[(i, j)];
            col += 1;
        }
    }
}
