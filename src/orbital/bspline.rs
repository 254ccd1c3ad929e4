//! Uniform cubic B-spline orbital.
//!
//! Evaluates a tricubic B-spline from coefficients read off disk; fitting the
//! coefficients is done elsewhere. Molecular orbitals live on a Cartesian box
//! and vanish outside it. Periodic orbitals live on the unit cell in
//! fractional coordinates and wrap around.
//!
//! File layout (YAML):
//! ```yaml
//! dims: [nx, ny, nz]
//! origin: [x, y, z]        # molecules only
//! box_size: [lx, ly, lz]   # molecules only
//! coefficients: [...]      # index (ix*ny + iy)*nz + iz, complex as re, im pairs
//! ```

use std::io::Read;

use color_eyre::eyre::{bail, ensure, eyre, Result, WrapErr};
use nalgebra::{Matrix3, Vector3};
use serde::Deserialize;

use super::traits::{OrbitalGrid, SplineProvider, SplineScalar};

#[derive(Deserialize, Debug)]
struct SplineFile {
    dims: [usize; 3],
    #[serde(default)]
    origin: [f64; 3],
    #[serde(default)]
    box_size: Option<[f64; 3]>,
    coefficients: Vec<f64>,
}

/// Basis weights of the four coefficients around one grid interval.
#[derive(Debug, Clone, Copy)]
struct Stencil {
    index: [usize; 4],
    w: [f64; 4],
    dw: [f64; 4],
    d2w: [f64; 4],
}

impl Stencil {
    /// `t` is the grid coordinate; derivative weights are scaled by `1/h`.
    fn new(t: f64, n: usize, h: f64, periodic: bool) -> Self {
        let cell = t.floor();
        let f = t - cell;
        let cell = cell as isize;
        let n = n as isize;
        let mut index = [0usize; 4];
        for (a, slot) in index.iter_mut().enumerate() {
            let i = cell - 1 + a as isize;
            *slot = if periodic { i.rem_euclid(n) } else { i.clamp(0, n - 1) } as usize;
        }

        let g = 1.0 - f;
        let w = [
            g * g * g / 6.0,
            (3.0 * f * f * f - 6.0 * f * f + 4.0) / 6.0,
            (-3.0 * f * f * f + 3.0 * f * f + 3.0 * f + 1.0) / 6.0,
            f * f * f / 6.0,
        ];
        let dw = [
            -0.5 * g * g / h,
            (1.5 * f * f - 2.0 * f) / h,
            (-1.5 * f * f + f + 0.5) / h,
            0.5 * f * f / h,
        ];
        let h2 = h * h;
        let d2w = [g / h2, (3.0 * f - 2.0) / h2, (1.0 - 3.0 * f) / h2, f / h2];

        Self { index, w, dw, d2w }
    }
}

/// Tricubic B-spline over a real or complex coefficient grid.
#[derive(Debug, Clone)]
pub struct BsplineOrbital<T> {
    periodic: bool,
    dims: [usize; 3],
    /// Cartesian corner of the box (molecule) or lattice origin (crystal)
    origin: Vector3<f64>,
    box_size: Vector3<f64>,
    coefficients: Vec<T>,
}

impl<T: SplineScalar> Default for BsplineOrbital<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SplineScalar> BsplineOrbital<T> {
    pub fn new() -> Self {
        Self {
            periodic: false,
            dims: [0; 3],
            origin: Vector3::zeros(),
            box_size: Vector3::zeros(),
            coefficients: Vec::new(),
        }
    }

    /// Build directly from a coefficient grid.
    ///
    /// For periodic splines `origin` and `box_size` are ignored; the grid
    /// covers the unit cell.
    pub fn from_coefficients(
        periodic: bool,
        dims: [usize; 3],
        origin: Vector3<f64>,
        box_size: Vector3<f64>,
        coefficients: Vec<T>,
    ) -> Result<Self> {
        let mut spline = Self::new();
        spline.periodic = periodic;
        spline.install(dims, origin, Some(box_size), coefficients)?;
        Ok(spline)
    }

    fn install(
        &mut self,
        dims: [usize; 3],
        origin: Vector3<f64>,
        box_size: Option<Vector3<f64>>,
        coefficients: Vec<T>,
    ) -> Result<()> {
        let min_points = if self.periodic { 1 } else { 2 };
        ensure!(
            dims.iter().all(|&n| n >= min_points),
            "spline grid {:?} needs at least {} points per axis",
            dims,
            min_points
        );
        let expected = dims[0] * dims[1] * dims[2];
        ensure!(
            coefficients.len() == expected,
            "spline grid {:?} needs {} coefficients, found {}",
            dims,
            expected,
            coefficients.len()
        );

        if !self.periodic {
            let box_size = box_size.ok_or_else(|| eyre!("molecular spline needs a box_size"))?;
            ensure!(
                box_size.iter().all(|&l| l > 0.0),
                "spline box_size must be positive, got {:?}",
                box_size.as_slice()
            );
            self.origin = origin;
            self.box_size = box_size;
        }
        self.dims = dims;
        self.coefficients = coefficients;
        Ok(())
    }

    /// Grid spacing in the evaluation frame.
    fn step(&self) -> Vector3<f64> {
        let n = Vector3::new(self.dims[0] as f64, self.dims[1] as f64, self.dims[2] as f64);
        if self.periodic {
            n.map(|n| 1.0 / n)
        } else {
            self.box_size.component_div(&n.map(|n| n - 1.0))
        }
    }

    fn stencils(&self, pos: &Vector3<f64>) -> Option<[Stencil; 3]> {
        if self.coefficients.is_empty() {
            return None;
        }
        let step = self.step();
        let mut out = [Stencil::new(0.0, 1, 1.0, true); 3];
        for axis in 0..3 {
            let n = self.dims[axis];
            let t = if self.periodic {
                (pos[axis] * n as f64).rem_euclid(n as f64)
            } else {
                let t = (pos[axis] - self.origin[axis]) / step[axis];
                if !(0.0..=(n - 1) as f64).contains(&t) {
                    return None;
                }
                t
            };
            out[axis] = Stencil::new(t, n, step[axis], self.periodic);
        }
        Some(out)
    }

    fn coefficient(&self, ix: usize, iy: usize, iz: usize) -> T {
        self.coefficients[(ix * self.dims[1] + iy) * self.dims[2] + iz]
    }
}

impl<T: SplineScalar> SplineProvider<T> for BsplineOrbital<T> {
    fn set_periodic(&mut self, periodic: bool) {
        self.periodic = periodic;
    }

    fn set_bounds(&mut self, lattice: &Matrix3<f64>) {
        self.box_size = Vector3::new(
            lattice.row(0).norm(),
            lattice.row(1).norm(),
            lattice.row(2).norm(),
        );
    }

    fn set_origin(&mut self, origin: &Vector3<f64>) {
        self.origin = *origin;
    }

    fn load(&mut self, reader: &mut dyn Read) -> Result<()> {
        let file: SplineFile =
            serde_yaml::from_reader(reader).wrap_err("malformed spline file")?;
        if file.coefficients.len() % T::COMPONENTS != 0 {
            bail!(
                "spline file holds {} numbers, not a multiple of {}",
                file.coefficients.len(),
                T::COMPONENTS
            );
        }
        let coefficients = file
            .coefficients
            .chunks_exact(T::COMPONENTS)
            .map(T::from_components)
            .collect();
        let origin = if self.periodic { self.origin } else { Vector3::from(file.origin) };
        self.install(file.dims, origin, file.box_size.map(Vector3::from), coefficients)
    }

    fn evaluate(&self, pos: &Vector3<f64>) -> T {
        let Some([sx, sy, sz]) = self.stencils(pos) else {
            return T::zero();
        };
        let mut value = T::zero();
        for a in 0..4 {
            for b in 0..4 {
                let wxy = sx.w[a] * sy.w[b];
                for c in 0..4 {
                    let coef = self.coefficient(sx.index[a], sy.index[b], sz.index[c]);
                    value += coef.scale(wxy * sz.w[c]);
                }
            }
        }
        value
    }

    fn evaluate_hessian(&self, pos: &Vector3<f64>) -> (T, Vector3<T>, Matrix3<T>) {
        let mut value = T::zero();
        let mut grad = Vector3::from_element(T::zero());
        let mut hess = Matrix3::from_element(T::zero());
        let Some([sx, sy, sz]) = self.stencils(pos) else {
            return (value, grad, hess);
        };

        for a in 0..4 {
            for b in 0..4 {
                for c in 0..4 {
                    let coef = self.coefficient(sx.index[a], sy.index[b], sz.index[c]);
                    let (x, dx, ddx) = (sx.w[a], sx.dw[a], sx.d2w[a]);
                    let (y, dy, ddy) = (sy.w[b], sy.dw[b], sy.d2w[b]);
                    let (z, dz, ddz) = (sz.w[c], sz.dw[c], sz.d2w[c]);

                    value += coef.scale(x * y * z);
                    grad[0] += coef.scale(dx * y * z);
                    grad[1] += coef.scale(x * dy * z);
                    grad[2] += coef.scale(x * y * dz);
                    hess[(0, 0)] += coef.scale(ddx * y * z);
                    hess[(1, 1)] += coef.scale(x * ddy * z);
                    hess[(2, 2)] += coef.scale(x * y * ddz);
                    hess[(0, 1)] += coef.scale(dx * dy * z);
                    hess[(0, 2)] += coef.scale(dx * y * dz);
                    hess[(1, 2)] += coef.scale(x * dy * dz);
                }
            }
        }
        hess[(1, 0)] = hess[(0, 1)];
        hess[(2, 0)] = hess[(0, 2)];
        hess[(2, 1)] = hess[(1, 2)];
        (value, grad, hess)
    }

    fn evaluate_laplacian(&self, pos: &Vector3<f64>) -> (T, Vector3<T>, T) {
        let mut value = T::zero();
        let mut grad = Vector3::from_element(T::zero());
        let mut lap = T::zero();
        let Some([sx, sy, sz]) = self.stencils(pos) else {
            return (value, grad, lap);
        };

        for a in 0..4 {
            for b in 0..4 {
                for c in 0..4 {
                    let coef = self.coefficient(sx.index[a], sy.index[b], sz.index[c]);
                    let (x, y, z) = (sx.w[a], sy.w[b], sz.w[c]);
                    value += coef.scale(x * y * z);
                    grad[0] += coef.scale(sx.dw[a] * y * z);
                    grad[1] += coef.scale(x * sy.dw[b] * z);
                    grad[2] += coef.scale(x * y * sz.dw[c]);
                    lap += coef.scale(sx.d2w[a] * y * z + x * sy.d2w[b] * z + x * y * sz.d2w[c]);
                }
            }
        }
        (value, grad, lap)
    }

    fn grid(&self) -> Option<OrbitalGrid> {
        if self.coefficients.is_empty() {
            return None;
        }
        let spacing = if self.periodic {
            self.box_size.component_div(&Vector3::new(
                self.dims[0] as f64,
                self.dims[1] as f64,
                self.dims[2] as f64,
            ))
        } else {
            self.step()
        };
        Some(OrbitalGrid {
            origin: self.origin,
            box_size: self.box_size,
            spacing,
        })
    }

    fn is_loaded(&self) -> bool {
        !self.coefficients.is_empty()
    }
}
