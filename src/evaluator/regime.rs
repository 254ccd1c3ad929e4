//! Evaluation regimes and derivative modes.

/// How an orbital set is evaluated, fixed when the evaluator is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Regime {
    /// Real splines in Cartesian coordinates
    Molecular,
    /// Complex splines in Cartesian coordinates, truncated to the real part
    MolecularComplex,
    /// Real splines on the unit cell (Γ point)
    Periodic,
    /// Complex cell amplitudes times the Bloch phase, truncated to the real part
    Bloch,
}

impl Regime {
    pub fn new(periodic: bool, complex: bool) -> Self {
        match (periodic, complex) {
            (false, false) => Regime::Molecular,
            (false, true) => Regime::MolecularComplex,
            (true, false) => Regime::Periodic,
            (true, true) => Regime::Bloch,
        }
    }

    pub fn is_periodic(self) -> bool {
        matches!(self, Regime::Periodic | Regime::Bloch)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, Regime::MolecularComplex | Regime::Bloch)
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Regime::Molecular => "non-periodic, real splines",
            Regime::MolecularComplex => "non-periodic, complex splines",
            Regime::Periodic => "periodic, real splines",
            Regime::Bloch => "periodic, complex splines",
        };
        f.write_str(text)
    }
}

/// Derivative order requested from an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalMode {
    /// `[value]`
    Value,
    /// `[value, gx, gy, gz, laplacian]`
    Laplacian,
    /// `[value, gx, gy, gz, xx, xy, xz, yy, yz, zz]`
    Hessian,
}

impl EvalMode {
    /// Width of one output row.
    pub fn columns(self) -> usize {
        match self {
            EvalMode::Value => 1,
            EvalMode::Laplacian => 5,
            EvalMode::Hessian => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regime_flags_round_trip() {
        for periodic in [false, true] {
            for complex in [false, true] {
                let regime = Regime::new(periodic, complex);
                assert_eq!(regime.is_periodic(), periodic);
                assert_eq!(regime.is_complex(), complex);
            }
        }
    }

    #[test]
    fn test_mode_columns() {
        assert_eq!(EvalMode::Value.columns(), 1);
        assert_eq!(EvalMode::Laplacian.columns(), 5);
        assert_eq!(EvalMode::Hessian.columns(), 10);
    }
}
