use nalgebra::Vector3;

/// Electron configuration the evaluator reads positions from.
pub trait ElectronSample {
    fn electron_count(&self) -> usize;

    /// Cartesian position of electron `e`.
    fn electron_pos(&self, e: usize) -> Vector3<f64>;
}

impl ElectronSample for [Vector3<f64>] {
    fn electron_count(&self) -> usize {
        self.len()
    }

    fn electron_pos(&self, e: usize) -> Vector3<f64> {
        self[e]
    }
}

impl ElectronSample for Vec<Vector3<f64>> {
    fn electron_count(&self) -> usize {
        self.len()
    }

    fn electron_pos(&self, e: usize) -> Vector3<f64> {
        self[e]
    }
}
