//! Variational-parameter trait shared by the mean-field ansatz and Jastrow factors.

use crate::error::Result;

/// Trait for wavefunction pieces with real variational parameters.
///
/// Used by Stochastic Reconfiguration: the optimiser reads the parameter
/// vector, adds the solved update and writes it back.
pub trait OptimizableWfn {
    /// Number of variational parameters.
    fn num_params(&self) -> usize;

    /// Get current parameter values.
    fn get_params(&self) -> Vec<f64>;

    /// Set parameter values. Fails if the length is wrong or the new
    /// parameters leave the wavefunction undefined.
    fn set_params(&mut self, params: &[f64]) -> Result<()>;

    /// `p += delta`
    fn shift_params(&mut self, delta: &[f64]) -> Result<()> {
        let params: Vec<f64> = self
            .get_params()
            .iter()
            .zip(delta)
            .map(|(p, d)| p + d)
            .collect();
        self.set_params(&params)
    }
}
