//! Stochastic Reconfiguration (SR) parameter updates.
//!
//! For real parameters `p` of a complex wavefunction the update solves
//!
//!   S · δp = -f
//!
//! where:
//! - S_ij = Re(⟨O_i* O_j⟩ - ⟨O_i*⟩⟨O_j⟩)
//! - f_i = Re(⟨O_i* E_L⟩ - ⟨O_i*⟩⟨E_L⟩)
//! - O_i = ∂ ln Ψ / ∂p_i
//!
//! and the parameters move by `timestep · δp`.

use log::warn;
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

#[derive(Clone, Debug)]
pub struct SROptimizer {
    /// Number of optimisation epochs.
    pub epochs: usize,
    /// Step size δt of the parameter update.
    pub timestep: f64,
    /// Relative diagonal shift: S_ii *= 1 + sr_epsilon.
    pub sr_epsilon: f64,
    /// Absolute diagonal shift added after the relative one.
    pub sr_shift: f64,
}

impl Default for SROptimizer {
    fn default() -> Self {
        Self {
            epochs: 10,
            timestep: 0.05,
            sr_epsilon: 1e-3,
            sr_shift: 1e-4,
        }
    }
}

impl SROptimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epochs(mut self, n: usize) -> Self {
        self.epochs = n;
        self
    }

    pub fn with_timestep(mut self, dt: f64) -> Self {
        self.timestep = dt;
        self
    }

    pub fn with_sr_epsilon(mut self, eps: f64) -> Self {
        self.sr_epsilon = eps;
        self
    }

    pub fn with_sr_shift(mut self, shift: f64) -> Self {
        self.sr_shift = shift;
        self
    }

    /// Parameter step `timestep · δp` from per-sample local energies and
    /// log-derivatives. `None` when the regularised S matrix cannot be
    /// solved or the step is not finite.
    pub fn compute_sr_update(
        &self,
        energies: &[Complex64],
        log_derivs: &[Vec<Complex64>],
    ) -> Option<Vec<f64>> {
        if energies.is_empty() || energies.len() != log_derivs.len() {
            return None;
        }
        let n_params = log_derivs[0].len();
        if n_params == 0 {
            return Some(Vec::new());
        }
        let n = energies.len() as f64;

        let e_mean = energies.iter().sum::<Complex64>() / n;
        let mut o_mean = vec![Complex64::new(0.0, 0.0); n_params];
        for od in log_derivs {
            for (m, o) in o_mean.iter_mut().zip(od) {
                *m += o;
            }
        }
        for m in o_mean.iter_mut() {
            *m /= n;
        }

        let mut s_matrix = DMatrix::<f64>::zeros(n_params, n_params);
        let mut force = DVector::<f64>::zeros(n_params);
        for (od, e) in log_derivs.iter().zip(energies) {
            for i in 0..n_params {
                let oi = od[i].conj();
                force[i] += (oi * e).re;
                for j in 0..n_params {
                    s_matrix[(i, j)] += (oi * od[j]).re;
                }
            }
        }
        s_matrix /= n;
        force /= n;
        for i in 0..n_params {
            force[i] -= (o_mean[i].conj() * e_mean).re;
            for j in 0..n_params {
                s_matrix[(i, j)] -= (o_mean[i].conj() * o_mean[j]).re;
            }
        }

        for i in 0..n_params {
            s_matrix[(i, i)] += self.sr_epsilon * s_matrix[(i, i)] + self.sr_shift;
        }

        let neg_force = -&force;
        let Some(delta) = s_matrix.lu().solve(&neg_force) else {
            warn!("SR matrix is singular; update skipped");
            return None;
        };
        if delta.iter().any(|x| !x.is_finite()) {
            warn!("SR update is not finite; update skipped");
            return None;
        }
        Some(delta.iter().map(|d| self.timestep * d).collect())
    }
}

/// One optimisation epoch.
#[derive(Clone, Debug)]
pub struct EpochSummary {
    pub epoch: usize,
    pub energy: Complex64,
    pub energy_err: Complex64,
    /// Parameters the epoch was sampled with.
    pub params: Vec<f64>,
    pub update_applied: bool,
}
