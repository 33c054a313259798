//! Gutzwiller-projected Slater determinant with fast updates.
//!
//! `psi(c) = det M(c) * J(c)` with `M[i][n] = Phi[(i * nf + c_i, n)]`. The
//! inverse of `M` is kept and updated with the Woodbury identity when rows
//! change, so a ratio for `k` changed sites costs `O(k N)` plus a `k x k`
//! determinant.

use log::{debug, warn};
use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::correlation::SpinJastrow;
use crate::error::{Result, VmcError};
use crate::random::RandomEngine;
use crate::wavefunction::MeanFieldAnsatz;

pub const MAX_INIT_ATTEMPTS: usize = 1000;
/// Relative discrepancy between cached and recomputed determinant that is
/// reported as drift.
pub const DRIFT_TOLERANCE: f64 = 1e-6;
/// Smallest `sigma_min / sigma_max` of a usable Slater matrix.
const SINGULARITY_TOLERANCE: f64 = 1e-10;
/// Distance from an integer below which a flavor occupation is exact.
const COUNT_TOLERANCE: f64 = 1e-6;

/// `(site, new flavor)`
pub type Change = (usize, usize);

#[derive(Debug, Clone)]
struct PendingUpdate {
    changes: Vec<Change>,
    new_rows: DMatrix<Complex64>,
    gram: DMatrix<Complex64>,
    det_ratio: Complex64,
    log_jastrow_delta: f64,
}

#[derive(Debug, Clone)]
pub struct ProjectedState {
    num_sites: usize,
    num_flavors: usize,
    /// `(N * nf) x N` occupied orbitals.
    orbitals: DMatrix<Complex64>,
    jastrow: Vec<SpinJastrow>,
    configuration: Vec<usize>,
    inverse: DMatrix<Complex64>,
    det: Complex64,
    log_jastrow: f64,
    pending: Option<PendingUpdate>,
}

impl ProjectedState {
    /// Project `ansatz` and draw a starting configuration with non-zero
    /// amplitude. Check [`ProjectedState::is_valid`] afterwards.
    pub fn new(ansatz: &MeanFieldAnsatz, rng: &mut RandomEngine) -> Result<Self> {
        Self::from_orbitals(
            ansatz.occupied_orbitals(),
            ansatz.num_flavors(),
            ansatz.jastrow().to_vec(),
            rng,
        )
    }

    pub fn from_orbitals(
        orbitals: DMatrix<Complex64>,
        num_flavors: usize,
        jastrow: Vec<SpinJastrow>,
        rng: &mut RandomEngine,
    ) -> Result<Self> {
        let num_sites = orbitals.ncols();
        if num_sites == 0 || num_flavors == 0 || orbitals.nrows() != num_sites * num_flavors {
            return Err(VmcError::config(format!(
                "orbital matrix {}x{} does not fit {} flavors per site",
                orbitals.nrows(),
                orbitals.ncols(),
                num_flavors
            )));
        }
        let mut state = Self {
            num_sites,
            num_flavors,
            orbitals,
            jastrow,
            configuration: vec![0; num_sites],
            inverse: DMatrix::zeros(num_sites, num_sites),
            det: Complex64::new(0.0, 0.0),
            log_jastrow: 0.0,
            pending: None,
        };
        state.initialize(rng);
        Ok(state)
    }

    /// Draw configurations until the Slater matrix is non-singular. When the
    /// occupied subspace fixes the number of sites of every flavor only the
    /// arrangement of that multiset is drawn. Returns `false` and
    /// leaves the determinant at zero after [`MAX_INIT_ATTEMPTS`] failures.
    pub fn initialize(&mut self, rng: &mut RandomEngine) -> bool {
        self.pending = None;
        let counts = self.flavor_counts();
        for attempt in 0..MAX_INIT_ATTEMPTS {
            let config: Vec<usize> = match &counts {
                Some(counts) => {
                    let mut v: Vec<usize> = counts
                        .iter()
                        .enumerate()
                        .flat_map(|(f, &n)| std::iter::repeat(f).take(n))
                        .collect();
                    rng.shuffle(&mut v);
                    v
                }
                None => (0..self.num_sites)
                    .map(|_| rng.rand_int(self.num_flavors))
                    .collect(),
            };
            let slater = self.build_slater(&config);
            if is_singular(&slater) {
                continue;
            }
            if let Some(inverse) = slater.clone().try_inverse() {
                debug!("valid configuration found after {} attempt(s)", attempt + 1);
                self.det = slater.determinant();
                self.inverse = inverse;
                self.log_jastrow = self.jastrow_log_value(&config);
                self.configuration = config;
                return true;
            }
        }
        warn!(
            "No valid initializations: determinant vanished for {} configurations",
            MAX_INIT_ATTEMPTS
        );
        self.det = Complex64::new(0.0, 0.0);
        false
    }

    /// Per-flavor occupations of the occupied subspace,
    /// `n_f = sum_i |Q(i * nf + f, :)|^2` for an orthonormal basis `Q` of the
    /// orbitals. Only configurations with these counts can have non-zero
    /// amplitude, so they are returned when all of them are integers.
    fn flavor_counts(&self) -> Option<Vec<usize>> {
        let nf = self.num_flavors;
        let q = self.orbitals.clone().qr().q();
        let mut occupations = vec![0.0; nf];
        for (row, q_row) in q.row_iter().enumerate() {
            occupations[row % nf] += q_row.iter().map(|z| z.norm_sqr()).sum::<f64>();
        }
        let mut counts = Vec::with_capacity(nf);
        for n in occupations {
            if (n - n.round()).abs() > COUNT_TOLERANCE {
                return None;
            }
            counts.push(n.round() as usize);
        }
        if counts.iter().sum::<usize>() != self.num_sites {
            return None;
        }
        Some(counts)
    }

    fn build_slater(&self, config: &[usize]) -> DMatrix<Complex64> {
        let n = self.num_sites;
        let nf = self.num_flavors;
        DMatrix::from_fn(n, n, |i, k| self.orbitals[(i * nf + config[i], k)])
    }

    fn jastrow_log_value(&self, config: &[usize]) -> f64 {
        self.jastrow.iter().map(|j| j.log_value(config)).sum()
    }

    pub fn num_sites(&self) -> usize {
        self.num_sites
    }

    pub fn num_flavors(&self) -> usize {
        self.num_flavors
    }

    pub fn spin(&self) -> f64 {
        (self.num_flavors as f64 - 1.0) / 2.0
    }

    pub fn configuration(&self) -> &[usize] {
        &self.configuration
    }

    /// Cached Slater determinant (without the Jastrow factor).
    pub fn get_det(&self) -> Complex64 {
        self.det
    }

    pub fn amplitude(&self) -> Complex64 {
        self.det * self.log_jastrow.exp()
    }

    pub fn is_valid(&self) -> bool {
        self.det != Complex64::new(0.0, 0.0)
    }

    /// Amplitude of an arbitrary configuration, computed from scratch.
    pub fn amplitude_of(&self, config: &[usize]) -> Complex64 {
        self.build_slater(config).determinant() * self.jastrow_log_value(config).exp()
    }

    /// Put the chain at `config`. Fails if the configuration has zero amplitude.
    pub fn set_configuration(&mut self, config: Vec<usize>) -> Result<()> {
        if config.len() != self.num_sites || config.iter().any(|&f| f >= self.num_flavors) {
            return Err(VmcError::config("configuration does not match the lattice"));
        }
        let slater = self.build_slater(&config);
        if is_singular(&slater) {
            return Err(VmcError::NoValidConfiguration);
        }
        let inverse = slater
            .clone()
            .try_inverse()
            .ok_or(VmcError::NoValidConfiguration)?;
        self.det = slater.determinant();
        self.inverse = inverse;
        self.log_jastrow = self.jastrow_log_value(&config);
        self.configuration = config;
        self.pending = None;
        Ok(())
    }

    fn effective_changes(&self, changes: &[Change]) -> Vec<Change> {
        changes
            .iter()
            .copied()
            .filter(|&(site, flavor)| self.configuration[site] != flavor)
            .collect()
    }

    fn new_rows(&self, changes: &[Change]) -> DMatrix<Complex64> {
        let nf = self.num_flavors;
        DMatrix::from_fn(changes.len(), self.num_sites, |r, k| {
            let (site, flavor) = changes[r];
            self.orbitals[(site * nf + flavor, k)]
        })
    }

    fn gram(&self, changes: &[Change], new_rows: &DMatrix<Complex64>) -> DMatrix<Complex64> {
        let sites: Vec<usize> = changes.iter().map(|c| c.0).collect();
        new_rows * self.inverse.select_columns(&sites)
    }

    fn jastrow_log_ratio(&self, changes: &[Change]) -> f64 {
        self.jastrow
            .iter()
            .map(|j| j.log_ratio(&self.configuration, changes))
            .sum()
    }

    /// `psi(c') / psi(c)` for the configuration with `changes` applied. Sites
    /// whose flavor does not change are ignored.
    pub fn ratio(&self, changes: &[Change]) -> Complex64 {
        let changes = self.effective_changes(changes);
        if changes.is_empty() {
            return Complex64::new(1.0, 0.0);
        }
        let new_rows = self.new_rows(&changes);
        let det_ratio = self.gram(&changes, &new_rows).determinant();
        det_ratio * self.jastrow_log_ratio(&changes).exp()
    }

    /// Like [`ProjectedState::ratio`], but keep the intermediate results so
    /// [`ProjectedState::accept`] can commit them.
    pub fn propose(&mut self, changes: &[Change]) -> Complex64 {
        let changes = self.effective_changes(changes);
        let new_rows = self.new_rows(&changes);
        let gram = self.gram(&changes, &new_rows);
        let det_ratio = if changes.is_empty() {
            Complex64::new(1.0, 0.0)
        } else {
            gram.determinant()
        };
        let log_jastrow_delta = self.jastrow_log_ratio(&changes);
        let ratio = det_ratio * log_jastrow_delta.exp();
        self.pending = Some(PendingUpdate {
            changes,
            new_rows,
            gram,
            det_ratio,
            log_jastrow_delta,
        });
        ratio
    }

    /// Commit the last proposal. Returns `false` if there was none or it had
    /// zero amplitude.
    pub fn accept(&mut self) -> bool {
        let Some(update) = self.pending.take() else {
            return false;
        };
        if update.changes.is_empty() {
            return true;
        }
        if update.det_ratio == Complex64::new(0.0, 0.0) {
            return false;
        }
        let Some(gram_inv) = update.gram.try_inverse() else {
            return false;
        };
        let sites: Vec<usize> = update.changes.iter().map(|c| c.0).collect();
        let inverse_cols = self.inverse.select_columns(&sites);
        let mut w = &update.new_rows * &self.inverse;
        for (r, &site) in sites.iter().enumerate() {
            w[(r, site)] -= Complex64::new(1.0, 0.0);
        }
        self.inverse -= inverse_cols * (gram_inv * w);
        for &(site, flavor) in &update.changes {
            self.configuration[site] = flavor;
        }
        self.det *= update.det_ratio;
        self.log_jastrow += update.log_jastrow_delta;
        true
    }

    pub fn reject(&mut self) {
        self.pending = None;
    }

    /// Recompute the determinant, inverse and Jastrow factor from scratch and
    /// return the relative discrepancy of the cached determinant.
    pub fn refresh(&mut self) -> Result<f64> {
        self.pending = None;
        let slater = self.build_slater(&self.configuration);
        let det = slater.determinant();
        let inverse = slater.clone().try_inverse().ok_or_else(|| {
            VmcError::Numerical("Slater matrix became singular during sampling".into())
        })?;
        let drift = if det.norm() > 0.0 {
            (self.det - det).norm() / det.norm()
        } else {
            0.0
        };
        if drift > DRIFT_TOLERANCE {
            warn!("determinant drift {:.3e} corrected by refresh", drift);
        }
        self.det = det;
        self.inverse = inverse;
        self.log_jastrow = self.jastrow_log_value(&self.configuration);
        Ok(drift)
    }

    /// `d ln psi / d p` for the hopping parameters (from the orbital
    /// derivatives `dPhi`) followed by the Jastrow parameters.
    pub fn log_derivatives(&self, orbital_derivatives: &[DMatrix<Complex64>]) -> Vec<Complex64> {
        let nf = self.num_flavors;
        let mut out = Vec::with_capacity(orbital_derivatives.len());
        for dphi in orbital_derivatives {
            let mut trace = Complex64::new(0.0, 0.0);
            for (i, &flavor) in self.configuration.iter().enumerate() {
                let row = i * nf + flavor;
                for k in 0..self.num_sites {
                    trace += self.inverse[(k, i)] * dphi[(row, k)];
                }
            }
            out.push(trace);
        }
        for j in &self.jastrow {
            out.extend(
                j.log_derivatives(&self.configuration)
                    .into_iter()
                    .map(|o| Complex64::new(o, 0.0)),
            );
        }
        out
    }

    /// Swap in re-optimised orbitals and Jastrow factors, keeping the current
    /// configuration if it still has non-zero amplitude.
    pub fn update_ansatz(&mut self, ansatz: &MeanFieldAnsatz, rng: &mut RandomEngine) -> Result<bool> {
        let orbitals = ansatz.occupied_orbitals();
        if orbitals.shape() != self.orbitals.shape() {
            return Err(VmcError::config("new orbitals do not match the projected state"));
        }
        self.orbitals = orbitals;
        self.jastrow = ansatz.jastrow().to_vec();
        let config = self.configuration.clone();
        match self.set_configuration(config) {
            Ok(()) => Ok(true),
            Err(VmcError::NoValidConfiguration) => Ok(self.initialize(rng)),
            Err(e) => Err(e),
        }
    }
}

fn is_singular(m: &DMatrix<Complex64>) -> bool {
    let sv = m.clone().svd(false, false).singular_values;
    let max = sv.iter().cloned().fold(0.0, f64::max);
    let min = sv.iter().cloned().fold(f64::INFINITY, f64::min);
    max <= 0.0 || min / max < SINGULARITY_TOLERANCE
}
