//! Metropolis sampling of a projected state and estimation of observables.
//!
//! A sweep discards `throwaway` steps, then takes `measures` measurements
//! spaced `steps` proposals apart. With optimisation enabled, `SR.bins`
//! sweeps each end in a Stochastic Reconfiguration update before the final
//! measuring sweep. Energies and observables are reported per site.

use log::{debug, info, warn};
use nalgebra::DMatrix;
use num_complex::Complex64;

use super::moves::{build_move_set, Move};
use super::sr_optimize::{EpochSummary, SROptimizer};
use super::stats::{autocorrelation_time, BinnedAccumulator};
use crate::error::{Result, VmcError};
use crate::io::VmcOptions;
use crate::lattice::Lattice;
use crate::random::RandomEngine;
use crate::systems::SpinModel;
use crate::timing::Profiler;
use crate::wavefunction::{MeanFieldAnsatz, OptimizableWfn, ProjectedState, DRIFT_TOLERANCE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    NotRun,
    Completed,
    NoValidConfiguration,
}

#[derive(Debug, Clone)]
pub struct ObservableEstimate {
    pub name: String,
    pub value: Complex64,
    pub error: Complex64,
}

/// Estimates of one run, per site.
#[derive(Debug, Clone)]
pub struct VmcResults {
    pub status: RunStatus,
    pub energy: Complex64,
    pub energy_err: Complex64,
    pub observables: Vec<ObservableEstimate>,
    pub num_samples: usize,
    pub acceptance_rate: f64,
    pub autocorrelation_time: f64,
    /// Energy and error of the first optimisation epoch.
    pub unoptimized: Option<(Complex64, Complex64)>,
    pub history: Vec<EpochSummary>,
}

impl VmcResults {
    /// Zeroed results for observables `names`.
    pub fn empty(names: &[String], status: RunStatus) -> Self {
        let zero = Complex64::new(0.0, 0.0);
        Self {
            status,
            energy: zero,
            energy_err: zero,
            observables: names
                .iter()
                .map(|name| ObservableEstimate {
                    name: name.clone(),
                    value: zero,
                    error: zero,
                })
                .collect(),
            num_samples: 0,
            acceptance_rate: 0.0,
            autocorrelation_time: 0.0,
            unoptimized: None,
            history: Vec::new(),
        }
    }

    pub fn observable(&self, name: &str) -> Option<&ObservableEstimate> {
        self.observables.iter().find(|o| o.name == name)
    }
}

pub struct MonteCarloEngine<'a> {
    model: &'a SpinModel,
    lattice: &'a Lattice,
    state: ProjectedState,
    ansatz: Option<MeanFieldAnsatz>,
    rng: RandomEngine,
    options: VmcOptions,
    moves: Vec<Move>,
    names: Vec<String>,
    energy: BinnedAccumulator,
    observables: Vec<BinnedAccumulator>,
    energy_samples: Vec<Complex64>,
    log_derivs: Vec<Vec<Complex64>>,
    steps: usize,
    proposed: usize,
    accepted: usize,
    drift_corrections: usize,
    status: RunStatus,
    unoptimized: Option<(Complex64, Complex64)>,
    history: Vec<EpochSummary>,
    profiler: Profiler,
}

impl<'a> MonteCarloEngine<'a> {
    pub fn new(
        model: &'a SpinModel,
        state: ProjectedState,
        lattice: &'a Lattice,
        rng: RandomEngine,
        options: VmcOptions,
    ) -> Self {
        let moves = build_move_set(&model.candidate_moves(), lattice, options.su3);
        let names = model.names();
        debug!("{} distinct Metropolis moves", moves.len());
        let energy = BinnedAccumulator::new(options.num_measures, options.error_bins);
        let observables = names
            .iter()
            .map(|_| BinnedAccumulator::new(options.num_measures, options.error_bins))
            .collect();
        Self {
            model,
            lattice,
            state,
            ansatz: None,
            rng,
            options,
            moves,
            names,
            energy,
            observables,
            energy_samples: Vec::new(),
            log_derivs: Vec::new(),
            steps: 0,
            proposed: 0,
            accepted: 0,
            drift_corrections: 0,
            status: RunStatus::NotRun,
            unoptimized: None,
            history: Vec::new(),
            profiler: Profiler::new(),
        }
    }

    /// Attach the mean-field ansatz the state was projected from; required
    /// for optimisation.
    pub fn with_ansatz(mut self, ansatz: MeanFieldAnsatz) -> Self {
        self.ansatz = Some(ansatz);
        self
    }

    pub fn state(&self) -> &ProjectedState {
        &self.state
    }

    pub fn ansatz(&self) -> Option<&MeanFieldAnsatz> {
        self.ansatz.as_ref()
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// One Metropolis proposal. Returns whether the configuration changed.
    pub fn step(&mut self) -> bool {
        if self.moves.is_empty() {
            return false;
        }
        let mv = self.moves[self.rng.rand_int(self.moves.len())];
        let changes = mv.changes(
            self.state.configuration(),
            self.state.num_flavors(),
            &mut self.rng,
        );
        let config = self.state.configuration();
        if changes.iter().all(|&(site, flavor)| config[site] == flavor) {
            return false;
        }
        self.proposed += 1;
        let ratio = self.state.propose(&changes);
        let p = ratio.norm_sqr();
        if p >= 1.0 || self.rng.rand_double() < p {
            if self.state.accept() {
                self.accepted += 1;
                return true;
            }
            false
        } else {
            self.state.reject();
            false
        }
    }

    fn advance(&mut self) -> Result<()> {
        self.step();
        self.steps += 1;
        if self.steps % self.options.refresh_interval == 0 {
            let drift = self.state.refresh()?;
            if drift > DRIFT_TOLERANCE {
                self.drift_corrections += 1;
            }
        }
        Ok(())
    }

    fn measure(&mut self, orbital_derivs: Option<&[DMatrix<Complex64>]>) {
        let n = self.lattice.num_sites() as f64;
        let values = self.model.local_observables(&self.state);
        let e = self.model.energy_from(&values) / n;
        self.energy.push(e);
        for (acc, v) in self.observables.iter_mut().zip(&values) {
            acc.push(v / n);
        }
        self.energy_samples.push(e);
        if let Some(derivs) = orbital_derivs {
            self.log_derivs.push(self.state.log_derivatives(derivs));
        }
    }

    fn reset_estimators(&mut self) {
        self.energy.reset();
        for acc in &mut self.observables {
            acc.reset();
        }
        self.energy_samples.clear();
        self.log_derivs.clear();
    }

    /// Warm up, then measure `num_measures` times.
    fn sweep(&mut self, orbital_derivs: Option<&[DMatrix<Complex64>]>) -> Result<()> {
        self.reset_estimators();
        self.profiler.start("warm-up");
        for _ in 0..self.options.throwaway_measures {
            self.advance()?;
        }
        self.profiler.stop("warm-up");

        self.profiler.start("sampling");
        for _ in 0..self.options.num_measures {
            for _ in 0..self.options.steps_per_measure {
                self.advance()?;
            }
            self.measure(orbital_derivs);
        }
        self.profiler.stop("sampling");
        Ok(())
    }

    fn optimize(&mut self) -> Result<()> {
        let sr_options = self
            .options
            .sr
            .clone()
            .ok_or_else(|| VmcError::config("vmc: optimization requires an SR block"))?;
        if self.ansatz.is_none() {
            return Err(VmcError::config(
                "vmc: optimization requires the mean-field ansatz",
            ));
        }
        let sr = SROptimizer::new()
            .with_epochs(sr_options.bins)
            .with_timestep(sr_options.timestep);

        for epoch in 0..sr.epochs {
            let (derivs, params) = match &self.ansatz {
                Some(a) => (a.orbital_derivatives(), a.get_params()),
                None => break,
            };
            self.sweep(Some(derivs.as_slice()))?;
            let energy = self.energy.mean();
            let energy_err = self.energy.error();
            if epoch == 0 {
                self.unoptimized = Some((energy, energy_err));
            }

            self.profiler.start("sr update");
            let update = sr.compute_sr_update(&self.energy_samples, &self.log_derivs);
            self.profiler.stop("sr update");
            let update_applied = match (update, self.ansatz.as_mut()) {
                (Some(delta), Some(ansatz)) => {
                    ansatz.shift_params(&delta)?;
                    if !self.state.update_ansatz(ansatz, &mut self.rng)? {
                        self.status = RunStatus::NoValidConfiguration;
                        return Err(VmcError::NoValidConfiguration);
                    }
                    true
                }
                _ => {
                    warn!("SR epoch {}: update skipped", epoch);
                    false
                }
            };
            info!(
                "SR epoch {:>3}: E = {:.6} +- {:.6}, params = {:?}",
                epoch, energy.re, energy_err.re, params
            );
            self.history.push(EpochSummary {
                epoch,
                energy,
                energy_err,
                params,
                update_applied,
            });
        }
        Ok(())
    }

    /// Run the full schedule. Fails with `NoValidConfiguration` if the state
    /// has zero amplitude.
    pub fn run(&mut self) -> Result<()> {
        self.options.validate()?;
        if !self.state.is_valid() {
            warn!("No valid initializations");
            self.status = RunStatus::NoValidConfiguration;
            return Err(VmcError::NoValidConfiguration);
        }
        if self.options.optimization {
            self.optimize()?;
        }
        self.sweep(None)?;
        self.status = RunStatus::Completed;
        if self.drift_corrections > 0 {
            warn!("{} refreshes corrected determinant drift", self.drift_corrections);
        }
        info!(
            "E = {:.8} +- {:.8} per site, acceptance {:.3}",
            self.get_energy().re,
            self.get_energy_err().re,
            self.acceptance_rate()
        );
        Ok(())
    }

    pub fn get_energy(&self) -> Complex64 {
        self.energy.mean()
    }

    pub fn get_energy_err(&self) -> Complex64 {
        self.energy.error()
    }

    pub fn get_observable(&self, name: &str) -> Option<Complex64> {
        let k = self.names.iter().position(|n| n == name)?;
        Some(self.observables[k].mean())
    }

    pub fn get_observable_err(&self, name: &str) -> Option<Complex64> {
        let k = self.names.iter().position(|n| n == name)?;
        Some(self.observables[k].error())
    }

    pub fn acceptance_rate(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }

    pub fn optimization_history(&self) -> &[EpochSummary] {
        &self.history
    }

    pub fn results(&self) -> VmcResults {
        if self.status == RunStatus::NoValidConfiguration {
            return VmcResults::empty(&self.names, self.status);
        }
        let energies: Vec<f64> = self.energy_samples.iter().map(|e| e.re).collect();
        VmcResults {
            status: self.status,
            energy: self.get_energy(),
            energy_err: self.get_energy_err(),
            observables: self
                .names
                .iter()
                .zip(&self.observables)
                .map(|(name, acc)| ObservableEstimate {
                    name: name.clone(),
                    value: acc.mean(),
                    error: acc.error(),
                })
                .collect(),
            num_samples: self.energy.count(),
            acceptance_rate: self.acceptance_rate(),
            autocorrelation_time: autocorrelation_time(&energies),
            unoptimized: self.unoptimized,
            history: self.history.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::LatticeType;
    use crate::systems::{Interaction, Observable};
    use approx::assert_relative_eq;

    fn two_site_setup() -> (Lattice, SpinModel, DMatrix<Complex64>) {
        let lat = Lattice::new(LatticeType::Chain, [2, 1, 1], [false, false, false]).unwrap();
        let mut j = Observable::new("J");
        j.add_interaction(Interaction::swap_exchange(&lat, 0, 1, 0.5).unwrap());
        let mut model = SpinModel::new();
        model.add_term(j, Complex64::new(1.0, 0.0)).unwrap();
        // psi(0,1) = 1, psi(1,0) = -1/4.
        let mut phi = DMatrix::<Complex64>::zeros(4, 2);
        phi[(0, 0)] = Complex64::new(1.0, 0.0);
        phi[(2, 0)] = Complex64::new(0.5, 0.0);
        phi[(1, 1)] = Complex64::new(0.5, 0.0);
        phi[(3, 1)] = Complex64::new(1.0, 0.0);
        (lat, model, phi)
    }

    #[test]
    fn test_detailed_balance_two_sites() {
        let (lat, model, phi) = two_site_setup();
        let mut rng = RandomEngine::new(Some(123));
        let state = ProjectedState::from_orbitals(phi, 2, vec![], &mut rng).unwrap();
        let mut engine = MonteCarloEngine::new(&model, state, &lat, rng, VmcOptions::new(0, 1, 0));
        let n = 200_000;
        let mut hits = 0;
        for _ in 0..n {
            engine.step();
            if engine.state().configuration() == [0, 1] {
                hits += 1;
            }
        }
        let freq = hits as f64 / n as f64;
        assert!((freq - 16.0 / 17.0).abs() < 0.01, "frequency {}", freq);
    }

    #[test]
    fn test_two_site_energy() {
        // E_loc(0,1) = 0.5 psi(1,0)/psi(0,1) = -1/8, E_loc(1,0) = 0.5 * 1/(-1/4) = -2.
        // <E> = (16/17)(-1/8) + (1/17)(-2) = -4/17 in total, -2/17 per site.
        let (lat, model, phi) = two_site_setup();
        let mut rng = RandomEngine::new(Some(7));
        let state = ProjectedState::from_orbitals(phi, 2, vec![], &mut rng).unwrap();
        let options = VmcOptions::new(20_000, 2, 100).with_seed(7);
        let mut engine = MonteCarloEngine::new(&model, state, &lat, rng, options);
        engine.run().unwrap();
        let e = engine.get_energy();
        let err = engine.get_energy_err();
        assert!((e.re + 2.0 / 17.0).abs() < 5.0 * err.re + 1e-3, "E = {} +- {}", e.re, err.re);
        assert_relative_eq!(e.im, 0.0, epsilon = 1e-12);
        let j = engine.get_observable("J").unwrap();
        assert_relative_eq!(j.re, e.re, epsilon = 1e-12);
        assert!(engine.get_observable("K").is_none());
        let results = engine.results();
        assert_eq!(results.status, RunStatus::Completed);
        assert_eq!(results.num_samples, 20_000);
        assert!(results.acceptance_rate > 0.0 && results.acceptance_rate <= 1.0);
    }

    #[test]
    fn test_no_samples_report_zero() {
        let (lat, model, phi) = two_site_setup();
        let mut rng = RandomEngine::new(Some(1));
        let state = ProjectedState::from_orbitals(phi, 2, vec![], &mut rng).unwrap();
        let engine = MonteCarloEngine::new(&model, state, &lat, rng, VmcOptions::new(10, 1, 0));
        assert_eq!(engine.get_energy(), Complex64::new(0.0, 0.0));
        assert_eq!(engine.get_energy_err(), Complex64::new(0.0, 0.0));
        assert_eq!(engine.acceptance_rate(), 0.0);
        assert_eq!(engine.status(), RunStatus::NotRun);
    }

    #[test]
    fn test_invalid_state_is_reported() {
        let (lat, model, _) = two_site_setup();
        // Both orbitals live on site 0: every Slater matrix has a zero row.
        let mut phi = DMatrix::<Complex64>::zeros(4, 2);
        phi[(0, 0)] = Complex64::new(1.0, 0.0);
        phi[(1, 1)] = Complex64::new(1.0, 0.0);
        let mut rng = RandomEngine::new(Some(1));
        let state = ProjectedState::from_orbitals(phi, 2, vec![], &mut rng).unwrap();
        assert!(!state.is_valid());
        let mut engine = MonteCarloEngine::new(&model, state, &lat, rng, VmcOptions::new(10, 1, 0));
        assert!(matches!(engine.run(), Err(VmcError::NoValidConfiguration)));
        let results = engine.results();
        assert_eq!(results.status, RunStatus::NoValidConfiguration);
        assert_eq!(results.energy, Complex64::new(0.0, 0.0));
        assert_eq!(results.observables[0].name, "J");
    }

    #[test]
    fn test_optimization_requires_ansatz() {
        let (lat, model, phi) = two_site_setup();
        let mut rng = RandomEngine::new(Some(1));
        let state = ProjectedState::from_orbitals(phi, 2, vec![], &mut rng).unwrap();
        let options = VmcOptions::new(10, 1, 0).with_optimization(2, 0.1);
        let mut engine = MonteCarloEngine::new(&model, state, &lat, rng, options);
        assert!(matches!(engine.run(), Err(VmcError::Configuration(_))));
    }
}
