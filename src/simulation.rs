//! End-to-end run: lattice, ansatz, projection, Hamiltonian, sampling.

use std::path::Path;

use log::{info, warn};

use crate::error::{Result, VmcError};
use crate::io::{write_lattice_reports, InputOptions, VmcOptions};
use crate::lattice::Lattice;
use crate::random::RandomEngine;
use crate::sampling::{MonteCarloEngine, RunStatus, VmcResults};
use crate::systems::{create_hamiltonian, SpinModel};
use crate::timing::Profiler;
use crate::wavefunction::{MeanFieldAnsatz, ProjectedState};

/// Build everything described by `options` and sample it. Lattice reports
/// go to `data_dir` when given. A state with no valid configuration gives
/// zeroed results with [`RunStatus::NoValidConfiguration`].
pub fn run_mc(options: &InputOptions, data_dir: Option<&Path>, profiler: &mut Profiler) -> Result<VmcResults> {
    let lattice = profiler.time("lattice", || Lattice::from_options(&options.lattice))?;
    info!(
        "lattice: {} {:?}, {} sites, {} rings",
        lattice.lattice_type(),
        lattice.extent(),
        lattice.num_sites(),
        lattice.rings().len()
    );
    if let Some(dir) = data_dir {
        write_lattice_reports(dir, &lattice)?;
    }

    let ansatz = profiler.time("mean field", || MeanFieldAnsatz::new(&options.wavefunction, &lattice))?;
    ansatz.print_levels();
    ansatz.print_fermi_level();

    let model = create_hamiltonian(&lattice, &options.model, ansatz.num_flavors())?;
    let mut rng = RandomEngine::new(options.vmc.seed);
    info!("random seed {}", rng.seed());
    let state = profiler.time("projection", || ProjectedState::new(&ansatz, &mut rng))?;

    sample_state(&model, &lattice, ansatz, state, rng, &options.vmc, profiler)
}

/// Sample an already projected state. A state that has, or after an SR
/// update ends up with, no valid configuration gives zeroed results with
/// [`RunStatus::NoValidConfiguration`].
pub fn sample_state(
    model: &SpinModel,
    lattice: &Lattice,
    ansatz: MeanFieldAnsatz,
    state: ProjectedState,
    rng: RandomEngine,
    options: &VmcOptions,
    profiler: &mut Profiler,
) -> Result<VmcResults> {
    if !state.is_valid() {
        warn!("No valid initializations; reporting zero estimates");
        return Ok(VmcResults::empty(&model.names(), RunStatus::NoValidConfiguration));
    }
    let mut engine =
        MonteCarloEngine::new(model, state, lattice, rng, options.clone()).with_ansatz(ansatz);
    let outcome = engine.run();
    profiler.merge(engine.profiler());
    match outcome {
        Ok(()) => Ok(engine.results()),
        Err(VmcError::NoValidConfiguration) => {
            warn!("Re-projection found no valid configuration; reporting zero estimates");
            Ok(VmcResults::empty(&model.names(), RunStatus::NoValidConfiguration))
        }
        Err(e) => Err(e),
    }
}
