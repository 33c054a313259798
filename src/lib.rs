//! spin_vmc - Variational Monte Carlo for lattice spin models
//!
//! This crate samples Gutzwiller-projected mean-field (parton) wavefunctions
//! of SU(N) and spin-S models on chain, square, triangular and cubic lattices,
//! estimates energies and named observables, and optimises the variational
//! parameters with Stochastic Reconfiguration.

pub mod correlation;
pub mod error;
pub mod io;
pub mod lattice;
pub mod random;
pub mod sampling;
pub mod simulation;
pub mod systems;
pub mod timing;
pub mod wavefunction;

// Re-export commonly used types at crate root
pub use correlation::{JastrowKind, SpinJastrow};
pub use error::{Result, VmcError};
pub use io::{read_input, InputOptions, VmcOptions};
pub use lattice::{Lattice, LatticeType, RingList};
pub use random::RandomEngine;
pub use sampling::{MonteCarloEngine, RunStatus, SROptimizer, VmcResults};
pub use simulation::{run_mc, sample_state};
pub use systems::{create_hamiltonian, Interaction, Observable, SpinModel};
pub use wavefunction::{MeanFieldAnsatz, OptimizableWfn, ProjectedState};
