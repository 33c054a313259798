//! Wavefunction module - mean-field orbitals and their Gutzwiller projection.

mod meanfield;
mod projected;
mod traits;

pub use meanfield::{MeanFieldAnsatz, Orbital};
pub use projected::{Change, ProjectedState, DRIFT_TOLERANCE, MAX_INIT_ATTEMPTS};
pub use traits::OptimizableWfn;
