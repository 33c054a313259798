//! Sampling module - Metropolis sampling of projected states and SR optimisation.

mod moves;
mod sr_optimize;
mod stats;
mod vmc;

pub use moves::{build_move_set, Move};
pub use sr_optimize::{EpochSummary, SROptimizer};
pub use stats::{autocorrelation_time, BinnedAccumulator};
pub use vmc::{MonteCarloEngine, ObservableEstimate, RunStatus, VmcResults};
