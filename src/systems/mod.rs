//! Systems module - spin Hamiltonians and the observables they are built from.

mod builder;
mod interaction;
mod spin_model;

pub use builder::{create_hamiltonian, create_hamiltonian_with, su3_ring_hamiltonian, RingSignConvention};
pub use interaction::{biquadratic_matrix, heisenberg_matrix, spin_matrices, swap_matrix, Interaction};
pub use spin_model::{Observable, SpinModel};
