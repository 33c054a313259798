//! Hamiltonians assembled from model options.
//!
//! Observable names:
//!
//! | input                                   | name      | operator                          |
//! |-----------------------------------------|-----------|-----------------------------------|
//! | bilinear `swap`/`exchange`/`su3`, shell s | `J`, `J2`, `J3` | `1/2 sum_i sum_{j in N_s(i)} P_ij` |
//! | bilinear `heisenberg`, shell s          | `J`, `J2`, `J3` | same with `S_i . S_j`          |
//! | bilinear `biquadratic`, shell s         | `Q`, `Q2`, `Q3` | same with `(S_i . S_j)^2`      |
//! | trilinear `ring`, hermitian             | `K`, `h`  | `P + P^-1`, `i (P - P^-1)` signs configurable |
//! | trilinear `ring`, non-hermitian         | `R`       | `P`                               |
//! | `single_ion`                            | `D`       | `sum_i (S^z_i)^2`                 |
//!
//! Later trilinear terms get a numeric suffix (`K2`, `h2`, ...).

use std::sync::Arc;

use log::{info, warn};
use num_complex::Complex64;

use crate::error::{Result, VmcError};
use crate::io::{BilinearOptions, ModelOptions, TrilinearOptions};
use crate::lattice::Lattice;
use crate::systems::interaction::{biquadratic_matrix, heisenberg_matrix};
use crate::systems::{Interaction, Observable, SpinModel};

/// Weights of the forward and reverse ring permutation in the chiral
/// (`h`) observable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingSignConvention {
    pub forward: f64,
    pub reverse: f64,
}

impl Default for RingSignConvention {
    fn default() -> Self {
        Self {
            forward: 1.0,
            reverse: -1.0,
        }
    }
}

fn shell_name(prefix: &str, shell: usize) -> String {
    if shell == 0 {
        prefix.to_string()
    } else {
        format!("{}{}", prefix, shell + 1)
    }
}

fn term_suffix(index: usize) -> String {
    if index == 0 {
        String::new()
    } else {
        (index + 1).to_string()
    }
}

pub fn create_hamiltonian(
    lattice: &Lattice,
    options: &ModelOptions,
    num_flavors: usize,
) -> Result<SpinModel> {
    create_hamiltonian_with(lattice, options, num_flavors, RingSignConvention::default())
}

pub fn create_hamiltonian_with(
    lattice: &Lattice,
    options: &ModelOptions,
    num_flavors: usize,
    signs: RingSignConvention,
) -> Result<SpinModel> {
    match options.model_type.as_str() {
        "su3" | "blbq" => {}
        other => {
            return Err(VmcError::config(format!(
                "model: unsupported model type '{}' (expected 'su3' or 'blbq')",
                other
            )))
        }
    }

    let mut model = SpinModel::new();
    for term in &options.bilinear_terms {
        let (observable, coupling) = bilinear_term(lattice, term, num_flavors)?;
        model.add_term(observable, coupling)?;
    }

    let mut hermitian_count = 0;
    let mut plain_count = 0;
    for term in &options.ring3_terms {
        if lattice.rings().is_empty() {
            warn!("lattice has no three-site rings; ring term '{}' is empty", term.interaction_type);
        }
        if term.hermitian {
            let suffix = term_suffix(hermitian_count);
            hermitian_count += 1;
            let (k, h) = hermitian_ring_terms(lattice, term, &suffix, signs)?;
            model.add_term(k, Complex64::new(term.coupling_real, 0.0))?;
            model.add_term(h, Complex64::new(0.0, term.coupling_imag))?;
        } else {
            let suffix = term_suffix(plain_count);
            plain_count += 1;
            check_ring_type(term)?;
            let mut r = Observable::new(format!("R{}", suffix));
            for ring in 0..lattice.rings().len() {
                r.add_interaction(Interaction::ring_exchange(lattice.rings(), ring, true, 1.0)?);
            }
            model.add_term(r, Complex64::new(term.coupling_real, term.coupling_imag))?;
        }
    }

    if let Some(d) = options.single_ion {
        let mut obs = Observable::new("D");
        for site in 0..lattice.num_sites() {
            obs.add_interaction(Interaction::single_ion(lattice, site, 1.0)?);
        }
        model.add_term(obs, Complex64::new(d, 0.0))?;
    }

    info!("Hamiltonian terms: {}", model.names().join(", "));
    Ok(model)
}

fn bilinear_term(
    lattice: &Lattice,
    term: &BilinearOptions,
    num_flavors: usize,
) -> Result<(Observable, Complex64)> {
    let shell = term.neighbor_index;
    if shell >= lattice.num_shells() {
        return Err(VmcError::config(format!(
            "model: bilinear neighbor_index {} exceeds the {} available shells",
            shell,
            lattice.num_shells()
        )));
    }
    let kind = term.interaction_type.to_ascii_lowercase();
    let (prefix, matrix) = match kind.as_str() {
        "swap" | "exchange" | "su3" | "permutation" => ("J", None),
        "heisenberg" | "bilinear" => ("J", Some(Arc::new(heisenberg_matrix(num_flavors)))),
        "biquadratic" => ("Q", Some(Arc::new(biquadratic_matrix(num_flavors)))),
        other => {
            return Err(VmcError::config(format!(
                "model: unknown bilinear type '{}'",
                other
            )))
        }
    };

    let mut obs = Observable::new(shell_name(prefix, shell));
    for site in 0..lattice.num_sites() {
        for nbr in lattice.neighbors(site, shell) {
            // Each bond is visited from both ends.
            let interaction = match &matrix {
                None => Interaction::swap_exchange(lattice, site, nbr, 0.5)?,
                Some(m) => Interaction::bond_operator(lattice, site, nbr, Arc::clone(m), 0.5)?,
            };
            obs.add_interaction(interaction);
        }
    }
    Ok((obs, term.coupling.value()))
}

fn check_ring_type(term: &TrilinearOptions) -> Result<()> {
    match term.interaction_type.to_ascii_lowercase().as_str() {
        "ring" | "ring3" | "ring_exchange" | "ring exchange" => Ok(()),
        other => Err(VmcError::config(format!(
            "model: unknown trilinear type '{}'",
            other
        ))),
    }
}

fn hermitian_ring_terms(
    lattice: &Lattice,
    term: &TrilinearOptions,
    suffix: &str,
    signs: RingSignConvention,
) -> Result<(Observable, Observable)> {
    check_ring_type(term)?;
    let rings = lattice.rings();
    let mut k = Observable::new(format!("K{}", suffix));
    let mut h = Observable::new(format!("h{}", suffix));
    for ring in 0..rings.len() {
        k.add_interaction(Interaction::ring_exchange(rings, ring, true, 1.0)?);
        k.add_interaction(Interaction::ring_exchange(rings, ring, false, 1.0)?);
        h.add_interaction(Interaction::ring_exchange(rings, ring, true, signs.forward)?);
        h.add_interaction(Interaction::ring_exchange(rings, ring, false, signs.reverse)?);
    }
    Ok((k, h))
}

/// `J sum P_ij + K sum (P + P^-1) + i h sum (P - P^-1)` over nearest-neighbour
/// bonds and triangles.
pub fn su3_ring_hamiltonian(lattice: &Lattice, j: f64, k: f64, h: f64) -> Result<SpinModel> {
    let options = ModelOptions {
        model_type: "su3".into(),
        single_ion: None,
        bilinear_terms: vec![BilinearOptions {
            interaction_type: "swap".into(),
            coupling: crate::io::CouplingValue::Real(j),
            neighbor_index: 0,
        }],
        ring3_terms: vec![TrilinearOptions {
            interaction_type: "ring".into(),
            hermitian: true,
            coupling_real: k,
            coupling_imag: h,
        }],
    };
    create_hamiltonian(lattice, &options, 3)
}
