//! Spin Jastrow factors on lattice configurations.
//!
//! `ln J(c) = 1/2 sum_i sum_{j in N_s(i)} v_p f(c_i) f(c_j)` where `f` is
//! either `S^z` or `(S^z)^2` of the flavor on a site and `p` labels the
//! variational parameter of the bond: one per shell when isotropic, one per
//! (shell, displacement) otherwise.

use crate::error::{Result, VmcError};
use crate::io::JastrowFactorOptions;
use crate::lattice::Lattice;
use crate::wavefunction::OptimizableWfn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JastrowKind {
    Sz,
    Sz2,
}

/// (other site, parameter index)
type Edge = (usize, usize);

#[derive(Debug, Clone)]
pub struct SpinJastrow {
    kind: JastrowKind,
    spin: f64,
    values: Vec<f64>,
    outgoing: Vec<Vec<Edge>>,
    incoming: Vec<Vec<Edge>>,
}

impl SpinJastrow {
    pub fn new(
        kind: JastrowKind,
        spin: f64,
        options: &JastrowFactorOptions,
        lattice: &Lattice,
    ) -> Result<Self> {
        if options.distance_max > lattice.num_shells() {
            return Err(VmcError::config(format!(
                "jastrow: distance_max {} exceeds the {} available neighbour shells",
                options.distance_max,
                lattice.num_shells()
            )));
        }
        let shells = &lattice.shells()[..options.distance_max];
        // First parameter index of each shell.
        let mut offsets = Vec::with_capacity(shells.len());
        let mut expected = 0;
        for shell in shells {
            offsets.push(expected);
            expected += if options.isotropic {
                1
            } else {
                shell.displacements.len()
            };
        }
        if options.values.len() != expected {
            return Err(VmcError::config(format!(
                "jastrow: expected {} values, found {}",
                expected,
                options.values.len()
            )));
        }

        let n = lattice.num_sites();
        let mut outgoing = vec![Vec::new(); n];
        let mut incoming = vec![Vec::new(); n];
        for site in 0..n {
            for (s, shell) in shells.iter().enumerate() {
                for (k, &d) in shell.displacements.iter().enumerate() {
                    let Some(bond) = lattice.displace(site, d) else {
                        continue;
                    };
                    if bond.site == site {
                        continue;
                    }
                    let p = if options.isotropic { offsets[s] } else { offsets[s] + k };
                    outgoing[site].push((bond.site, p));
                    incoming[bond.site].push((site, p));
                }
            }
        }

        Ok(Self {
            kind,
            spin,
            values: options.values.clone(),
            outgoing,
            incoming,
        })
    }

    pub fn kind(&self) -> JastrowKind {
        self.kind
    }

    fn weight(&self, flavor: usize) -> f64 {
        let m = self.spin - flavor as f64;
        match self.kind {
            JastrowKind::Sz => m,
            JastrowKind::Sz2 => m * m,
        }
    }

    pub fn log_value(&self, config: &[usize]) -> f64 {
        let mut total = 0.0;
        for (i, edges) in self.outgoing.iter().enumerate() {
            let fi = self.weight(config[i]);
            for &(j, p) in edges {
                total += self.values[p] * fi * self.weight(config[j]);
            }
        }
        0.5 * total
    }

    /// `ln J(c') - ln J(c)` where `c'` is `config` with `changes` applied.
    pub fn log_ratio(&self, config: &[usize], changes: &[(usize, usize)]) -> f64 {
        let changed = |site: usize| changes.iter().find(|c| c.0 == site).map(|c| c.1);
        let new_weight = |site: usize| self.weight(changed(site).unwrap_or(config[site]));
        let old_weight = |site: usize| self.weight(config[site]);

        let mut delta = 0.0;
        for &(i, _) in changes {
            for &(j, p) in &self.outgoing[i] {
                delta += self.values[p] * (new_weight(i) * new_weight(j) - old_weight(i) * old_weight(j));
            }
            // Edges from changed sources were counted above.
            for &(src, p) in &self.incoming[i] {
                if changed(src).is_none() {
                    delta += self.values[p]
                        * (new_weight(src) * new_weight(i) - old_weight(src) * old_weight(i));
                }
            }
        }
        0.5 * delta
    }

    /// `d ln J / d v_p` for every parameter.
    pub fn log_derivatives(&self, config: &[usize]) -> Vec<f64> {
        let mut out = vec![0.0; self.values.len()];
        for (i, edges) in self.outgoing.iter().enumerate() {
            let fi = self.weight(config[i]);
            for &(j, p) in edges {
                out[p] += 0.5 * fi * self.weight(config[j]);
            }
        }
        out
    }
}

impl OptimizableWfn for SpinJastrow {
    fn num_params(&self) -> usize {
        self.values.len()
    }

    fn get_params(&self) -> Vec<f64> {
        self.values.clone()
    }

    fn set_params(&mut self, params: &[f64]) -> Result<()> {
        if params.len() != self.values.len() {
            return Err(VmcError::config(format!(
                "jastrow: expected {} parameters, got {}",
                self.values.len(),
                params.len()
            )));
        }
        self.values.copy_from_slice(params);
        Ok(())
    }
}
