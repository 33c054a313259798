//! Local operators and their matrix elements on projected states.
//!
//! The contribution of an operator `O` to a local estimator is
//! `sum_{c'} <c|O|c'> psi(c') / psi(c)`, evaluated with determinant ratios.

use std::sync::Arc;

use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::error::{Result, VmcError};
use crate::lattice::{Lattice, RingList};
use crate::sampling::Move;
use crate::wavefunction::{Change, ProjectedState};

#[derive(Debug, Clone)]
pub enum Interaction {
    /// `weight * P_ab`, the flavor transposition of two sites.
    SwapExchange { sites: [usize; 2], weight: f64 },
    /// `weight * P` for the cyclic permutation moving the flavor on
    /// `sites[0]` to `sites[1]`, `sites[1]` to `sites[2]` and `sites[2]` to
    /// `sites[0]` (`forward`), or its inverse.
    RingExchange {
        sites: [usize; 3],
        forward: bool,
        weight: f64,
    },
    /// General two-site operator given as an `nf^2 x nf^2` matrix with row
    /// index `f_a * nf + f_b`.
    BondOperator {
        sites: [usize; 2],
        matrix: Arc<DMatrix<Complex64>>,
        weight: f64,
    },
    /// `weight * (S^z)^2` on one site.
    SingleIon { site: usize, weight: f64 },
}

fn check_site(lattice: &Lattice, site: usize) -> Result<()> {
    if site >= lattice.num_sites() {
        return Err(VmcError::config(format!(
            "interaction site {} out of range for {} sites",
            site,
            lattice.num_sites()
        )));
    }
    Ok(())
}

fn check_pair(lattice: &Lattice, a: usize, b: usize) -> Result<()> {
    check_site(lattice, a)?;
    check_site(lattice, b)?;
    if a == b {
        return Err(VmcError::config(format!("two-site interaction on site {} twice", a)));
    }
    Ok(())
}

impl Interaction {
    pub fn swap_exchange(lattice: &Lattice, a: usize, b: usize, weight: f64) -> Result<Self> {
        check_pair(lattice, a, b)?;
        Ok(Interaction::SwapExchange { sites: [a, b], weight })
    }

    pub fn ring_exchange(rings: &RingList, ring: usize, forward: bool, weight: f64) -> Result<Self> {
        let sites = *rings.get(ring).ok_or_else(|| {
            VmcError::config(format!("ring {} out of range ({} rings)", ring, rings.len()))
        })?;
        Ok(Interaction::RingExchange { sites, forward, weight })
    }

    pub fn bond_operator(
        lattice: &Lattice,
        a: usize,
        b: usize,
        matrix: Arc<DMatrix<Complex64>>,
        weight: f64,
    ) -> Result<Self> {
        check_pair(lattice, a, b)?;
        if matrix.nrows() != matrix.ncols() {
            return Err(VmcError::config("bond operator matrix must be square"));
        }
        let nf = (matrix.nrows() as f64).sqrt().round() as usize;
        if nf * nf != matrix.nrows() {
            return Err(VmcError::config(format!(
                "bond operator dimension {} is not a square of a flavor count",
                matrix.nrows()
            )));
        }
        Ok(Interaction::BondOperator { sites: [a, b], matrix, weight })
    }

    pub fn single_ion(lattice: &Lattice, site: usize, weight: f64) -> Result<Self> {
        check_site(lattice, site)?;
        Ok(Interaction::SingleIon { site, weight })
    }

    /// Configuration `c'` with `<c|P|c'> = 1`, as changes to `config`.
    fn ring_preimage(sites: [usize; 3], forward: bool, config: &[usize]) -> [Change; 3] {
        let [s0, s1, s2] = sites;
        if forward {
            [(s0, config[s1]), (s1, config[s2]), (s2, config[s0])]
        } else {
            [(s1, config[s0]), (s2, config[s1]), (s0, config[s2])]
        }
    }

    pub fn contribution(&self, state: &ProjectedState) -> Complex64 {
        let c = state.configuration();
        match self {
            Interaction::SwapExchange { sites: [a, b], weight } => {
                let (a, b) = (*a, *b);
                if c[a] == c[b] {
                    Complex64::new(*weight, 0.0)
                } else {
                    state.ratio(&[(a, c[b]), (b, c[a])]) * *weight
                }
            }
            Interaction::RingExchange { sites, forward, weight } => {
                let changes = Self::ring_preimage(*sites, *forward, c);
                state.ratio(&changes) * *weight
            }
            Interaction::BondOperator { sites: [a, b], matrix, weight } => {
                let (a, b) = (*a, *b);
                let nf = state.num_flavors();
                let row = c[a] * nf + c[b];
                let mut total = Complex64::new(0.0, 0.0);
                for col in 0..nf * nf {
                    let element = matrix[(row, col)];
                    if element == Complex64::new(0.0, 0.0) {
                        continue;
                    }
                    total += element * state.ratio(&[(a, col / nf), (b, col % nf)]);
                }
                total * *weight
            }
            Interaction::SingleIon { site, weight } => {
                let m = state.spin() - c[*site] as f64;
                Complex64::new(weight * m * m, 0.0)
            }
        }
    }

    /// A Metropolis move connecting the configurations this term connects.
    pub fn candidate_move(&self) -> Option<Move> {
        match self {
            Interaction::SwapExchange { sites: [a, b], .. }
            | Interaction::BondOperator { sites: [a, b], .. } => Some(Move::Swap(*a, *b)),
            Interaction::RingExchange { sites, forward, .. } => Some(Move::Cycle {
                sites: *sites,
                forward: *forward,
            }),
            Interaction::SingleIon { .. } => None,
        }
    }
}

/// `S^z`, `S^+` and `S^-` in the flavor basis (`S^z = spin - f`).
pub fn spin_matrices(num_flavors: usize) -> (DMatrix<f64>, DMatrix<f64>, DMatrix<f64>) {
    let s = (num_flavors as f64 - 1.0) / 2.0;
    let sz = DMatrix::from_fn(num_flavors, num_flavors, |i, j| {
        if i == j {
            s - i as f64
        } else {
            0.0
        }
    });
    let splus = DMatrix::from_fn(num_flavors, num_flavors, |i, j| {
        // <m+1|S^+|m> with m = s - j, m + 1 = s - i
        if i + 1 == j {
            let m = s - j as f64;
            (s * (s + 1.0) - m * (m + 1.0)).sqrt()
        } else {
            0.0
        }
    });
    let sminus = splus.transpose();
    (sz, splus, sminus)
}

/// `S_a . S_b` on a bond.
pub fn heisenberg_matrix(num_flavors: usize) -> DMatrix<Complex64> {
    let (sz, sp, sm) = spin_matrices(num_flavors);
    let h = sz.kronecker(&sz) + (sp.kronecker(&sm) + sm.kronecker(&sp)) * 0.5;
    h.map(|x| Complex64::new(x, 0.0))
}

/// `(S_a . S_b)^2` on a bond.
pub fn biquadratic_matrix(num_flavors: usize) -> DMatrix<Complex64> {
    let h = heisenberg_matrix(num_flavors);
    &h * &h
}

/// Flavor transposition `P_ab` as a bond matrix.
pub fn swap_matrix(num_flavors: usize) -> DMatrix<Complex64> {
    let nf = num_flavors;
    DMatrix::from_fn(nf * nf, nf * nf, |row, col| {
        if row / nf == col % nf && row % nf == col / nf {
            Complex64::new(1.0, 0.0)
        } else {
            Complex64::new(0.0, 0.0)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::LatticeType;
    use crate::random::RandomEngine;
    use approx::assert_relative_eq;

    fn state(n: usize, nf: usize, seed: u64) -> ProjectedState {
        let mut rng = RandomEngine::new(Some(seed));
        let phi = DMatrix::from_fn(n * nf, n, |_, _| {
            Complex64::new(rng.rand_double() - 0.5, rng.rand_double() - 0.5)
        });
        ProjectedState::from_orbitals(phi, nf, vec![], &mut rng).unwrap()
    }

    fn apply(config: &[usize], changes: &[Change]) -> Vec<usize> {
        let mut next = config.to_vec();
        for &(s, f) in changes {
            next[s] = f;
        }
        next
    }

    #[test]
    fn test_spin_one_swap_identity() {
        // P = S.S + (S.S)^2 - 1 for spin 1.
        let p = heisenberg_matrix(3) + biquadratic_matrix(3) - DMatrix::identity(9, 9);
        assert_relative_eq!((p - swap_matrix(3)).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_spin_half_heisenberg() {
        // S.S = P/2 - 1/4 for spin 1/2.
        let expected = swap_matrix(2) * Complex64::new(0.5, 0.0)
            - DMatrix::identity(4, 4) * Complex64::new(0.25, 0.0);
        assert_relative_eq!((heisenberg_matrix(2) - expected).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bond_operator_matches_swap() {
        let lat = Lattice::new(LatticeType::Chain, [5, 1, 1], [true, false, false]).unwrap();
        let st = state(5, 3, 21);
        let swap = Interaction::swap_exchange(&lat, 1, 2, 0.5).unwrap();
        let bond = Interaction::bond_operator(&lat, 1, 2, Arc::new(swap_matrix(3)), 0.5).unwrap();
        let a = swap.contribution(&st);
        let b = bond.contribution(&st);
        assert_relative_eq!(a.re, b.re, epsilon = 1e-10);
        assert_relative_eq!(a.im, b.im, epsilon = 1e-10);
    }

    #[test]
    fn test_ring_contribution_uses_preimage() {
        let lat = Lattice::new(LatticeType::Triangular, [3, 3, 1], [true, true, false]).unwrap();
        let st = state(9, 3, 8);
        let c = st.configuration().to_vec();
        let psi = st.amplitude_of(&c);
        let sites = *lat.rings().get(0).unwrap();
        for forward in [true, false] {
            let term = Interaction::ring_exchange(lat.rings(), 0, forward, 1.0).unwrap();
            // P|c'> = |c>: undo the cycle on c.
            let mut rng = RandomEngine::new(Some(0));
            let undo = Move::Cycle { sites, forward: !forward }.changes(&c, 3, &mut rng);
            let expected = st.amplitude_of(&apply(&c, &undo)) / psi;
            let got = term.contribution(&st);
            assert_relative_eq!(got.re, expected.re, epsilon = 1e-9);
            assert_relative_eq!(got.im, expected.im, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_single_ion_and_validation() {
        let lat = Lattice::new(LatticeType::Chain, [3, 1, 1], [false, false, false]).unwrap();
        let st = state(3, 3, 2);
        let term = Interaction::single_ion(&lat, 0, 2.0).unwrap();
        let m = 1.0 - st.configuration()[0] as f64;
        assert_relative_eq!(term.contribution(&st).re, 2.0 * m * m);
        assert!(term.candidate_move().is_none());
        assert!(Interaction::swap_exchange(&lat, 0, 3, 1.0).is_err());
        assert!(Interaction::swap_exchange(&lat, 1, 1, 1.0).is_err());
        assert!(Interaction::ring_exchange(lat.rings(), 0, true, 1.0).is_err());
        let bad = Arc::new(DMatrix::<Complex64>::zeros(5, 5));
        assert!(Interaction::bond_operator(&lat, 0, 1, bad, 1.0).is_err());
    }
}
