//! Local Metropolis proposals on flavor configurations.

use std::collections::BTreeSet;

use crate::lattice::Lattice;
use crate::random::RandomEngine;
use crate::wavefunction::Change;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Move {
    /// Exchange the flavors of two sites.
    Swap(usize, usize),
    /// Cycle flavors around three sites; `forward` moves the flavor on
    /// `sites[0]` to `sites[1]`, `sites[1]` to `sites[2]` and back.
    Cycle { sites: [usize; 3], forward: bool },
    /// Redraw the flavors of two sites uniformly among pairs with the same
    /// total `S^z`.
    PairResample(usize, usize),
}

impl Move {
    /// Canonical form used to deduplicate move lists.
    pub fn canonical(self) -> Self {
        match self {
            Move::Swap(a, b) => Move::Swap(a.min(b), a.max(b)),
            Move::PairResample(a, b) => Move::PairResample(a.min(b), a.max(b)),
            Move::Cycle { sites, forward } => {
                let start = (0..3).min_by_key(|&k| sites[k]).unwrap_or(0);
                Move::Cycle {
                    sites: [sites[start], sites[(start + 1) % 3], sites[(start + 2) % 3]],
                    forward,
                }
            }
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            Move::Cycle { sites, forward } => Move::Cycle {
                sites,
                forward: !forward,
            },
            other => other,
        }
    }

    /// Flavor changes this move makes to `config`.
    pub fn changes(&self, config: &[usize], num_flavors: usize, rng: &mut RandomEngine) -> Vec<Change> {
        match *self {
            Move::Swap(a, b) => vec![(a, config[b]), (b, config[a])],
            Move::Cycle { sites: [s0, s1, s2], forward } => {
                if forward {
                    vec![(s1, config[s0]), (s2, config[s1]), (s0, config[s2])]
                } else {
                    vec![(s0, config[s1]), (s1, config[s2]), (s2, config[s0])]
                }
            }
            Move::PairResample(a, b) => {
                // f_a + f_b fixes the pair's total S^z.
                let total = config[a] + config[b];
                let lo = total.saturating_sub(num_flavors - 1);
                let hi = total.min(num_flavors - 1);
                let fa = lo + rng.rand_int(hi - lo + 1);
                vec![(a, fa), (b, total - fa)]
            }
        }
    }
}

/// Deduplicated proposal list. Cycles are paired with their inverses so the
/// proposal distribution stays symmetric; without `su3` symmetry swaps are
/// widened to S^z-conserving pair moves. Falls back to nearest-neighbour
/// swaps when `candidates` is empty.
pub fn build_move_set(candidates: &[Move], lattice: &Lattice, su3: bool) -> Vec<Move> {
    let mut set = BTreeSet::new();
    for &m in candidates {
        insert_move(&mut set, m, su3);
        insert_move(&mut set, m.inverse(), su3);
    }
    if set.is_empty() {
        for site in 0..lattice.num_sites() {
            for nbr in lattice.neighbors(site, 0) {
                insert_move(&mut set, Move::Swap(site, nbr), su3);
            }
        }
    }
    set.into_iter().collect()
}

fn insert_move(set: &mut BTreeSet<Move>, m: Move, su3: bool) {
    let m = match m {
        Move::Swap(a, b) if !su3 => Move::PairResample(a, b),
        other => other,
    };
    set.insert(m.canonical());
}
