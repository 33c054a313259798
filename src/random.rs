//! Seedable random source for Monte Carlo proposals.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

/// Uniform integers and reals from a PCG stream.
///
/// Two engines built with the same seed produce identical streams, so a run is
/// reproducible from its seed alone.
#[derive(Clone, Debug)]
pub struct RandomEngine {
    rng: Pcg64,
    seed: u64,
}

impl RandomEngine {
    /// Create an engine. `None` draws a fresh seed from the thread RNG.
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
        Self {
            rng: Pcg64::seed_from_u64(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Independent engine for chain `index`, derived from this engine's seed.
    pub fn fork(&self, index: u64) -> Self {
        let seed = self
            .seed
            .wrapping_add(index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        Self::new(Some(seed))
    }

    /// Uniform integer in `[0, n)`.
    pub fn rand_int(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    /// Uniform real in `[0, 1)`.
    pub fn rand_double(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    pub fn shuffle<T>(&mut self, values: &mut [T]) {
        values.shuffle(&mut self.rng);
    }
}
