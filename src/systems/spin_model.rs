//! Named observables and the coupled Hamiltonian built from them.

use num_complex::Complex64;

use crate::error::{Result, VmcError};
use crate::sampling::Move;
use crate::systems::Interaction;
use crate::wavefunction::ProjectedState;

/// A named sum of interactions.
#[derive(Debug, Clone)]
pub struct Observable {
    name: String,
    interactions: Vec<Interaction>,
}

impl Observable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interactions: Vec::new(),
        }
    }

    pub fn add_interaction(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Local value `sum_k <c|O_k|psi> / <c|psi>` for the state's configuration.
    pub fn evaluate(&self, state: &ProjectedState) -> Complex64 {
        self.interactions.iter().map(|i| i.contribution(state)).sum()
    }
}

#[derive(Debug, Clone)]
struct Term {
    observable: Observable,
    coupling: Complex64,
}

/// `H = sum_k coupling_k O_k`, terms kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct SpinModel {
    terms: Vec<Term>,
}

impl SpinModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `coupling * observable`. The observable's own name is the key the
    /// term is registered and looked up under, and must be unique.
    pub fn add_term(&mut self, observable: Observable, coupling: Complex64) -> Result<()> {
        if self.terms.iter().any(|t| t.observable.name == observable.name) {
            return Err(VmcError::config(format!(
                "duplicate observable name '{}'",
                observable.name
            )));
        }
        self.terms.push(Term { observable, coupling });
        Ok(())
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn names(&self) -> Vec<String> {
        self.terms.iter().map(|t| t.observable.name.clone()).collect()
    }

    pub fn coupling(&self, name: &str) -> Option<Complex64> {
        self.terms
            .iter()
            .find(|t| t.observable.name == name)
            .map(|t| t.coupling)
    }

    pub fn observable(&self, name: &str) -> Option<&Observable> {
        self.terms
            .iter()
            .find(|t| t.observable.name == name)
            .map(|t| &t.observable)
    }

    /// Local value of every observable, in term order.
    pub fn local_observables(&self, state: &ProjectedState) -> Vec<Complex64> {
        self.terms.iter().map(|t| t.observable.evaluate(state)).collect()
    }

    /// `sum_k coupling_k * values[k]`
    pub fn energy_from(&self, values: &[Complex64]) -> Complex64 {
        self.terms.iter().zip(values).map(|(t, v)| t.coupling * v).sum()
    }

    pub fn local_energy(&self, state: &ProjectedState) -> Complex64 {
        self.energy_from(&self.local_observables(state))
    }

    /// Moves suggested by the interactions, in term order (duplicates kept).
    pub fn candidate_moves(&self) -> Vec<Move> {
        self.terms
            .iter()
            .flat_map(|t| t.observable.interactions.iter())
            .filter_map(|i| i.candidate_move())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{Lattice, LatticeType};
    use crate::random::RandomEngine;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn triangle_state() -> (Lattice, ProjectedState) {
        let lat = Lattice::new(LatticeType::Triangular, [2, 2, 1], [true, true, false]).unwrap();
        let mut rng = RandomEngine::new(Some(17));
        let phi = DMatrix::from_fn(12, 4, |_, _| {
            Complex64::new(rng.rand_double() - 0.5, rng.rand_double() - 0.5)
        });
        let st = ProjectedState::from_orbitals(phi, 3, vec![], &mut rng).unwrap();
        (lat, st)
    }

    #[test]
    fn test_energy_is_coupled_sum() {
        let (lat, st) = triangle_state();
        assert_eq!(lat.rings().len(), 4);
        let mut j = Observable::new("J");
        j.add_interaction(Interaction::swap_exchange(&lat, 0, 1, 0.5).unwrap());
        j.add_interaction(Interaction::swap_exchange(&lat, 2, 3, 0.5).unwrap());
        let mut k = Observable::new("K");
        for r in 0..lat.rings().len() {
            k.add_interaction(Interaction::ring_exchange(lat.rings(), r, true, 1.0).unwrap());
        }
        let mut model = SpinModel::new();
        let cj = Complex64::new(1.0, 0.0);
        let ck = Complex64::new(0.3, 0.2);
        model.add_term(j.clone(), cj).unwrap();
        model.add_term(k.clone(), ck).unwrap();

        let values = model.local_observables(&st);
        assert_eq!(model.names(), vec!["J".to_string(), "K".to_string()]);
        let expected = cj * j.evaluate(&st) + ck * k.evaluate(&st);
        let e = model.local_energy(&st);
        assert_relative_eq!(e.re, expected.re, epsilon = 1e-12);
        assert_relative_eq!(e.im, expected.im, epsilon = 1e-12);
        assert_relative_eq!(values[1].re, k.evaluate(&st).re, epsilon = 1e-12);

        // Swap term from amplitudes directly.
        let c = st.configuration().to_vec();
        let psi = st.amplitude_of(&c);
        let mut direct = Complex64::new(0.0, 0.0);
        for (a, b) in [(0, 1), (2, 3)] {
            let mut swapped = c.clone();
            swapped.swap(a, b);
            direct += st.amplitude_of(&swapped) / psi * 0.5;
        }
        assert_relative_eq!(values[0].re, direct.re, epsilon = 1e-9);
        assert_relative_eq!(values[0].im, direct.im, epsilon = 1e-9);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut model = SpinModel::new();
        model.add_term(Observable::new("J"), Complex64::new(1.0, 0.0)).unwrap();
        assert!(model.add_term(Observable::new("J"), Complex64::new(2.0, 0.0)).is_err());
        assert_eq!(model.coupling("J"), Some(Complex64::new(1.0, 0.0)));
        assert!(model.observable("K").is_none());
    }

    #[test]
    fn test_candidate_moves() {
        let (lat, _) = triangle_state();
        let mut j = Observable::new("J");
        j.add_interaction(Interaction::swap_exchange(&lat, 0, 1, 0.5).unwrap());
        j.add_interaction(Interaction::single_ion(&lat, 0, 1.0).unwrap());
        let mut model = SpinModel::new();
        model.add_term(j, Complex64::new(1.0, 0.0)).unwrap();
        assert_eq!(model.candidate_moves(), vec![Move::Swap(0, 1)]);
    }
}
