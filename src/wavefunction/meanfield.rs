//! Quadratic mean-field Hamiltonians and their single-particle orbitals.
//!
//! Orbital rows are indexed `site * num_flavors + flavor`; flavor `f` carries
//! `S^z = spin - f`. With one particle per site the lowest `N` eigenvectors
//! (ties broken by index) are occupied.

use std::f64::consts::PI;

use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector, Vector3};
use num_complex::Complex64;

use crate::correlation::{JastrowKind, SpinJastrow};
use crate::error::{Result, VmcError};
use crate::io::{HoppingTerm, MeanFieldOptions, QuadrupoleOrder};
use crate::lattice::{Lattice, LatticeType};
use crate::wavefunction::OptimizableWfn;

/// Levels closer than this are treated as degenerate.
const DEGENERACY_TOLERANCE: f64 = 1e-10;

/// One eigenvector of the mean-field Hamiltonian.
#[derive(Debug, Clone)]
pub struct Orbital {
    pub energy: f64,
    pub amplitudes: DVector<Complex64>,
}

#[derive(Debug, Clone)]
pub struct MeanFieldAnsatz {
    num_sites: usize,
    num_flavors: usize,
    spin: f64,
    /// Fixed part: Zeeman field and quadrupolar directors.
    onsite: DMatrix<Complex64>,
    /// Unit-strength hopping matrices, one per variational strength.
    hoppings: Vec<DMatrix<Complex64>>,
    strengths: Vec<f64>,
    jastrow: Vec<SpinJastrow>,
    energies: Vec<f64>,
    vectors: DMatrix<Complex64>,
}

impl MeanFieldAnsatz {
    pub fn new(options: &MeanFieldOptions, lattice: &Lattice) -> Result<Self> {
        if options.wf_type != "meanfield" {
            return Err(VmcError::config(format!(
                "wavefunction: unsupported wavefunction type '{}' (expected 'meanfield')",
                options.wf_type
            )));
        }
        let twice_spin = 2.0 * options.spin;
        if options.spin < 0.0 || (twice_spin - twice_spin.round()).abs() > 1e-12 {
            return Err(VmcError::config(format!(
                "wavefunction: spin {} is not a non-negative half-integer",
                options.spin
            )));
        }
        let nf = options.num_spin_orbit;
        if nf != twice_spin.round() as usize + 1 {
            return Err(VmcError::config(format!(
                "wavefunction: num spin-orbit {} does not match spin {} (expected {})",
                nf,
                options.spin,
                twice_spin.round() as usize + 1
            )));
        }
        match options.lattice_type.parse::<LatticeType>() {
            Ok(t) if t == lattice.lattice_type() => {}
            Ok(t) => warn!(
                "wavefunction lattice type {} differs from simulation lattice {}",
                t,
                lattice.lattice_type()
            ),
            Err(e) => return Err(e),
        }
        if let Some(basis) = &options.basis {
            if basis.is_empty() {
                return Err(VmcError::config("wavefunction: basis must not be empty"));
            }
        }

        let n = lattice.num_sites();
        let dim = n * nf;
        let mut onsite = DMatrix::<Complex64>::zeros(dim, dim);
        for site in 0..n {
            for f in 0..nf {
                let m = options.spin - f as f64;
                onsite[(site * nf + f, site * nf + f)] -= Complex64::new(options.field * m, 0.0);
            }
        }
        if let Some(directors) = &options.directors {
            if nf != 3 {
                return Err(VmcError::config(
                    "wavefunction: directors require spin 1 (num spin-orbit 3)",
                ));
            }
            add_directors(&mut onsite, directors, options.inequivalent_sites, lattice)?;
        }

        let mut hoppings = Vec::with_capacity(options.hopping_list.len());
        let mut strengths = Vec::with_capacity(options.hopping_list.len());
        for (k, term) in options.hopping_list.iter().enumerate() {
            let row = if options.su3_symmetry {
                vec![1.0; nf]
            } else {
                term.spin_row.clone()
            };
            if row.len() != nf {
                return Err(VmcError::config(format!(
                    "wavefunction: hopping term {} has {} spin row entries, expected {}",
                    k,
                    row.len(),
                    nf
                )));
            }
            hoppings.push(hopping_matrix(term, &row, nf, options.match_lattice_pbc, lattice, k)?);
            strengths.push(term.strength);
        }

        let mut jastrow = Vec::new();
        if let Some(j) = &options.jastrow {
            if let Some(d) = &j.density {
                info!(
                    "density Jastrow (strength {}) is constant at one particle per site; ignored",
                    d.strength
                );
            }
            if let Some(sz) = &j.sz {
                jastrow.push(SpinJastrow::new(JastrowKind::Sz, options.spin, sz, lattice)?);
            }
            if let Some(sz2) = &j.sz2 {
                jastrow.push(SpinJastrow::new(JastrowKind::Sz2, options.spin, sz2, lattice)?);
            }
        }

        let mut ansatz = Self::from_matrices(n, nf, onsite, hoppings, strengths)?;
        ansatz.jastrow = jastrow;
        Ok(ansatz)
    }

    /// Build directly from a fixed part plus unit hopping matrices.
    pub fn from_matrices(
        num_sites: usize,
        num_flavors: usize,
        onsite: DMatrix<Complex64>,
        hoppings: Vec<DMatrix<Complex64>>,
        strengths: Vec<f64>,
    ) -> Result<Self> {
        let dim = num_sites * num_flavors;
        if num_sites == 0 || num_flavors == 0 {
            return Err(VmcError::config("mean-field ansatz needs at least one site and flavor"));
        }
        if onsite.shape() != (dim, dim) || hoppings.iter().any(|h| h.shape() != (dim, dim)) {
            return Err(VmcError::config(format!(
                "mean-field matrices must be {}x{}",
                dim, dim
            )));
        }
        if hoppings.len() != strengths.len() {
            return Err(VmcError::config("one strength is needed per hopping matrix"));
        }
        let mut ansatz = Self {
            num_sites,
            num_flavors,
            spin: (num_flavors as f64 - 1.0) / 2.0,
            onsite,
            hoppings,
            strengths,
            jastrow: Vec::new(),
            energies: Vec::new(),
            vectors: DMatrix::zeros(dim, dim),
        };
        ansatz.diagonalize()?;
        Ok(ansatz)
    }

    pub fn with_jastrow(mut self, jastrow: Vec<SpinJastrow>) -> Self {
        self.jastrow = jastrow;
        self
    }

    pub fn hamiltonian(&self) -> DMatrix<Complex64> {
        let mut h = self.onsite.clone();
        for (hk, &t) in self.hoppings.iter().zip(&self.strengths) {
            h += hk * Complex64::new(t, 0.0);
        }
        h
    }

    fn diagonalize(&mut self) -> Result<()> {
        let h = self.hamiltonian();
        if h.iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
            return Err(VmcError::Numerical("mean-field Hamiltonian has non-finite entries".into()));
        }
        let eigen = h.symmetric_eigen();
        if eigen.eigenvalues.iter().any(|e| !e.is_finite()) {
            return Err(VmcError::Numerical("mean-field diagonalisation failed".into()));
        }
        let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
        order.sort_by(|&a, &b| {
            eigen.eigenvalues[a]
                .total_cmp(&eigen.eigenvalues[b])
                .then(a.cmp(&b))
        });
        self.energies = order.iter().map(|&k| eigen.eigenvalues[k]).collect();
        self.vectors = eigen.eigenvectors.select_columns(&order);

        if let Some(gap) = self.gap() {
            if gap < DEGENERACY_TOLERANCE {
                warn!(
                    "Fermi level is degenerate (gap {:.3e}); occupied orbitals chosen by index",
                    gap
                );
            }
        }
        debug!("diagonalised mean-field Hamiltonian of dimension {}", self.dimension());
        Ok(())
    }

    pub fn num_sites(&self) -> usize {
        self.num_sites
    }

    pub fn num_flavors(&self) -> usize {
        self.num_flavors
    }

    pub fn spin(&self) -> f64 {
        self.spin
    }

    pub fn dimension(&self) -> usize {
        self.num_sites * self.num_flavors
    }

    /// One particle per site.
    pub fn num_particles(&self) -> usize {
        self.num_sites
    }

    /// Single-particle energies in ascending order.
    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    pub fn orbitals(&self) -> Vec<Orbital> {
        self.energies
            .iter()
            .enumerate()
            .map(|(k, &energy)| Orbital {
                energy,
                amplitudes: self.vectors.column(k).into_owned(),
            })
            .collect()
    }

    /// `dimension x N` matrix of occupied orbitals.
    pub fn occupied_orbitals(&self) -> DMatrix<Complex64> {
        self.vectors.columns(0, self.num_particles()).into_owned()
    }

    /// Energy of the highest occupied level.
    pub fn fermi_level(&self) -> f64 {
        self.energies[self.num_particles() - 1]
    }

    /// Gap between the highest occupied and lowest empty level.
    pub fn gap(&self) -> Option<f64> {
        self.energies
            .get(self.num_particles())
            .map(|e| e - self.fermi_level())
    }

    pub fn jastrow(&self) -> &[SpinJastrow] {
        &self.jastrow
    }

    pub fn num_hopping_params(&self) -> usize {
        self.strengths.len()
    }

    /// First-order change of the occupied orbitals per unit hopping strength,
    /// `dPhi_occ = Phi_empty X` with `X_mn = <m|H_k|n> / (e_n - e_m)`.
    /// Degenerate occupied/empty pairs are skipped.
    pub fn orbital_derivatives(&self) -> Vec<DMatrix<Complex64>> {
        let n = self.num_particles();
        let dim = self.dimension();
        let occupied = self.vectors.columns(0, n).into_owned();
        let empty = self.vectors.columns(n, dim - n).into_owned();
        let mut skipped = 0;
        let derivs = self
            .hoppings
            .iter()
            .map(|hk| {
                let coupling = empty.adjoint() * hk * &occupied;
                let mut x = DMatrix::<Complex64>::zeros(dim - n, n);
                for m in 0..dim - n {
                    for a in 0..n {
                        let gap = self.energies[a] - self.energies[n + m];
                        if gap.abs() < DEGENERACY_TOLERANCE {
                            skipped += 1;
                            continue;
                        }
                        x[(m, a)] = coupling[(m, a)] / gap;
                    }
                }
                &empty * x
            })
            .collect();
        if skipped > 0 {
            warn!(
                "{} degenerate orbital pairs skipped in parameter derivatives",
                skipped
            );
        }
        derivs
    }

    /// One line per level: index, energy and occupation.
    pub fn spectrum_report(&self) -> String {
        self.energies
            .iter()
            .enumerate()
            .map(|(k, e)| {
                let mark = if k < self.num_particles() { "occupied" } else { "empty" };
                format!("{:>4} {:>14.8} {}\n", k, e, mark)
            })
            .collect()
    }

    pub fn print_levels(&self) {
        for line in self.spectrum_report().lines() {
            debug!("level {}", line);
        }
    }

    pub fn print_fermi_level(&self) {
        match self.gap() {
            Some(gap) => info!("Fermi level {:.8}, gap {:.8}", self.fermi_level(), gap),
            None => info!("Fermi level {:.8} (all levels occupied)", self.fermi_level()),
        }
    }
}

impl OptimizableWfn for MeanFieldAnsatz {
    fn num_params(&self) -> usize {
        self.strengths.len() + self.jastrow.iter().map(|j| j.num_params()).sum::<usize>()
    }

    fn get_params(&self) -> Vec<f64> {
        let mut params = self.strengths.clone();
        for j in &self.jastrow {
            params.extend(j.get_params());
        }
        params
    }

    fn set_params(&mut self, params: &[f64]) -> Result<()> {
        if params.len() != self.num_params() {
            return Err(VmcError::config(format!(
                "expected {} variational parameters, got {}",
                self.num_params(),
                params.len()
            )));
        }
        let (hopping, mut rest) = params.split_at(self.strengths.len());
        self.strengths.copy_from_slice(hopping);
        for j in &mut self.jastrow {
            let (mine, tail) = rest.split_at(j.num_params());
            j.set_params(mine)?;
            rest = tail;
        }
        self.diagonalize()
    }
}

/// Every selected displacement of every origin adds `-r_f e^{i theta}` to
/// `H[(i,f),(j,f)]` and its conjugate to the transpose entry, so selecting
/// both directions of a bond doubles it.
fn hopping_matrix(
    term: &HoppingTerm,
    row: &[f64],
    nf: usize,
    match_lattice_pbc: bool,
    lattice: &Lattice,
    index: usize,
) -> Result<DMatrix<Complex64>> {
    let n = lattice.num_sites();
    let shell = lattice.shells().get(term.distance).ok_or_else(|| {
        VmcError::config(format!(
            "wavefunction: hopping term {} uses distance {} but only {} shells exist",
            index,
            term.distance,
            lattice.num_shells()
        ))
    })?;
    let origins: Vec<usize> = if term.origins.is_empty() {
        (0..n).collect()
    } else {
        term.origins.clone()
    };
    if let Some(&bad) = origins.iter().find(|&&o| o >= n) {
        return Err(VmcError::config(format!(
            "wavefunction: hopping term {} origin {} out of range",
            index, bad
        )));
    }
    let selected: Vec<usize> = if term.neighbor_index.is_empty() {
        (0..shell.displacements.len()).collect()
    } else {
        term.neighbor_index.clone()
    };
    if let Some(&bad) = selected.iter().find(|&&k| k >= shell.displacements.len()) {
        return Err(VmcError::config(format!(
            "wavefunction: hopping term {} neighbor index {} out of range",
            index, bad
        )));
    }
    if !term.phases.is_empty() && term.phases.len() != selected.len() {
        return Err(VmcError::config(format!(
            "wavefunction: hopping term {} has {} phases for {} neighbours",
            index,
            term.phases.len(),
            selected.len()
        )));
    }

    let dim = n * nf;
    let mut h = DMatrix::<Complex64>::zeros(dim, dim);
    for &i in &origins {
        for (slot, &k) in selected.iter().enumerate() {
            let Some(bond) = lattice.displace(i, shell.displacements[k]) else {
                continue;
            };
            if bond.site == i {
                continue;
            }
            let theta = term.phases.get(slot).copied().unwrap_or(0.0).to_radians();
            let mut phase = Complex64::from_polar(1.0, theta);
            // Antiperiodic along the first axis.
            if !match_lattice_pbc && bond.winding[0] % 2 != 0 {
                phase = -phase;
            }
            let j = bond.site;
            for (f, &r) in row.iter().enumerate() {
                let amp = phase * (-r);
                h[(i * nf + f, j * nf + f)] += amp;
                h[(j * nf + f, i * nf + f)] += amp.conj();
            }
        }
    }
    Ok(h)
}

fn polar_vector(rtp: [f64; 3], q_theta: [f64; 3], q_phi: [f64; 3], r: &Vector3<f64>) -> Vector3<f64> {
    let [radius, theta0, phi0] = rtp;
    let theta = theta0 + PI * (q_theta[0] * r.x + q_theta[1] * r.y + q_theta[2] * r.z);
    let phi = phi0 + PI * (q_phi[0] * r.x + q_phi[1] * r.y + q_phi[2] * r.z);
    Vector3::new(
        radius * theta.sin() * phi.cos(),
        radius * theta.sin() * phi.sin(),
        radius * theta.cos(),
    )
}

/// `-|d><d|` on every site with `d = u + i v` written in the `S^z` basis.
fn add_directors(
    onsite: &mut DMatrix<Complex64>,
    order: &QuadrupoleOrder,
    inequivalent_sites: Option<usize>,
    lattice: &Lattice,
) -> Result<()> {
    if order.u_polar.is_empty() || order.u_polar.len() != order.v_polar.len() {
        return Err(VmcError::config(
            "wavefunction: directors need matching, non-empty u and v lists",
        ));
    }
    let k = inequivalent_sites.unwrap_or(order.u_polar.len());
    if k != order.u_polar.len() {
        return Err(VmcError::config(format!(
            "wavefunction: {} inequivalent sites but {} directors",
            k,
            order.u_polar.len()
        )));
    }
    let s2 = std::f64::consts::SQRT_2;
    for site in 0..lattice.num_sites() {
        let c = lattice.coords(site);
        let r = Vector3::new(c[0] as f64, c[1] as f64, c[2] as f64);
        let sub = lattice.sublattice(site, k);
        let u = polar_vector(order.u_polar[sub], order.q_theta_u, order.q_phi_u, &r);
        let v = polar_vector(order.v_polar[sub], order.q_theta_v, order.q_phi_v, &r);
        let d: Vec<Complex64> = (0..3).map(|a| Complex64::new(u[a], v[a])).collect();
        let i = Complex64::i();
        let basis = [(-d[0] + i * d[1]) / s2, d[2], (d[0] + i * d[1]) / s2];
        for a in 0..3 {
            for b in 0..3 {
                onsite[(site * 3 + a, site * 3 + b)] -= basis[a] * basis[b].conj();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::JastrowOptions;
    use approx::assert_relative_eq;

    fn chain(l: i64, periodic: bool) -> Lattice {
        Lattice::new(LatticeType::Chain, [l, 1, 1], [periodic, false, false]).unwrap()
    }

    fn options(spin: f64, terms: Vec<HoppingTerm>) -> MeanFieldOptions {
        MeanFieldOptions {
            lattice_type: "chain".into(),
            wf_type: "meanfield".into(),
            basis: None,
            inequivalent_sites: None,
            spin,
            field: 0.0,
            num_spin_orbit: (2.0 * spin) as usize + 1,
            match_lattice_pbc: true,
            su3_symmetry: true,
            hopping_list: terms,
            directors: None,
            jastrow: None,
        }
    }

    fn nn(strength: f64) -> HoppingTerm {
        HoppingTerm {
            spin_row: vec![],
            strength,
            distance: 0,
            origins: vec![],
            neighbor_index: vec![],
            phases: vec![],
        }
    }

    #[test]
    fn test_ring_spectrum() {
        // Periodic 4-site ring, one flavor. Both displacements of the shell
        // are summed, so every bond carries -2t: -4t cos(k).
        let lat = chain(4, true);
        let ansatz = MeanFieldAnsatz::new(&options(0.0, vec![nn(1.0)]), &lat).unwrap();
        let e = ansatz.energies();
        assert_relative_eq!(e[0], -4.0, epsilon = 1e-10);
        assert_relative_eq!(e[1], 0.0, epsilon = 1e-10);
        assert_relative_eq!(e[2], 0.0, epsilon = 1e-10);
        assert_relative_eq!(e[3], 4.0, epsilon = 1e-10);
        assert_eq!(ansatz.occupied_orbitals().shape(), (4, 4));
        let report = ansatz.spectrum_report();
        assert_eq!(report.lines().count(), 4);
        assert!(report.lines().next().unwrap().ends_with("occupied"));
    }

    #[test]
    fn test_hamiltonian_is_hermitian_with_phases() {
        let lat = Lattice::new(LatticeType::Triangular, [3, 3, 1], [true, true, false]).unwrap();
        let mut term = nn(1.0);
        term.phases = vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0];
        let mut opts = options(1.0, vec![term]);
        opts.lattice_type = "triangular".into();
        opts.field = 0.2;
        let ansatz = MeanFieldAnsatz::new(&opts, &lat).unwrap();
        let h = ansatz.hamiltonian();
        assert_relative_eq!((h.adjoint() - &h).norm(), 0.0, epsilon = 1e-12);
        // Orbitals are eigenvectors.
        for orb in ansatz.orbitals() {
            let residual = &h * &orb.amplitudes - &orb.amplitudes * Complex64::new(orb.energy, 0.0);
            assert!(residual.norm() < 1e-8);
        }
    }

    #[test]
    fn test_antiperiodic_boundary() {
        // Antiperiodic 4-site ring: -4t cos(k) with k = +-pi/4, +-3pi/4.
        let lat = chain(4, true);
        let mut opts = options(0.0, vec![nn(1.0)]);
        opts.match_lattice_pbc = false;
        let ansatz = MeanFieldAnsatz::new(&opts, &lat).unwrap();
        let c = 4.0 * (PI / 4.0).cos();
        assert_relative_eq!(ansatz.energies()[0], -c, epsilon = 1e-10);
        assert_relative_eq!(ansatz.energies()[3], c, epsilon = 1e-10);
    }

    #[test]
    fn test_field_orders_flavors() {
        // No hopping: the field alone orders the flavors, S^z = +1 lowest.
        let lat = chain(3, false);
        let mut opts = options(1.0, vec![]);
        opts.field = 1.0;
        let ansatz = MeanFieldAnsatz::new(&opts, &lat).unwrap();
        assert_relative_eq!(ansatz.energies()[0], -1.0);
        assert_relative_eq!(ansatz.fermi_level(), -1.0);
        assert_relative_eq!(ansatz.gap().unwrap(), 1.0);
        let occ = ansatz.occupied_orbitals();
        for col in 0..3 {
            for site in 0..3 {
                for f in 1..3 {
                    assert_relative_eq!(occ[(site * 3 + f, col)].norm(), 0.0);
                }
            }
        }
    }

    #[test]
    fn test_rejects_bad_options() {
        let lat = chain(4, true);
        let mut opts = options(1.0, vec![nn(1.0)]);
        opts.num_spin_orbit = 2;
        assert!(MeanFieldAnsatz::new(&opts, &lat).is_err());

        let mut opts = options(1.0, vec![nn(1.0)]);
        opts.wf_type = "bcs".into();
        assert!(MeanFieldAnsatz::new(&opts, &lat).is_err());

        let mut far = nn(1.0);
        far.distance = 7;
        assert!(MeanFieldAnsatz::new(&options(1.0, vec![far]), &lat).is_err());

        let mut opts = options(0.5, vec![nn(1.0)]);
        opts.su3_symmetry = false;
        opts.hopping_list[0].spin_row = vec![1.0];
        assert!(MeanFieldAnsatz::new(&opts, &lat).is_err());
    }

    #[test]
    fn test_directors_project_onto_polarisation() {
        // u along z, v = 0: the |S^z = 0> state is lowered by |d|^2 = 1.
        let lat = chain(2, false);
        let mut opts = options(1.0, vec![]);
        opts.directors = Some(QuadrupoleOrder {
            u_polar: vec![[1.0, 0.0, 0.0]],
            v_polar: vec![[0.0, 0.0, 0.0]],
            q_theta_u: [0.0; 3],
            q_phi_u: [0.0; 3],
            q_theta_v: [0.0; 3],
            q_phi_v: [0.0; 3],
        });
        let ansatz = MeanFieldAnsatz::new(&opts, &lat).unwrap();
        assert_relative_eq!(ansatz.energies()[0], -1.0, epsilon = 1e-12);
        assert_relative_eq!(ansatz.energies()[1], -1.0, epsilon = 1e-12);
        let occ = ansatz.occupied_orbitals();
        let weight: f64 = (0..2).map(|c| occ[(1, c)].norm_sqr() + occ[(4, c)].norm_sqr()).sum();
        assert_relative_eq!(weight, 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_set_params_rediagonalises() {
        let lat = chain(4, true);
        let mut opts = options(0.5, vec![nn(1.0)]);
        opts.jastrow = Some(JastrowOptions {
            density: None,
            sz: Some(crate::io::JastrowFactorOptions {
                isotropic: true,
                distance_max: 1,
                values: vec![0.2],
            }),
            sz2: None,
        });
        let mut ansatz = MeanFieldAnsatz::new(&opts, &lat).unwrap();
        assert_eq!(ansatz.num_params(), 2);
        assert_eq!(ansatz.get_params(), vec![1.0, 0.2]);
        ansatz.set_params(&[2.0, 0.1]).unwrap();
        assert_relative_eq!(ansatz.energies()[0], -8.0, epsilon = 1e-10);
        assert_eq!(ansatz.jastrow()[0].get_params(), vec![0.1]);
        assert!(ansatz.set_params(&[1.0]).is_err());
    }

    #[test]
    fn test_orbital_derivatives_match_first_order_change() {
        // The projector onto the occupied space moves by dP = dPhi Phi^+ + h.c.
        let lat = chain(6, false);
        let mut t2 = nn(0.3);
        t2.distance = 1;
        let mut opts = options(0.5, vec![nn(1.0), t2]);
        opts.field = 0.37;
        let ansatz = MeanFieldAnsatz::new(&opts, &lat).unwrap();
        let derivs = ansatz.orbital_derivatives();
        let occ = ansatz.occupied_orbitals();
        let proj = |a: &MeanFieldAnsatz| {
            let o = a.occupied_orbitals();
            &o * o.adjoint()
        };
        let h = 1e-6;
        for k in 0..2 {
            let mut plus = ansatz.clone();
            let mut params = plus.get_params();
            params[k] += h;
            plus.set_params(&params).unwrap();
            let numeric = (proj(&plus) - proj(&ansatz)) / Complex64::new(h, 0.0);
            let analytic = &derivs[k] * occ.adjoint() + &occ * derivs[k].adjoint();
            assert!((numeric - analytic).norm() < 1e-4);
        }
    }
}
