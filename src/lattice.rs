//! Lattice geometry: sites, periodic boundaries, neighbour shells and rings.
//!
//! Sites are indexed `x + Lx * (y + Ly * z)`. Neighbour shells are groups of
//! displacement vectors with a common Euclidean length, ordered by distance;
//! every site sees the same displacements in the same order, so neighbour
//! lists of different sites line up index by index.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use nalgebra::{Matrix3, Vector3};

use crate::error::{Result, VmcError};
use crate::io::LatticeOptions;

/// Number of neighbour shells tabulated for every site.
pub const MAX_SHELLS: usize = 3;

/// Largest integer coefficient searched when enumerating displacements.
const SHELL_RANGE: i32 = 3;

const DISTANCE_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatticeType {
    Chain,
    Square,
    Triangular,
    Cubic,
}

impl LatticeType {
    pub fn dimension(&self) -> usize {
        match self {
            LatticeType::Chain => 1,
            LatticeType::Square | LatticeType::Triangular => 2,
            LatticeType::Cubic => 3,
        }
    }

    /// Primitive vectors as the columns of a 3x3 matrix.
    pub fn primitive_vectors(&self) -> Matrix3<f64> {
        match self {
            LatticeType::Chain | LatticeType::Square | LatticeType::Cubic => Matrix3::identity(),
            LatticeType::Triangular => Matrix3::new(
                1.0, 0.5, 0.0,
                0.0, 3f64.sqrt() / 2.0, 0.0,
                0.0, 0.0, 1.0,
            ),
        }
    }

    /// Integer vector `c` such that `c . R mod k` colours nearest neighbours
    /// differently for k = 2 (bipartite lattices) and k = 3 (triangular).
    fn colouring(&self) -> [i64; 3] {
        match self {
            LatticeType::Triangular => [1, -1, 0],
            _ => [1, 1, 1],
        }
    }
}

impl FromStr for LatticeType {
    type Err = VmcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chain" | "1d" => Ok(LatticeType::Chain),
            "square" => Ok(LatticeType::Square),
            "triangle" | "triangular" => Ok(LatticeType::Triangular),
            "cubic" => Ok(LatticeType::Cubic),
            other => Err(VmcError::config(format!("unknown lattice type '{}'", other))),
        }
    }
}

impl fmt::Display for LatticeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LatticeType::Chain => "chain",
            LatticeType::Square => "square",
            LatticeType::Triangular => "triangular",
            LatticeType::Cubic => "cubic",
        };
        write!(f, "{}", name)
    }
}

/// Displacements sharing one distance.
#[derive(Debug, Clone)]
pub struct NeighborShell {
    pub distance: f64,
    pub displacements: Vec<[i32; 3]>,
}

/// A directed bond to `site`, with the number of times it wraps each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bond {
    pub site: usize,
    pub winding: [i32; 3],
}

/// Ordered list of three-site rings, each in counter-clockwise order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingList {
    rings: Vec<[usize; 3]>,
}

impl RingList {
    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[usize; 3]> {
        self.rings.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize; 3]> {
        self.rings.iter()
    }
}

#[derive(Debug, Clone)]
pub struct Lattice {
    lattice_type: LatticeType,
    extent: [usize; 3],
    pbc: [bool; 3],
    shells: Vec<NeighborShell>,
    /// `neighbors[site][shell]`
    neighbors: Vec<Vec<Vec<Bond>>>,
    rings: RingList,
}

impl Lattice {
    pub fn new(lattice_type: LatticeType, extent: [i64; 3], pbc: [bool; 3]) -> Result<Self> {
        for (axis, &l) in extent.iter().enumerate() {
            if l < 1 {
                return Err(VmcError::config(format!(
                    "lattice extent along axis {} must be positive, got {}",
                    axis, l
                )));
            }
            if axis >= lattice_type.dimension() && l != 1 {
                return Err(VmcError::config(format!(
                    "{} lattice is {}-dimensional but extent along axis {} is {}",
                    lattice_type,
                    lattice_type.dimension(),
                    axis,
                    l
                )));
            }
        }
        let extent = [extent[0] as usize, extent[1] as usize, extent[2] as usize];

        let mut lattice = Self {
            lattice_type,
            extent,
            pbc,
            shells: enumerate_shells(lattice_type),
            neighbors: Vec::new(),
            rings: RingList::default(),
        };
        lattice.neighbors = (0..lattice.num_sites())
            .map(|site| lattice.build_neighbors(site))
            .collect();
        lattice.rings = lattice.build_rings();
        Ok(lattice)
    }

    pub fn from_options(options: &LatticeOptions) -> Result<Self> {
        let lattice_type: LatticeType = options.lattice_type.parse()?;
        if options.dimension != lattice_type.dimension() {
            return Err(VmcError::config(format!(
                "lattice.dimension is {} but a {} lattice is {}-dimensional",
                options.dimension,
                lattice_type,
                lattice_type.dimension()
            )));
        }
        if options.extent.len() != 3 || options.pbc.len() != 3 {
            return Err(VmcError::config("lattice.L and lattice.pbc must have three entries"));
        }
        let extent = [options.extent[0], options.extent[1], options.extent[2]];
        let pbc = [options.pbc[0] != 0, options.pbc[1] != 0, options.pbc[2] != 0];
        Self::new(lattice_type, extent, pbc)
    }

    pub fn lattice_type(&self) -> LatticeType {
        self.lattice_type
    }

    pub fn extent(&self) -> [usize; 3] {
        self.extent
    }

    pub fn pbc(&self) -> [bool; 3] {
        self.pbc
    }

    pub fn num_sites(&self) -> usize {
        self.extent.iter().product()
    }

    pub fn num_shells(&self) -> usize {
        self.shells.len()
    }

    pub fn shells(&self) -> &[NeighborShell] {
        &self.shells
    }

    pub fn coords(&self, site: usize) -> [usize; 3] {
        let [lx, ly, _] = self.extent;
        [site % lx, (site / lx) % ly, site / (lx * ly)]
    }

    pub fn index(&self, coords: [usize; 3]) -> usize {
        let [lx, ly, _] = self.extent;
        coords[0] + lx * (coords[1] + ly * coords[2])
    }

    /// Real-space position of a site.
    pub fn position(&self, site: usize) -> Vector3<f64> {
        let c = self.coords(site);
        self.lattice_type.primitive_vectors()
            * Vector3::new(c[0] as f64, c[1] as f64, c[2] as f64)
    }

    /// Move from `site` by an integer displacement. `None` when the move
    /// leaves an open boundary.
    pub fn displace(&self, site: usize, d: [i32; 3]) -> Option<Bond> {
        let c = self.coords(site);
        let mut target = [0usize; 3];
        let mut winding = [0i32; 3];
        for axis in 0..3 {
            let l = self.extent[axis] as i64;
            let t = c[axis] as i64 + d[axis] as i64;
            if (t < 0 || t >= l) && !self.pbc[axis] {
                return None;
            }
            winding[axis] = t.div_euclid(l) as i32;
            target[axis] = t.rem_euclid(l) as usize;
        }
        Some(Bond { site: self.index(target), winding })
    }

    /// Neighbour sites of `site` in shell `shell`, in displacement order.
    pub fn neighbors(&self, site: usize, shell: usize) -> Vec<usize> {
        self.bonds(site, shell).iter().map(|b| b.site).collect()
    }

    pub fn bonds(&self, site: usize, shell: usize) -> &[Bond] {
        self.neighbors
            .get(site)
            .and_then(|s| s.get(shell))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Number of bonds of site 0 in every shell.
    pub fn neighbor_counts(&self) -> Vec<usize> {
        (0..self.shells.len()).map(|s| self.bonds(0, s).len()).collect()
    }

    pub fn rings(&self) -> &RingList {
        &self.rings
    }

    /// Index in `[0, k)` that differs between nearest neighbours for the
    /// natural two- (bipartite) or three-colouring of the lattice.
    pub fn sublattice(&self, site: usize, k: usize) -> usize {
        if k <= 1 {
            return 0;
        }
        let c = self.coords(site);
        let w = self.lattice_type.colouring();
        let s: i64 = (0..3).map(|a| w[a] * c[a] as i64).sum();
        s.rem_euclid(k as i64) as usize
    }

    fn build_neighbors(&self, site: usize) -> Vec<Vec<Bond>> {
        self.shells
            .iter()
            .map(|shell| {
                shell
                    .displacements
                    .iter()
                    .filter_map(|&d| self.displace(site, d))
                    .filter(|b| b.site != site)
                    .collect()
            })
            .collect()
    }

    fn build_rings(&self) -> RingList {
        let mut rings = Vec::new();
        if self.lattice_type != LatticeType::Triangular {
            return RingList { rings };
        }
        // up triangle (r, r+a1, r+a2) and down triangle (r+a1, r+a1+a2, r+a2)
        let patterns: [[[i32; 3]; 3]; 2] = [
            [[0, 0, 0], [1, 0, 0], [0, 1, 0]],
            [[1, 0, 0], [1, 1, 0], [0, 1, 0]],
        ];
        let mut seen = BTreeSet::new();
        for site in 0..self.num_sites() {
            for pattern in patterns.iter() {
                let corners: Option<Vec<usize>> = pattern
                    .iter()
                    .map(|&d| self.displace(site, d).map(|b| b.site))
                    .collect();
                let Some(corners) = corners else { continue };
                let ring = [corners[0], corners[1], corners[2]];
                if ring[0] == ring[1] || ring[1] == ring[2] || ring[0] == ring[2] {
                    continue;
                }
                let mut key = ring;
                key.sort_unstable();
                if seen.insert(key) {
                    rings.push(ring);
                }
            }
        }
        RingList { rings }
    }

    pub fn write_neighbors<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "# {} lattice, L = {:?}, pbc = {:?}", self.lattice_type, self.extent, self.pbc)?;
        for (k, shell) in self.shells.iter().enumerate() {
            writeln!(out, "# shell {}: distance {:.6}", k, shell.distance)?;
        }
        for site in 0..self.num_sites() {
            for shell in 0..self.shells.len() {
                let list: Vec<String> = self.neighbors(site, shell).iter().map(|s| s.to_string()).collect();
                writeln!(out, "{} {} : {}", site, shell, list.join(" "))?;
            }
        }
        Ok(())
    }

    pub fn write_rings<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "# {} rings", self.rings.len())?;
        for (k, r) in self.rings.iter().enumerate() {
            writeln!(out, "{} : {} {} {}", k, r[0], r[1], r[2])?;
        }
        Ok(())
    }
}

fn enumerate_shells(lattice_type: LatticeType) -> Vec<NeighborShell> {
    let a = lattice_type.primitive_vectors();
    let dim = lattice_type.dimension();
    let range = |axis: usize| if axis < dim { SHELL_RANGE } else { 0 };

    let mut candidates: Vec<([i32; 3], f64)> = Vec::new();
    for n0 in -range(0)..=range(0) {
        for n1 in -range(1)..=range(1) {
            for n2 in -range(2)..=range(2) {
                if n0 == 0 && n1 == 0 && n2 == 0 {
                    continue;
                }
                let r = a * Vector3::new(n0 as f64, n1 as f64, n2 as f64);
                candidates.push(([n0, n1, n2], r.norm()));
            }
        }
    }
    candidates.sort_by(|x, y| x.1.partial_cmp(&y.1).unwrap_or(Ordering::Equal));

    let mut shells: Vec<NeighborShell> = Vec::new();
    for (d, dist) in candidates {
        match shells.last_mut() {
            Some(shell) if (shell.distance - dist).abs() < DISTANCE_TOLERANCE => {
                shell.displacements.push(d)
            }
            _ => {
                if shells.len() == MAX_SHELLS {
                    break;
                }
                shells.push(NeighborShell { distance: dist, displacements: vec![d] });
            }
        }
    }
    for shell in shells.iter_mut() {
        shell.displacements.sort();
    }
    shells
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn all_lattices() -> Vec<Lattice> {
        vec![
            Lattice::new(LatticeType::Chain, [6, 1, 1], [true, false, false]).unwrap(),
            Lattice::new(LatticeType::Chain, [5, 1, 1], [false, false, false]).unwrap(),
            Lattice::new(LatticeType::Square, [4, 3, 1], [true, true, false]).unwrap(),
            Lattice::new(LatticeType::Square, [2, 2, 1], [true, true, false]).unwrap(),
            Lattice::new(LatticeType::Square, [3, 3, 1], [true, false, false]).unwrap(),
            Lattice::new(LatticeType::Triangular, [3, 3, 1], [true, true, false]).unwrap(),
            Lattice::new(LatticeType::Triangular, [4, 2, 1], [false, true, false]).unwrap(),
            Lattice::new(LatticeType::Cubic, [3, 3, 2], [true, true, true]).unwrap(),
        ]
    }

    #[test]
    fn test_coordination_numbers() {
        let sq = Lattice::new(LatticeType::Square, [6, 6, 1], [true, true, false]).unwrap();
        assert_eq!(sq.neighbor_counts(), vec![4, 4, 4]);
        let tri = Lattice::new(LatticeType::Triangular, [6, 6, 1], [true, true, false]).unwrap();
        assert_eq!(tri.neighbor_counts(), vec![6, 6, 6]);
        let cub = Lattice::new(LatticeType::Cubic, [5, 5, 5], [true, true, true]).unwrap();
        assert_eq!(cub.neighbor_counts(), vec![6, 12, 8]);
        let chain = Lattice::new(LatticeType::Chain, [8, 1, 1], [true, false, false]).unwrap();
        assert_eq!(chain.neighbor_counts(), vec![2, 2, 2]);
    }

    #[test]
    fn test_shell_distances() {
        let sq = Lattice::new(LatticeType::Square, [6, 6, 1], [true, true, false]).unwrap();
        assert_relative_eq!(sq.shells()[0].distance, 1.0, epsilon = 1e-12);
        assert_relative_eq!(sq.shells()[1].distance, 2f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(sq.shells()[2].distance, 2.0, epsilon = 1e-12);
        let tri = Lattice::new(LatticeType::Triangular, [6, 6, 1], [true, true, false]).unwrap();
        assert_relative_eq!(tri.shells()[1].distance, 3f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_neighbors_are_symmetric() {
        for lattice in all_lattices() {
            for shell in 0..lattice.num_shells() {
                for a in 0..lattice.num_sites() {
                    for b in lattice.neighbors(a, shell) {
                        let forward = lattice.neighbors(a, shell).iter().filter(|&&x| x == b).count();
                        let backward = lattice.neighbors(b, shell).iter().filter(|&&x| x == a).count();
                        assert_eq!(
                            forward, backward,
                            "{} lattice shell {}: {} -> {} not mirrored",
                            lattice.lattice_type(), shell, a, b
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_open_chain_ends() {
        let chain = Lattice::new(LatticeType::Chain, [5, 1, 1], [false, false, false]).unwrap();
        assert_eq!(chain.neighbors(0, 0), vec![1]);
        assert_eq!(chain.neighbors(2, 0), vec![1, 3]);
        assert_eq!(chain.neighbors(4, 0), vec![3]);
    }

    #[test]
    fn test_winding_recorded() {
        let chain = Lattice::new(LatticeType::Chain, [4, 1, 1], [true, false, false]).unwrap();
        let bonds = chain.bonds(3, 0);
        let wrapped = bonds.iter().find(|b| b.site == 0).unwrap();
        assert_eq!(wrapped.winding, [1, 0, 0]);
        let bonds = chain.bonds(0, 0);
        let wrapped = bonds.iter().find(|b| b.site == 3).unwrap();
        assert_eq!(wrapped.winding, [-1, 0, 0]);
    }

    #[test]
    fn test_ring_count_triangular() {
        let tri = Lattice::new(LatticeType::Triangular, [3, 3, 1], [true, true, false]).unwrap();
        assert_eq!(tri.rings().len(), 2 * tri.num_sites());
        let open = Lattice::new(LatticeType::Triangular, [3, 3, 1], [false, false, false]).unwrap();
        assert_eq!(open.rings().len(), 2 * 2 * 2);
        let sq = Lattice::new(LatticeType::Square, [4, 4, 1], [true, true, false]).unwrap();
        assert!(sq.rings().is_empty());
    }

    #[test]
    fn test_rings_are_triangles_of_nearest_neighbors() {
        let tri = Lattice::new(LatticeType::Triangular, [4, 4, 1], [true, true, false]).unwrap();
        for ring in tri.rings().iter() {
            for k in 0..3 {
                let (a, b) = (ring[k], ring[(k + 1) % 3]);
                assert!(tri.neighbors(a, 0).contains(&b));
            }
        }
    }

    #[test]
    fn test_ring_enumeration_is_deterministic() {
        let a = Lattice::new(LatticeType::Triangular, [4, 3, 1], [true, true, false]).unwrap();
        let b = Lattice::new(LatticeType::Triangular, [4, 3, 1], [true, true, false]).unwrap();
        assert_eq!(a.rings(), b.rings());
        let mut keys: Vec<[usize; 3]> = a
            .rings()
            .iter()
            .map(|r| {
                let mut k = *r;
                k.sort_unstable();
                k
            })
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), a.rings().len());
    }

    #[test]
    fn test_zero_extent_rejected() {
        let err = Lattice::new(LatticeType::Square, [0, 0, 0], [true, true, true]).unwrap_err();
        assert!(matches!(err, VmcError::Configuration(_)));
        let err = Lattice::new(LatticeType::Chain, [4, 2, 1], [true, true, true]).unwrap_err();
        assert!(matches!(err, VmcError::Configuration(_)));
        assert!("hexagonal".parse::<LatticeType>().is_err());
    }

    #[test]
    fn test_sublattice_colouring() {
        let tri = Lattice::new(LatticeType::Triangular, [6, 6, 1], [true, true, false]).unwrap();
        let sq = Lattice::new(LatticeType::Square, [4, 4, 1], [true, true, false]).unwrap();
        for (lattice, k) in [(&tri, 3), (&sq, 2)] {
            for a in 0..lattice.num_sites() {
                for b in lattice.neighbors(a, 0) {
                    assert_ne!(lattice.sublattice(a, k), lattice.sublattice(b, k));
                }
            }
        }
    }

    #[test]
    fn test_reports() {
        let tri = Lattice::new(LatticeType::Triangular, [2, 2, 1], [true, true, false]).unwrap();
        let mut buf = Vec::new();
        tri.write_neighbors(&mut buf).unwrap();
        tri.write_rings(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("0 0 :"));
        assert!(text.contains(&format!("# {} rings", tri.rings().len())));
    }
}
