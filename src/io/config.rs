//! Input options and their loading from JSON or YAML.
//!
//! Key names follow the input-file format, e.g.
//!
//! ```text
//! { "lattice": { "type": "triangular", "dimension": 2, "L": [6, 6, 1], "pbc": [1, 1, 0] },
//!   "wavefunction": { "lattice type": "triangular", "wavefunction type": "meanfield", ... },
//!   "model": { "type": "su3", "bilinear": [...], "trilinear": [...] },
//!   "vmc": { "measures": 1000, "steps": 10, "throwaway": 500 } }
//! ```

use std::path::Path;

use num_complex::Complex64;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, VmcError};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LatticeOptions {
    #[serde(rename = "type")]
    pub lattice_type: String,
    pub dimension: usize,
    #[serde(rename = "L")]
    pub extent: Vec<i64>,
    pub pbc: Vec<i64>,
}

/// One hopping channel of the mean-field Hamiltonian.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HoppingTerm {
    /// Per-flavor multiplier of the hopping amplitude.
    #[serde(rename = "spin row")]
    pub spin_row: Vec<f64>,
    pub strength: f64,
    /// Neighbour shell index.
    pub distance: usize,
    /// Sites the bonds start from; empty means every site.
    #[serde(default)]
    pub origins: Vec<usize>,
    /// Displacements of the shell to use; empty means all of them.
    #[serde(rename = "neighbor index", default)]
    pub neighbor_index: Vec<usize>,
    /// Bond phases in degrees, one per selected displacement; empty means zero.
    #[serde(default)]
    pub phases: Vec<f64>,
}

/// Spin-1 quadrupolar (director) order: `d = u + i v` per sublattice,
/// `(r, theta, phi)` angles modulated by `pi * Q . R`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QuadrupoleOrder {
    #[serde(rename = "u_r_theta_phi")]
    pub u_polar: Vec<[f64; 3]>,
    #[serde(rename = "v_r_theta_phi")]
    pub v_polar: Vec<[f64; 3]>,
    #[serde(rename = "Qthetau")]
    pub q_theta_u: [f64; 3],
    #[serde(rename = "Qphiu")]
    pub q_phi_u: [f64; 3],
    #[serde(rename = "Qthetav")]
    pub q_theta_v: [f64; 3],
    #[serde(rename = "Qphiv")]
    pub q_phi_v: [f64; 3],
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JastrowFactorOptions {
    pub isotropic: bool,
    /// Number of neighbour shells coupled.
    pub distance_max: usize,
    pub values: Vec<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DensityJastrowOptions {
    pub strength: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct JastrowOptions {
    pub density: Option<DensityJastrowOptions>,
    pub sz: Option<JastrowFactorOptions>,
    pub sz2: Option<JastrowFactorOptions>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MeanFieldOptions {
    #[serde(rename = "lattice type")]
    pub lattice_type: String,
    #[serde(rename = "wavefunction type")]
    pub wf_type: String,
    #[serde(default)]
    pub basis: Option<Vec<[i64; 3]>>,
    #[serde(rename = "inequivalent sites", default)]
    pub inequivalent_sites: Option<usize>,
    pub spin: f64,
    pub field: f64,
    #[serde(rename = "num spin-orbit")]
    pub num_spin_orbit: usize,
    #[serde(rename = "match lattice pbc")]
    pub match_lattice_pbc: bool,
    pub su3_symmetry: bool,
    #[serde(rename = "hopping terms")]
    pub hopping_list: Vec<HoppingTerm>,
    #[serde(default)]
    pub directors: Option<QuadrupoleOrder>,
    #[serde(default)]
    pub jastrow: Option<JastrowOptions>,
}

/// A coupling written either as a number or as `[re, im]`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum CouplingValue {
    Real(f64),
    Complex([f64; 2]),
}

impl CouplingValue {
    pub fn value(&self) -> Complex64 {
        match *self {
            CouplingValue::Real(x) => Complex64::new(x, 0.0),
            CouplingValue::Complex([re, im]) => Complex64::new(re, im),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BilinearOptions {
    #[serde(rename = "type")]
    pub interaction_type: String,
    pub coupling: CouplingValue,
    pub neighbor_index: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrilinearOptions {
    #[serde(rename = "type")]
    pub interaction_type: String,
    pub hermitian: bool,
    pub coupling_real: f64,
    pub coupling_imag: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelOptions {
    /// `su3` or `blbq`
    #[serde(rename = "type")]
    pub model_type: String,
    #[serde(default)]
    pub single_ion: Option<f64>,
    #[serde(rename = "bilinear", default)]
    pub bilinear_terms: Vec<BilinearOptions>,
    #[serde(rename = "trilinear", default)]
    pub ring3_terms: Vec<TrilinearOptions>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SrOptions {
    /// Number of optimisation epochs.
    pub bins: usize,
    pub timestep: f64,
}

fn default_true() -> bool {
    true
}

fn default_refresh_interval() -> usize {
    100
}

fn default_error_bins() -> usize {
    20
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VmcOptions {
    #[serde(default)]
    pub optimization: bool,
    #[serde(rename = "SR", default)]
    pub sr: Option<SrOptions>,
    /// Flavor-permutation moves only; `false` also resamples S^z-conserving pairs.
    #[serde(default = "default_true")]
    pub su3: bool,
    #[serde(rename = "measures")]
    pub num_measures: usize,
    #[serde(rename = "steps")]
    pub steps_per_measure: usize,
    #[serde(rename = "throwaway")]
    pub throwaway_measures: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    /// Steps between full recomputations of the determinant.
    #[serde(rename = "refresh interval", default = "default_refresh_interval")]
    pub refresh_interval: usize,
    /// Number of statistical bins for error estimation.
    #[serde(rename = "error bins", default = "default_error_bins")]
    pub error_bins: usize,
}

impl VmcOptions {
    pub fn new(num_measures: usize, steps_per_measure: usize, throwaway_measures: usize) -> Self {
        Self {
            optimization: false,
            sr: None,
            su3: true,
            num_measures,
            steps_per_measure,
            throwaway_measures,
            seed: None,
            refresh_interval: default_refresh_interval(),
            error_bins: default_error_bins(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_optimization(mut self, bins: usize, timestep: f64) -> Self {
        self.optimization = true;
        self.sr = Some(SrOptions { bins, timestep });
        self
    }

    pub fn with_su3(mut self, su3: bool) -> Self {
        self.su3 = su3;
        self
    }

    pub fn with_refresh_interval(mut self, n: usize) -> Self {
        self.refresh_interval = n;
        self
    }

    pub fn with_error_bins(mut self, n: usize) -> Self {
        self.error_bins = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.optimization && self.sr.is_none() {
            return Err(VmcError::config("vmc: missing field `SR` (required when optimization is true)"));
        }
        if self.steps_per_measure == 0 {
            return Err(VmcError::config("vmc.steps must be at least 1"));
        }
        if self.refresh_interval == 0 {
            return Err(VmcError::config("vmc.refresh interval must be at least 1"));
        }
        if self.error_bins < 2 {
            return Err(VmcError::config("vmc.error bins must be at least 2"));
        }
        Ok(())
    }
}

/// All four option blocks of an input file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InputOptions {
    pub lattice: LatticeOptions,
    pub wavefunction: MeanFieldOptions,
    pub model: ModelOptions,
    pub vmc: VmcOptions,
}

/// Read an input file. `.yml`/`.yaml` files are parsed as YAML, anything
/// else as JSON.
pub fn read_input(path: &Path) -> Result<InputOptions> {
    let text = std::fs::read_to_string(path)?;
    let value: Value = match path.extension().and_then(|e| e.to_str()) {
        Some("yml") | Some("yaml") => serde_yaml::from_str(&text)?,
        _ => serde_json::from_str(&text)?,
    };
    parse_input(&value)
}

pub fn parse_input(root: &Value) -> Result<InputOptions> {
    let vmc: VmcOptions = read_block(root, "vmc")?;
    vmc.validate()?;
    Ok(InputOptions {
        lattice: read_block(root, "lattice")?,
        wavefunction: read_block(root, "wavefunction")?,
        model: read_block(root, "model")?,
        vmc,
    })
}

/// Deserialize one top-level block, prefixing errors with the block name so
/// a missing key reads e.g. ``lattice: missing field `L` ``.
pub fn read_block<T: DeserializeOwned>(root: &Value, key: &str) -> Result<T> {
    let block = root
        .get(key)
        .ok_or_else(|| VmcError::config(format!("missing field `{}`", key)))?;
    T::deserialize(block).map_err(|e| VmcError::config(format!("{}: {}", key, e)))
}
