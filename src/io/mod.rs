//! IO module - input options and output files.

mod config;
mod output;

pub use config::{
    parse_input, read_block, read_input, BilinearOptions, CouplingValue, DensityJastrowOptions,
    HoppingTerm, InputOptions, JastrowFactorOptions, JastrowOptions, LatticeOptions,
    MeanFieldOptions, ModelOptions, QuadrupoleOrder, SrOptions, TrilinearOptions, VmcOptions,
};
pub use output::{results_path, write_lattice_reports, write_results, write_results_csv};
