use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use spin_vmc::io::{read_input, results_path, write_results_csv};
use spin_vmc::timing::Profiler;
use spin_vmc::{run_mc, Result};

#[derive(Parser, Debug)]
#[command(version, about = "Variational Monte Carlo for projected lattice spin wavefunctions", long_about = None)]
struct Args {
    /// Input file (JSON, or YAML with a .yml/.yaml extension)
    input: PathBuf,

    /// Label of the results file, `<results-dir>/<label>.csv`
    label: Option<String>,

    #[arg(long, default_value = "results")]
    results_dir: PathBuf,

    /// Where neighbors.txt and rings.txt are written
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Overrides `vmc.seed` of the input file
    #[arg(long)]
    seed: Option<u64>,

    #[arg(short, long)]
    verbose: bool,
}

fn run(args: &Args) -> Result<()> {
    let mut options = read_input(&args.input)?;
    if args.seed.is_some() {
        options.vmc.seed = args.seed;
    }

    let mut profiler = Profiler::new();
    let results = run_mc(&options, Some(&args.data_dir), &mut profiler)?;

    info!(
        "E = {:.8} +- {:.8} (imag {:.3e})",
        results.energy.re, results.energy_err.re, results.energy.im
    );
    for obs in &results.observables {
        info!("<{}> = {:.8} +- {:.8}", obs.name, obs.value.re, obs.error.re);
    }
    let path = results_path(&args.results_dir, args.label.as_deref());
    write_results_csv(&path, &results)?;
    profiler.print_timers();
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
