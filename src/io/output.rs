//! Result tables and lattice reports.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::Result;
use crate::lattice::Lattice;
use crate::sampling::VmcResults;

/// `<dir>/<label>.csv`, or `<dir>/observables.csv` without a label.
pub fn results_path(dir: &Path, label: Option<&str>) -> PathBuf {
    dir.join(format!("{}.csv", label.unwrap_or("observables")))
}

/// Write the results table: a header row `,E,E_err,<J>,<J>_err,...`, where
/// every observable name is wrapped in angle brackets, followed by a `real`
/// and an `imag` row.
pub fn write_results<W: std::io::Write>(out: W, results: &VmcResults) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    let mut header = vec![String::new(), "E".to_string(), "E_err".to_string()];
    for obs in &results.observables {
        header.push(format!("<{}>", obs.name));
        header.push(format!("<{}>_err", obs.name));
    }
    writer.write_record(&header)?;

    let row = |label: &str, part: fn(&num_complex::Complex64) -> f64| {
        let mut record = vec![
            label.to_string(),
            part(&results.energy).to_string(),
            part(&results.energy_err).to_string(),
        ];
        for obs in &results.observables {
            record.push(part(&obs.value).to_string());
            record.push(part(&obs.error).to_string());
        }
        record
    };
    writer.write_record(&row("real", |z| z.re))?;
    writer.write_record(&row("imag", |z| z.im))?;
    writer.flush()?;
    Ok(())
}

pub fn write_results_csv(path: &Path, results: &VmcResults) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    write_results(BufWriter::new(File::create(path)?), results)?;
    info!("results written to {}", path.display());
    Ok(())
}

/// `neighbors.txt` and `rings.txt` under `dir`.
pub fn write_lattice_reports(dir: &Path, lattice: &Lattice) -> Result<()> {
    fs::create_dir_all(dir)?;
    let mut neighbors = BufWriter::new(File::create(dir.join("neighbors.txt"))?);
    lattice.write_neighbors(&mut neighbors)?;
    let mut rings = BufWriter::new(File::create(dir.join("rings.txt"))?);
    lattice.write_rings(&mut rings)?;
    Ok(())
}
