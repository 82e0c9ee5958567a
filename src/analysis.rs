use crate::grid::GridCell;
use crate::stats::Tally;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

/// Aggregated detection outcomes of one grid cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CellResult {
    #[serde(flatten)]
    cell: GridCell,
    n_fail: u64,
    n_success: u64,
}

impl CellResult {
    pub fn new(cell: GridCell, tally: &Tally) -> Self {
        Self {
            cell,
            n_fail: tally.n_fail(),
            n_success: tally.n_success(),
        }
    }

    pub fn cell(&self) -> &GridCell {
        &self.cell
    }

    pub fn n_fail(&self) -> u64 {
        self.n_fail
    }

    pub fn n_success(&self) -> u64 {
        self.n_success
    }

    pub fn n_reps(&self) -> u64 {
        self.n_fail + self.n_success
    }
}

/// Mean false-negative rate of one grid cell on the normalized coverage axis.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RateRecord {
    pub coverage: u64,
    pub pool_size: u64,
    pub cov_per_indiv: f64,
    pub fnr: f64,
}

/// Derive the rate records driving the false-negative curve.
///
/// The records keep the grid order: grouped by pool size, coverages ascending
/// within each group.
pub fn rate_records(results: &[CellResult]) -> Vec<RateRecord> {
    results
        .iter()
        .map(|res| RateRecord {
            coverage: res.cell().coverage(),
            pool_size: res.cell().pool_size(),
            cov_per_indiv: res.cell().cov_per_indiv(),
            fnr: res.n_fail() as f64 / res.n_reps() as f64,
        })
        .collect()
}

/// Save the simulation results to a JSON file.
pub fn save_results<P: AsRef<Path>>(results: &[CellResult], file: P) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, results).context("failed to serialize results")?;
    Ok(())
}

/// Load previously saved simulation results.
pub fn load_results<P: AsRef<Path>>(file: P) -> Result<Vec<CellResult>> {
    let file = file.as_ref();
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).context("failed to deserialize results")
}
