use crate::analysis::CellResult;
use crate::config::Config;
use crate::grid::{self, GridCell};
use crate::stats::Tally;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Binomial;

/// Simulation engine.
///
/// Holds the configuration and random number generator, and simulates the
/// detection trials of every cell of the parameter grid.
pub struct Engine {
    cfg: Config,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create a new `Engine` with the given configuration.
    ///
    /// The random number generator is seeded from the configuration if a seed
    /// is set, and from the operating system otherwise.
    pub fn new(cfg: Config) -> Result<Self> {
        let rng = match cfg.simulation.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };

        Ok(Self { cfg, rng })
    }

    /// Simulate every grid cell and collect the aggregated results.
    pub fn run(&mut self) -> Result<Vec<CellResult>> {
        let cells = grid::build_grid(&self.cfg.grid).context("failed to build parameter grid")?;

        let mut results = Vec::with_capacity(cells.len());
        for (i_cell, cell) in cells.iter().enumerate() {
            let tally = self
                .simulate_cell(cell)
                .with_context(|| format!("failed to simulate grid cell {cell:?}"))?;
            results.push(CellResult::new(*cell, &tally));

            let progress = 100.0 * (i_cell + 1) as f64 / cells.len() as f64;
            log::info!("completed {progress:06.2}%");
        }

        Ok(results)
    }

    /// Run the repeated detection trials of a single grid cell.
    ///
    /// Each trial draws the number of carrier-allele reads from a binomial
    /// distribution over `coverage` reads; the trial counts as a detection iff
    /// at least one such read was drawn.
    fn simulate_cell(&mut self, cell: &GridCell) -> Result<Tally> {
        let read_dist = Binomial::new(cell.coverage(), cell.exp_freq())
            .context("failed to construct binomial read distribution")?;

        let mut tally = Tally::new();
        for _ in 0..self.cfg.simulation.n_reps {
            let n_carrier_reads = read_dist.sample(&mut self.rng);
            tally.record(n_carrier_reads > 0);
        }

        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ComparisonConfig, GridConfig, SimulationConfig};

    fn test_config(coverages: Vec<u64>, pool_sizes: Vec<u64>, n_carriers: u64) -> Config {
        Config {
            grid: GridConfig {
                coverages,
                pool_sizes,
                n_carriers,
            },
            simulation: SimulationConfig {
                n_reps: 1000,
                seed: Some(42),
            },
            comparison: ComparisonConfig::default(),
        }
    }

    #[test]
    fn counts_sum_to_repetitions_in_every_cell() {
        let cfg = test_config(vec![0, 1, 10, 100], vec![5, 20], 2);
        let results = Engine::new(cfg).unwrap().run().unwrap();

        assert_eq!(results.len(), 8);
        for res in &results {
            assert_eq!(res.n_fail() + res.n_success(), 1000);
        }
    }

    #[test]
    fn zero_coverage_never_detects() {
        let cfg = test_config(vec![0], vec![10], 2);
        let results = Engine::new(cfg).unwrap().run().unwrap();

        assert_eq!(results[0].n_fail(), 1000);
        assert_eq!(results[0].n_success(), 0);
    }

    #[test]
    fn certain_frequency_always_detects() {
        // Carriers fill the pool, so every read carries the allele.
        let cfg = test_config(vec![1, 10], vec![5], 5);
        let results = Engine::new(cfg).unwrap().run().unwrap();

        for res in &results {
            assert_eq!(res.n_fail(), 0);
        }
    }

    #[test]
    fn deep_coverage_rarely_misses() {
        // Expected frequency 0.1 at coverage 100: P(no carrier read) ~ 2.7e-5.
        let cfg = test_config(vec![100], vec![20], 2);
        let results = Engine::new(cfg).unwrap().run().unwrap();

        let fnr = results[0].n_fail() as f64 / 1000.0;
        assert!(fnr <= 0.01, "false-negative rate too high: {fnr}");
    }

    #[test]
    fn failure_rate_does_not_increase_with_coverage() {
        let mut cfg = test_config(vec![1, 5, 10, 20, 50, 100], vec![20], 2);
        cfg.simulation.n_reps = 5000;
        let results = Engine::new(cfg).unwrap().run().unwrap();

        let rates: Vec<f64> = results
            .iter()
            .map(|res| res.n_fail() as f64 / 5000.0)
            .collect();
        for pair in rates.windows(2) {
            // Statistical monotonicity with a sampling-noise allowance.
            assert!(
                pair[1] <= pair[0] + 0.03,
                "rate increased with coverage: {rates:?}"
            );
        }
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let cfg = test_config(vec![10, 50], vec![10], 1);
        let first = Engine::new(cfg.clone()).unwrap().run().unwrap();
        let second = Engine::new(cfg).unwrap().run().unwrap();

        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.n_fail(), b.n_fail());
        }
    }
}
