use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::{
    fmt::Debug,
    fs,
    ops::RangeBounds,
    path::{Path, PathBuf},
};

/// Largest coverage accepted per grid cell.
///
/// Coverages beyond this bound are rejected early instead of being handed to
/// the binomial sampler.
pub const MAX_COVERAGE: u64 = 1_000_000_000;

/// Analysis configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Deserialize)]
pub struct Config {
    /// Parameter grid of the simulation sweep.
    pub grid: GridConfig,
    /// Simulation settings.
    pub simulation: SimulationConfig,
    /// External dataset comparison settings.
    #[serde(default)]
    pub comparison: ComparisonConfig,
}

/// Coverage levels and pool sizes swept by the simulation.
#[derive(Debug, PartialEq, Clone, Deserialize)]
pub struct GridConfig {
    /// Sequencing coverages (reads sampled per site).
    pub coverages: Vec<u64>,
    /// Pool sizes (diploid individuals per pool).
    pub pool_sizes: Vec<u64>,
    /// Number of homozygous carrier individuals spiked into each pool.
    pub n_carriers: u64,
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Number of repetitions per grid cell.
    pub n_reps: u64,
    /// Seed for the random number generator (OS entropy if omitted).
    pub seed: Option<u64>,
}

#[derive(Debug, PartialEq, Clone, Default, Deserialize)]
pub struct ComparisonConfig {
    /// URL of the published dataset to compare against.
    pub dataset_url: Option<String>,
    /// Local path of the dataset (relative paths resolve against the working directory).
    pub dataset_file: Option<PathBuf>,
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        check_num(self.grid.coverages.len(), 1..1_000).context("invalid number of coverages")?;
        check_num(self.grid.pool_sizes.len(), 1..1_000).context("invalid number of pool sizes")?;

        for &coverage in &self.grid.coverages {
            check_num(coverage, 0..=MAX_COVERAGE).context("invalid coverage")?;
        }
        for &pool_size in &self.grid.pool_sizes {
            check_num(pool_size, 1..1_000_000).context("invalid pool size")?;
        }

        check_num(self.grid.n_carriers, 1..1_000_000).context("invalid number of carriers")?;

        // A pool smaller than the carrier subpopulation implies an allele
        // frequency above 1.
        if let Some(&min_pool_size) = self.grid.pool_sizes.iter().min() {
            if self.grid.n_carriers > min_pool_size {
                bail!(
                    "number of carriers ({}) must not exceed the smallest pool size ({min_pool_size})",
                    self.grid.n_carriers
                );
            }
        }

        check_num(self.simulation.n_reps, 1..1_000_000)
            .context("invalid number of repetitions")?;

        if self.comparison.dataset_url.is_some() && self.comparison.dataset_file.is_some() {
            bail!("dataset_url and dataset_file are mutually exclusive");
        }

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> String {
        String::new()
            + "[grid]\n"
            + "coverages = [1, 5, 10, 20, 50, 100, 200, 500]\n"
            + "pool_sizes = [5, 10, 20, 50, 100, 200]\n"
            + "n_carriers = 2\n"
            + "\n"
            + "[simulation]\n"
            + "n_reps = 1000\n"
            + "seed = 42\n"
    }

    #[test]
    fn valid_config_parses() {
        let config: Config = toml::from_str(&base_config()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.grid.n_carriers, 2);
        assert_eq!(config.simulation.seed, Some(42));
        assert_eq!(config.comparison, ComparisonConfig::default());
    }

    #[test]
    fn rejects_zero_pool_size() {
        let contents = base_config().replace("pool_sizes = [5,", "pool_sizes = [0,");
        let config: Config = toml::from_str(&contents).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_carriers_exceeding_smallest_pool() {
        let contents = base_config().replace("n_carriers = 2", "n_carriers = 6");
        let config: Config = toml::from_str(&contents).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_coverage_beyond_sampler_bound() {
        let contents = base_config().replace("500]", "2000000000]");
        let config: Config = toml::from_str(&contents).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_both_dataset_sources() {
        let contents = base_config()
            + "\n[comparison]\n"
            + "dataset_url = \"https://example.org/sites.csv\"\n"
            + "dataset_file = \"sites.csv\"\n";
        let config: Config = toml::from_str(&contents).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn coverage_zero_is_allowed() {
        let contents = base_config().replace("coverages = [1,", "coverages = [0,");
        let config: Config = toml::from_str(&contents).unwrap();
        config.validate().unwrap();
    }
}
