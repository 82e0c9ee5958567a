//! Parameter grid of the simulation sweep.

use crate::config::GridConfig;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Alleles carried per diploid individual.
const ALLELES_PER_INDIVIDUAL: u64 = 2;

/// One cell of the coverage x pool-size grid.
///
/// Carries the allele frequency expected when `n_carriers` homozygous carriers
/// are diluted into a pool of `pool_size` diploid individuals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    coverage: u64,
    pool_size: u64,
    exp_freq: f64,
}

impl GridCell {
    /// Create a grid cell and derive its expected allele frequency.
    ///
    /// # Errors
    /// Returns an error if `pool_size` is zero or if the implied frequency
    /// falls outside `[0, 1]`.
    pub fn new(coverage: u64, pool_size: u64, n_carriers: u64) -> Result<Self> {
        if pool_size == 0 {
            bail!("pool size must be positive");
        }

        // Carriers are homozygous, so each contributes both of its alleles.
        let n_alleles = n_carriers * ALLELES_PER_INDIVIDUAL;
        let exp_freq = n_alleles as f64 / (pool_size * ALLELES_PER_INDIVIDUAL) as f64;

        if !(0.0..=1.0).contains(&exp_freq) {
            bail!(
                "expected allele frequency must be in [0, 1], but is {exp_freq} \
                 ({n_carriers} carriers in a pool of {pool_size})"
            );
        }

        Ok(Self {
            coverage,
            pool_size,
            exp_freq,
        })
    }

    pub fn coverage(&self) -> u64 {
        self.coverage
    }

    pub fn pool_size(&self) -> u64 {
        self.pool_size
    }

    pub fn exp_freq(&self) -> f64 {
        self.exp_freq
    }

    /// Coverage normalized by pool size.
    pub fn cov_per_indiv(&self) -> f64 {
        self.coverage as f64 / self.pool_size as f64
    }
}

/// Build the full cross product of coverages and pool sizes.
///
/// Cells are ordered by pool size first, then coverage.
pub fn build_grid(cfg: &GridConfig) -> Result<Vec<GridCell>> {
    let mut cells = Vec::with_capacity(cfg.pool_sizes.len() * cfg.coverages.len());

    for &pool_size in &cfg.pool_sizes {
        for &coverage in &cfg.coverages {
            let cell = GridCell::new(coverage, pool_size, cfg.n_carriers)
                .context("failed to construct grid cell")?;
            cells.push(cell);
        }
    }

    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_frequency_is_exact() {
        // 2 homozygous carriers contribute 4 alleles out of 20.
        let cell = GridCell::new(50, 10, 2).unwrap();
        assert_eq!(cell.exp_freq(), 0.2);
    }

    #[test]
    fn rejects_zero_pool_size() {
        assert!(GridCell::new(50, 0, 2).is_err());
    }

    #[test]
    fn rejects_frequency_above_one() {
        assert!(GridCell::new(50, 3, 4).is_err());
    }

    #[test]
    fn carriers_filling_the_pool_reach_frequency_one() {
        let cell = GridCell::new(50, 5, 5).unwrap();
        assert_eq!(cell.exp_freq(), 1.0);
    }

    #[test]
    fn normalized_coverage() {
        let cell = GridCell::new(100, 20, 2).unwrap();
        assert_eq!(cell.cov_per_indiv(), 5.0);
    }

    #[test]
    fn grid_is_the_full_cross_product() {
        let cfg = GridConfig {
            coverages: vec![1, 10, 100],
            pool_sizes: vec![5, 50],
            n_carriers: 2,
        };
        let cells = build_grid(&cfg).unwrap();
        assert_eq!(cells.len(), 6);

        // Grouped by pool size, coverages in configured order.
        assert_eq!(cells[0].pool_size(), 5);
        assert_eq!(cells[0].coverage(), 1);
        assert_eq!(cells[2].coverage(), 100);
        assert_eq!(cells[3].pool_size(), 50);
    }
}
