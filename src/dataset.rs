//! Comparison against a published dataset of paired individual/pool
//! allele-frequency estimates.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read},
    path::Path,
};

/// Recognized column names, after header normalization.
const INDIV_COV_NAMES: &[&str] = &[
    "indiv_sum_cov",
    "indiv_sum_coverage",
    "individual_coverage",
    "sum_cov_individuals",
];
const POOL_COV_NAMES: &[&str] = &[
    "pool_sum_cov",
    "pool_sum_coverage",
    "pool_coverage",
    "sum_cov_pools",
];
const INDIV_FREQ_NAMES: &[&str] = &[
    "indiv_freq",
    "individual_freq",
    "indiv_allele_freq",
    "freq_individuals",
];
const POOL_FREQ_NAMES: &[&str] = &[
    "pool_freq",
    "pool_allele_freq",
    "freq_pools",
];

/// Upper edges of the ordinal coverage bins (reads); the last bin is open.
const BIN_EDGES: &[f64] = &[100.0, 200.0, 400.0, 800.0];

/// One genomic site with paired individual and pool sequencing estimates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteRecord {
    /// Coverage summed over the individually sequenced panel.
    pub indiv_cov: f64,
    /// Coverage summed over the pool replicates.
    pub pool_cov: f64,
    /// Allele frequency estimated from individual sequencing.
    pub indiv_freq: f64,
    /// Allele frequency estimated from pooled sequencing.
    pub pool_freq: f64,
}

impl SiteRecord {
    /// A site where individual sequencing found the allele but the pool did not.
    pub fn is_false_negative(&self) -> bool {
        self.indiv_freq > 0.0 && self.pool_freq == 0.0
    }
}

/// Site and false-negative counts within one coverage bin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinSummary {
    pub label: String,
    pub n_sites: u64,
    pub n_false_negative: u64,
}

/// Empirical false-negative summary of the dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub n_sites: u64,
    pub n_false_negative: u64,
    pub false_negative_rate: f64,
    pub indiv_cov_bins: Vec<BinSummary>,
    pub pool_cov_bins: Vec<BinSummary>,
}

/// Parse the dataset from CSV text.
///
/// Header names are normalized before matching, so `Indiv.Sum.Cov` and
/// `indiv sum cov` both resolve to the same column. Columns other than the
/// four recognized ones are ignored.
pub fn parse_dataset<R: Read>(reader: R) -> Result<Vec<SiteRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .context("failed to read dataset header")?
        .iter()
        .map(normalize_header)
        .collect();

    let i_indiv_cov =
        find_column(&headers, INDIV_COV_NAMES).context("missing individual coverage column")?;
    let i_pool_cov =
        find_column(&headers, POOL_COV_NAMES).context("missing pool coverage column")?;
    let i_indiv_freq =
        find_column(&headers, INDIV_FREQ_NAMES).context("missing individual frequency column")?;
    let i_pool_freq =
        find_column(&headers, POOL_FREQ_NAMES).context("missing pool frequency column")?;

    let mut sites = Vec::new();
    for (i_row, row) in csv_reader.records().enumerate() {
        let row = row.with_context(|| format!("failed to read dataset row {i_row}"))?;
        sites.push(SiteRecord {
            indiv_cov: parse_field(&row, i_indiv_cov, i_row)?,
            pool_cov: parse_field(&row, i_pool_cov, i_row)?,
            indiv_freq: parse_field(&row, i_indiv_freq, i_row)?,
            pool_freq: parse_field(&row, i_pool_freq, i_row)?,
        });
    }

    Ok(sites)
}

/// Compute the empirical false-negative summary over all sites.
pub fn compare(sites: &[SiteRecord]) -> Result<ComparisonReport> {
    if sites.is_empty() {
        bail!("dataset contains no sites");
    }

    let n_sites = sites.len() as u64;
    let n_false_negative = sites.iter().filter(|site| site.is_false_negative()).count() as u64;

    let mut indiv_cov_bins = empty_bins();
    let mut pool_cov_bins = empty_bins();
    for site in sites {
        let is_fn = site.is_false_negative();
        tally_bin(&mut indiv_cov_bins[bin_index(site.indiv_cov)], is_fn);
        tally_bin(&mut pool_cov_bins[bin_index(site.pool_cov)], is_fn);
    }

    Ok(ComparisonReport {
        n_sites,
        n_false_negative,
        false_negative_rate: n_false_negative as f64 / n_sites as f64,
        indiv_cov_bins,
        pool_cov_bins,
    })
}

/// Save the comparison report to a JSON file.
pub fn save_report<P: AsRef<Path>>(report: &ComparisonReport, file: P) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, report).context("failed to serialize report")?;
    Ok(())
}

/// Load a previously saved comparison report.
pub fn load_report<P: AsRef<Path>>(file: P) -> Result<ComparisonReport> {
    let file = file.as_ref();
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).context("failed to deserialize report")
}

/// Lower-case a header and unify runs of non-alphanumeric separators to `_`.
fn normalize_header(header: &str) -> String {
    let mut name = String::with_capacity(header.len());
    for chr in header.chars() {
        if chr.is_ascii_alphanumeric() {
            name.push(chr.to_ascii_lowercase());
        } else if !name.ends_with('_') {
            name.push('_');
        }
    }
    name.trim_matches('_').to_string()
}

fn find_column(headers: &[String], candidates: &[&str]) -> Result<usize> {
    for (i_col, header) in headers.iter().enumerate() {
        if candidates.contains(&header.as_str()) {
            return Ok(i_col);
        }
    }
    bail!("no column matching any of {candidates:?} (found {headers:?})");
}

fn parse_field(row: &csv::StringRecord, i_col: usize, i_row: usize) -> Result<f64> {
    let field = row
        .get(i_col)
        .with_context(|| format!("dataset row {i_row} has no column {i_col}"))?;
    field
        .parse()
        .with_context(|| format!("failed to parse {field:?} in dataset row {i_row}"))
}

fn bin_index(coverage: f64) -> usize {
    BIN_EDGES
        .iter()
        .position(|&edge| coverage < edge)
        .unwrap_or(BIN_EDGES.len())
}

fn empty_bins() -> Vec<BinSummary> {
    let mut labels: Vec<String> = Vec::with_capacity(BIN_EDGES.len() + 1);
    labels.push(format!("<{}", BIN_EDGES[0]));
    for pair in BIN_EDGES.windows(2) {
        labels.push(format!("{}-{}", pair[0], pair[1] - 1.0));
    }
    labels.push(format!(">={}", BIN_EDGES[BIN_EDGES.len() - 1]));

    labels
        .into_iter()
        .map(|label| BinSummary {
            label,
            n_sites: 0,
            n_false_negative: 0,
        })
        .collect()
}

fn tally_bin(bin: &mut BinSummary, is_false_negative: bool) {
    bin.n_sites += 1;
    if is_false_negative {
        bin.n_false_negative += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
Indiv.Sum.Cov,Pool.Sum.Cov,Indiv.Freq,Pool.Freq,Site
150,90,0.05,0.04,chr1:100
250,450,0.10,0.00,chr1:200
80,820,0.00,0.00,chr1:300
900,150,0.02,0.00,chr1:400
120,210,0.00,0.01,chr1:500
";

    #[test]
    fn header_normalization() {
        assert_eq!(normalize_header("Indiv.Sum.Cov"), "indiv_sum_cov");
        assert_eq!(normalize_header("pool sum  coverage"), "pool_sum_coverage");
        assert_eq!(normalize_header("_Pool-Freq_"), "pool_freq");
    }

    #[test]
    fn parses_recognized_columns_and_ignores_the_rest() {
        let sites = parse_dataset(TABLE.as_bytes()).unwrap();
        assert_eq!(sites.len(), 5);
        assert_eq!(
            sites[0],
            SiteRecord {
                indiv_cov: 150.0,
                pool_cov: 90.0,
                indiv_freq: 0.05,
                pool_freq: 0.04,
            }
        );
    }

    #[test]
    fn missing_column_is_an_error() {
        let table = "Indiv.Sum.Cov,Pool.Sum.Cov,Indiv.Freq\n150,90,0.05\n";
        assert!(parse_dataset(table.as_bytes()).is_err());
    }

    #[test]
    fn unparsable_field_is_an_error() {
        let table = "indiv_sum_cov,pool_sum_cov,indiv_freq,pool_freq\n150,90,n/a,0.0\n";
        assert!(parse_dataset(table.as_bytes()).is_err());
    }

    #[test]
    fn false_negative_rate_is_exact() {
        // Rows 2 and 4 of TABLE: nonzero individual estimate, zero pool estimate.
        let sites = parse_dataset(TABLE.as_bytes()).unwrap();
        let report = compare(&sites).unwrap();

        assert_eq!(report.n_sites, 5);
        assert_eq!(report.n_false_negative, 2);
        assert_eq!(report.false_negative_rate, 0.4);
    }

    #[test]
    fn empty_table_is_an_error() {
        assert!(compare(&[]).is_err());
    }

    #[test]
    fn coverage_binning() {
        assert_eq!(bin_index(0.0), 0);
        assert_eq!(bin_index(99.9), 0);
        assert_eq!(bin_index(100.0), 1);
        assert_eq!(bin_index(399.9), 2);
        assert_eq!(bin_index(400.0), 3);
        assert_eq!(bin_index(800.0), 4);
        assert_eq!(bin_index(5000.0), 4);
    }

    #[test]
    fn bins_partition_the_sites() {
        let sites = parse_dataset(TABLE.as_bytes()).unwrap();
        let report = compare(&sites).unwrap();

        let indiv_total: u64 = report.indiv_cov_bins.iter().map(|bin| bin.n_sites).sum();
        let pool_total: u64 = report.pool_cov_bins.iter().map(|bin| bin.n_sites).sum();
        assert_eq!(indiv_total, report.n_sites);
        assert_eq!(pool_total, report.n_sites);

        // indiv coverages 150, 250, 80, 900, 120 land in bins 1, 2, 0, 4, 1.
        let sites_per_bin: Vec<u64> = report
            .indiv_cov_bins
            .iter()
            .map(|bin| bin.n_sites)
            .collect();
        assert_eq!(sites_per_bin, vec![1, 2, 1, 0, 1]);
    }
}
