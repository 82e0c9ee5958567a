use crate::analysis;
use crate::config::Config;
use crate::dataset;
use crate::engine::Engine;
use crate::fetch;
use crate::plot;
use anyhow::{Context, Result, bail};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub struct Manager {
    work_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(work_dir: P) -> Result<Self> {
        let work_dir = work_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(work_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { work_dir, cfg })
    }

    pub fn run_simulation(&self) -> Result<()> {
        let mut engine = Engine::new(self.cfg.clone()).context("failed to construct engine")?;

        let results = engine.run().context("failed to run simulation")?;

        analysis::save_results(&results, self.results_file())
            .context("failed to save results")?;
        log::info!("saved {:?}", self.results_file());

        Ok(())
    }

    pub fn run_comparison(&self) -> Result<()> {
        let contents = self
            .read_dataset()
            .context("failed to obtain external dataset")?;

        let sites =
            dataset::parse_dataset(contents.as_bytes()).context("failed to parse dataset")?;
        log::info!("parsed {} sites", sites.len());

        let report = dataset::compare(&sites).context("failed to compare dataset")?;
        log::info!(
            "empirical false-negative rate: {:.4} ({} of {} sites)",
            report.false_negative_rate,
            report.n_false_negative,
            report.n_sites
        );

        dataset::save_report(&report, self.comparison_file())
            .context("failed to save comparison report")?;
        log::info!("saved {:?}", self.comparison_file());

        Ok(())
    }

    pub fn render_figures(&self) -> Result<()> {
        let results =
            analysis::load_results(self.results_file()).context("failed to load results")?;
        let records = analysis::rate_records(&results);

        let figure_dir = self.figure_dir();
        fs::create_dir_all(&figure_dir)
            .with_context(|| format!("failed to create {figure_dir:?}"))?;

        plot::plot_counts(&results, self.counts_figure())
            .context("failed to plot detection counts")?;
        log::info!("rendered {:?}", self.counts_figure());

        plot::plot_fnr_curve(&records, self.curve_figure())
            .context("failed to plot false-negative curve")?;
        log::info!("rendered {:?}", self.curve_figure());

        // The comparison is optional; render its figure only when the report exists.
        if self.comparison_file().exists() {
            let report = dataset::load_report(self.comparison_file())
                .context("failed to load comparison report")?;
            plot::plot_comparison(&report, self.comparison_figure())
                .context("failed to plot comparison")?;
            log::info!("rendered {:?}", self.comparison_figure());
        }

        Ok(())
    }

    pub fn clean_outputs(&self) -> Result<()> {
        for file in [self.results_file(), self.comparison_file()] {
            if file.exists() {
                fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
                log::info!("removed {file:?}");
            }
        }

        let figure_dir = self.figure_dir();
        if figure_dir.exists() {
            fs::remove_dir_all(&figure_dir)
                .with_context(|| format!("failed to remove {figure_dir:?}"))?;
            log::info!("removed {figure_dir:?}");
        }

        Ok(())
    }

    fn read_dataset(&self) -> Result<String> {
        match (
            &self.cfg.comparison.dataset_file,
            &self.cfg.comparison.dataset_url,
        ) {
            (Some(file), None) => {
                let file = if file.is_relative() {
                    self.work_dir.join(file)
                } else {
                    file.clone()
                };
                fs::read_to_string(&file).with_context(|| format!("failed to read {file:?}"))
            }
            (None, Some(url)) => fetch::fetch_text(url),
            (None, None) => bail!("config must set either dataset_file or dataset_url"),
            (Some(_), Some(_)) => bail!("dataset_url and dataset_file are mutually exclusive"),
        }
    }

    fn results_file(&self) -> PathBuf {
        self.work_dir.join("results.json")
    }

    fn comparison_file(&self) -> PathBuf {
        self.work_dir.join("comparison.json")
    }

    fn figure_dir(&self) -> PathBuf {
        self.work_dir.join("figures")
    }

    fn counts_figure(&self) -> PathBuf {
        self.figure_dir().join("counts.svg")
    }

    fn curve_figure(&self) -> PathBuf {
        self.figure_dir().join("fnr_curve.svg")
    }

    fn comparison_figure(&self) -> PathBuf {
        self.figure_dir().join("comparison.svg")
    }
}
