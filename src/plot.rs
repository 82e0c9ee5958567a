//! Presentation layer: renders the simulation results and the empirical
//! comparison to SVG figures. Consumes the saved result data only; no
//! simulation state reaches this module.

use crate::analysis::{CellResult, RateRecord};
use crate::dataset::ComparisonReport;
use anyhow::{Context, Result, bail};
use plotters::prelude::*;
use std::path::Path;

const CAPTION_FONT: (&str, u32) = ("sans-serif", 24);
const AXIS_FONT: (&str, u32) = ("sans-serif", 18);
const LABEL_FONT: (&str, u32) = ("sans-serif", 14);

const DETECTED_COLOUR: RGBColor = RGBColor(34, 139, 34);
const MISSED_COLOUR: RGBColor = RGBColor(178, 34, 34);
const BIN_COLOUR: RGBColor = RGBColor(70, 130, 180);

const POOL_COLOURS: [RGBColor; 6] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
];

fn colour_for_pool(i_pool: usize) -> RGBColor {
    POOL_COLOURS[i_pool % POOL_COLOURS.len()]
}

/// Render the stacked detection/miss counts of every grid cell.
pub fn plot_counts<P: AsRef<Path>>(results: &[CellResult], file: P) -> Result<()> {
    if results.is_empty() {
        bail!("no results to plot");
    }
    let n_reps = results.iter().map(CellResult::n_reps).max().unwrap_or(0);

    let file = file.as_ref();
    let root = SVGBackend::new(file, (1000, 600)).into_drawing_area();
    root.fill(&WHITE).context("failed to fill drawing area")?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Detection outcomes per grid cell", CAPTION_FONT)
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..results.len() as f64, 0f64..n_reps as f64)
        .context("failed to build chart")?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("grid cell (pool size : coverage)")
        .y_desc("trials")
        .x_labels(results.len().min(12))
        .x_label_formatter(&|x| {
            let i_cell = *x as usize;
            results
                .get(i_cell)
                .map(|res| format!("{}:{}", res.cell().pool_size(), res.cell().coverage()))
                .unwrap_or_default()
        })
        .axis_desc_style(AXIS_FONT)
        .label_style(LABEL_FONT)
        .draw()
        .context("failed to draw mesh")?;

    chart
        .draw_series(results.iter().enumerate().map(|(i_cell, res)| {
            Rectangle::new(
                [
                    (i_cell as f64 + 0.1, 0.0),
                    (i_cell as f64 + 0.9, res.n_success() as f64),
                ],
                DETECTED_COLOUR.filled(),
            )
        }))
        .context("failed to draw detection counts")?
        .label("detected")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], DETECTED_COLOUR.filled()));

    chart
        .draw_series(results.iter().enumerate().map(|(i_cell, res)| {
            Rectangle::new(
                [
                    (i_cell as f64 + 0.1, res.n_success() as f64),
                    (i_cell as f64 + 0.9, res.n_reps() as f64),
                ],
                MISSED_COLOUR.filled(),
            )
        }))
        .context("failed to draw miss counts")?
        .label("not detected")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], MISSED_COLOUR.filled()));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(LABEL_FONT)
        .position(SeriesLabelPosition::UpperRight)
        .draw()
        .context("failed to draw legend")?;

    root.present().with_context(|| format!("failed to write {file:?}"))?;
    Ok(())
}

/// Render the false-negative rate against coverage per individual, one series
/// per pool size, on a log-scaled x axis.
pub fn plot_fnr_curve<P: AsRef<Path>>(records: &[RateRecord], file: P) -> Result<()> {
    // Zero coverage has no place on a log axis.
    let plotted: Vec<&RateRecord> = records
        .iter()
        .filter(|record| record.cov_per_indiv > 0.0)
        .collect();
    if plotted.is_empty() {
        bail!("no records with positive normalized coverage");
    }

    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    for record in &plotted {
        x_min = x_min.min(record.cov_per_indiv);
        x_max = x_max.max(record.cov_per_indiv);
    }

    let mut pool_sizes: Vec<u64> = plotted.iter().map(|record| record.pool_size).collect();
    pool_sizes.dedup();

    let file = file.as_ref();
    let root = SVGBackend::new(file, (900, 650)).into_drawing_area();
    root.fill(&WHITE).context("failed to fill drawing area")?;

    let mut chart = ChartBuilder::on(&root)
        .caption("False-negative rate vs coverage per individual", CAPTION_FONT)
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d((x_min * 0.8..x_max * 1.25).log_scale(), 0f64..1.05f64)
        .context("failed to build chart")?;

    chart
        .configure_mesh()
        .x_desc("coverage per individual")
        .y_desc("false-negative rate")
        .axis_desc_style(AXIS_FONT)
        .label_style(LABEL_FONT)
        .draw()
        .context("failed to draw mesh")?;

    for (i_pool, &pool_size) in pool_sizes.iter().enumerate() {
        let colour = colour_for_pool(i_pool);
        let series: Vec<(f64, f64)> = plotted
            .iter()
            .filter(|record| record.pool_size == pool_size)
            .map(|record| (record.cov_per_indiv, record.fnr))
            .collect();

        chart
            .draw_series(LineSeries::new(
                series.iter().copied(),
                colour.stroke_width(2),
            ))
            .context("failed to draw rate curve")?
            .label(format!("pool size {pool_size}"))
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 25, y)], colour.stroke_width(2))
            });

        chart
            .draw_series(
                series
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 3, colour.filled())),
            )
            .context("failed to draw rate points")?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(LABEL_FONT)
        .position(SeriesLabelPosition::LowerLeft)
        .draw()
        .context("failed to draw legend")?;

    root.present().with_context(|| format!("failed to write {file:?}"))?;
    Ok(())
}

/// Render the empirical false-negative rate per pool-coverage bin.
pub fn plot_comparison<P: AsRef<Path>>(report: &ComparisonReport, file: P) -> Result<()> {
    let bins = &report.pool_cov_bins;
    if bins.is_empty() {
        bail!("comparison report contains no bins");
    }

    let rates: Vec<f64> = bins
        .iter()
        .map(|bin| {
            if bin.n_sites == 0 {
                0.0
            } else {
                bin.n_false_negative as f64 / bin.n_sites as f64
            }
        })
        .collect();
    let y_max = rates.iter().fold(0.01f64, |acc, &rate| acc.max(rate)) * 1.25;

    let file = file.as_ref();
    let root = SVGBackend::new(file, (900, 600)).into_drawing_area();
    root.fill(&WHITE).context("failed to fill drawing area")?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Empirical false-negative rate by pool coverage", CAPTION_FONT)
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..bins.len() as f64, 0f64..y_max)
        .context("failed to build chart")?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("pool coverage (reads)")
        .y_desc("false-negative rate")
        .x_labels(bins.len())
        .x_label_formatter(&|x| {
            let i_bin = *x as usize;
            bins.get(i_bin)
                .map(|bin| bin.label.clone())
                .unwrap_or_default()
        })
        .axis_desc_style(AXIS_FONT)
        .label_style(LABEL_FONT)
        .draw()
        .context("failed to draw mesh")?;

    chart
        .draw_series(rates.iter().enumerate().map(|(i_bin, &rate)| {
            Rectangle::new(
                [(i_bin as f64 + 0.15, 0.0), (i_bin as f64 + 0.85, rate)],
                BIN_COLOUR.filled(),
            )
        }))
        .context("failed to draw bin rates")?;

    root.present().with_context(|| format!("failed to write {file:?}"))?;
    Ok(())
}
