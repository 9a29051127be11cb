//! Diagnostic figures for the reporter, rendered as SVG.

use std::path::Path;

use anyhow::Context as _;
use log::info;
use plotters::prelude::*;

use crate::tools::report::StatReport;

const FIGURE_SIZE: (u32, u32) = (900, 600);
const HIST_BINS: usize = 20;

/// Insert-size strata used to color the loading scatter.
const INSERT_BINS: [(&str, f64, f64, RGBColor); 3] = [
    ("< 5 kb", 0.0, 5_000.0, RGBColor(214, 96, 77)),
    ("5-15 kb", 5_000.0, 15_000.0, RGBColor(67, 147, 195)),
    ("> 15 kb", 15_000.0, f64::INFINITY, RGBColor(27, 120, 55)),
];
const MISSING_COLOR: RGBColor = RGBColor(150, 150, 150);

/// Renders the standard figure set into `dir`: yield and P1 histograms
/// plus the P1-vs-yield scatter stratified by insert size.
pub fn render_figures(
    report: &StatReport,
    dir: &Path,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    histogram(
        &report.data.yield_gb,
        &dir.join("yield_hist.svg"),
        "HiFi yield per run",
        "Yield (Gb)",
    )?;
    histogram(
        &report.data.p1_percent,
        &dir.join("p1_hist.svg"),
        "P1 loading per run",
        "P1 (%)",
    )?;
    loading_scatter(report, &dir.join("p1_vs_yield.svg"))?;

    info!("wrote figures to {}", dir.display());
    Ok(())
}

fn histogram(
    values: &[f64],
    path: &Path,
    title: &str,
    x_label: &str,
) -> anyhow::Result<()> {
    anyhow::ensure!(!values.is_empty(), "no data to plot for {}", title);

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    // A single-valued column would make the axis range empty; pad it so
    // the lone bar still renders.
    let (lo, hi) = if max > min { (min, max) } else { (min - 0.5, min + 0.5) };
    let width = (hi - lo) / HIST_BINS as f64;

    let mut counts = vec![0usize; HIST_BINS];
    for v in values {
        let bin = (((v - lo) / width) as usize).min(HIST_BINS - 1);
        counts[bin] += 1;
    }
    let peak = counts.iter().max().copied().unwrap_or(1);

    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(lo..hi, 0usize..(peak + 1))?;
    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc("Runs")
        .draw()?;

    chart.draw_series(counts.iter().enumerate().map(|(i, &count)| {
        let x0 = lo + i as f64 * width;
        let x1 = x0 + width;
        Rectangle::new(
            [(x0, 0), (x1, count)],
            RGBColor(67, 147, 195).mix(0.7).filled(),
        )
    }))?;

    root.present()?;
    Ok(())
}

fn loading_scatter(
    report: &StatReport,
    path: &Path,
) -> anyhow::Result<()> {
    let data = &report.data;
    anyhow::ensure!(!data.yield_gb.is_empty(), "no data to plot");

    let x_max = data
        .p1_percent
        .iter()
        .cloned()
        .fold(0.0f64, f64::max)
        .max(1.0)
        * 1.05;
    let y_max = data
        .yield_gb
        .iter()
        .cloned()
        .fold(0.0f64, f64::max)
        .max(1.0)
        * 1.05;

    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("P1 loading vs HiFi yield", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)?;
    chart
        .configure_mesh()
        .x_desc("P1 (%)")
        .y_desc("Yield (Gb)")
        .draw()?;

    for (label, lo, hi, color) in INSERT_BINS {
        let points: Vec<(f64, f64)> = data
            .p1_percent
            .iter()
            .zip(&data.yield_gb)
            .zip(&data.insert_size)
            .filter_map(|((&p1, &y), &insert)| {
                insert
                    .filter(|ins| *ins >= lo && *ins < hi)
                    .map(|_| (p1, y))
            })
            .collect();
        if points.is_empty() {
            continue;
        }
        chart
            .draw_series(
                points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
            )?
            .label(label)
            .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
    }

    let missing: Vec<(f64, f64)> = data
        .p1_percent
        .iter()
        .zip(&data.yield_gb)
        .zip(&data.insert_size)
        .filter_map(|((&p1, &y), insert)| {
            insert.is_none().then_some((p1, y))
        })
        .collect();
    if !missing.is_empty() {
        chart
            .draw_series(missing.iter().map(|&(x, y)| {
                Circle::new((x, y), 4, MISSING_COLOR.mix(0.8).filled())
            }))?
            .label("insert size unknown")
            .legend(|(x, y)| {
                Circle::new((x + 10, y), 4, MISSING_COLOR.filled())
            });
    }

    // Overlay the simple regression fit when it was estimated.
    if let Some(model) =
        report.models.iter().find(|m| m.name == "yield ~ p1")
    {
        if let (Some(intercept), Some(slope)) = (
            model.coefficient("intercept"),
            model.coefficient("p1_percent"),
        ) {
            chart
                .draw_series(LineSeries::new(
                    (0..=100).map(|i| {
                        let x = x_max * i as f64 / 100.0;
                        (x, intercept + slope * x)
                    }),
                    BLACK.stroke_width(2),
                ))?
                .label("yield ~ p1 fit")
                .legend(|(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], BLACK)
                });
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
