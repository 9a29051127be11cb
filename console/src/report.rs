use std::path::PathBuf;

use anyhow::ensure;
use clap::Args;
use console::style;
use runscope::plots::render_figures;
use runscope::prelude::*;
use runscope::RunTable;

use crate::utils::{validate_input, UtilsArgs};
use crate::PipelineCommand;

#[derive(Args, Debug, Clone)]
pub(crate) struct ReportArgs {
    #[arg(
        short,
        long,
        default_value = "sequel_runs_summary.csv",
        help = "CSV summary table produced by `scan`"
    )]
    input: PathBuf,

    #[arg(
        long,
        default_value = "report_tables",
        help = "Directory for the CSV and JSON summary tables"
    )]
    tables_dir: PathBuf,

    #[arg(long, help = "Also render SVG figures into this directory")]
    figures_dir: Option<PathBuf>,

    #[arg(
        long,
        default_value = r"(?i)diag|test|dryrun",
        help = "Runs whose name matches this pattern are treated as \
                diagnostic and excluded"
    )]
    diagnostic_pattern: String,
}

impl PipelineCommand for ReportArgs {
    fn run(
        &self,
        _utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        validate_input(&self.input)?;

        let table = RunTable::read_csv(&self.input)?;
        let config = ReportConfig {
            diagnostic_pattern: self.diagnostic_pattern.clone(),
        };
        let report = StatReport::build(&table, &config)?;
        ensure!(
            report.n_analyzed > 0,
            "no runs pass the filter pipeline; nothing to analyze"
        );

        report.write_tables(&self.tables_dir)?;
        if let Some(dir) = &self.figures_dir {
            render_figures(&report, dir)?;
        }

        println!("{}", style("Report complete").green().bold());
        println!(
            "  Runs analyzed:  {} of {}",
            report.n_analyzed, report.n_input
        );
        println!(
            "  Insert size known for {} runs",
            report.n_with_insert_size
        );
        for corr in &report.correlations {
            println!(
                "  r({}, yield) = {:+.3}  (p = {:.4})",
                corr.metric, corr.r, corr.p
            );
        }
        for test in &report.comparisons {
            println!(
                "  {} -> {}: F = {:.2}, p = {:.4}",
                test.restricted, test.full, test.f_statistic, test.p_value
            );
        }
        println!("  Tables written: {}", self.tables_dir.display());
        if let Some(dir) = &self.figures_dir {
            println!("  Figures written: {}", dir.display());
        }
        Ok(())
    }
}
