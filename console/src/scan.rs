use std::path::PathBuf;

use clap::Args;
use console::style;
use log::info;
use runscope::prelude::*;
use runscope::RunTable;

use crate::utils::{init_progress, validate_output, write_xlsx, UtilsArgs};
use crate::PipelineCommand;

#[derive(Args, Debug, Clone)]
pub(crate) struct ScanArgs {
    #[arg(help = "Directory tree to scan for run XML files")]
    base_dir: PathBuf,

    #[arg(
        short,
        long,
        default_value = "sequel_runs_summary.csv",
        help = "Path of the CSV summary table"
    )]
    output: PathBuf,

    #[arg(
        long,
        help = "Additionally write an Excel workbook next to the CSV"
    )]
    xlsx: bool,
}

impl PipelineCommand for ScanArgs {
    fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        validate_output(&self.output)?;

        let aggregator = RunAggregator::new(&self.base_dir);
        let records = if utils.progress() {
            let files = aggregator.discover()?;
            let progress_bar = init_progress(Some(files.total()))?;
            let records = aggregator.collect_files(&files, |path| {
                if let Some(name) = path.file_name() {
                    progress_bar
                        .set_message(name.to_string_lossy().into_owned());
                }
                progress_bar.inc(1);
            })?;
            progress_bar.finish_and_clear();
            records
        }
        else {
            aggregator.collect()?
        };
        info!("aggregated {} runs", records.len());

        let table = RunTable::from_records(&records)?;
        table.write_csv(&self.output)?;
        if self.xlsx {
            let xlsx_path = self.output.with_extension("xlsx");
            write_xlsx(&table, &xlsx_path)?;
            info!("Saved workbook to {}", xlsx_path.display());
        }

        let summary = table.summary()?;
        println!("{}", style("Scan complete").green().bold());
        println!("  Runs found:    {}", summary.n_runs);
        println!("  CCS/HiFi:      {}", summary.n_ccs_hifi);
        println!("  CLR:           {}", summary.n_clr);
        println!("  Total yield:   {:.2} Gb", summary.total_yield_gb);
        if let Some(mean) = summary.mean_yield_gb {
            println!("  Mean yield:    {:.2} Gb", mean);
        }
        if let Some(mean) = summary.mean_p1_percent {
            println!("  Mean P1:       {:.2} %", mean);
        }
        if let Some(mean) = summary.mean_productivity_percent {
            println!("  Mean prod.:    {:.2} %", mean);
        }
        println!("  Table written: {}", self.output.display());
        Ok(())
    }
}
