use std::path::Path;

use anyhow::ensure;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::AnyValue;
use runscope::RunTable;

#[derive(Args, Debug, Clone)]
pub(crate) struct UtilsArgs {
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Verbosity level (-v info, -vv debug, -vvv trace)"
    )]
    verbose: u8,

    #[arg(long = "no-progress", help = "Do not display a progress bar")]
    no_progress: bool,
}

impl UtilsArgs {
    pub(crate) fn setup(&self) -> anyhow::Result<()> {
        init_logger(self.verbose)
    }

    pub(crate) fn progress(&self) -> bool {
        !self.no_progress
    }
}

fn init_logger(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    pretty_env_logger::formatted_builder()
        .filter_level(level)
        .try_init()?;
    Ok(())
}

pub(crate) fn init_progress(
    total: Option<usize>
) -> anyhow::Result<ProgressBar> {
    let progress_bar = match total {
        Some(total) => ProgressBar::new(total as u64),
        None => ProgressBar::new_spinner(),
    };
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>5.green}/{len:5} {msg}")?
            .progress_chars("#>-"),
    );
    progress_bar.set_message("Processing...");
    Ok(progress_bar)
}

pub(crate) fn validate_input(path: &Path) -> anyhow::Result<()> {
    ensure!(path.exists(), "input {} not found", path.display());
    ensure!(path.is_file(), "input {} is not a file", path.display());
    Ok(())
}

pub(crate) fn validate_output(path: &Path) -> anyhow::Result<()> {
    ensure!(
        !path.is_dir(),
        "output {} is a directory",
        path.display()
    );
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure!(
            parent.exists(),
            "output directory {} does not exist",
            parent.display()
        );
    }
    Ok(())
}

/// Writes the run table as a single-sheet Excel workbook.
pub(crate) fn write_xlsx(
    table: &RunTable,
    path: &Path,
) -> anyhow::Result<()> {
    use rust_xlsxwriter::Workbook;

    let df = table.dataframe();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("runs")?;

    for (col, name) in df.get_column_names().iter().enumerate() {
        sheet.write_string(0, col as u16, name.as_str())?;
    }
    for (col, column) in df.get_columns().iter().enumerate() {
        for row in 0..df.height() {
            let cell = (row as u32 + 1, col as u16);
            match column.get(row)? {
                AnyValue::Null => {},
                AnyValue::Boolean(v) => {
                    sheet.write_boolean(cell.0, cell.1, v)?;
                },
                AnyValue::String(v) => {
                    sheet.write_string(cell.0, cell.1, v)?;
                },
                AnyValue::Int64(v) => {
                    sheet.write_number(cell.0, cell.1, v as f64)?;
                },
                AnyValue::Float64(v) => {
                    sheet.write_number(cell.0, cell.1, v)?;
                },
                other => {
                    sheet.write_string(cell.0, cell.1, other.to_string())?;
                },
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}
