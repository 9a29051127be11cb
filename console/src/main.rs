mod report;
mod scan;
mod utils;

use clap::{Parser, Subcommand};
use report::ReportArgs;
use scan::ScanArgs;
use utils::UtilsArgs;
use wild::ArgsOs;

#[derive(Parser, Debug)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None,)]
struct Cli {
    #[command(subcommand)]
    command: MainMenu,
}

#[derive(Subcommand, Debug)]
enum MainMenu {
    /// Walk a directory tree and write the run summary table.
    Scan {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  ScanArgs,
    },

    /// Run the statistical analysis over a scanned summary table.
    Report {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  ReportArgs,
    },
}

pub(crate) trait PipelineCommand {
    fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()>;
}

fn main() -> anyhow::Result<()> {
    let args: ArgsOs = wild::args_os();
    let cli = Cli::parse_from(args);

    match cli.command {
        MainMenu::Scan { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Report { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
    }
    Ok(())
}
