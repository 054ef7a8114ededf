use clap::{Parser, ValueEnum};
use log::error;
use std::{io, path::PathBuf};

use tally::{Discount, Error, Mode, Settings, Tally};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Cost per environment and rule; incomplete rows are skipped.
    Cost,
    /// Cost and savings; incomplete rows are kept with defaults.
    Savings,
}

/// Summarises a cloud cost findings export by environment and by rule.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Path to the findings CSV file.
    csv: PathBuf,
    /// Discount percentage (0-100) taken off every cost. Savings mode only.
    discount: Option<String>,
    #[arg(long, value_enum, default_value = "cost")]
    mode: ModeArg,
}

fn run(args: Args) -> Result<(), Error> {
    let mode = match args.mode {
        ModeArg::Cost => Mode::Cost,
        ModeArg::Savings => Mode::Savings,
    };
    let discount = args
        .discount
        .as_deref()
        .map(Discount::from_percent)
        .transpose()?;
    let settings = Settings::new(mode, discount)?;

    let tally = Tally::from_path(&args.csv, settings)?;
    tally.write_report(io::stdout().lock())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    if let Err(err) = run(args) {
        error!("{}", err);
        std::process::exit(1);
    }
}
