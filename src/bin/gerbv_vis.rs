//! `gerbv-vis`: find gerber files in a directory and render them with gerbv.
//!
//! Argument errors exit with clap's usage code (2); every other failure is
//! printed with its context chain and exits 1.

use anyhow::Result;
use clap::Parser;
use gerbvis::{Cli, logging, run};

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let report = run(&cli.into_config())?;

    for outcome in &report.outcomes {
        if let Some(descriptor) = &outcome.descriptor {
            tracing::info!(project_file = %descriptor.display(), "kept project file");
        }
    }
    Ok(())
}
