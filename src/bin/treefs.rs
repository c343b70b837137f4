//! treefs CLI Binary
//!
//! Command-line interface for the concurrent in-memory filesystem.

use anyhow::Context;
use clap::Parser;
use std::process;
use treefs::logging::init_logging;
use treefs::tooling::cli::{Cli, CliContext};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let context = CliContext::new(cli.config.clone()).context("Error loading configuration")?;
    let logging = cli.logging_config(&context.config().logging);
    init_logging(Some(&logging)).context("Error initializing logging")?;

    let output = context.execute(&cli.command)?;
    println!("{}", output);
    Ok(())
}
