//! The main entry point for the `flagfix` command-line application.
//!
//! This file parses arguments, installs the log subscriber and hands off to
//! the driver in the `flagfix` library.

use anyhow::Context;
use flagfix::cli;
use flagfix::committer::{GitCommitter, VersionControl};
use flagfix::driver;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = cli::parse_args();
    init_tracing(args.verbose);

    let result = driver::run(&args, io::stdout().lock(), |root| {
        Box::new(GitCommitter::new(root)) as Box<dyn VersionControl>
    })
    .context("flagfix failed");

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Diagnostics go to stderr so stdout carries only the report.
///
/// `RUST_LOG` takes precedence over `-v`.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("flagfix={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
