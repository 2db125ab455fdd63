//! cirparse entry point.

use std::process::ExitCode;

use cirparse::cli::Cli;
use clap::Parser;

fn main() -> ExitCode {
    let cli = Cli::parse();
    cirparse::init_tracing();
    cirparse::run(cli)
}
