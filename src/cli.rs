//! Command-line interface for the CIR parser.

use std::path::PathBuf;

use cir_syntax::options::DEFAULT_MAX_DEPTH;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "cirparse")]
#[command(about = "Parse and check ClangIR text files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub parse: ParseArgs,

    /// Diagnostic output format
    #[arg(long, value_enum, global = true, default_value_t = Format::Human)]
    pub format: Format,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse each file and report its diagnostics
    Check {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Number of files parsed at once (defaults to the available cores)
        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Parse a file and print it back in the forms it was written in
    Print {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Args, Clone, Debug)]
pub struct ParseArgs {
    /// Do not warn about deprecated surface forms
    #[arg(long, global = true)]
    pub no_deprecations: bool,

    /// Maximum region nesting depth
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Human,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_with_flags() {
        let cli = Cli::parse_from([
            "cirparse",
            "check",
            "a.cir",
            "b.cir",
            "--jobs",
            "2",
            "--no-deprecations",
            "--format",
            "json",
        ]);
        let Command::Check { files, jobs } = cli.command else {
            panic!("expected check");
        };
        assert_eq!(files.len(), 2);
        assert_eq!(jobs, Some(2));
        assert!(cli.parse.no_deprecations);
        assert_eq!(cli.parse.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(cli.format, Format::Json);
    }

    #[test]
    fn test_check_requires_a_file() {
        assert!(Cli::try_parse_from(["cirparse", "check"]).is_err());
    }

    #[test]
    fn test_print_with_depth() {
        let cli = Cli::parse_from(["cirparse", "--max-depth", "8", "print", "a.cir"]);
        assert!(matches!(cli.command, Command::Print { .. }));
        assert_eq!(cli.parse.max_depth, 8);
        assert_eq!(cli.format, Format::Human);
    }
}
