//! Command-line driver for the ClangIR textual syntax parser.

pub mod cli;
pub mod diagnostics;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};

use cir_syntax::options::stack_size_for;
use cir_syntax::{ParseOptions, ParseResult, print_module};
use ropey::Rope;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, Format, ParseArgs};
use crate::diagnostics::{JsonDiagnostic, JsonFile};

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "CIRPARSE_LOG";

/// Install the stderr log subscriber. Defaults to warnings only.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// A parsed file together with the text it was parsed from.
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub source: Rope,
    pub result: ParseResult,
}

impl FileReport {
    fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

impl ParseArgs {
    pub fn options(&self, path: &Path) -> ParseOptions<'static> {
        ParseOptions::default()
            .with_source_id(path.display().to_string())
            .with_deprecation_warnings(!self.no_deprecations)
            .with_max_depth(self.max_depth)
    }
}

/// Read and parse one file.
pub fn parse_file(path: &Path, args: &ParseArgs) -> io::Result<FileReport> {
    let source = std::fs::File::open(path).and_then(Rope::from_reader)?;
    let text = source.to_string();
    let result = cir_syntax::parse(&text, args.options(path));
    tracing::debug!(
        path = %path.display(),
        items = result.module.items.len(),
        diagnostics = result.diagnostics.len(),
        "parsed"
    );
    Ok(FileReport {
        path: path.to_owned(),
        source,
        result,
    })
}

/// Parse every file, `jobs` at a time, on threads with enough stack for
/// `args.max_depth`. Results keep the order of `paths`.
pub fn check_files(
    paths: &[PathBuf],
    args: &ParseArgs,
    jobs: usize,
) -> Vec<io::Result<FileReport>> {
    let workers = jobs.clamp(1, paths.len().max(1));
    let next = AtomicUsize::new(0);

    let work = || {
        let mut done = Vec::new();
        loop {
            let index = next.fetch_add(1, Ordering::Relaxed);
            let Some(path) = paths.get(index) else {
                break;
            };
            done.push((index, parse_file(path, args)));
        }
        done
    };
    let stack_size = stack_size_for(args.max_depth);

    let mut indexed: Vec<(usize, io::Result<FileReport>)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .filter_map(|_| {
                std::thread::Builder::new()
                    .stack_size(stack_size)
                    .spawn_scoped(scope, work)
                    .inspect_err(|e| tracing::warn!("cannot spawn parse worker: {e}"))
                    .ok()
            })
            .collect();
        let mut indexed: Vec<_> = handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(done) => done,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect();
        // Picks up whatever is left if no worker could be spawned.
        indexed.extend(work());
        indexed
    });
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, report)| report).collect()
}

/// Render reports as a JSON array, one object per file.
pub fn render_json(reports: &[FileReport]) -> serde_json::Result<String> {
    let paths: Vec<String> = reports.iter().map(FileReport::display_path).collect();
    let files: Vec<JsonFile<'_>> = reports
        .iter()
        .zip(&paths)
        .map(|(report, path)| JsonFile {
            file: path,
            diagnostics: report
                .result
                .diagnostics
                .iter()
                .map(|diag| JsonDiagnostic::new(diag, &report.source))
                .collect(),
        })
        .collect();
    serde_json::to_string_pretty(&files)
}

fn report_human(report: &FileReport) {
    let path = report.display_path();
    for diag in &report.result.diagnostics {
        diagnostics::print_diagnostic(diag, &report.source, &path);
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

/// Run a parsed command line. Exits with 1 when any file has errors.
pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Check { files, jobs } => {
            let jobs = jobs.unwrap_or_else(default_jobs);
            let mut failed = false;
            let mut reports = Vec::new();
            for (path, outcome) in files.iter().zip(check_files(&files, &cli.parse, jobs)) {
                match outcome {
                    Ok(report) => {
                        failed |= report.result.has_errors();
                        reports.push(report);
                    }
                    Err(e) => {
                        eprintln!("Error reading {}: {e}", path.display());
                        failed = true;
                    }
                }
            }
            match cli.format {
                Format::Human => {
                    reports.iter().for_each(report_human);
                    let errors: usize = reports.iter().map(|r| r.result.errors().count()).sum();
                    let warnings: usize =
                        reports.iter().map(|r| r.result.warnings().count()).sum();
                    eprintln!(
                        "checked {} file(s): {errors} error(s), {warnings} warning(s)",
                        reports.len()
                    );
                }
                Format::Json => match render_json(&reports) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("Error encoding diagnostics: {e}");
                        failed = true;
                    }
                },
            }
            exit_code(failed)
        }
        Command::Print { file } => {
            let report = match check_files(std::slice::from_ref(&file), &cli.parse, 1).pop() {
                Some(Ok(report)) => report,
                Some(Err(e)) => {
                    eprintln!("Error reading file: {e}");
                    return ExitCode::FAILURE;
                }
                None => return ExitCode::FAILURE,
            };
            match cli.format {
                Format::Human => report_human(&report),
                Format::Json => match render_json(std::slice::from_ref(&report)) {
                    Ok(json) => eprintln!("{json}"),
                    Err(e) => eprintln!("Error encoding diagnostics: {e}"),
                },
            }
            if report.result.has_errors() {
                return ExitCode::FAILURE;
            }
            let mut stdout = io::stdout().lock();
            if let Err(e) = stdout.write_all(print_module(&report.result.module).as_bytes()) {
                eprintln!("Error writing output: {e}");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
    }
}

fn exit_code(failed: bool) -> ExitCode {
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
