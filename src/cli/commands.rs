//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{ClassifierConfig, HarnessConfig, SolverConfig, resolve_solver_program};
use crate::golden::GoldenStore;
use crate::process::ProcessRunner;
use crate::reference::ReferenceTable;

use super::classifier::classify_corpus;
use super::reporter::{ConsoleReporter, run_suites};
use super::{Cli, CliError, CliResult, ExitCode, SortCli};

/// Resolve `--root` to an absolute directory.
///
/// The root doubles as the solver's working directory, so relative suite paths
/// handed to the solver must not depend on where we were started from.
pub fn resolve_root(root: &Path) -> CliResult<PathBuf> {
    let resolved = fs::canonicalize(root)
        .map_err(|e| CliError::failure(format!("Cannot access root directory '{}': {}", root.display(), e)))?;
    if !resolved.is_dir() {
        return Err(CliError::failure(format!(
            "Root '{}' is not a directory",
            root.display()
        )));
    }
    Ok(resolved)
}

/// Load the reference table from `path`, or the embedded one.
pub fn load_references(path: Option<&Path>) -> CliResult<ReferenceTable> {
    let table = match path {
        Some(path) => ReferenceTable::load(path)?,
        None => ReferenceTable::embedded()?,
    };
    Ok(table)
}

/// Run all suites and report.
pub fn run_harness(cli: &Cli) -> CliResult<ExitCode> {
    let root = resolve_root(&cli.root)?;
    let references = load_references(cli.known_results.as_deref())?;
    let program = resolve_solver_program(cli.solver.as_deref());
    let config = HarnessConfig::default()
        .with_root(&root)
        .with_solver(SolverConfig::default().with_program(program));

    tracing::debug!(?config, references = references.len(), "starting regression run");

    let store = GoldenStore::new(&config.outputs_dir);
    let mut reporter = ConsoleReporter::stdout(cli.verbose);
    let summary = run_suites(&config, &references, &store, &ProcessRunner::new(), &mut reporter)?;
    Ok(summary.exit_code())
}

/// Partition the staged netlib corpus into fast and slow tiers.
pub fn sort_corpus(cli: &SortCli) -> CliResult<ExitCode> {
    if cli.timeout_secs == 0 {
        return Err(CliError::failure("Error: --timeout-secs must be at least 1"));
    }
    let root = resolve_root(&cli.root)?;
    let config = ClassifierConfig::default()
        .with_root(&root)
        .with_program(resolve_solver_program(cli.solver.as_deref()))
        .with_timeout(Duration::from_secs(cli.timeout_secs));

    classify_corpus(&config, &ProcessRunner::new())?;
    Ok(ExitCode::SUCCESS)
}
