//! CLI module for the solver regression tools
//!
//! Two entry points share this module:
//!
//! - `solver-regress` runs every configured suite against the solver and
//!   exits 0 only if all test cases passed.
//! - `sort-corpus` times the solver on a raw netlib staging directory and moves
//!   each file into the fast or slow tier.
//!
//! Both run with no arguments; the flags only relocate the repository root or
//! swap the solver program and reference table.
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//! - `reporter` - Test loop, run summary and console reporting
//! - `classifier` - Fast/slow corpus partitioning
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` / `run_sort()` functions handle errors and exit.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod classifier;
pub mod commands;
pub mod reporter;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use crate::errors::HarnessError;
use crate::version::HARNESS_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<HarnessError> for CliError {
    fn from(err: HarnessError) -> Self {
        CliError::failure(format!("Error: {}", err))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definitions
// ============================================================================

/// Regression tests for an external optimization solver
#[derive(Parser, Debug)]
#[command(name = "solver-regress")]
#[command(version = HARNESS_VERSION)]
#[command(about = "Run the benchmark suites against the solver and compare with golden outputs", long_about = None)]
pub struct Cli {
    /// Repository root holding tests/ and the solver library
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Solver program (default: $SOLVER_REGRESS_SOLVER, then `vine`)
    #[arg(long, value_name = "PROGRAM")]
    pub solver: Option<String>,

    /// JSON reference table to use instead of the embedded netlib values
    #[arg(long = "known-results", value_name = "FILE")]
    pub known_results: Option<PathBuf>,

    /// Show per-test durations
    #[arg(short, long)]
    pub verbose: bool,
}

/// Sort raw netlib instances into fast and slow tiers
#[derive(Parser, Debug)]
#[command(name = "sort-corpus")]
#[command(version = HARNESS_VERSION)]
#[command(about = "Time the solver on each staged instance and move it to the fast or slow tier", long_about = None)]
pub struct SortCli {
    /// Repository root holding tests/netlib
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Solver program (default: $SOLVER_REGRESS_SOLVER, then `vine`)
    #[arg(long, value_name = "PROGRAM")]
    pub solver: Option<String>,

    /// Seconds a run may take before the instance counts as slow
    #[arg(long = "timeout-secs", value_name = "SECS", default_value_t = 10)]
    pub timeout_secs: u64,
}

// ============================================================================
// CLI entry points
// ============================================================================

/// Regression harness entry point.
///
/// This and [`run_sort`] are the only places where `process::exit` is called.
pub fn run() {
    let cli = Cli::parse();
    exit_with(commands::run_harness(&cli));
}

/// Corpus classifier entry point.
pub fn run_sort() {
    let cli = SortCli::parse();
    exit_with(commands::sort_corpus(&cli));
}

fn exit_with(result: CliResult<ExitCode>) {
    match result {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
