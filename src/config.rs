//! Harness and classifier configuration
//!
//! Defaults reproduce the repository layout the harness has always run against:
//! the solver is `vine`, test suites live under `tests/`, and golden outputs
//! under `tests/outputs/`. Every path is relative to a base directory (the
//! `--root` flag, `.` by default).

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted for the solver program when no flag is given.
pub const SOLVER_ENV_VAR: &str = "SOLVER_REGRESS_SOLVER";

/// Solver program used when neither the flag nor the environment names one.
pub const DEFAULT_SOLVER: &str = "vine";

/// Wall-clock bound used by the classifier.
pub const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(10);

/// How a suite hands problem data to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    /// Each file is a problem program passed as a command-line argument.
    DirectFile,
    /// Each file is raw problem data piped on stdin to a shared driver.
    PipedStdin,
}

/// How the solver command line is assembled.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Program to spawn (looked up on `PATH` when not a path)
    pub program: String,
    /// Pass `--no-stats` after the `run` subcommand
    pub no_stats: bool,
    /// Library loaded with `--lib`
    pub library: Option<PathBuf>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_SOLVER.to_string(),
            no_stats: true,
            library: Some(PathBuf::from("liana/liana.vi")),
        }
    }
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the solver program
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Set or clear the `--lib` argument
    pub fn with_library(mut self, library: Option<PathBuf>) -> Self {
        self.library = library;
        self
    }

    /// Toggle `--no-stats`
    pub fn with_no_stats(mut self, no_stats: bool) -> Self {
        self.no_stats = no_stats;
        self
    }

    /// Arguments for running `program_file`: `run [--no-stats] <file> [--lib <library>]`.
    pub fn run_args(&self, program_file: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["run".into()];
        if self.no_stats {
            args.push("--no-stats".into());
        }
        args.push(program_file.as_os_str().to_os_string());
        if let Some(lib) = &self.library {
            args.push("--lib".into());
            args.push(lib.as_os_str().to_os_string());
        }
        args
    }
}

/// One benchmark suite.
#[derive(Debug, Clone)]
pub struct SuiteConfig {
    /// Suite name; also the golden sub-directory (may contain `/`)
    pub name: String,
    /// Directory holding the test files
    pub dir: PathBuf,
    pub mode: InvocationMode,
    /// Driver program for piped suites
    pub driver: Option<PathBuf>,
}

impl SuiteConfig {
    /// A suite whose files are passed directly to the solver.
    pub fn direct(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            mode: InvocationMode::DirectFile,
            driver: None,
        }
    }

    /// A suite whose files are piped to `driver` on stdin.
    pub fn piped(name: impl Into<String>, dir: impl Into<PathBuf>, driver: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            mode: InvocationMode::PipedStdin,
            driver: Some(driver.into()),
        }
    }

    fn rebased(mut self, root: &Path) -> Self {
        self.dir = root.join(&self.dir);
        self.driver = self.driver.map(|d| root.join(d));
        self
    }
}

/// Configuration for the regression harness.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub solver: SolverConfig,
    /// Suites, run in this order
    pub suites: Vec<SuiteConfig>,
    /// Root of the golden output tree
    pub outputs_dir: PathBuf,
    /// Working directory for solver processes (`None` inherits ours)
    pub solver_cwd: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            suites: vec![
                SuiteConfig::direct("linear_programs", "tests/linear_programs"),
                SuiteConfig::piped("netlib/small", "tests/netlib/small", "tests/test_mps.vi"),
            ],
            outputs_dir: PathBuf::from("tests/outputs"),
            solver_cwd: None,
        }
    }
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every relative path against `root` and run the solver from there.
    ///
    /// `root` must be absolute, since it also becomes the solver's working
    /// directory. The `--lib` path stays relative and resolves from there.
    pub fn with_root(mut self, root: &Path) -> Self {
        self.suites = self.suites.into_iter().map(|s| s.rebased(root)).collect();
        self.outputs_dir = root.join(&self.outputs_dir);
        self.solver_cwd = Some(root.to_path_buf());
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_suites(mut self, suites: Vec<SuiteConfig>) -> Self {
        self.suites = suites;
        self
    }

    pub fn with_outputs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.outputs_dir = dir.into();
        self
    }
}

/// Configuration for the fast/slow corpus classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Solver program
    pub program: String,
    /// Driver program the raw data is piped to
    pub driver: PathBuf,
    /// Directory holding unsorted files
    pub staging_dir: PathBuf,
    /// Destination for files that finish within the timeout
    pub fast_dir: PathBuf,
    /// Destination for files that exceed it
    pub slow_dir: PathBuf,
    pub timeout: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_SOLVER.to_string(),
            driver: PathBuf::from("tests/test_mps.vi"),
            staging_dir: PathBuf::from("tests/netlib"),
            fast_dir: PathBuf::from("tests/netlib/small"),
            slow_dir: PathBuf::from("tests/netlib/large"),
            timeout: DEFAULT_CLASSIFIER_TIMEOUT,
        }
    }
}

impl ClassifierConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every relative path against `root`.
    pub fn with_root(mut self, root: &Path) -> Self {
        self.driver = root.join(&self.driver);
        self.staging_dir = root.join(&self.staging_dir);
        self.fast_dir = root.join(&self.fast_dir);
        self.slow_dir = root.join(&self.slow_dir);
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments for one classifier run: `run <driver>`.
    pub fn run_args(&self) -> Vec<OsString> {
        vec!["run".into(), self.driver.as_os_str().to_os_string()]
    }
}

/// Pick the solver program: explicit flag, then `SOLVER_REGRESS_SOLVER`, then `vine`.
pub fn resolve_solver_program(flag: Option<&str>) -> String {
    if let Some(program) = flag {
        return program.to_string();
    }
    match env::var(SOLVER_ENV_VAR) {
        Ok(program) if !program.trim().is_empty() => program,
        _ => DEFAULT_SOLVER.to_string(),
    }
}
