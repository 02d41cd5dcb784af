//! Error and failure types shared by the harness and the classifier.
//!
//! Two layers:
//!
//! - [`HarnessError`] is for environment-level problems that stop a run (a suite directory is missing, the
//!   reference table does not parse). These propagate with `?` up to the CLI boundary.
//! - [`FailureKind`] describes why a *single* test case failed. It is data, not an error: the reporter records it
//!   and moves on to the next case.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a harness or classifier run.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("suite '{suite}' directory not found: {}", path.display())]
    SuiteMissing { suite: String, path: PathBuf },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid reference table: {0}")]
    ReferenceTable(String),
}

impl HarnessError {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a single test case failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The solver could not be started at all.
    Spawn(String),
    /// The problem data for a piped run could not be prepared.
    Input(String),
    /// The solver was killed after exceeding its wait bound.
    Timeout,
    /// The solver ran to completion with a non-zero (or signal) status.
    NonZeroExit(Option<i32>),
    /// No baseline was recorded for this test id yet.
    MissingBaseline,
    /// The observation differs from the stored baseline.
    OutputMismatch { diff: String },
    /// The baseline could not be read or written.
    Persistence(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Spawn(msg) => write!(f, "failed to start solver: {}", msg),
            FailureKind::Input(msg) => write!(f, "could not prepare solver input: {}", msg),
            FailureKind::Timeout => write!(f, "solver timed out"),
            FailureKind::NonZeroExit(Some(code)) => write!(f, "solver exited with code {}", code),
            FailureKind::NonZeroExit(None) => write!(f, "solver terminated by signal"),
            FailureKind::MissingBaseline => write!(f, "no baseline recorded yet"),
            FailureKind::OutputMismatch { diff } => write!(f, "output differs from baseline:\n{}", diff),
            FailureKind::Persistence(msg) => write!(f, "baseline persistence failed: {}", msg),
        }
    }
}
