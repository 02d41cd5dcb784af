//! Test case discovery
//!
//! Every regular file directly inside a suite directory is one test case.
//! Subdirectories are not descended into; for the netlib suites they hold
//! other corpus tiers.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{InvocationMode, SuiteConfig};
use crate::errors::HarnessError;

/// One discovered test case. Identity is `(suite, id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub id: String,
    pub suite: String,
    pub mode: InvocationMode,
    pub source: PathBuf,
}

/// Derive the test id from a file name.
///
/// Direct-file suites drop everything from the first `.` (`lp1.vi` → `lp1`).
/// Piped suites keep the whole name, because netlib instance names such as
/// `pilot.we` contain a dot themselves.
pub fn test_id(file_name: &str, mode: InvocationMode) -> String {
    match mode {
        InvocationMode::DirectFile => file_name.split('.').next().unwrap_or(file_name).to_string(),
        InvocationMode::PipedStdin => file_name.to_string(),
    }
}

/// List the test cases of `suite`, sorted by id.
pub fn discover(suite: &SuiteConfig) -> Result<Vec<TestCase>, HarnessError> {
    if !suite.dir.is_dir() {
        return Err(HarnessError::SuiteMissing {
            suite: suite.name.clone(),
            path: suite.dir.clone(),
        });
    }

    let mut cases = Vec::new();
    for entry in regular_files(&suite.dir)? {
        let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
            tracing::warn!("skipping non-UTF-8 file name {}", entry.display());
            continue;
        };
        cases.push(TestCase {
            id: test_id(name, suite.mode),
            suite: suite.name.clone(),
            mode: suite.mode,
            source: entry,
        });
    }

    cases.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.source.cmp(&b.source)));
    tracing::debug!("suite '{}': discovered {} test case(s)", suite.name, cases.len());
    Ok(cases)
}

/// Regular files directly inside `dir` (symlinks to files count).
fn regular_files(dir: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    let entries = fs::read_dir(dir).map_err(|e| HarnessError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| HarnessError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}
