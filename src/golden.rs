//! Golden (baseline) output storage
//!
//! One text file per test id, laid out as `<root>/<suite>/<id>.out`. Suite
//! names containing `/` become nested directories.
//!
//! A baseline is a rolling snapshot: the harness overwrites it after every run
//! with whatever it just observed. It is never a locked reference.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::errors::HarnessError;

/// Extension of golden files.
pub const GOLDEN_EXTENSION: &str = "out";

/// Reads and writes baselines below a root directory.
#[derive(Debug, Clone)]
pub struct GoldenStore {
    root: PathBuf,
}

impl GoldenStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the baselines of `suite`.
    pub fn suite_dir(&self, suite: &str) -> PathBuf {
        suite.split('/').filter(|s| !s.is_empty()).fold(self.root.clone(), |dir, s| dir.join(s))
    }

    /// Path of the baseline for `(suite, id)`.
    pub fn path_for(&self, suite: &str, id: &str) -> PathBuf {
        self.suite_dir(suite).join(format!("{}.{}", id, GOLDEN_EXTENSION))
    }

    /// Create the suite directory if it does not exist yet.
    pub fn ensure_suite_dir(&self, suite: &str) -> Result<PathBuf, HarnessError> {
        let dir = self.suite_dir(suite);
        fs::create_dir_all(&dir).map_err(|e| HarnessError::io(&dir, e))?;
        Ok(dir)
    }

    /// The stored baseline, or `None` on first encounter.
    pub fn get(&self, suite: &str, id: &str) -> Result<Option<String>, HarnessError> {
        let path = self.path_for(suite, id);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HarnessError::io(path, e)),
        }
    }

    /// Overwrite the baseline for `(suite, id)`.
    pub fn put(&self, suite: &str, id: &str, text: &str) -> Result<(), HarnessError> {
        self.ensure_suite_dir(suite)?;
        let path = self.path_for(suite, id);
        fs::write(&path, text).map_err(|e| HarnessError::io(&path, e))?;
        tracing::debug!("wrote baseline {}", path.display());
        Ok(())
    }
}
