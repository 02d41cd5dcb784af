//! Fast/slow corpus partitioning
//!
//! Pipes every file in the staging directory to the solver driver under a
//! wall-clock bound. Files whose run completes in time (whatever the exit
//! status) move to the fast tier, files that hit the bound move to the slow
//! tier, and files that could not be run stay where they are. Each input file
//! lands in exactly one of those three places.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::ClassifierConfig;
use crate::errors::HarnessError;
use crate::process::{Invocation, SolverExecutor, WaitPolicy};

/// Where a staged file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Fast,
    Slow,
    /// Not moved; carries the reason
    LeftInPlace(String),
}

/// Per-file placements from one classifier pass, in processing order.
#[derive(Debug, Clone, Default)]
pub struct ClassificationReport {
    pub entries: Vec<(String, Placement)>,
}

impl ClassificationReport {
    pub fn placement(&self, file_name: &str) -> Option<&Placement> {
        self.entries.iter().find(|(name, _)| name == file_name).map(|(_, p)| p)
    }

    pub fn fast_count(&self) -> usize {
        self.entries.iter().filter(|(_, p)| *p == Placement::Fast).count()
    }

    pub fn slow_count(&self) -> usize {
        self.entries.iter().filter(|(_, p)| *p == Placement::Slow).count()
    }

    pub fn left_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, p)| matches!(p, Placement::LeftInPlace(_)))
            .count()
    }
}

/// Classify every staged file once.
pub fn classify_corpus(
    config: &ClassifierConfig,
    executor: &dyn SolverExecutor,
) -> Result<ClassificationReport, HarnessError> {
    for dir in [&config.staging_dir, &config.fast_dir, &config.slow_dir] {
        fs::create_dir_all(dir).map_err(|e| HarnessError::io(dir, e))?;
    }

    let mut report = ClassificationReport::default();
    for path in staged_files(&config.staging_dir)? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let placement = classify_file(config, executor, &path, &name);
        report.entries.push((name, placement));
    }

    println!();
    println!("Sorting complete!");
    tracing::info!(
        "classified {} file(s): {} fast, {} slow, {} left in place",
        report.entries.len(),
        report.fast_count(),
        report.slow_count(),
        report.left_count()
    );
    Ok(report)
}

fn classify_file(config: &ClassifierConfig, executor: &dyn SolverExecutor, path: &Path, name: &str) -> Placement {
    println!("Testing {}...", name);

    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            println!("✗ Error processing {}: {}", name, e);
            return Placement::LeftInPlace(e.to_string());
        }
    };

    let invocation = Invocation::new(&config.program).args(config.run_args()).stdin(data);
    let (placement, target_dir) = match executor.execute(&invocation, WaitPolicy::Bounded(config.timeout)) {
        Ok(result) if result.timed_out => {
            println!("⚠ {} took too long", name);
            (Placement::Slow, &config.slow_dir)
        }
        Ok(_) => {
            println!("✓ {} completed in time", name);
            (Placement::Fast, &config.fast_dir)
        }
        Err(e) => {
            println!("✗ Error processing {}: {}", name, e);
            return Placement::LeftInPlace(e.to_string());
        }
    };

    match move_file(path, &target_dir.join(name)) {
        Ok(()) => placement,
        Err(e) => {
            println!("Error moving {}: {}", name, e);
            Placement::LeftInPlace(e.to_string())
        }
    }
}

/// Regular files (not symlinks) directly in `dir`, sorted by name.
fn staged_files(dir: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    let entries = fs::read_dir(dir).map_err(|e| HarnessError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| HarnessError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| HarnessError::io(entry.path(), e))?;
        if file_type.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Move a file, falling back to copy + remove across filesystems.
///
/// On failure the source is still in place and no copy is left behind. A file
/// already present at `to` before the move is never removed.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    let preexisting = fs::symlink_metadata(to).is_ok();
    let discard_copy = || {
        if !preexisting {
            let _ = fs::remove_file(to);
        }
    };
    if let Err(e) = fs::copy(from, to) {
        discard_copy();
        return Err(e);
    }
    if let Err(e) = fs::remove_file(from) {
        discard_copy();
        return Err(e);
    }
    Ok(())
}
