//! Pass/fail decisions
//!
//! A run passes when the solver exited cleanly and its *observation* equals the
//! stored baseline byte for byte. The observation is the solver's stdout,
//! prefixed with the reference-value label line when the test id has one.
//!
//! The baseline is then replaced by the observation whatever the outcome, so
//! the harness detects regressions against its own previous run. The numeric
//! reference value is never compared with a tolerance; it only has to keep
//! appearing in the same textual form.

use crate::errors::FailureKind;
use crate::process::ExecutionResult;
use crate::reference::ReferenceTable;

/// Outcome of a single test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed(FailureKind),
}

impl TestOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, TestOutcome::Passed)
    }
}

/// Result of evaluating one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub outcome: TestOutcome,
    /// Text to persist as the next baseline
    pub new_baseline: String,
}

/// Compare an execution against the stored baseline.
pub fn evaluate(
    test_id: &str,
    references: &ReferenceTable,
    prior_baseline: Option<&str>,
    result: &ExecutionResult,
) -> Evaluation {
    let observed = format!("{}{}", references.expected_prefix(test_id), result.stdout);

    let outcome = if result.succeeded() {
        match prior_baseline {
            None => TestOutcome::Failed(FailureKind::MissingBaseline),
            Some(prior) if prior == observed => TestOutcome::Passed,
            Some(prior) => TestOutcome::Failed(FailureKind::OutputMismatch {
                diff: line_diff(prior, &observed),
            }),
        }
    } else if result.timed_out {
        TestOutcome::Failed(FailureKind::Timeout)
    } else {
        TestOutcome::Failed(FailureKind::NonZeroExit(result.exit_code))
    };

    Evaluation {
        outcome,
        new_baseline: observed,
    }
}

/// Line-by-line diff of `expected` against `actual`.
///
/// `-` lines come from the baseline, `+` lines from the new observation. When
/// the texts differ only in a trailing newline a note says so, since no line
/// would show up otherwise.
pub fn line_diff(expected: &str, actual: &str) -> String {
    let mut diff = String::new();
    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();

    let max_lines = expected_lines.len().max(actual_lines.len());
    for i in 0..max_lines {
        let exp = expected_lines.get(i);
        let act = actual_lines.get(i);
        if exp != act {
            if let Some(exp) = exp {
                diff.push_str(&format!("-{:4} | {}\n", i + 1, exp));
            }
            if let Some(act) = act {
                diff.push_str(&format!("+{:4} | {}\n", i + 1, act));
            }
        }
    }

    if diff.is_empty() && expected != actual {
        diff.push_str("(texts differ only in line endings)\n");
    }
    diff
}
