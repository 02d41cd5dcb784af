//! Regression test loop and reporting
//!
//! ## HarnessReporter Trait
//!
//! The loop in [`run_suites`] reports through the `HarnessReporter` trait so
//! that what gets printed is separate from what gets executed.
//! [`ConsoleReporter`] produces the line-oriented output CI logs rely on:
//!
//! ```text
//! Running netlib/small tests
//!   Running test afiro: PASSED
//!   Running test blend: FAILED
//! Passed 1/2 tests
//! ```
//!
//! ## Failure isolation
//!
//! Nothing that goes wrong inside one test case stops the loop. Spawn errors,
//! bad exits, mismatches and baseline I/O problems all become a
//! [`TestOutcome::Failed`] for that case. Only a missing suite directory (or a
//! golden directory that cannot be created) aborts the run.

use std::fs;
use std::io::{self, Write};

use crate::catalog::{self, TestCase};
use crate::config::{HarnessConfig, InvocationMode, SuiteConfig};
use crate::errors::{FailureKind, HarnessError};
use crate::golden::GoldenStore;
use crate::oracle::{self, TestOutcome};
use crate::process::{ExecutionResult, Invocation, SolverExecutor, WaitPolicy};
use crate::reference::ReferenceTable;

use super::ExitCode;

// ============================================================================
// Run summary
// ============================================================================

/// Counts folded over test outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ran: usize,
    pub passed: usize,
}

impl RunSummary {
    /// Fold one outcome into the summary.
    pub fn record(self, outcome: &TestOutcome) -> Self {
        Self {
            ran: self.ran + 1,
            passed: self.passed + usize::from(outcome.is_passed()),
        }
    }

    /// Combine two partial summaries.
    pub fn merge(self, other: RunSummary) -> Self {
        Self {
            ran: self.ran + other.ran,
            passed: self.passed + other.passed,
        }
    }

    pub fn failed(&self) -> usize {
        self.ran - self.passed
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.ran
    }

    /// 0 when every test passed (including an empty run), 1 otherwise.
    pub fn exit_code(&self) -> ExitCode {
        if self.all_passed() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

impl<'a> FromIterator<&'a TestOutcome> for RunSummary {
    fn from_iter<I: IntoIterator<Item = &'a TestOutcome>>(iter: I) -> Self {
        iter.into_iter().fold(RunSummary::default(), RunSummary::record)
    }
}

/// What happened to one test case.
#[derive(Debug, Clone)]
pub struct TestRecord {
    pub outcome: TestOutcome,
    /// The solver run, when the solver could be started
    pub execution: Option<ExecutionResult>,
}

impl TestRecord {
    fn not_run(kind: FailureKind) -> Self {
        Self {
            outcome: TestOutcome::Failed(kind),
            execution: None,
        }
    }
}

// ============================================================================
// Reporter trait
// ============================================================================

/// Receives progress events from [`run_suites`].
pub trait HarnessReporter {
    /// Called before the first test of a suite runs
    fn on_suite_start(&mut self, _suite: &SuiteConfig) {}

    /// Called right before a test case executes
    fn on_test_start(&mut self, test: &TestCase);

    /// Called once a test case has been evaluated and its baseline written
    fn on_test_complete(&mut self, test: &TestCase, record: &TestRecord);

    /// Called after the last suite
    fn on_run_complete(&mut self, summary: &RunSummary);
}

/// Plain-text reporter writing to stdout (or any writer in tests).
pub struct ConsoleReporter<W: Write> {
    out: W,
    pub verbose: bool,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout(verbose: bool) -> Self {
        Self::new(io::stdout(), verbose)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self { out, verbose }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> HarnessReporter for ConsoleReporter<W> {
    fn on_suite_start(&mut self, suite: &SuiteConfig) {
        let _ = writeln!(self.out, "Running {} tests", suite.name);
    }

    fn on_test_start(&mut self, test: &TestCase) {
        let _ = write!(self.out, "  Running test {}: ", test.id);
        let _ = self.out.flush();
    }

    fn on_test_complete(&mut self, _test: &TestCase, record: &TestRecord) {
        let status = if record.outcome.is_passed() { "PASSED" } else { "FAILED" };
        let _ = match (&record.execution, self.verbose) {
            (Some(execution), true) => writeln!(self.out, "{} ({}ms)", status, execution.duration.as_millis()),
            _ => writeln!(self.out, "{}", status),
        };

        if let TestOutcome::Failed(kind) = &record.outcome {
            if let Some(execution) = &record.execution {
                if !execution.stderr.is_empty() {
                    let _ = writeln!(self.out, "'{}'", execution.stderr);
                }
            }
            for line in kind.to_string().lines() {
                let _ = writeln!(self.out, "    {}", line);
            }
        }
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        let _ = writeln!(self.out, "Passed {}/{} tests", summary.passed, summary.ran);
        let _ = self.out.flush();
    }
}

// ============================================================================
// Test loop
// ============================================================================

/// Run every configured suite, in order, and return the folded summary.
pub fn run_suites(
    config: &HarnessConfig,
    references: &ReferenceTable,
    store: &GoldenStore,
    executor: &dyn SolverExecutor,
    reporter: &mut dyn HarnessReporter,
) -> Result<RunSummary, HarnessError> {
    check_suites(&config.suites)?;

    let mut summary = RunSummary::default();
    for suite in &config.suites {
        reporter.on_suite_start(suite);
        store.ensure_suite_dir(&suite.name)?;

        let cases = catalog::discover(suite)?;
        let mut suite_summary = RunSummary::default();
        for case in &cases {
            reporter.on_test_start(case);
            let record = run_case(config, suite, case, references, store, executor);
            suite_summary = suite_summary.record(&record.outcome);
            reporter.on_test_complete(case, &record);
        }
        tracing::info!(
            "suite '{}': {}/{} passed, {} failed",
            suite.name,
            suite_summary.passed,
            suite_summary.ran,
            suite_summary.failed()
        );
        summary = summary.merge(suite_summary);
    }

    reporter.on_run_complete(&summary);
    Ok(summary)
}

/// Every suite directory must exist before anything runs.
fn check_suites(suites: &[SuiteConfig]) -> Result<(), HarnessError> {
    for suite in suites {
        if !suite.dir.is_dir() {
            return Err(HarnessError::SuiteMissing {
                suite: suite.name.clone(),
                path: suite.dir.clone(),
            });
        }
    }
    Ok(())
}

/// Build the solver invocation for one case.
fn build_invocation(config: &HarnessConfig, suite: &SuiteConfig, case: &TestCase) -> Result<Invocation, FailureKind> {
    let invocation = Invocation::new(&config.solver.program).current_dir(config.solver_cwd.as_deref());
    match case.mode {
        InvocationMode::DirectFile => Ok(invocation.args(config.solver.run_args(&case.source))),
        InvocationMode::PipedStdin => {
            let Some(driver) = &suite.driver else {
                return Err(FailureKind::Input(format!("suite '{}' has no driver program", suite.name)));
            };
            let data = fs::read(&case.source)
                .map_err(|e| FailureKind::Input(format!("cannot read '{}': {}", case.source.display(), e)))?;
            Ok(invocation.args(config.solver.run_args(driver)).stdin(data))
        }
    }
}

/// Execute, evaluate and persist one case. Never fails; problems become the outcome.
fn run_case(
    config: &HarnessConfig,
    suite: &SuiteConfig,
    case: &TestCase,
    references: &ReferenceTable,
    store: &GoldenStore,
    executor: &dyn SolverExecutor,
) -> TestRecord {
    let invocation = match build_invocation(config, suite, case) {
        Ok(invocation) => invocation,
        Err(kind) => return TestRecord::not_run(kind),
    };

    // The harness never times out a solver run.
    let execution = match executor.execute(&invocation, WaitPolicy::Unbounded) {
        Ok(execution) => execution,
        Err(e) => {
            tracing::warn!("{}: {}", case.id, e);
            return TestRecord::not_run(FailureKind::Spawn(e.to_string()));
        }
    };

    let (prior, read_error) = match store.get(&case.suite, &case.id) {
        Ok(prior) => (prior, None),
        Err(e) => (None, Some(e.to_string())),
    };

    let evaluation = oracle::evaluate(&case.id, references, prior.as_deref(), &execution);
    let mut outcome = match read_error {
        Some(msg) => TestOutcome::Failed(FailureKind::Persistence(msg)),
        None => evaluation.outcome,
    };

    if let Err(e) = store.put(&case.suite, &case.id, &evaluation.new_baseline) {
        tracing::warn!("{}: {}", case.id, e);
        outcome = TestOutcome::Failed(FailureKind::Persistence(e.to_string()));
    }

    TestRecord {
        outcome,
        execution: Some(execution),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::Path;
    use std::time::Duration;

    use super::*;
    use crate::process::ProcessError;

    /// Answers from a table keyed by the last path-like argument (or stdin text).
    struct FakeSolver {
        outputs: HashMap<String, Result<(i32, String), ()>>,
        seen: RefCell<Vec<Invocation>>,
    }

    impl FakeSolver {
        fn new(outputs: &[(&str, Result<(i32, &str), ()>)]) -> Self {
            Self {
                outputs: outputs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.map(|(c, s)| (c, s.to_string()))))
                    .collect(),
                seen: RefCell::new(Vec::new()),
            }
        }

        fn key(invocation: &Invocation) -> String {
            match &invocation.stdin {
                Some(data) => String::from_utf8_lossy(data).trim().to_string(),
                None => {
                    let file = invocation.args.iter().find(|a| a.to_string_lossy().ends_with(".vi")).unwrap();
                    Path::new(file).file_stem().unwrap().to_string_lossy().into_owned()
                }
            }
        }
    }

    impl SolverExecutor for FakeSolver {
        fn execute(&self, invocation: &Invocation, policy: WaitPolicy) -> Result<ExecutionResult, ProcessError> {
            assert_eq!(policy, WaitPolicy::Unbounded);
            self.seen.borrow_mut().push(invocation.clone());
            match self.outputs.get(&Self::key(invocation)) {
                Some(Ok((code, stdout))) => Ok(ExecutionResult {
                    exit_code: Some(*code),
                    stdout: stdout.clone(),
                    stderr: if *code == 0 { String::new() } else { "boom".to_string() },
                    duration: Duration::from_millis(1),
                    timed_out: false,
                }),
                _ => Err(ProcessError::Spawn {
                    program: "vine".to_string(),
                    source: io::Error::new(io::ErrorKind::NotFound, "not found"),
                }),
            }
        }
    }

    /// Keeps every outcome by test id.
    #[derive(Default)]
    struct RecordingReporter {
        outcomes: Vec<(String, TestOutcome)>,
    }

    impl HarnessReporter for RecordingReporter {
        fn on_test_start(&mut self, _test: &TestCase) {}

        fn on_test_complete(&mut self, test: &TestCase, record: &TestRecord) {
            self.outcomes.push((test.id.clone(), record.outcome.clone()));
        }

        fn on_run_complete(&mut self, _summary: &RunSummary) {}
    }

    impl RecordingReporter {
        fn outcome(&self, id: &str) -> &TestOutcome {
            &self.outcomes.iter().find(|(i, _)| i == id).unwrap().1
        }
    }

    fn layout(tmp: &Path) -> HarnessConfig {
        let lp = tmp.join("tests/linear_programs");
        let netlib = tmp.join("tests/netlib/small");
        fs::create_dir_all(&lp).unwrap();
        fs::create_dir_all(&netlib).unwrap();
        fs::write(lp.join("lp1.vi"), "lp1 program").unwrap();
        fs::write(lp.join("lp2.vi"), "lp2 program").unwrap();
        fs::write(netlib.join("afiro"), "afiro\n").unwrap();
        HarnessConfig::default().with_root(tmp)
    }

    fn table() -> ReferenceTable {
        ReferenceTable::from_json(r#"[{"id": "afiro", "value": -464.75314286}]"#).unwrap()
    }

    // ========================================
    // RunSummary
    // ========================================

    #[test]
    fn test_summary_fold_and_exit_code() {
        let outcomes = [
            TestOutcome::Passed,
            TestOutcome::Failed(FailureKind::MissingBaseline),
            TestOutcome::Passed,
        ];
        let summary: RunSummary = outcomes.iter().collect();
        assert_eq!(summary, RunSummary { ran: 3, passed: 2 });
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.exit_code(), ExitCode::FAILURE);
    }

    #[test]
    fn test_empty_summary_succeeds() {
        assert_eq!(RunSummary::default().exit_code(), ExitCode::SUCCESS);
    }

    #[test]
    fn test_summary_merge() {
        let a = RunSummary { ran: 2, passed: 1 };
        let b = RunSummary { ran: 3, passed: 3 };
        assert_eq!(a.merge(b), RunSummary { ran: 5, passed: 4 });
    }

    // ========================================
    // Test loop
    // ========================================

    #[test]
    fn test_first_run_fails_then_passes() {
        let tmp = tempfile::tempdir().unwrap();
        let config = layout(tmp.path());
        let store = GoldenStore::new(&config.outputs_dir);
        let solver = FakeSolver::new(&[
            ("lp1", Ok((0, "x = 1\n"))),
            ("lp2", Ok((0, "x = 2\n"))),
            ("afiro", Ok((0, "obj\n"))),
        ]);

        let mut out = ConsoleReporter::new(Vec::new(), false);
        let first = run_suites(&config, &table(), &store, &solver, &mut out).unwrap();
        assert_eq!(first, RunSummary { ran: 3, passed: 0 });
        assert_eq!(
            store.get("netlib/small", "afiro").unwrap().as_deref(),
            Some("Expected optimal value: -464.75314286\nobj\n")
        );

        let mut out = ConsoleReporter::new(Vec::new(), false);
        let second = run_suites(&config, &table(), &store, &solver, &mut out).unwrap();
        assert_eq!(second, RunSummary { ran: 3, passed: 3 });

        let text = String::from_utf8(out.into_inner()).unwrap();
        insta::assert_snapshot!(text, @r"
        Running linear_programs tests
          Running test lp1: PASSED
          Running test lp2: PASSED
        Running netlib/small tests
          Running test afiro: PASSED
        Passed 3/3 tests
        ");
    }

    #[test]
    fn test_spawn_failure_is_isolated() {
        let tmp = tempfile::tempdir().unwrap();
        let config = layout(tmp.path());
        let store = GoldenStore::new(&config.outputs_dir);
        // lp1 has no entry, so the fake fails to spawn it.
        let solver = FakeSolver::new(&[("lp2", Ok((0, "x = 2\n"))), ("afiro", Ok((0, "obj\n")))]);

        let mut out = ConsoleReporter::new(Vec::new(), false);
        run_suites(&config, &table(), &store, &solver, &mut out).unwrap();
        let summary = run_suites(&config, &table(), &store, &solver, &mut out).unwrap();

        assert_eq!(summary, RunSummary { ran: 3, passed: 2 });
        assert_eq!(solver.seen.borrow().len(), 6);
        // no observation, no baseline
        assert_eq!(store.get("linear_programs", "lp1").unwrap(), None);
    }

    #[test]
    fn test_nonzero_exit_prints_stderr() {
        let tmp = tempfile::tempdir().unwrap();
        let config = layout(tmp.path());
        let store = GoldenStore::new(&config.outputs_dir);
        let solver = FakeSolver::new(&[
            ("lp1", Ok((1, "partial\n"))),
            ("lp2", Ok((0, ""))),
            ("afiro", Ok((0, ""))),
        ]);

        let mut out = ConsoleReporter::new(Vec::new(), false);
        let summary = run_suites(&config, &table(), &store, &solver, &mut out).unwrap();
        assert_eq!(summary.passed, 0);

        let text = String::from_utf8(out.into_inner()).unwrap();
        assert!(text.contains("  Running test lp1: FAILED\n'boom'\n    solver exited with code 1\n"));
        // the failing run still refreshes its baseline
        assert_eq!(store.get("linear_programs", "lp1").unwrap().as_deref(), Some("partial\n"));
    }

    #[test]
    fn test_piped_suite_sends_file_on_stdin_to_driver() {
        let tmp = tempfile::tempdir().unwrap();
        let config = layout(tmp.path());
        let store = GoldenStore::new(&config.outputs_dir);
        let solver = FakeSolver::new(&[
            ("lp1", Ok((0, ""))),
            ("lp2", Ok((0, ""))),
            ("afiro", Ok((0, ""))),
        ]);

        let mut out = ConsoleReporter::new(Vec::new(), false);
        run_suites(&config, &table(), &store, &solver, &mut out).unwrap();

        let seen = solver.seen.borrow();
        let piped = seen.iter().find(|i| i.stdin.is_some()).unwrap();
        assert_eq!(piped.stdin.as_deref(), Some(b"afiro\n".as_slice()));
        let args: Vec<String> = piped.args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args[0], "run");
        assert_eq!(args[1], "--no-stats");
        assert!(args[2].ends_with("tests/test_mps.vi"));
        assert_eq!(&args[3..], ["--lib", "liana/liana.vi"]);
        assert_eq!(piped.current_dir.as_deref(), Some(tmp.path()));
    }

    #[test]
    fn test_missing_suite_dir_aborts_before_running() {
        let tmp = tempfile::tempdir().unwrap();
        let config = layout(tmp.path());
        fs::remove_dir_all(tmp.path().join("tests/netlib/small")).unwrap();
        let store = GoldenStore::new(&config.outputs_dir);
        let solver = FakeSolver::new(&[]);

        let mut out = ConsoleReporter::new(Vec::new(), false);
        let err = run_suites(&config, &table(), &store, &solver, &mut out).unwrap_err();
        assert!(matches!(err, HarnessError::SuiteMissing { ref suite, .. } if suite == "netlib/small"));
        assert!(solver.seen.borrow().is_empty());
    }

    // ========================================
    // Baseline persistence
    // ========================================

    #[test]
    fn test_unreadable_baseline_fails_but_is_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let config = layout(tmp.path());
        let store = GoldenStore::new(&config.outputs_dir);
        store.ensure_suite_dir("linear_programs").unwrap();
        fs::write(store.path_for("linear_programs", "lp1"), [0xff, 0xfe, 0x00]).unwrap();
        let solver = FakeSolver::new(&[
            ("lp1", Ok((0, "x = 1\n"))),
            ("lp2", Ok((0, "x = 2\n"))),
            ("afiro", Ok((0, "obj\n"))),
        ]);

        let mut reporter = RecordingReporter::default();
        let summary = run_suites(&config, &table(), &store, &solver, &mut reporter).unwrap();
        assert_eq!(summary, RunSummary { ran: 3, passed: 0 });
        assert!(matches!(reporter.outcome("lp1"), TestOutcome::Failed(FailureKind::Persistence(_))));
        assert_eq!(reporter.outcome("lp2"), &TestOutcome::Failed(FailureKind::MissingBaseline));
        assert_eq!(reporter.outcome("afiro"), &TestOutcome::Failed(FailureKind::MissingBaseline));
        // the observation still replaced the unreadable baseline
        assert_eq!(store.get("linear_programs", "lp1").unwrap().as_deref(), Some("x = 1\n"));

        let mut reporter = RecordingReporter::default();
        let summary = run_suites(&config, &table(), &store, &solver, &mut reporter).unwrap();
        assert_eq!(summary, RunSummary { ran: 3, passed: 3 });
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_baseline_fails_the_case_only() {
        let tmp = tempfile::tempdir().unwrap();
        let config = layout(tmp.path());
        let store = GoldenStore::new(&config.outputs_dir);
        let solver = FakeSolver::new(&[
            ("lp1", Ok((0, "x = 1\n"))),
            ("lp2", Ok((0, "x = 2\n"))),
            ("afiro", Ok((0, "obj\n"))),
        ]);
        let mut reporter = RecordingReporter::default();
        run_suites(&config, &table(), &store, &solver, &mut reporter).unwrap();

        // A dangling link reads as "no baseline" but cannot be written through.
        let golden = store.path_for("linear_programs", "lp1");
        fs::remove_file(&golden).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("gone/lp1.out"), &golden).unwrap();

        let mut reporter = RecordingReporter::default();
        let summary = run_suites(&config, &table(), &store, &solver, &mut reporter).unwrap();
        assert_eq!(summary, RunSummary { ran: 3, passed: 2 });
        match reporter.outcome("lp1") {
            TestOutcome::Failed(FailureKind::Persistence(msg)) => assert!(msg.contains("lp1.out")),
            other => panic!("expected persistence failure, got {:?}", other),
        }
        assert_eq!(reporter.outcome("lp2"), &TestOutcome::Passed);
        assert_eq!(reporter.outcome("afiro"), &TestOutcome::Passed);
    }

    #[test]
    fn test_piped_suite_without_driver_is_an_input_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = layout(tmp.path());
        config.suites[1].driver = None;
        let store = GoldenStore::new(&config.outputs_dir);
        let solver = FakeSolver::new(&[("lp1", Ok((0, ""))), ("lp2", Ok((0, "")))]);

        let mut reporter = RecordingReporter::default();
        let summary = run_suites(&config, &table(), &store, &solver, &mut reporter).unwrap();
        assert_eq!(summary.ran, 3);
        assert!(matches!(reporter.outcome("afiro"), TestOutcome::Failed(FailureKind::Input(_))));
        assert_eq!(solver.seen.borrow().len(), 2);
    }

    // ========================================
    // Console output
    // ========================================

    #[test]
    fn test_verbose_output_shows_durations() {
        let tmp = tempfile::tempdir().unwrap();
        let config = layout(tmp.path());
        let store = GoldenStore::new(&config.outputs_dir);
        let solver = FakeSolver::new(&[
            ("lp1", Ok((0, "x = 1\n"))),
            ("lp2", Ok((0, "x = 2\n"))),
        ]);

        let mut out = ConsoleReporter::new(Vec::new(), true);
        run_suites(&config, &table(), &store, &solver, &mut out).unwrap();

        let text = String::from_utf8(out.into_inner()).unwrap();
        insta::assert_snapshot!(text, @r"
        Running linear_programs tests
          Running test lp1: FAILED (1ms)
            no baseline recorded yet
          Running test lp2: FAILED (1ms)
            no baseline recorded yet
        Running netlib/small tests
          Running test afiro: FAILED
            failed to start solver: failed to spawn 'vine': not found
        Passed 0/3 tests
        ");
    }
}
