#![forbid(unsafe_code)]
//! Regression harness for an external optimization solver
//!
//! Runs the solver over benchmark suites, compares each run with the golden
//! output recorded by the previous run, and exits non-zero when anything
//! changed. A second tool partitions a raw netlib corpus into fast and slow
//! tiers by timing the solver on each instance.
//!
//! ## Layout
//!
//! - [`process`] - spawn the solver, capture its output, optional time bound
//! - [`catalog`] - discover test cases in suite directories
//! - [`golden`] - baseline storage
//! - [`reference`] - known-optimal values and their label format
//! - [`oracle`] - pass/fail decision and next baseline
//! - [`cli`] - test loop, reporting, corpus classifier, entry points
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod errors;
pub mod golden;
pub mod oracle;
pub mod process;
pub mod reference;
pub mod version;

pub use catalog::{TestCase, discover};
pub use config::{ClassifierConfig, HarnessConfig, InvocationMode, SolverConfig, SuiteConfig};
pub use errors::{FailureKind, HarnessError};
pub use golden::GoldenStore;
pub use oracle::{Evaluation, TestOutcome, evaluate};
pub use process::{ExecutionResult, Invocation, ProcessError, ProcessRunner, SolverExecutor, WaitPolicy};
pub use reference::{ReferenceTable, format_reference_value};
