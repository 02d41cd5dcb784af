//! sort-corpus binary entry point
//!
//! Run with: sort-corpus [--root DIR] [--timeout-secs N]
//!
//! Moves each file in tests/netlib into tests/netlib/small or tests/netlib/large
//! depending on whether the solver finishes it within the timeout.

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    solver_regress::cli::run_sort();
}
