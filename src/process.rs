//! Solver process execution
//!
//! One primitive, [`ProcessRunner::execute`], shared by the regression harness
//! and the corpus classifier. The two callers differ only in their
//! [`WaitPolicy`]: the harness waits as long as the solver needs, the
//! classifier kills the solver once its time bound expires.
//!
//! stdin is fed and stdout/stderr are drained on helper threads so a child
//! that fills one pipe while we block on another cannot deadlock the run.
//! After a timeout the helpers are detached rather than joined: a descendant
//! of the killed solver may still hold the pipes open.

use std::ffi::{OsStr, OsString};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Errors from starting or waiting on a child process.
///
/// A non-zero exit status is *not* an error; it is reported in [`ExecutionResult::exit_code`].
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// How long to wait for a child before giving up on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Block until the child exits.
    Unbounded,
    /// Kill the child once this much wall-clock time has passed.
    Bounded(Duration),
}

/// A command to run, with optional data for its stdin.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    /// Bytes written to the child's stdin; `None` gives the child a null stdin
    pub stdin: Option<Vec<u8>>,
    pub current_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            stdin: None,
            current_dir: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn stdin(mut self, data: Vec<u8>) -> Self {
        self.stdin = Some(data);
        self
    }

    pub fn current_dir(mut self, dir: Option<&Path>) -> Self {
        self.current_dir = dir.map(Path::to_path_buf);
        self
    }

    /// The program name as text, for diagnostics.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// The full command line as text, for diagnostics.
    pub fn command_line(&self) -> String {
        let mut line = self.program_name();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// What a finished (or killed) solver run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code; `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub timed_out: bool,
}

impl ExecutionResult {
    /// True when the process ran to completion with exit code 0.
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Executes solver invocations.
///
/// The harness and classifier talk to the solver only through this trait, so
/// their control flow can be exercised without a real solver.
pub trait SolverExecutor {
    fn execute(&self, invocation: &Invocation, policy: WaitPolicy) -> Result<ExecutionResult, ProcessError>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// How often a bounded wait checks on the child
    pub poll_interval: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SolverExecutor for ProcessRunner {
    fn execute(&self, invocation: &Invocation, policy: WaitPolicy) -> Result<ExecutionResult, ProcessError> {
        let start = Instant::now();
        tracing::debug!(command = %invocation.command_line(), ?policy, "spawning solver");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.current_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            program: invocation.program_name(),
            source,
        })?;

        let writer = match (&invocation.stdin, child.stdin.take()) {
            (Some(data), Some(pipe)) => Some(spawn_writer(pipe, data.clone())),
            _ => None,
        };
        let stdout_capture = child.stdout.take().map(PipeCapture::spawn);
        let stderr_capture = child.stderr.take().map(PipeCapture::spawn);

        let waited = match policy {
            WaitPolicy::Unbounded => child.wait().map(|status| (status, false)),
            WaitPolicy::Bounded(limit) => wait_bounded(&mut child, limit, self.poll_interval),
        };
        let (status, timed_out) = match waited {
            Ok(waited) => waited,
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProcessError::Wait {
                    program: invocation.program_name(),
                    source,
                });
            }
        };

        let duration = start.elapsed();

        let (stdout, stderr) = if timed_out {
            // Keep what arrived before the kill; joining could block on a surviving descendant.
            drop(writer);
            (PipeCapture::snapshot(stdout_capture), PipeCapture::snapshot(stderr_capture))
        } else {
            if let Some(writer) = writer {
                let _ = writer.join();
            }
            (PipeCapture::finish(stdout_capture), PipeCapture::finish(stderr_capture))
        };

        let result = ExecutionResult {
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            duration,
            timed_out,
        };
        tracing::debug!(
            exit_code = ?result.exit_code,
            timed_out = result.timed_out,
            duration_ms = result.duration.as_millis() as u64,
            "solver finished"
        );
        Ok(result)
    }
}

/// Poll the child until it exits or `limit` passes; on expiry kill and reap it.
fn wait_bounded(child: &mut Child, limit: Duration, poll_interval: Duration) -> io::Result<(ExitStatus, bool)> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if started.elapsed() >= limit {
            // The child may exit between try_wait and kill; wait() still reaps it.
            let _ = child.kill();
            let status = child.wait()?;
            return Ok((status, true));
        }
        thread::sleep(poll_interval);
    }
}

fn spawn_writer<W: Write + Send + 'static>(mut pipe: W, data: Vec<u8>) -> JoinHandle<()> {
    thread::spawn(move || {
        // EPIPE here just means the child stopped reading early.
        if let Err(e) = pipe.write_all(&data) {
            tracing::debug!("stdin write ended early: {}", e);
        }
    })
}

/// A reader thread draining one output pipe into a shared buffer.
struct PipeCapture {
    handle: JoinHandle<()>,
    buf: Arc<Mutex<Vec<u8>>>,
}

impl PipeCapture {
    fn spawn<R: Read + Send + 'static>(mut pipe: R) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let handle = thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => sink.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(&chunk[..n]),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
        });
        Self { handle, buf }
    }

    /// Wait for the pipe to close and return everything it carried.
    fn finish(capture: Option<Self>) -> Vec<u8> {
        match capture {
            Some(capture) => {
                let PipeCapture { handle, buf } = capture;
                let _ = handle.join();
                let mut buf = buf.lock().unwrap_or_else(PoisonError::into_inner);
                std::mem::take(&mut *buf)
            }
            None => Vec::new(),
        }
    }

    /// Return what has been read so far and leave the thread detached.
    fn snapshot(capture: Option<Self>) -> Vec<u8> {
        capture.map(Self::take).unwrap_or_default()
    }

    fn take(self) -> Vec<u8> {
        let mut buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *buf)
    }
}
