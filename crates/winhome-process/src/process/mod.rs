//! Bounded subprocess execution.
//!
//! [`run`] spawns a child with piped standard streams, writes the optional
//! stdin payload from a helper thread and closes the pipe, drains stderr into
//! the log line by line, and collects stdout up to a byte cap. The calling
//! thread polls for exit against a deadline. A child that outlives the
//! deadline or overruns the cap is killed and reported as an error; no
//! partial output is returned in either case.

use std::borrow::Cow;
use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

/// Tracing target for subprocess operations.
const PROCESS_TARGET: &str = "winhome_process::process";

/// Interval between exit polls.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Time allowed for stderr to reach EOF once the child has exited.
const STDERR_GRACE: Duration = Duration::from_millis(250);

/// Upper bound on retained stderr text.
const STDERR_RETAIN_LIMIT: usize = 64 * 1024;

/// Default wall-clock budget for a command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Default stdout cap for a command.
pub const DEFAULT_OUTPUT_LIMIT: usize = 16 * 1024 * 1024;

const READ_CHUNK: usize = 8 * 1024;

/// Description of a process to run.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use winhome_process::{ProcessCommand, run};
///
/// let command = ProcessCommand::new("git")
///     .args(["--version"])
///     .timeout(Duration::from_secs(5));
/// let output = run(&command)?;
/// assert!(output.success());
/// # Ok::<(), winhome_process::ProcessError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    envs: Vec<(OsString, OsString)>,
    stdin: Option<Vec<u8>>,
    timeout: Duration,
    output_limit: usize,
    label: String,
    stderr_as_warning: bool,
}

impl ProcessCommand {
    /// Creates a command for `program` with default budgets.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let label = program
            .file_name()
            .map_or_else(|| program.display().to_string(), |name| {
                name.to_string_lossy().into_owned()
            });
        Self {
            program,
            args: Vec::new(),
            current_dir: None,
            envs: Vec::new(),
            stdin: None,
            timeout: DEFAULT_TIMEOUT,
            output_limit: DEFAULT_OUTPUT_LIMIT,
            label,
            stderr_as_warning: false,
        }
    }

    /// Appends arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory of the child.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Adds an environment variable to the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Bytes written to the child's stdin before the pipe is closed.
    #[must_use]
    pub fn stdin(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(payload.into());
        self
    }

    /// Overrides the wall-clock budget.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the stdout cap in bytes.
    #[must_use]
    pub const fn output_limit(mut self, limit: usize) -> Self {
        self.output_limit = limit;
        self
    }

    /// Name used in log events instead of the program file name.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Logs stderr lines at `warn` rather than `debug`.
    #[must_use]
    pub const fn stderr_as_warning(mut self, enabled: bool) -> Self {
        self.stderr_as_warning = enabled;
        self
    }

    /// Program to execute.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments passed to the program.
    #[must_use]
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Configured working directory, if any.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Configured wall-clock budget.
    #[must_use]
    pub const fn timeout_budget(&self) -> Duration {
        self.timeout
    }

    /// Configured stdout cap.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.output_limit
    }
}

/// Captured result of a process that exited on its own.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Raw stdout bytes.
    pub stdout: Vec<u8>,
    /// Retained stderr text.
    pub stderr: String,
}

impl ProcessOutput {
    /// Returns `true` when the process exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Stdout decoded lossily as UTF-8.
    #[must_use]
    pub fn stdout_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }
}

/// Failures of [`run`].
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    /// The program could not be started.
    #[error("failed to start '{}': {source}", program.display())]
    Spawn {
        /// Program that was launched.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// Communicating with or waiting on the child failed.
    #[error("I/O error while running '{}': {source}", program.display())]
    Io {
        /// Program that was launched.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The child did not finish within its budget and was killed.
    #[error("'{}' timed out after {}ms and was killed", program.display(), timeout.as_millis())]
    Timeout {
        /// Program that was launched.
        program: PathBuf,
        /// Budget that was exceeded.
        timeout: Duration,
    },
    /// The child wrote more than the stdout cap and was killed.
    #[error("'{}' exceeded the output size limit of {limit} bytes and was killed", program.display())]
    OutputLimit {
        /// Program that was launched.
        program: PathBuf,
        /// Cap that was exceeded.
        limit: usize,
    },
}

/// Seam over [`run`] so callers can substitute scripted outputs in tests.
pub trait ProcessRunner: Send + Sync {
    /// Runs the command to completion.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessError`] when the process cannot be started, times
    /// out, overruns its output cap, or its pipes fail.
    fn run(&self, command: &ProcessCommand) -> Result<ProcessOutput, ProcessError>;
}

/// [`ProcessRunner`] that spawns real processes via [`run`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, command: &ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        run(command)
    }
}

/// Spawns the command and waits for it under its deadline and output cap.
///
/// # Errors
///
/// See [`ProcessRunner::run`].
pub fn run(command: &ProcessCommand) -> Result<ProcessOutput, ProcessError> {
    let mut child = spawn(command)?;
    let deadline = Instant::now() + command.timeout;
    let program = command.program.clone();

    if let Some(pipe) = child.stdin.take() {
        spawn_stdin_writer(pipe, command.stdin.clone().unwrap_or_default(), &command.label);
    }

    let Some(stdout) = child.stdout.take() else {
        kill(&mut child);
        return Err(ProcessError::Io {
            program,
            source: Arc::new(io::Error::other("stdout was not captured")),
        });
    };
    let overflow = Arc::new(AtomicBool::new(false));
    let stdout_rx = spawn_stdout_reader(stdout, command.output_limit, Arc::clone(&overflow));
    let stderr_rx = child
        .stderr
        .take()
        .map(|pipe| spawn_stderr_drain(pipe, command.label.clone(), command.stderr_as_warning));

    let code = wait_for_exit(command, &mut child, deadline, &overflow)?;

    let remaining = deadline.saturating_duration_since(Instant::now());
    let stdout = match stdout_rx.recv_timeout(remaining.max(POLL_INTERVAL)) {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(source)) => {
            return Err(ProcessError::Io {
                program,
                source: Arc::new(source),
            });
        }
        Err(RecvTimeoutError::Timeout) => {
            return Err(ProcessError::Timeout {
                program,
                timeout: command.timeout,
            });
        }
        Err(RecvTimeoutError::Disconnected) => {
            return Err(ProcessError::Io {
                program,
                source: Arc::new(io::Error::other("stdout reader stopped unexpectedly")),
            });
        }
    };

    if overflow.load(Ordering::SeqCst) {
        return Err(ProcessError::OutputLimit {
            program,
            limit: command.output_limit,
        });
    }

    let stderr = stderr_rx
        .and_then(|rx| rx.recv_timeout(STDERR_GRACE).ok())
        .unwrap_or_default();

    debug!(
        target: PROCESS_TARGET,
        process = %command.label,
        ?code,
        stdout_bytes = stdout.len(),
        "process exited"
    );

    Ok(ProcessOutput {
        code,
        stdout,
        stderr,
    })
}

fn spawn(command: &ProcessCommand) -> Result<Child, ProcessError> {
    let mut builder = Command::new(&command.program);
    builder
        .args(&command.args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if command.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
    if let Some(dir) = &command.current_dir {
        builder.current_dir(dir);
    }
    for (key, value) in &command.envs {
        builder.env(key, value);
    }

    debug!(
        target: PROCESS_TARGET,
        process = %command.label,
        program = %command.program.display(),
        "spawning process"
    );

    builder.spawn().map_err(|source| ProcessError::Spawn {
        program: command.program.clone(),
        source: Arc::new(source),
    })
}

/// Writes the payload and drops the pipe so the child observes EOF.
fn spawn_stdin_writer(mut pipe: ChildStdin, payload: Vec<u8>, label: &str) {
    let label = label.to_owned();
    thread::spawn(move || {
        let written = pipe.write_all(&payload).and_then(|()| pipe.flush());
        if let Err(error) = written {
            debug!(
                target: PROCESS_TARGET,
                process = %label,
                %error,
                "child closed stdin before the request was written"
            );
        }
    });
}

fn spawn_stdout_reader(
    mut pipe: ChildStdout,
    limit: usize,
    overflow: Arc<AtomicBool>,
) -> Receiver<io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = read_capped(&mut pipe, limit, &overflow);
        drop(tx.send(result));
    });
    rx
}

/// Reads until EOF or until the cap would be exceeded.
fn read_capped(reader: &mut impl Read, limit: usize, overflow: &AtomicBool) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; READ_CHUNK];
    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        };
        if buffer.len().saturating_add(read) > limit {
            overflow.store(true, Ordering::SeqCst);
            break;
        }
        buffer.extend_from_slice(chunk.get(..read).unwrap_or_default());
    }
    Ok(buffer)
}

fn spawn_stderr_drain(pipe: ChildStderr, label: String, as_warning: bool) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut retained = String::new();
        for line in BufReader::new(pipe).lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            if as_warning {
                warn!(target: PROCESS_TARGET, process = %label, stderr = %line, "process stderr");
            } else {
                debug!(target: PROCESS_TARGET, process = %label, stderr = %line, "process stderr");
            }
            if retained.len() < STDERR_RETAIN_LIMIT {
                retained.push_str(&line);
                retained.push('\n');
            }
        }
        drop(tx.send(retained));
    });
    rx
}

fn wait_for_exit(
    command: &ProcessCommand,
    child: &mut Child,
    deadline: Instant,
    overflow: &AtomicBool,
) -> Result<Option<i32>, ProcessError> {
    loop {
        if overflow.load(Ordering::SeqCst) {
            warn!(
                target: PROCESS_TARGET,
                process = %command.label,
                limit = command.output_limit,
                "output limit exceeded, killing process"
            );
            kill(child);
            return Err(ProcessError::OutputLimit {
                program: command.program.clone(),
                limit: command.output_limit,
            });
        }
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status.code()),
            Ok(None) => {
                if Instant::now() >= deadline {
                    warn!(
                        target: PROCESS_TARGET,
                        process = %command.label,
                        timeout_ms = u64::try_from(command.timeout.as_millis()).unwrap_or(u64::MAX),
                        "process timed out, killing it"
                    );
                    kill(child);
                    return Err(ProcessError::Timeout {
                        program: command.program.clone(),
                        timeout: command.timeout,
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(source) => {
                kill(child);
                return Err(ProcessError::Io {
                    program: command.program.clone(),
                    source: Arc::new(source),
                });
            }
        }
    }
}

fn kill(child: &mut Child) {
    drop(child.kill());
    drop(child.wait());
}
