use std::{
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    result::Result as StdResult,
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use liboutput::Output;
use tracing::{debug, warn};

use crate::error::{ExecErrorKind, ExecutionError};

/// Deadline applied to every git invocation unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How often a running child is polled while waiting for its deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Run-wide execution flags, fixed when the [`Executor`] is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    /// Skip every [`Access::Write`] invocation and echo it instead.
    pub dry_run: bool,
    /// Echo every command together with its combined output.
    pub verbose: bool,
    /// Per-invocation deadline.
    pub timeout: Duration,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            verbose: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Whether an invocation only inspects the repository or changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Pure query; runs even in dry-run mode.
    Read,
    /// Touches refs, the index, the working tree or remote-tracking refs.
    Write,
}

/// A fully described git invocation, as handed to a [`Runner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Read or write classification.
    pub access: Access,
    /// Arguments after `git`.
    pub args: Vec<String>,
    /// Working directory, or the process's own when `None`.
    pub cwd: Option<PathBuf>,
    /// Deadline for this invocation.
    pub timeout: Duration,
}

impl Invocation {
    /// Human-readable command line, e.g. `git pull --ff-only origin stage`.
    pub fn command_line(&self) -> String {
        format!("git {}", self.args.join(" "))
    }

    /// The git subcommand (first argument).
    pub fn subcommand(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or_default()
    }
}

/// Captured streams of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl Captured {
    /// Stdout followed by stderr, trimmed.
    pub fn combined(&self) -> String {
        combine(&self.stdout, &self.stderr)
    }
}

/// Join two output streams the way they are shown to the operator.
fn combine(stdout: &str, stderr: &str) -> String {
    match (stdout.trim(), stderr.trim()) {
        ("", err) => err.to_string(),
        (out, "") => out.to_string(),
        (out, err) => format!("{out}\n{err}"),
    }
}

/// Backend that actually runs git. Swappable so workflows can be exercised
/// against scripted responses.
pub trait Runner {
    /// Run `invocation` to completion or until its deadline.
    fn run(&self, invocation: &Invocation) -> StdResult<Captured, ExecutionError>;
}

/// [`Runner`] that spawns a child process per invocation.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// Program to execute; `git` outside of tests.
    program: String,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    /// Runner for the `git` found on `PATH`.
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// Runner for an arbitrary program, taking the same arguments.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Wait for `child` until `deadline`, killing it if the deadline passes.
    /// Returns `None` on timeout.
    fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                child.kill()?;
                child.wait()?;
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Drain a child pipe on a helper thread so a chatty child never blocks on a
/// full pipe while we poll for its exit.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe
            && let Err(err) = pipe.read_to_end(&mut buf)
        {
            debug!(%err, "failed to read child output");
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Collect a drained pipe, tolerating a panicked reader.
fn collect(handle: JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

impl Runner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> StdResult<Captured, ExecutionError> {
        let command_line = format!("{} {}", self.program, invocation.args.join(" "));
        let mut command = Command::new(&self.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|err| {
            ExecutionError::new(ExecErrorKind::Spawn, &command_line, err.to_string())
        })?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + invocation.timeout;
        let status = Self::wait_until(&mut child, deadline).map_err(|err| {
            ExecutionError::new(ExecErrorKind::Spawn, &command_line, err.to_string())
        })?;

        // Helpers such as ssh may outlive a killed git and hold the pipes
        // open, so the readers are abandoned rather than joined on timeout.
        let Some(status) = status else {
            return Err(ExecutionError::new(
                ExecErrorKind::Timeout,
                command_line,
                format!("no result after {:?}", invocation.timeout),
            ));
        };

        let captured = Captured {
            stdout: collect(stdout),
            stderr: collect(stderr),
        };

        if status.success() {
            Ok(captured)
        } else {
            Err(ExecutionError::new(
                ExecErrorKind::NonZeroExit {
                    code: status.code(),
                },
                command_line,
                captured.combined(),
            ))
        }
    }
}

/// Result of a single invocation: trimmed stdout, or the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Trimmed standard output; empty for skipped or failed invocations.
    pub stdout: String,
    /// The failure, if the invocation did not succeed.
    pub error: Option<ExecutionError>,
}

impl CommandResult {
    /// Whether the invocation succeeded (or was skipped by dry-run).
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into a `Result` for `?` propagation.
    pub fn into_result(self) -> StdResult<String, ExecutionError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.stdout),
        }
    }
}

/// Runs git subcommands on behalf of the inspector and the workflows,
/// applying dry-run, verbose echo and timeouts uniformly.
pub struct Executor {
    /// Process backend.
    runner: Box<dyn Runner>,
    /// Run-wide flags.
    options: ExecOptions,
    /// Where dry-run and verbose echoes go.
    output: Arc<dyn Output>,
    /// Default working directory for invocations.
    cwd: Option<PathBuf>,
}

impl Executor {
    /// Executor backed by the real `git` binary.
    pub fn new(options: ExecOptions, output: Arc<dyn Output>) -> Self {
        Self::with_runner(Box::new(ProcessRunner::new()), options, output)
    }

    /// Executor backed by a custom [`Runner`].
    pub fn with_runner(
        runner: Box<dyn Runner>,
        options: ExecOptions,
        output: Arc<dyn Output>,
    ) -> Self {
        Self {
            runner,
            options,
            output,
            cwd: None,
        }
    }

    /// Run every invocation inside `dir` unless one specifies its own.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Whether write invocations are being skipped.
    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Run `git <args>` with an explicit timeout and working directory.
    pub fn execute(
        &self,
        access: Access,
        args: &[&str],
        timeout: Duration,
        cwd: Option<&Path>,
    ) -> CommandResult {
        let invocation = Invocation {
            access,
            args: args.iter().map(|arg| (*arg).to_string()).collect(),
            cwd: cwd.map(Path::to_path_buf).or_else(|| self.cwd.clone()),
            timeout,
        };
        let command_line = invocation.command_line();

        if self.options.dry_run && access == Access::Write {
            debug!(command = %command_line, "dry run, skipping");
            self.echo(&format!("[DRY RUN] {command_line}"));
            return CommandResult {
                stdout: String::new(),
                error: None,
            };
        }

        debug!(command = %command_line, ?access, "running git");
        match self.runner.run(&invocation) {
            Ok(captured) => {
                if self.options.verbose {
                    self.echo_detail(&command_line, &captured.combined());
                }
                CommandResult {
                    stdout: captured.stdout.trim().to_string(),
                    error: None,
                }
            }
            Err(err) => {
                debug!(command = %command_line, kind = %err.kind, "git failed");
                if self.options.verbose {
                    self.echo_detail(&command_line, &err.output);
                }
                CommandResult {
                    stdout: String::new(),
                    error: Some(err),
                }
            }
        }
    }

    /// Run a query with the default timeout.
    pub fn read(&self, args: &[&str]) -> StdResult<String, ExecutionError> {
        self.execute(Access::Read, args, self.options.timeout, None)
            .into_result()
    }

    /// Run a mutation with the default timeout; skipped under dry-run.
    pub fn write(&self, args: &[&str]) -> StdResult<String, ExecutionError> {
        self.execute(Access::Write, args, self.options.timeout, None)
            .into_result()
    }

    /// Echo a line regardless of verbosity.
    fn echo(&self, line: &str) {
        if let Err(err) = self.output.plain(line) {
            warn!(%err, "failed to echo command");
        }
    }

    /// Echo a command and its output in verbose mode.
    fn echo_detail(&self, command_line: &str, output: &str) {
        let text = if output.is_empty() {
            format!("$ {command_line}")
        } else {
            format!("$ {command_line}\n{output}")
        };
        if let Err(err) = self.output.detail(&text) {
            warn!(%err, "failed to echo command output");
        }
    }
}
