//! Child process execution for toolchain scripts.
//!
//! Every child gets an explicit working directory and a hard time limit.
//! The child is killed when the limit elapses (`kill_on_drop`), so a hung
//! script never outlives the request that started it.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::process::Command;

/// Errors from running an external command.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The command could not be started at all.
    #[error("Failed to start '{command}': {source}")]
    Spawn {
        /// The program that was invoked.
        command: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The command did not finish within its time limit.
    #[error("'{command}' timed out after {}s", .timeout.as_secs_f64())]
    Timeout {
        /// The program that was invoked.
        command: String,
        /// The limit that was exceeded.
        timeout: Duration,
    },

    /// The command exited with a non-zero status.
    #[error("'{command}' failed with exit code {code}: {stderr}")]
    ProcessFailed {
        /// The program that was invoked.
        command: String,
        /// The exit code, `-1` when terminated by a signal.
        code: i32,
        /// Captured stderr, truncated.
        stderr: String,
        /// Captured stdout, truncated.
        stdout: String,
    },
}

/// Parameters for a single command invocation.
#[derive(Debug, Clone)]
pub struct ExecutionParams {
    /// Program to run.
    pub program: OsString,
    /// Arguments.
    pub args: Vec<OsString>,
    /// Working directory of the child; the parent's is inherited when `None`.
    pub working_dir: Option<PathBuf>,
    /// Time limit for the whole invocation.
    pub timeout: Duration,
}

impl ExecutionParams {
    /// Create parameters for `program` with a time limit.
    pub fn new(program: impl Into<OsString>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout,
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the child's working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn display_command(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

/// Output of a successful invocation.
#[derive(Debug, Clone)]
pub struct ExecutionOutput {
    /// Full stdout.
    pub stdout: String,
    /// Full stderr.
    pub stderr: String,
    /// Wall-clock duration.
    pub duration: Duration,
}

/// Runs external commands with timeouts and captured output.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    max_diagnostic_chars: usize,
}

impl ProcessRunner {
    /// Create a runner that keeps at most `max_diagnostic_chars` of child
    /// output in error values.
    pub fn new(max_diagnostic_chars: usize) -> Self {
        Self {
            max_diagnostic_chars,
        }
    }

    /// Run a command to completion.
    pub async fn run(&self, params: &ExecutionParams) -> Result<ExecutionOutput, ExecutorError> {
        let start = Instant::now();
        let command = params.display_command();

        tracing::debug!(
            command = %command,
            args = ?params.args,
            cwd = ?params.working_dir,
            timeout_ms = params.timeout.as_millis() as u64,
            "Executing command"
        );

        let mut cmd = Command::new(&params.program);
        cmd.args(&params.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = params.working_dir {
            cmd.current_dir(dir);
        }

        let result = tokio::time::timeout(params.timeout, cmd.output()).await;
        let duration = start.elapsed();

        match result {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

                if !output.status.success() {
                    let code = output.status.code().unwrap_or(-1);
                    tracing::warn!(
                        command = %command,
                        exit_code = code,
                        duration_ms = duration.as_millis() as u64,
                        "Command failed"
                    );
                    return Err(ExecutorError::ProcessFailed {
                        command,
                        code,
                        stderr: truncate(&stderr, self.max_diagnostic_chars),
                        stdout: truncate(&stdout, self.max_diagnostic_chars),
                    });
                }

                tracing::debug!(
                    command = %command,
                    duration_ms = duration.as_millis() as u64,
                    "Command completed"
                );

                Ok(ExecutionOutput {
                    stdout,
                    stderr,
                    duration,
                })
            }
            Ok(Err(source)) => {
                tracing::warn!(command = %command, error = %source, "Failed to start command");
                Err(ExecutorError::Spawn { command, source })
            }
            Err(_) => {
                tracing::warn!(
                    command = %command,
                    timeout_ms = params.timeout.as_millis() as u64,
                    "Command timed out, child killed"
                );
                Err(ExecutorError::Timeout {
                    command,
                    timeout: params.timeout,
                })
            }
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(2000)
    }
}

/// Keep the last `max` characters; tool errors usually end with the cause.
pub fn truncate(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.trim_end().to_string();
    }
    let tail: String = text.chars().skip(count - max).collect();
    format!("...{}", tail.trim_end())
}
