//! Task executor running a task's action as an external process.
//!
//! - Standard streams are inherited unless output capture is enabled
//! - Captured output is streamed as task output events and kept for failure
//!   summaries
//! - Timeouts and cancellation terminate the process (see [`super::process`])

use super::process::{TERMINATION_GRACE, interrupted, terminate};
use super::{Action, Task};
use crate::{Error, Result};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tend_events::Stream;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Task execution result
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Task name.
    pub name: String,
    /// Exit code, `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output; empty unless output capture is enabled.
    pub stdout: String,
    /// Captured standard error; empty unless output capture is enabled.
    pub stderr: String,
    /// Whether the process exited successfully.
    pub success: bool,
    /// Wall-clock run time.
    pub duration: Duration,
}

/// Number of lines from stdout/stderr to include when summarizing failures
pub const TASK_FAILURE_SNIPPET_LINES: usize = 20;

/// Task executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Whether to capture output (vs inheriting the terminal's streams)
    pub capture_output: bool,
    /// Directory holding the task file; tasks run here unless they set their
    /// own directory, and artifact paths resolve against it.
    pub project_root: PathBuf,
    /// Timeout for tasks that do not set their own.
    pub default_timeout: Option<Duration>,
    /// How long a terminated task may take to exit before it is killed.
    pub termination_grace: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            capture_output: false,
            project_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            default_timeout: None,
            termination_grace: TERMINATION_GRACE,
        }
    }
}

/// Why waiting on a task process stopped.
enum Wait {
    Exited(ExitStatus),
    TimedOut(Duration),
    Cancelled,
}

/// Runs one task's action at a time.
#[derive(Debug, Clone, Default)]
pub struct TaskExecutor {
    config: ExecutorConfig,
}

impl TaskExecutor {
    /// Create a new executor.
    #[must_use]
    pub const fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// The executor configuration.
    #[must_use]
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Working directory for `task`.
    #[must_use]
    pub fn working_dir(&self, task: &Task) -> PathBuf {
        task.directory.as_ref().map_or_else(
            || self.config.project_root.clone(),
            |dir| self.config.project_root.join(dir),
        )
    }

    /// Run `action` on behalf of `task` and wait for it to exit.
    ///
    /// A process that exits unsuccessfully is not an error here; the caller
    /// inspects [`TaskResult::success`].
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the process cannot be spawned or waited on.
    /// - [`Error::TaskTimeout`] if the task's timeout elapsed first.
    /// - [`Error::Cancelled`] if `cancel` fired while the task was running, or
    ///   the process died from SIGINT.
    pub async fn execute_task(
        &self,
        task: &Task,
        action: &Action,
        cancel: &CancellationToken,
    ) -> Result<TaskResult> {
        let name = task.name.as_str();
        let command_line = action.to_string();
        let work_dir = self.working_dir(task);
        let capture = self.config.capture_output;

        let mut cmd = Command::new(&action.command);
        cmd.args(&action.args)
            .current_dir(&work_dir)
            .stdin(Stdio::inherit())
            .kill_on_drop(true);
        if capture {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        tend_events::emit_task_started!(name, command_line);
        tracing::info!(task = name, command = %command_line, dir = %work_dir.display(), "Starting task");

        let start_time = Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            Error::io(
                e,
                Some(work_dir.clone()),
                format!("spawn task {name} ({})", action.command),
            )
        })?;

        let stdout_task = child
            .stdout
            .take()
            .map(|out| stream_lines(name, Stream::Stdout, out));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| stream_lines(name, Stream::Stderr, err));

        let timeout = task.timeout.or(self.config.default_timeout);
        let deadline = async {
            match timeout {
                Some(limit) => {
                    tokio::time::sleep(limit).await;
                    limit
                }
                None => std::future::pending().await,
            }
        };

        let wait = tokio::select! {
            status = child.wait() => Wait::Exited(status.map_err(|e| {
                Error::io(e, None, format!("wait for task {name}"))
            })?),
            limit = deadline => Wait::TimedOut(limit),
            () = cancel.cancelled() => Wait::Cancelled,
        };

        let status = match wait {
            Wait::Exited(status) => status,
            Wait::TimedOut(limit) => {
                terminate(&mut child, name, self.config.termination_grace).await;
                abort_readers([stdout_task, stderr_task]);
                tend_events::emit_task_timed_out!(name, limit.as_secs());
                tracing::warn!(task = name, timeout_secs = limit.as_secs(), "Task timed out");
                return Err(Error::TaskTimeout {
                    task: name.to_string(),
                    seconds: limit.as_secs(),
                });
            }
            Wait::Cancelled => {
                terminate(&mut child, name, self.config.termination_grace).await;
                abort_readers([stdout_task, stderr_task]);
                tracing::warn!(task = name, "Task cancelled");
                return Err(Error::Cancelled {
                    task: Some(name.to_string()),
                });
            }
        };

        // A Ctrl-C reaches the child as well as tend, so the child may exit
        // before the cancellation token is set.
        if !status.success() && (cancel.is_cancelled() || interrupted(&status)) {
            abort_readers([stdout_task, stderr_task]);
            tracing::warn!(task = name, ?status, "Task interrupted");
            return Err(Error::Cancelled {
                task: Some(name.to_string()),
            });
        }

        let stdout = collect_lines(stdout_task).await;
        let stderr = collect_lines(stderr_task).await;
        let duration = start_time.elapsed();
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        let exit_code = status.code();
        let success = status.success();

        tend_events::emit_task_completed!(name, success, exit_code, duration_ms);

        let result = TaskResult {
            name: name.to_string(),
            exit_code,
            stdout,
            stderr,
            success,
            duration,
        };

        if success {
            tracing::debug!(task = name, duration_ms, "Task completed");
        } else {
            tracing::warn!(task = name, exit = ?exit_code, "Task failed");
            if capture {
                tracing::error!(
                    task = name,
                    "{}",
                    summarize_task_failure(&result, TASK_FAILURE_SNIPPET_LINES)
                );
            }
        }

        Ok(result)
    }
}

/// Forward `reader` line by line as output events, keeping the lines.
fn stream_lines<R>(name: &str, stream: Stream, reader: R) -> JoinHandle<Vec<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let name = name.to_string();
    tokio::spawn(async move {
        let mut lines = Vec::new();
        let mut reader = BufReader::new(reader).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            tend_events::emit_task_output!(name, stream, line);
            lines.push(line);
        }
        lines
    })
}

async fn collect_lines(handle: Option<JoinHandle<Vec<String>>>) -> String {
    match handle {
        Some(handle) => handle.await.unwrap_or_default().join("\n"),
        None => String::new(),
    }
}

// A terminated task may leave children holding its pipes open
fn abort_readers(handles: [Option<JoinHandle<Vec<String>>>; 2]) {
    for handle in handles.into_iter().flatten() {
        handle.abort();
    }
}

/// Build a compact, user-friendly summary for a failed task, including the
/// exit code and the tail of stdout/stderr to help with diagnostics.
#[must_use]
pub fn summarize_task_failure(result: &TaskResult, max_output_lines: usize) -> String {
    let exit_code = result
        .exit_code
        .map_or_else(|| "none (killed by signal)".to_string(), |c| c.to_string());

    let mut sections = vec![format!(
        "Task '{}' failed with exit code {}.",
        result.name, exit_code
    )];

    let output = format_failure_streams(result, max_output_lines);
    if output.is_empty() {
        sections.push(
            "No stdout/stderr were captured; rerun with --capture to include task output."
                .to_string(),
        );
    } else {
        sections.push(output);
    }

    sections.join("\n\n")
}

/// The captured output tail of a failed task, empty when nothing was captured.
#[must_use]
pub fn format_failure_streams(result: &TaskResult, max_output_lines: usize) -> String {
    [
        summarize_stream("stdout", &result.stdout, max_output_lines),
        summarize_stream("stderr", &result.stderr, max_output_lines),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join("\n\n")
}

fn summarize_stream(label: &str, content: &str, max_output_lines: usize) -> Option<String> {
    let normalized = content.trim_end();
    if normalized.is_empty() {
        return None;
    }

    let lines: Vec<&str> = normalized.lines().collect();
    let total = lines.len();
    let start = total.saturating_sub(max_output_lines);
    let snippet = lines[start..].join("\n");

    let header = if total > max_output_lines {
        format!("{label} (last {max_output_lines} of {total} lines):")
    } else {
        format!("{label}:")
    };

    Some(format!("{header}\n{snippet}"))
}
