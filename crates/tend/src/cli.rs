//! Command-line definition, error mapping and exit codes.

use crate::logging::LogLevel;
use clap::Parser;
use miette::{Diagnostic, Report};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// Exit code for a failed task that reported no usable status
pub const EXIT_TASK_FAILED: i32 = 1;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// I/O error exit code
pub const EXIT_IO: i32 = 3;
/// Task timeout exit code
pub const EXIT_TIMEOUT: i32 = 124;
/// Exit code for SIGINT (128 + signal number 2)
pub const EXIT_SIGINT: i32 = 130;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("{message}")]
    #[diagnostic(code(tend::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// A task process failed (exit code: the task's status)
    #[error("{message}")]
    #[diagnostic(code(tend::cli::task))]
    Task {
        /// The error message
        message: String,
        /// Process exit code to propagate
        status: i32,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// A task exceeded its timeout (exit code 124)
    #[error("{message}")]
    #[diagnostic(code(tend::cli::timeout))]
    Timeout {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// The run was interrupted (exit code 130)
    #[error("{message}")]
    #[diagnostic(code(tend::cli::cancelled))]
    Cancelled {
        /// The error message
        message: String,
    },
    /// I/O or other unexpected error (exit code 3)
    #[error("{message}")]
    #[diagnostic(code(tend::cli::io))]
    Io {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Report `self` as a cancellation once an interrupt was received, so a
    /// task killed by the same Ctrl-C is not rendered as a task failure.
    #[must_use]
    pub fn or_cancelled(self, cancelled: bool) -> Self {
        match self {
            Self::Cancelled { .. } => self,
            _ if cancelled => Self::Cancelled {
                message: "Cancelled".to_string(),
            },
            other => other,
        }
    }

    /// Stable code used in the JSON error envelope.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Task { .. } => "task",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled { .. } => "cancelled",
            Self::Io { .. } => "io",
        }
    }
}

/// Convert `tend_core::Error` to appropriate `CliError` variant.
///
/// - Registry, resolution and task file errors -> Config (exit code 2)
/// - Failed task processes -> Task (the process's exit status)
/// - Timeouts -> Timeout (124), cancellation -> Cancelled (130)
/// - I/O errors -> Io (exit code 3)
impl From<tend_core::Error> for CliError {
    fn from(err: tend_core::Error) -> Self {
        use tend_core::Error;

        let help = err.help().map(|help| help.to_string());
        match err {
            Error::DuplicateTask { .. }
            | Error::UnknownTask { .. }
            | Error::CyclicDependency { .. }
            | Error::MissingTask => Self::Config {
                message: err.to_string(),
                help,
            },
            // Extract just the message to avoid "Configuration error:" twice
            Error::Configuration { message, .. } => Self::Config {
                message: format!("Invalid task file: {message}"),
                help,
            },
            Error::TaskExecution { status, .. } => Self::Task {
                message: err.to_string(),
                status: task_exit_code(status),
                help,
            },
            Error::TaskTimeout { .. } => Self::Timeout {
                message: err.to_string(),
                help,
            },
            Error::Cancelled { .. } => Self::Cancelled {
                message: err.to_string(),
            },
            Error::Io {
                source,
                path,
                operation,
            } => {
                let path_str = path
                    .as_ref()
                    .map_or(String::new(), |p| format!(" on {}", p.display()));
                Self::Io {
                    message: format!("I/O {operation} failed{path_str}: {source}"),
                    help: Some("Check file permissions and ensure the path exists".to_string()),
                }
            }
        }
    }
}

/// Exit code propagated for a failed task.
///
/// Signals and a nonsensical zero status map to 1 so failure is never
/// reported as success.
#[must_use]
pub const fn task_exit_code(status: Option<i32>) -> i32 {
    match status {
        Some(code) if code != 0 => code,
        _ => EXIT_TASK_FAILED,
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Task { status, .. } => *status,
        CliError::Timeout { .. } => EXIT_TIMEOUT,
        CliError::Cancelled { .. } => EXIT_SIGINT,
        CliError::Io { .. } => EXIT_IO,
    }
}

/// Render error appropriately based on JSON flag
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let error_envelope = ErrorEnvelope::new(serde_json::json!({
            "code": err.kind(),
            "message": err.to_string(),
            "exit_code": exit_code_for(err),
        }));

        match serde_json::to_string(&error_envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        // Use miette for human-friendly error display
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        // Ensure output is flushed before potential process exit
        let _ = io::stderr().flush();
    }
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Run named tasks and their dependencies, in order.
///
/// Tasks are declared in `tend.toml`, found in the current directory or the
/// nearest ancestor.
#[derive(Parser, Debug)]
#[command(name = "tend")]
#[command(about = "Run named tasks and their dependencies, in order")]
#[command(long_about = None)]
#[command(version)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Task to run; defaults to `settings.default` from the task file.
    #[arg(value_name = "TASK")]
    pub task: Option<String>,

    /// List the declared tasks.
    #[arg(long, conflicts_with_all = ["check", "dry_run", "init"])]
    pub list: bool,

    /// Validate the task file and exit.
    #[arg(long, conflicts_with_all = ["dry_run", "init"])]
    pub check: bool,

    /// Print the tasks that would run, in order, without running them.
    #[arg(short = 'n', long, conflicts_with = "init")]
    pub dry_run: bool,

    /// Write a starter tend.toml to the current directory.
    #[arg(long)]
    pub init: bool,

    /// Task file to use instead of searching for tend.toml.
    #[arg(short = 'f', long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Emit JSON events and envelopes.
    #[arg(long, help = "Emit JSON events and envelopes")]
    pub json: bool,

    /// Capture task output and stream it as events.
    #[arg(long)]
    pub capture: bool,

    /// Timeout in seconds for tasks that do not set their own.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Show task completion lines.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse command-line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
