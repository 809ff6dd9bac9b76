//! Task model, registry and execution.
//!
//! A [`Task`] names an optional external command and the tasks that must run
//! before it. Tasks live in a [`TaskRegistry`] in declaration order; a
//! [`TaskRunner`] executes a task and its dependency closure.

pub mod executor;
pub mod freshness;
pub mod process;
pub mod registry;
pub mod runner;

pub use executor::{
    ExecutorConfig, TASK_FAILURE_SNIPPET_LINES, TaskExecutor, TaskResult, summarize_task_failure,
};
pub use freshness::Freshness;
pub use registry::TaskRegistry;
pub use runner::{RunReport, TaskOutcome, TaskRunner};

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tend_task_graph::TaskNodeData;

/// Whether a task always runs or produces a file it can be skipped for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskKind {
    /// Always executes when requested.
    #[default]
    Phony,
    /// Produces `path`; skipped while `path` is up to date.
    Artifact {
        /// The produced file, relative to the task file's directory unless
        /// absolute.
        path: PathBuf,
    },
}

impl TaskKind {
    /// Whether this is a phony task.
    #[must_use]
    pub const fn is_phony(&self) -> bool {
        matches!(self, Self::Phony)
    }

    /// The artifact path, for artifact tasks.
    #[must_use]
    pub fn artifact(&self) -> Option<&Path> {
        match self {
            Self::Phony => None,
            Self::Artifact { path } => Some(path),
        }
    }
}

/// An external command with a fixed argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Program to execute, looked up on `PATH` when not a path.
    pub command: String,
    /// Arguments passed verbatim, without shell interpretation.
    pub args: Vec<String>,
}

impl Action {
    /// Create an action from a program and its arguments.
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// A named unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Unique task name.
    pub name: String,
    /// Phony or artifact-producing.
    pub kind: TaskKind,
    /// Names of tasks that must complete first, in declared order.
    pub depends_on: Vec<String>,
    /// Command to run. `None` for aggregate tasks that only pull in their
    /// dependencies.
    pub action: Option<Action>,
    /// Human-readable description shown by `--list`.
    pub description: Option<String>,
    /// Working directory, relative to the task file's directory.
    pub directory: Option<PathBuf>,
    /// Per-task timeout; overrides the executor default.
    pub timeout: Option<Duration>,
}

impl Task {
    /// A phony task with no dependencies and no action.
    pub fn phony(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TaskKind::Phony,
            depends_on: Vec::new(),
            action: None,
            description: None,
            directory: None,
            timeout: None,
        }
    }

    /// An artifact task producing `path`.
    pub fn artifact(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            kind: TaskKind::Artifact { path: path.into() },
            ..Self::phony(name)
        }
    }

    /// Set the dependency list.
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Set the command to run.
    #[must_use]
    pub fn with_action<I, S>(mut self, command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.action = Some(Action::new(command, args));
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Set the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether the task always executes.
    #[must_use]
    pub const fn is_phony(&self) -> bool {
        self.kind.is_phony()
    }

    /// One-line command description for events and listings.
    #[must_use]
    pub fn command_line(&self) -> String {
        self.action
            .as_ref()
            .map_or_else(String::new, ToString::to_string)
    }
}

impl TaskNodeData for Task {
    fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.depends_on.iter().map(String::as_str)
    }
}
