//! Error types for tend-core.

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for tend-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for registry, task file and run operations.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A task name was registered twice.
    #[error("Task '{name}' is defined more than once")]
    #[diagnostic(
        code(tend::task::duplicate),
        help("Task names must be unique; rename or remove one of the definitions")
    )]
    DuplicateTask {
        /// The repeated task name.
        name: String,
    },

    /// A task was requested, or depended upon, that is not registered.
    #[error("{}", unknown_task_message(.name, .required_by.as_deref()))]
    #[diagnostic(code(tend::task::unknown), help("Run `tend --list` to see the available tasks"))]
    UnknownTask {
        /// The missing task name.
        name: String,
        /// The task whose dependency list names it, if any.
        required_by: Option<String>,
    },

    /// The dependency closure of a task contains a cycle.
    ///
    /// `cycle` starts and ends with the same task.
    #[error("Cyclic dependency: {}", .cycle.join(" -> "))]
    #[diagnostic(
        code(tend::task::cycle),
        help("Remove one of the dependencies on the cycle")
    )]
    CyclicDependency {
        /// Task names along the cycle.
        cycle: Vec<String>,
    },

    /// No task was named and no default task is configured.
    #[error("No task given and no default task configured")]
    #[diagnostic(
        code(tend::task::missing),
        help("Pass a task name, or set `default` under [settings] in the task file")
    )]
    MissingTask,

    /// A task's process exited unsuccessfully.
    #[error("{}", execution_message(.task, .status.as_ref()))]
    #[diagnostic(code(tend::task::failed))]
    TaskExecution {
        /// The failing task.
        task: String,
        /// Exit status, `None` when the process was killed by a signal.
        status: Option<i32>,
        /// Tail of the captured output, when output was captured.
        #[help]
        output: Option<String>,
    },

    /// A task's process ran past its timeout and was terminated.
    #[error("Task '{task}' timed out after {seconds} seconds")]
    #[diagnostic(
        code(tend::task::timeout),
        help("Raise `timeout_secs` for the task or pass a larger --timeout")
    )]
    TaskTimeout {
        /// The task that timed out.
        task: String,
        /// The timeout that was exceeded.
        seconds: u64,
    },

    /// The run was cancelled from outside (Ctrl-C).
    #[error("{}", cancelled_message(.task.as_deref()))]
    #[diagnostic(code(tend::run::cancelled))]
    Cancelled {
        /// The task that was running when cancellation arrived.
        task: Option<String>,
    },

    /// Invalid task file or task definition.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(tend::config::invalid))]
    Configuration {
        /// Description of the problem.
        message: String,
        /// The task file, if the error came from one.
        path: Option<Box<Path>>,
    },

    /// I/O error with path context.
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(tend::io::error))]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// The path where the I/O error occurred, if applicable.
        path: Option<Box<Path>>,
        /// Description of the operation that failed.
        operation: String,
    },
}

impl Error {
    /// Create a configuration error with a message.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error attributed to a task file.
    pub fn configuration_in(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Configuration {
            message: message.into(),
            path: Some(path.into().into_boxed_path()),
        }
    }

    /// Create an I/O error with context.
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: path.map(PathBuf::into_boxed_path),
            operation: operation.into(),
        }
    }

    /// Create an unknown task error for a directly requested task.
    pub fn unknown_task(name: impl Into<String>) -> Self {
        Self::UnknownTask {
            name: name.into(),
            required_by: None,
        }
    }
}

fn unknown_task_message(name: &str, required_by: Option<&str>) -> String {
    match required_by {
        Some(parent) => format!("Unknown task '{name}' (required by '{parent}')"),
        None => format!("Unknown task '{name}'"),
    }
}

fn execution_message(task: &str, status: Option<&i32>) -> String {
    match status {
        Some(code) => format!("Task '{task}' failed with exit status {code}"),
        None => format!("Task '{task}' was terminated by a signal"),
    }
}

fn cancelled_message(task: Option<&str>) -> String {
    match task {
        Some(task) => format!("Cancelled while running task '{task}'"),
        None => "Cancelled".to_string(),
    }
}

impl From<tend_task_graph::Error> for Error {
    fn from(err: tend_task_graph::Error) -> Self {
        use tend_task_graph::Error as GraphError;

        match err {
            GraphError::CycleDetected { cycle } => Self::CyclicDependency { cycle },
            GraphError::MissingDependencies { missing } => match missing.into_iter().next() {
                Some((task, dependency)) => Self::UnknownTask {
                    name: dependency,
                    required_by: Some(task),
                },
                None => Self::configuration("dependency check reported no missing task"),
            },
            GraphError::TaskNotFound { name } => Self::unknown_task(name),
        }
    }
}
