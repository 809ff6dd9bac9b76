//! Error types for task graph operations.

use thiserror::Error;

/// Result type for task graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during task graph operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A dependency cycle was detected in the graph.
    ///
    /// The first and last entries of `cycle` are the same task, so
    /// `["a", "b", "a"]` reads as `a -> b -> a`.
    #[error("Cycle detected in task graph: {}", .cycle.join(" -> "))]
    CycleDetected {
        /// Task names along the cycle.
        cycle: Vec<String>,
    },

    /// Multiple missing dependencies were found.
    #[error("Missing dependencies: {}", format_missing(.missing))]
    MissingDependencies {
        /// List of (task, missing_dependency) pairs.
        missing: Vec<(String, String)>,
    },

    /// The requested task is not part of the graph.
    #[error("Task '{name}' not found")]
    TaskNotFound {
        /// Name of the task that was looked up.
        name: String,
    },
}

fn format_missing(missing: &[(String, String)]) -> String {
    missing
        .iter()
        .map(|(task, dep)| format!("Task '{task}' depends on missing task '{dep}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
