//! Event type definitions for structured tend events.
//!
//! Events are categorized by domain (a single task, or a whole run) and carry
//! an id, a timestamp and the tracing target they were emitted on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A structured tend event with full metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TendEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Source information for the event.
    pub source: EventSource,
    /// The event category and data.
    pub category: EventCategory,
}

impl TendEvent {
    /// Create a new event with the given category.
    #[must_use]
    pub fn new(source: EventSource, category: EventCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source,
            category,
        }
    }
}

/// Source information for an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSource {
    /// The tracing target (e.g., "`tend::task`", "`tend::run`").
    pub target: String,
}

impl EventSource {
    /// Create a new event source.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

/// Event categories organized by domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventCategory {
    /// Lifecycle of a single task.
    Task(TaskEvent),
    /// Lifecycle of one requested run.
    Run(RunEvent),
}

/// Task execution lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum TaskEvent {
    /// Task process is about to start.
    Started {
        /// Task name.
        name: String,
        /// Command line being executed.
        command: String,
    },
    /// Task was not executed.
    Skipped {
        /// Task name.
        name: String,
        /// Why it was skipped.
        reason: String,
    },
    /// A line of captured task output.
    Output {
        /// Task name.
        name: String,
        /// Output stream.
        stream: Stream,
        /// Output content, without the trailing newline.
        content: String,
    },
    /// Task process exited.
    Completed {
        /// Task name.
        name: String,
        /// Whether the task succeeded.
        success: bool,
        /// Exit code, if the process exited normally.
        exit_code: Option<i32>,
        /// Duration in milliseconds.
        duration_ms: u64,
    },
    /// Task process was terminated after exceeding its timeout.
    TimedOut {
        /// Task name.
        name: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
}

/// Run lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum RunEvent {
    /// The execution order for a requested task was resolved.
    Planned {
        /// Requested task.
        target: String,
        /// Number of tasks in the order.
        task_count: usize,
    },
    /// The run finished, successfully or not.
    Completed {
        /// Requested task.
        target: String,
        /// Whether every task succeeded.
        success: bool,
        /// Duration in milliseconds.
        duration_ms: u64,
    },
    /// The run was cancelled from outside.
    Cancelled {
        /// Requested task.
        target: String,
        /// Task that was running when cancellation arrived.
        task: Option<String>,
    },
}

/// Output stream type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl Stream {
    /// Stream name as used in event fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}
