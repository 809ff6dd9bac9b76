//! Structured event system for tend.
//!
//! Task and run lifecycle events are emitted through tracing macros on the
//! `tend::task` and `tend::run` targets, captured by [`TendEventLayer`] and
//! handed to an [`EventSink`] such as the terminal or JSON renderer.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tend_events::{CliRenderer, TendEventLayer, emit_task_started};
//! use tracing_subscriber::layer::SubscriberExt;
//! use tracing_subscriber::util::SubscriberInitExt;
//!
//! tracing_subscriber::registry()
//!     .with(TendEventLayer::new(CliRenderer::new()))
//!     .init();
//!
//! emit_task_started!("test", "cargo test");
//! ```

pub mod event;
pub mod layer;
pub mod renderers;

// Re-exports for convenience
pub use event::{EventCategory, EventSource, RunEvent, Stream, TaskEvent, TendEvent};
pub use layer::{
    EventSink, RUN_EVENT_TARGET, TASK_EVENT_TARGET, TendEventLayer, is_event_target,
};
pub use renderers::{CliRenderer, CliRendererConfig, JsonRenderer, RenderedLine};

// ============================================================================
// Emit Macros
// ============================================================================

/// Emit a task started event.
///
/// # Example
/// ```rust,ignore
/// emit_task_started!("test", "cargo test");
/// ```
#[macro_export]
macro_rules! emit_task_started {
    ($name:expr, $command:expr) => {
        ::tracing::info!(
            target: "tend::task",
            event_type = "task.started",
            task_name = %$name,
            command = %$command,
        )
    };
}

/// Emit a task skipped event.
#[macro_export]
macro_rules! emit_task_skipped {
    ($name:expr, $reason:expr) => {
        ::tracing::info!(
            target: "tend::task",
            event_type = "task.skipped",
            task_name = %$name,
            reason = %$reason,
        )
    };
}

/// Emit a task output event.
///
/// # Example
/// ```rust,ignore
/// emit_task_output!("test", Stream::Stdout, "running 3 tests");
/// ```
#[macro_export]
macro_rules! emit_task_output {
    ($name:expr, $stream:expr, $content:expr) => {
        ::tracing::info!(
            target: "tend::task",
            event_type = "task.output",
            task_name = %$name,
            stream = $crate::Stream::as_str($stream),
            content = %$content,
        )
    };
}

/// Emit a task completed event.
///
/// `exit_code` is an `Option<i32>`; the field is left out when the process
/// was killed by a signal.
///
/// # Example
/// ```rust,ignore
/// emit_task_completed!("test", true, Some(0), 1234);
/// ```
#[macro_export]
macro_rules! emit_task_completed {
    ($name:expr, $success:expr, $exit_code:expr, $duration_ms:expr) => {
        match $exit_code {
            ::std::option::Option::Some(code) => ::tracing::info!(
                target: "tend::task",
                event_type = "task.completed",
                task_name = %$name,
                success = $success,
                exit_code = code,
                duration_ms = $duration_ms,
            ),
            ::std::option::Option::None => ::tracing::info!(
                target: "tend::task",
                event_type = "task.completed",
                task_name = %$name,
                success = $success,
                duration_ms = $duration_ms,
            ),
        }
    };
}

/// Emit a task timed out event.
#[macro_export]
macro_rules! emit_task_timed_out {
    ($name:expr, $timeout_secs:expr) => {
        ::tracing::info!(
            target: "tend::task",
            event_type = "task.timed_out",
            task_name = %$name,
            timeout_secs = $timeout_secs,
        )
    };
}

/// Emit a run planned event.
#[macro_export]
macro_rules! emit_run_planned {
    ($target:expr, $task_count:expr) => {
        ::tracing::info!(
            target: "tend::run",
            event_type = "run.planned",
            run_target = %$target,
            task_count = $task_count,
        )
    };
}

/// Emit a run completed event.
#[macro_export]
macro_rules! emit_run_completed {
    ($target:expr, $success:expr, $duration_ms:expr) => {
        ::tracing::info!(
            target: "tend::run",
            event_type = "run.completed",
            run_target = %$target,
            success = $success,
            duration_ms = $duration_ms,
        )
    };
}

/// Emit a run cancelled event, optionally naming the interrupted task.
#[macro_export]
macro_rules! emit_run_cancelled {
    ($target:expr) => {
        ::tracing::info!(
            target: "tend::run",
            event_type = "run.cancelled",
            run_target = %$target,
        )
    };
    ($target:expr, $task:expr) => {
        ::tracing::info!(
            target: "tend::run",
            event_type = "run.cancelled",
            run_target = %$target,
            task_name = %$task,
        )
    };
}
