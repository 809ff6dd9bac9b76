//! Custom tracing Layer for capturing tend events.
//!
//! This layer intercepts tracing events on the [`TASK_EVENT_TARGET`] and
//! [`RUN_EVENT_TARGET`] targets, converts them to [`TendEvent`] instances, and
//! hands them to an [`EventSink`].

// Field values come from the emit macros in this crate
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use crate::event::{EventCategory, EventSource, RunEvent, Stream, TaskEvent, TendEvent};
use tokio::sync::mpsc;
use tracing::Subscriber;
use tracing::field::{Field, Visit};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Target of task lifecycle events.
pub const TASK_EVENT_TARGET: &str = "tend::task";

/// Target of run lifecycle events.
pub const RUN_EVENT_TARGET: &str = "tend::run";

/// Whether a tracing target carries structured tend events.
///
/// Only the exact event targets match; module paths of the `tend` crate
/// (`tend::commands`, ...) are ordinary logs.
#[must_use]
pub fn is_event_target(target: &str) -> bool {
    target == TASK_EVENT_TARGET || target == RUN_EVENT_TARGET
}

/// Destination for captured events.
///
/// Sinks are called synchronously on the thread that emitted the event, so a
/// renderer's output is ordered with respect to the emitting code.
pub trait EventSink: Send + Sync + 'static {
    /// Consume one event.
    fn handle(&self, event: TendEvent);
}

impl EventSink for mpsc::UnboundedSender<TendEvent> {
    fn handle(&self, event: TendEvent) {
        // Receiver gone means nobody is listening any more
        let _ = self.send(event);
    }
}

/// A tracing Layer that captures tend-specific events.
///
/// Events are identified by their `target` (`tend::task` or `tend::run`)
/// and an `event_type` field that specifies the event kind.
pub struct TendEventLayer {
    sink: Box<dyn EventSink>,
}

impl TendEventLayer {
    /// Create a new layer delivering events to `sink`.
    #[must_use]
    pub fn new(sink: impl EventSink) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }

    /// Create a layer that forwards events into an unbounded channel.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TendEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl<S> Layer<S> for TendEventLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let target = event.metadata().target();
        if !is_event_target(target) {
            return;
        }

        let mut visitor = TendEventVisitor::new(target);
        event.record(&mut visitor);

        if let Some(tend_event) = visitor.build() {
            self.sink.handle(tend_event);
        }
    }
}

/// Visitor for extracting typed fields from tracing events.
#[derive(Default)]
struct TendEventVisitor {
    target: String,
    event_type: Option<String>,
    task_name: Option<String>,
    command: Option<String>,
    reason: Option<String>,
    stream: Option<Stream>,
    content: Option<String>,
    success: Option<bool>,
    exit_code: Option<i32>,
    duration_ms: Option<u64>,
    timeout_secs: Option<u64>,
    run_target: Option<String>,
    task_count: Option<usize>,
}

impl TendEventVisitor {
    fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            ..Self::default()
        }
    }

    fn build(self) -> Option<TendEvent> {
        let event_type = self.event_type.as_deref()?;
        let source = EventSource::new(&self.target);

        let category = match event_type {
            "task.started" => EventCategory::Task(TaskEvent::Started {
                name: self.task_name?,
                command: self.command.unwrap_or_default(),
            }),
            "task.skipped" => EventCategory::Task(TaskEvent::Skipped {
                name: self.task_name?,
                reason: self.reason.unwrap_or_default(),
            }),
            "task.output" => EventCategory::Task(TaskEvent::Output {
                name: self.task_name?,
                stream: self.stream.unwrap_or(Stream::Stdout),
                content: self.content?,
            }),
            "task.completed" => EventCategory::Task(TaskEvent::Completed {
                name: self.task_name?,
                success: self.success?,
                exit_code: self.exit_code,
                duration_ms: self.duration_ms.unwrap_or(0),
            }),
            "task.timed_out" => EventCategory::Task(TaskEvent::TimedOut {
                name: self.task_name?,
                timeout_secs: self.timeout_secs?,
            }),
            "run.planned" => EventCategory::Run(RunEvent::Planned {
                target: self.run_target?,
                task_count: self.task_count.unwrap_or(0),
            }),
            "run.completed" => EventCategory::Run(RunEvent::Completed {
                target: self.run_target?,
                success: self.success?,
                duration_ms: self.duration_ms.unwrap_or(0),
            }),
            "run.cancelled" => EventCategory::Run(RunEvent::Cancelled {
                target: self.run_target?,
                task: self.task_name,
            }),
            _ => return None,
        };

        Some(TendEvent::new(source, category))
    }
}

impl Visit for TendEventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_string(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        match field.name() {
            "exit_code" => self.exit_code = Some(value as i32),
            "duration_ms" => self.duration_ms = Some(value as u64),
            "timeout_secs" => self.timeout_secs = Some(value as u64),
            "task_count" => self.task_count = Some(value as usize),
            _ => {}
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "exit_code" => self.exit_code = Some(value as i32),
            "duration_ms" => self.duration_ms = Some(value),
            "timeout_secs" => self.timeout_secs = Some(value),
            "task_count" => self.task_count = Some(value as usize),
            _ => {}
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "success" {
            self.success = Some(value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // `%value` fields arrive here as Display wrapped in Debug
        self.record_string(field, format!("{value:?}"));
    }
}

impl TendEventVisitor {
    fn record_string(&mut self, field: &Field, value: String) {
        match field.name() {
            "event_type" => self.event_type = Some(value),
            "task_name" => self.task_name = Some(value),
            "command" => self.command = Some(value),
            "reason" => self.reason = Some(value),
            "content" => self.content = Some(value),
            "run_target" => self.run_target = Some(value),
            "stream" => {
                self.stream = match value.as_str() {
                    "stdout" => Some(Stream::Stdout),
                    "stderr" => Some(Stream::Stderr),
                    _ => None,
                };
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_is_event_target() {
        assert!(is_event_target("tend::task"));
        assert!(is_event_target("tend::run"));
        assert!(!is_event_target("tend_core::executor"));
        assert!(!is_event_target("tend"));
        assert!(!is_event_target("tend::commands"));
        assert!(!is_event_target("tend::task::nested"));
    }

    #[tokio::test]
    async fn test_layer_captures_task_events() {
        let (layer, mut rx) = TendEventLayer::channel();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(
                target: "tend::task",
                event_type = "task.started",
                task_name = "test",
                command = "cargo test",
                "Task started"
            );
        });

        let event = rx.recv().await.unwrap();
        match event.category {
            EventCategory::Task(TaskEvent::Started { name, command }) => {
                assert_eq!(name, "test");
                assert_eq!(command, "cargo test");
            }
            other => panic!("Expected task started event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_layer_ignores_other_targets() {
        let (layer, mut rx) = TendEventLayer::channel();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(
                target: "tend_core::executor",
                event_type = "task.started",
                task_name = "ignored",
                "Plain log line"
            );
        });

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_layer_drops_unknown_event_type() {
        let (layer, mut rx) = TendEventLayer::channel();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "tend::task", event_type = "task.exploded", task_name = "x");
        });

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_layer_records_display_fields() {
        let (layer, mut rx) = TendEventLayer::channel();
        let subscriber = tracing_subscriber::registry().with(layer);
        let name = String::from("docs");

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(
                target: "tend::task",
                event_type = "task.skipped",
                task_name = %name,
                reason = %"up to date",
            );
        });

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event.category,
            EventCategory::Task(TaskEvent::Skipped { ref name, ref reason })
                if name == "docs" && reason == "up to date"
        ));
    }
}
