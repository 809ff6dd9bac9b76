//! CLI renderer for tend events.
//!
//! Renders events to stdout/stderr for terminal display.
//! This module is allowed to use println!/eprintln! as it's the output layer.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use crate::event::{EventCategory, RunEvent, Stream, TaskEvent, TendEvent};
use crate::layer::EventSink;
use std::io::{self, IsTerminal, Write};

const BOLD_CYAN: &str = "\x1b[1;36m";
const BOLD_RED: &str = "\x1b[1;31m";
const RESET: &str = "\x1b[0m";

/// CLI renderer configuration.
#[derive(Debug, Clone)]
pub struct CliRendererConfig {
    /// Whether to use ANSI colors.
    pub colors: bool,
    /// Whether to show verbose output.
    pub verbose: bool,
}

impl Default for CliRendererConfig {
    fn default() -> Self {
        Self {
            colors: io::stderr().is_terminal(),
            verbose: false,
        }
    }
}

/// A rendered line and the stream it belongs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedLine {
    /// Line for standard output.
    Stdout(String),
    /// Line for standard error.
    Stderr(String),
}

/// CLI renderer that outputs events to stdout/stderr.
#[derive(Debug)]
pub struct CliRenderer {
    config: CliRendererConfig,
}

impl CliRenderer {
    /// Create a new CLI renderer with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CliRendererConfig::default(),
        }
    }

    /// Create a new CLI renderer with the given configuration.
    #[must_use]
    pub fn with_config(config: CliRendererConfig) -> Self {
        Self { config }
    }

    /// Render a single event.
    pub fn render(&self, event: &TendEvent) {
        match self.format(event) {
            Some(RenderedLine::Stdout(line)) => {
                println!("{line}");
                let _ = io::stdout().flush();
            }
            Some(RenderedLine::Stderr(line)) => {
                eprintln!("{line}");
                let _ = io::stderr().flush();
            }
            None => {}
        }
    }

    /// Format an event without printing it. `None` means the event is not
    /// shown at the current verbosity.
    #[must_use]
    pub fn format(&self, event: &TendEvent) -> Option<RenderedLine> {
        match &event.category {
            EventCategory::Task(task_event) => self.format_task(task_event),
            EventCategory::Run(run_event) => self.format_run(run_event),
        }
    }

    fn format_task(&self, event: &TaskEvent) -> Option<RenderedLine> {
        match event {
            TaskEvent::Started { name, command } => {
                Some(RenderedLine::Stderr(format!("{} {command}", self.tag(name))))
            }
            TaskEvent::Skipped { name, reason } => {
                Some(RenderedLine::Stderr(format!("{} skipped: {reason}", self.tag(name))))
            }
            TaskEvent::Output {
                stream, content, ..
            } => Some(match stream {
                Stream::Stdout => RenderedLine::Stdout(content.clone()),
                Stream::Stderr => RenderedLine::Stderr(content.clone()),
            }),
            TaskEvent::Completed {
                name,
                success,
                exit_code,
                duration_ms,
            } => {
                if !self.config.verbose {
                    return None;
                }
                let status = match (success, exit_code) {
                    (true, _) => "completed".to_string(),
                    (false, Some(code)) => format!("failed (exit {code})"),
                    (false, None) => "failed".to_string(),
                };
                Some(RenderedLine::Stderr(format!(
                    "{} {status} in {duration_ms}ms",
                    self.tag(name)
                )))
            }
            TaskEvent::TimedOut { name, timeout_secs } => Some(RenderedLine::Stderr(format!(
                "{} {}",
                self.tag(name),
                self.alert(&format!("timed out after {timeout_secs}s"))
            ))),
        }
    }

    fn format_run(&self, event: &RunEvent) -> Option<RenderedLine> {
        match event {
            RunEvent::Planned { target, task_count } => self.config.verbose.then(|| {
                RenderedLine::Stderr(format!("> Running '{target}' ({task_count} tasks)"))
            }),
            RunEvent::Completed {
                target,
                success,
                duration_ms,
            } => self.config.verbose.then(|| {
                let status = if *success { "completed" } else { "failed" };
                RenderedLine::Stderr(format!("> '{target}' {status} in {duration_ms}ms"))
            }),
            RunEvent::Cancelled { target, task } => {
                let detail = task
                    .as_ref()
                    .map_or(String::new(), |task| format!(" while running '{task}'"));
                Some(RenderedLine::Stderr(format!(
                    "> {}{detail}",
                    self.alert(&format!("'{target}' cancelled"))
                )))
            }
        }
    }

    fn tag(&self, name: &str) -> String {
        if self.config.colors {
            format!("{BOLD_CYAN}> [{name}]{RESET}")
        } else {
            format!("> [{name}]")
        }
    }

    fn alert(&self, text: &str) -> String {
        if self.config.colors {
            format!("{BOLD_RED}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

impl Default for CliRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for CliRenderer {
    fn handle(&self, event: TendEvent) {
        self.render(&event);
    }
}
