//! Tracing initialization.
//!
//! Two layers share one registry:
//!
//! - a fmt layer writing diagnostics to stderr, filtered by `RUST_LOG` or the
//!   `--level` flag, that never shows structured `tend::` events
//! - a [`TendEventLayer`] turning `tend::` events into terminal lines or JSON

use clap::ValueEnum;
use tend_events::{CliRenderer, CliRendererConfig, JsonRenderer, TendEventLayer, is_event_target};
use tracing::Subscriber;
use tracing_subscriber::filter::{EnvFilter, FilterExt, filter_fn};
use tracing_subscriber::layer::{Filter, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{Layer, fmt};

/// Log verbosity accepted by `-L/--level`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Everything, including per-line internals.
    Trace,
    /// Graph building and scheduling decisions.
    Debug,
    /// Task starts and run summaries.
    Info,
    /// Failures and recoverable problems.
    #[default]
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// Directive understood by [`EnvFilter`].
    #[must_use]
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Format of the diagnostic log lines.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Where structured task events go.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventOutput {
    /// Terminal lines on stderr; `verbose` adds completion lines.
    Cli {
        /// Show task and run completion lines.
        verbose: bool,
    },
    /// JSON lines on stdout.
    Json,
}

/// Logging setup for one process.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Level used when `RUST_LOG` is unset.
    pub level: LogLevel,
    /// Diagnostic line format.
    pub format: LogFormat,
    /// Event renderer.
    pub events: EventOutput,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Pretty,
            events: EventOutput::Cli { verbose: false },
        }
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()));

    let fmt_layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let event_layer = match config.events {
        EventOutput::Cli { verbose } => TendEventLayer::new(CliRenderer::with_config(
            CliRendererConfig {
                verbose,
                ..CliRendererConfig::default()
            },
        )),
        EventOutput::Json => TendEventLayer::new(JsonRenderer::new()),
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(diagnostics_filter(env_filter)))
        .with(event_layer)
        .try_init()
}

/// Filter for the diagnostic fmt layer: `env_filter`, minus structured
/// task and run events, which the event layer renders instead.
pub fn diagnostics_filter<S>(env_filter: EnvFilter) -> impl Filter<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    env_filter.and(filter_fn(|meta| !is_event_target(meta.target())))
}
