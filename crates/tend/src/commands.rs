//! Command implementations behind the CLI flags.
//!
//! Listings and plans are written to stdout; task output, events and
//! diagnostics go to stderr unless `--json` is given.

#![allow(clippy::print_stdout)]

use crate::cli::{Cli, CliError, OkEnvelope};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tend_core::config::{self, Project, TASK_FILE_NAME};
use tend_core::tasks::{ExecutorConfig, TaskExecutor, TaskOutcome};
use tend_core::{Task, TaskRegistry, TaskRunner};
use tokio_util::sync::CancellationToken;

/// One task as shown by `--list` and `--dry-run`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TaskSummary {
    /// Task name.
    pub name: String,
    /// Whether the task always runs.
    pub phony: bool,
    /// Produced file, for artifact tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    /// Direct dependencies in declared order.
    pub depends_on: Vec<String>,
    /// Command line, empty for aggregate tasks.
    pub command: String,
    /// Description from the task file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&Task> for TaskSummary {
    fn from(task: &Task) -> Self {
        Self {
            name: task.name.clone(),
            phony: task.is_phony(),
            artifact: task.kind.artifact().map(Path::to_path_buf),
            depends_on: task.depends_on.clone(),
            command: task.command_line(),
            description: task.description.clone(),
        }
    }
}

/// Summary of a finished run for the JSON envelope.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Requested task.
    pub target: String,
    /// Tasks whose process ran.
    pub executed: Vec<String>,
    /// Tasks skipped as up to date.
    pub skipped: Vec<String>,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

/// Execute the command described by `cli`.
///
/// # Errors
///
/// Returns the [`CliError`] to render and exit with.
pub async fn execute(cli: &Cli, cancel: &CancellationToken) -> Result<(), CliError> {
    if cli.init {
        return init(cli);
    }

    let path = locate_task_file(cli.file.as_deref())?;
    let project = Project::load(&path)?;
    tracing::debug!(path = %project.path.display(), root = %project.root.display(), "Using task file");

    if cli.list {
        list(&project.registry, cli.json);
        return Ok(());
    }
    if cli.check {
        check(&project, cli.json);
        return Ok(());
    }

    let target = project.resolve_target(cli.task.as_deref())?;
    if cli.dry_run {
        return dry_run(&project.registry, target, cli.json);
    }

    let executor = TaskExecutor::new(executor_config(cli, &project));
    let report = TaskRunner::new(&project.registry, executor)
        .run(target, cancel)
        .await?;

    if cli.json {
        let summary = RunSummary {
            target: report.target.clone(),
            executed: report.executed().into_iter().map(String::from).collect(),
            skipped: report.skipped().into_iter().map(String::from).collect(),
            duration_ms: u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
        };
        print_json(&OkEnvelope::new(summary));
    } else {
        let up_to_date = report
            .outcomes
            .iter()
            .all(|outcome| !matches!(outcome, TaskOutcome::Executed(_)));
        if up_to_date {
            tracing::info!(task = target, "Nothing to do");
        }
    }

    Ok(())
}

/// Executor settings from the task file, overridden by command-line flags.
#[must_use]
pub fn executor_config(cli: &Cli, project: &Project) -> ExecutorConfig {
    ExecutorConfig {
        capture_output: cli.capture || cli.json || project.settings.capture_output.unwrap_or(false),
        project_root: project.root.clone(),
        default_timeout: cli
            .timeout
            .map(Duration::from_secs)
            .or_else(|| project.settings.default_timeout()),
        ..ExecutorConfig::default()
    }
}

/// The task file named by `--file`, or the nearest `tend.toml`.
///
/// # Errors
///
/// Returns a configuration error if no task file can be found.
pub fn locate_task_file(explicit: Option<&Path>) -> Result<PathBuf, CliError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let cwd = std::env::current_dir().map_err(|e| CliError::Io {
        message: format!("Cannot read current directory: {e}"),
        help: None,
    })?;
    config::discover(&cwd).ok_or_else(|| {
        CliError::config_with_help(
            format!("No {TASK_FILE_NAME} found in {} or any parent directory", cwd.display()),
            "Create one with `tend --init`, or pass --file",
        )
    })
}

fn init(cli: &Cli) -> Result<(), CliError> {
    let path = cli
        .file
        .clone()
        .unwrap_or_else(|| PathBuf::from(TASK_FILE_NAME));
    config::write_starter(&path)?;

    if cli.json {
        print_json(&OkEnvelope::new(serde_json::json!({ "created": path })));
    } else {
        println!("Created {}", path.display());
    }
    Ok(())
}

fn list(registry: &TaskRegistry, json: bool) {
    let tasks: Vec<TaskSummary> = registry.iter().map(TaskSummary::from).collect();
    if json {
        print_json(&OkEnvelope::new(tasks));
    } else {
        print!("{}", format_task_list(&tasks));
    }
}

fn check(project: &Project, json: bool) {
    if json {
        print_json(&OkEnvelope::new(serde_json::json!({
            "path": project.path,
            "tasks": project.registry.len(),
        })));
    } else {
        println!(
            "{}: {} tasks, no problems found",
            project.path.display(),
            project.registry.len()
        );
    }
}

fn dry_run(registry: &TaskRegistry, target: &str, json: bool) -> Result<(), CliError> {
    let plan: Vec<TaskSummary> = registry
        .plan(target)?
        .into_iter()
        .map(TaskSummary::from)
        .collect();

    if json {
        print_json(&OkEnvelope::new(plan));
    } else {
        print!("{}", format_plan(&plan));
    }
    Ok(())
}

/// One line per task: name, kind marker, description or command, deps.
#[must_use]
pub fn format_task_list(tasks: &[TaskSummary]) -> String {
    let width = tasks.iter().map(|task| task.name.len()).max().unwrap_or(0);
    let mut out = String::new();

    for task in tasks {
        let about = task
            .description
            .clone()
            .unwrap_or_else(|| task.command.clone());
        let mut line = format!("{:<width$}  {}", task.name, kind_marker(task));
        if !about.is_empty() {
            line.push_str("  ");
            line.push_str(&about);
        }
        if !task.depends_on.is_empty() {
            line.push_str(&format!("  (depends on: {})", task.depends_on.join(", ")));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Numbered execution order with each task's command.
#[must_use]
pub fn format_plan(plan: &[TaskSummary]) -> String {
    plan.iter()
        .enumerate()
        .map(|(idx, task)| {
            let command = if task.command.is_empty() {
                "(no command)"
            } else {
                task.command.as_str()
            };
            let note = task
                .artifact
                .as_ref()
                .map_or(String::new(), |path| {
                    format!("  [skipped if {} is up to date]", path.display())
                });
            format!("{}. {}: {command}{note}\n", idx + 1, task.name)
        })
        .collect()
}

fn kind_marker(task: &TaskSummary) -> &'static str {
    if task.phony { "phony   " } else { "artifact" }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "Failed to serialize JSON output"),
    }
}
