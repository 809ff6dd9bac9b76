//! Dependency-ordered, fail-fast execution of a requested task.

use super::executor::{TASK_FAILURE_SNIPPET_LINES, TaskExecutor, TaskResult, format_failure_streams};
use super::freshness::Freshness;
use super::{Task, TaskRegistry};
use crate::{Error, Result};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What happened to one task of a run.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    /// The task's process ran to a successful exit.
    Executed(TaskResult),
    /// The task's artifact was up to date.
    Skipped {
        /// Task name.
        name: String,
    },
    /// The task has no action; only its dependencies ran.
    Aggregate {
        /// Task name.
        name: String,
    },
}

impl TaskOutcome {
    /// Name of the task this outcome belongs to.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Executed(result) => &result.name,
            Self::Skipped { name } | Self::Aggregate { name } => name,
        }
    }
}

/// Outcome of one successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The requested task.
    pub target: String,
    /// Per-task outcomes in execution order.
    pub outcomes: Vec<TaskOutcome>,
    /// Total wall-clock time.
    pub duration: Duration,
}

impl RunReport {
    /// Names of tasks whose process ran, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, TaskOutcome::Executed(_)))
            .map(TaskOutcome::name)
            .collect()
    }

    /// Names of tasks skipped as up to date, in order.
    #[must_use]
    pub fn skipped(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, TaskOutcome::Skipped { .. }))
            .map(TaskOutcome::name)
            .collect()
    }
}

/// Runs tasks from a registry, dependencies first.
///
/// Each [`run`](Self::run) is independent; nothing carries over between
/// calls.
#[derive(Debug, Clone)]
pub struct TaskRunner<'a> {
    registry: &'a TaskRegistry,
    executor: TaskExecutor,
}

impl<'a> TaskRunner<'a> {
    /// Create a runner over `registry`.
    #[must_use]
    pub const fn new(registry: &'a TaskRegistry, executor: TaskExecutor) -> Self {
        Self { registry, executor }
    }

    /// The tasks [`run`](Self::run) would consider, without executing any.
    ///
    /// # Errors
    ///
    /// See [`TaskRegistry::plan`].
    pub fn plan(&self, name: &str) -> Result<Vec<&'a Task>> {
        self.registry.plan(name)
    }

    /// Run `name` and its transitive dependencies.
    ///
    /// Unknown tasks and cycles are reported before any process starts. The
    /// first failing task stops the run.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownTask`] / [`Error::CyclicDependency`] from planning.
    /// - [`Error::TaskExecution`] naming the first task that exited
    ///   unsuccessfully.
    /// - [`Error::TaskTimeout`], [`Error::Io`] from the executor.
    /// - [`Error::Cancelled`] when `cancel` fired.
    pub async fn run(&self, name: &str, cancel: &CancellationToken) -> Result<RunReport> {
        let start_time = Instant::now();
        let order = self.plan(name)?;
        tend_events::emit_run_planned!(name, order.len());
        info!(task = name, count = order.len(), "Running task");

        let mut executed = HashSet::new();
        let mut outcomes = Vec::with_capacity(order.len());

        for task in order {
            let outcome = if cancel.is_cancelled() {
                Err(Error::Cancelled { task: None })
            } else {
                self.run_one(task, &executed, cancel).await
            };

            match outcome {
                Ok(outcome) => {
                    if !matches!(outcome, TaskOutcome::Skipped { .. })
                        && ran_anything(&outcome, task, &executed)
                    {
                        executed.insert(task.name.clone());
                    }
                    outcomes.push(outcome);
                }
                Err(err) => {
                    let err = if cancel.is_cancelled() && !matches!(err, Error::Cancelled { .. }) {
                        Error::Cancelled {
                            task: Some(task.name.clone()),
                        }
                    } else {
                        err
                    };
                    self.report_failure(name, start_time, &err);
                    return Err(err);
                }
            }
        }

        let duration = start_time.elapsed();
        tend_events::emit_run_completed!(name, true, millis(duration));
        info!(task = name, duration_ms = millis(duration), "Run completed");

        Ok(RunReport {
            target: name.to_string(),
            outcomes,
            duration,
        })
    }

    async fn run_one(
        &self,
        task: &Task,
        executed: &HashSet<String>,
        cancel: &CancellationToken,
    ) -> Result<TaskOutcome> {
        let freshness = Freshness::check(
            task,
            self.registry,
            executed,
            &self.executor.config().project_root,
        )?;
        if freshness.is_up_to_date() {
            tend_events::emit_task_skipped!(task.name, freshness);
            debug!(task = %task.name, "Artifact up to date, skipping");
            return Ok(TaskOutcome::Skipped {
                name: task.name.clone(),
            });
        }
        debug!(task = %task.name, reason = %freshness, "Task needs to run");

        let Some(action) = &task.action else {
            return Ok(TaskOutcome::Aggregate {
                name: task.name.clone(),
            });
        };

        let result = self.executor.execute_task(task, action, cancel).await?;
        if !result.success {
            let output = format_failure_streams(&result, TASK_FAILURE_SNIPPET_LINES);
            return Err(Error::TaskExecution {
                task: result.name,
                status: result.exit_code,
                output: (!output.is_empty()).then_some(output),
            });
        }

        Ok(TaskOutcome::Executed(result))
    }

    fn report_failure(&self, name: &str, start_time: Instant, err: &Error) {
        match err {
            Error::Cancelled { task: Some(task) } => {
                tend_events::emit_run_cancelled!(name, task);
            }
            Error::Cancelled { task: None } => tend_events::emit_run_cancelled!(name),
            _ => {
                tend_events::emit_run_completed!(name, false, millis(start_time.elapsed()));
                debug!(task = name, registry_size = self.registry.len(), error = %err, "Run failed");
            }
        }
    }
}

/// Whether a completed task counts as having executed for its dependents.
///
/// An aggregate task passes on the execution of any of its dependencies.
fn ran_anything(outcome: &TaskOutcome, task: &Task, executed: &HashSet<String>) -> bool {
    match outcome {
        TaskOutcome::Executed(_) => true,
        TaskOutcome::Skipped { .. } => false,
        TaskOutcome::Aggregate { .. } => task.depends_on.iter().any(|dep| executed.contains(dep)),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::tasks::ExecutorConfig;
    use crate::test_utils::{registry_from, shell_task};
    use std::fs::{File, FileTimes};
    use std::path::Path;
    use std::time::SystemTime;
    use tempfile::TempDir;
    use tend_events::{EventCategory, RunEvent, TaskEvent, TendEvent, TendEventLayer};
    use tokio::sync::mpsc::UnboundedReceiver;
    use tracing_subscriber::layer::SubscriberExt;

    fn executor(dir: &Path) -> TaskExecutor {
        TaskExecutor::new(ExecutorConfig {
            capture_output: true,
            project_root: dir.to_path_buf(),
            ..ExecutorConfig::default()
        })
    }

    /// Each task appends its name to `log` in `dir`.
    fn logging_task(name: &str, deps: &[&str]) -> Task {
        shell_task(name, deps, &format!("echo {name} >> log"))
    }

    fn read_log(dir: &TempDir) -> Vec<String> {
        std::fs::read_to_string(dir.path().join("log"))
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }

    fn age(path: &Path, seconds: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_times(
            FileTimes::new().set_modified(SystemTime::now() - Duration::from_secs(seconds)),
        )
        .unwrap();
    }

    async fn run_with_events(
        registry: &TaskRegistry,
        dir: &Path,
        name: &str,
    ) -> (Result<RunReport>, UnboundedReceiver<TendEvent>) {
        let (layer, rx) = TendEventLayer::channel();
        let subscriber = tracing_subscriber::registry().with(layer);
        let _guard = tracing::subscriber::set_default(subscriber);
        let result = TaskRunner::new(registry, executor(dir))
            .run(name, &CancellationToken::new())
            .await;
        (result, rx)
    }

    #[tokio::test]
    async fn test_runs_dependencies_before_task() {
        let dir = TempDir::new().unwrap();
        let registry = registry_from(vec![
            logging_task("clean", &[]),
            logging_task("test", &["clean"]),
        ]);

        let report = TaskRunner::new(&registry, executor(dir.path()))
            .run("test", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(read_log(&dir), vec!["clean", "test"]);
        assert_eq!(report.executed(), vec!["clean", "test"]);
        assert_eq!(report.target, "test");
    }

    #[tokio::test]
    async fn test_shared_dependency_runs_once() {
        let dir = TempDir::new().unwrap();
        let registry = registry_from(vec![
            logging_task("fetch", &[]),
            logging_task("lib", &["fetch"]),
            logging_task("bin", &["fetch"]),
            logging_task("all", &["lib", "bin"]),
        ]);

        TaskRunner::new(&registry, executor(dir.path()))
            .run("all", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(read_log(&dir), vec!["fetch", "lib", "bin", "all"]);
    }

    #[tokio::test]
    async fn test_failure_stops_run() {
        let dir = TempDir::new().unwrap();
        let registry = registry_from(vec![
            shell_task("expand", &[], "echo expanding; exit 1"),
            logging_task("docs", &["expand"]),
        ]);

        let err = TaskRunner::new(&registry, executor(dir.path()))
            .run("docs", &CancellationToken::new())
            .await
            .unwrap_err();

        let Error::TaskExecution {
            task,
            status,
            output,
        } = err
        else {
            panic!("expected task execution error, got {err:?}");
        };
        assert_eq!(task, "expand");
        assert_eq!(status, Some(1));
        assert!(output.unwrap().contains("expanding"));
        assert!(read_log(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_task_starts_nothing() {
        let dir = TempDir::new().unwrap();
        let registry = registry_from(vec![logging_task("clean", &[])]);

        let err = TaskRunner::new(&registry, executor(dir.path()))
            .run("deploy", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnknownTask { .. }));
        assert!(read_log(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_cycle_starts_nothing() {
        let dir = TempDir::new().unwrap();
        let registry = registry_from(vec![
            logging_task("a", &["b"]),
            logging_task("b", &["a"]),
        ]);

        let err = TaskRunner::new(&registry, executor(dir.path()))
            .run("a", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CyclicDependency { .. }));
        assert!(read_log(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_runs_are_independent() {
        let dir = TempDir::new().unwrap();
        let registry = registry_from(vec![logging_task("clean", &[])]);
        let runner = TaskRunner::new(&registry, executor(dir.path()));

        runner.run("clean", &CancellationToken::new()).await.unwrap();
        runner.run("clean", &CancellationToken::new()).await.unwrap();

        assert_eq!(read_log(&dir), vec!["clean", "clean"]);
    }

    #[tokio::test]
    async fn test_up_to_date_artifact_is_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("out.txt"), "built").unwrap();
        let registry = registry_from(vec![
            Task::artifact("gen", "out.txt").with_action("sh", ["-c", "echo gen >> log"]),
        ]);

        let report = TaskRunner::new(&registry, executor(dir.path()))
            .run("gen", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.skipped(), vec!["gen"]);
        assert!(read_log(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_stale_artifact_rebuilds_after_dependency() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("lib.a"), "").unwrap();
        std::fs::write(dir.path().join("app"), "").unwrap();
        age(&dir.path().join("app"), 120);
        age(&dir.path().join("lib.a"), 60);

        let registry = registry_from(vec![
            Task::artifact("lib", "lib.a").with_action("sh", ["-c", "echo lib >> log"]),
            Task::artifact("app", "app")
                .with_dependencies(["lib"])
                .with_action("sh", ["-c", "echo app >> log"]),
        ]);

        let report = TaskRunner::new(&registry, executor(dir.path()))
            .run("app", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.skipped(), vec!["lib"]);
        assert_eq!(read_log(&dir), vec!["app"]);
    }

    #[tokio::test]
    async fn test_executed_dependency_forces_dependent() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("app"), "").unwrap();

        let registry = registry_from(vec![
            logging_task("clean", &[]),
            Task::phony("prep").with_dependencies(["clean"]),
            Task::artifact("app", "app")
                .with_dependencies(["prep"])
                .with_action("sh", ["-c", "echo app >> log"]),
        ]);

        let report = TaskRunner::new(&registry, executor(dir.path()))
            .run("app", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(read_log(&dir), vec!["clean", "app"]);
        assert!(matches!(report.outcomes[1], TaskOutcome::Aggregate { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let registry = registry_from(vec![logging_task("clean", &[])]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = TaskRunner::new(&registry, executor(dir.path()))
            .run("clean", &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled { task: None }));
        assert!(read_log(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_abandons_remaining_tasks() {
        let dir = TempDir::new().unwrap();
        let registry = registry_from(vec![
            Task::phony("slow").with_action("sleep", ["30"]),
            logging_task("after", &["slow"]),
        ]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let err = TaskRunner::new(&registry, executor(dir.path()))
            .run("after", &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled { task: Some(ref t) } if t == "slow"));
        assert!(read_log(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_run_emits_lifecycle_events() {
        let dir = TempDir::new().unwrap();
        let registry = registry_from(vec![
            shell_task("clean", &[], "echo cleaning"),
            shell_task("test", &["clean"], "true"),
        ]);

        let (result, mut rx) = run_with_events(&registry, dir.path(), "test").await;
        result.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event.category);
        }

        assert!(matches!(
            events.first(),
            Some(EventCategory::Run(RunEvent::Planned { task_count: 2, .. }))
        ));
        assert!(matches!(
            events.last(),
            Some(EventCategory::Run(RunEvent::Completed { success: true, .. }))
        ));
        let started: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                EventCategory::Task(TaskEvent::Started { name, .. }) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(started, vec!["clean", "test"]);
        assert!(events.iter().any(|event| matches!(
            event,
            EventCategory::Task(TaskEvent::Output { content, .. }) if content == "cleaning"
        )));
    }
}
