//! Task file (`tend.toml`) loading.
//!
//! The task file is a static TOML declaration read once at startup:
//!
//! ```toml
//! [settings]
//! default = "test"
//!
//! [[task]]
//! name = "clean"
//! command = "cargo"
//! args = ["clean"]
//!
//! [[task]]
//! name = "test"
//! depends_on = ["clean"]
//! command = "cargo"
//! args = ["test"]
//! ```

use crate::tasks::{Task, TaskKind, TaskRegistry};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default task file name.
pub const TASK_FILE_NAME: &str = "tend.toml";

/// Starter task file written by `tend --init`.
pub const STARTER_TASK_FILE: &str = r#"# Tasks run with `tend <name>`; `tend` alone runs the default task.

[settings]
default = "test"

[[task]]
name = "clean"
description = "Remove build outputs"
command = "cargo"
args = ["clean"]

[[task]]
name = "test"
description = "Run the test suite"
command = "cargo"
args = ["test"]

[[task]]
name = "expand"
description = "Show macro-expanded source"
command = "cargo"
args = ["expand"]

[[task]]
name = "docs"
description = "Build API documentation"
command = "cargo"
args = ["doc", "--no-deps"]
"#;

/// Parsed task file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TaskFile {
    /// File-wide settings.
    #[serde(default)]
    pub settings: Settings,

    /// Task declarations in file order.
    #[serde(default, rename = "task")]
    pub tasks: Vec<TaskConfig>,
}

/// `[settings]` table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Task to run when none is named on the command line.
    pub default: Option<String>,

    /// Timeout applied to tasks that do not set their own.
    pub timeout_secs: Option<u64>,

    /// Capture task output instead of inheriting the terminal's streams.
    pub capture_output: Option<bool>,
}

impl Settings {
    /// Reject values no task could run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a zero `timeout_secs`.
    pub fn validate(&self, path: &Path) -> Result<()> {
        if self.timeout_secs == Some(0) {
            return Err(Error::configuration_in(
                "settings.timeout_secs must be at least 1",
                path,
            ));
        }
        Ok(())
    }

    /// Timeout applied to tasks that do not set their own.
    #[must_use]
    pub fn default_timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// One `[[task]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Unique task name.
    pub name: String,

    /// Description shown by `tend --list`.
    #[serde(default)]
    pub description: Option<String>,

    /// Explicit phony flag; defaults to `artifact` being absent.
    #[serde(default)]
    pub phony: Option<bool>,

    /// File produced by the task.
    #[serde(default)]
    pub artifact: Option<PathBuf>,

    /// Tasks that must run first.
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Program to run. Tasks without one only run their dependencies.
    #[serde(default)]
    pub command: Option<String>,

    /// Arguments for the command
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory relative to the task file.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl TaskConfig {
    /// Convert the declaration into a validated [`Task`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the phony flag contradicts the
    /// artifact, arguments are given without a command, or a field is empty.
    pub fn to_task(&self, file: &Path) -> Result<Task> {
        let invalid = |message: String| Error::configuration_in(message, file);

        if self.name.trim().is_empty() {
            return Err(invalid("task name must not be empty".to_string()));
        }
        let name = &self.name;

        let kind = match (self.phony, &self.artifact) {
            (Some(true), Some(_)) => {
                return Err(invalid(format!(
                    "task '{name}' is phony but declares an artifact"
                )));
            }
            (Some(false), None) => {
                return Err(invalid(format!(
                    "task '{name}' is not phony but declares no artifact"
                )));
            }
            (_, Some(path)) => TaskKind::Artifact { path: path.clone() },
            (_, None) => TaskKind::Phony,
        };

        let mut task = Task {
            kind,
            ..Task::phony(name.as_str())
        }
        .with_dependencies(self.depends_on.iter().cloned());

        match &self.command {
            Some(command) if command.trim().is_empty() => {
                return Err(invalid(format!("task '{name}' has an empty command")));
            }
            Some(command) => task = task.with_action(command.as_str(), self.args.iter().cloned()),
            None if !self.args.is_empty() => {
                return Err(invalid(format!(
                    "task '{name}' has args but no command"
                )));
            }
            None => {}
        }

        if let Some(description) = &self.description {
            task = task.with_description(description.as_str());
        }
        if let Some(directory) = &self.directory {
            task = task.with_directory(directory.as_path());
        }
        match self.timeout_secs {
            Some(0) => {
                return Err(invalid(format!(
                    "task '{name}' has a zero timeout"
                )));
            }
            Some(secs) => task = task.with_timeout(Duration::from_secs(secs)),
            None => {}
        }

        Ok(task)
    }
}

impl TaskFile {
    /// Parse task file contents. `path` is only used for error messages.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] on TOML syntax errors, unknown keys or
    /// wrongly typed values.
    pub fn parse(source: &str, path: &Path) -> Result<Self> {
        toml::from_str(source)
            .map_err(|e| Error::configuration_in(format!("{}: {e}", path.display()), path))
    }

    /// Read and parse a task file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as
    /// [`parse`](Self::parse).
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::io(e, Some(path.to_path_buf()), "read task file"))?;
        Self::parse(&source, path)
    }

    /// Register every declared task in file order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for invalid declarations and
    /// [`Error::DuplicateTask`] for repeated names.
    pub fn to_registry(&self, path: &Path) -> Result<TaskRegistry> {
        let mut registry = TaskRegistry::new();
        for config in &self.tasks {
            registry.register(config.to_task(path)?)?;
        }
        Ok(registry)
    }
}

/// A loaded task file with its registry.
#[derive(Debug, Clone)]
pub struct Project {
    /// Path of the task file.
    pub path: PathBuf,
    /// Directory holding the task file.
    pub root: PathBuf,
    /// Parsed `[settings]`.
    pub settings: Settings,
    /// Registered tasks.
    pub registry: TaskRegistry,
}

impl Project {
    /// Load and validate the task file at `path`.
    ///
    /// The whole registry is checked for unknown dependencies and cycles so
    /// that a broken file is reported before anything runs.
    ///
    /// # Errors
    ///
    /// Any error from [`TaskFile::load`], [`Settings::validate`],
    /// [`TaskFile::to_registry`] or [`TaskRegistry::validate`]; a `default`
    /// naming an unknown task is an [`Error::UnknownTask`].
    pub fn load(path: &Path) -> Result<Self> {
        let file = TaskFile::load(path)?;
        file.settings.validate(path)?;
        let registry = file.to_registry(path)?;
        registry.validate()?;

        if let Some(default) = file
            .settings
            .default
            .as_ref()
            .filter(|default| !registry.contains(default))
        {
            return Err(Error::unknown_task(default.clone()));
        }

        let root = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        debug!(path = %path.display(), tasks = registry.len(), "Loaded task file");

        Ok(Self {
            path: path.to_path_buf(),
            root,
            settings: file.settings,
            registry,
        })
    }

    /// Task to run when `requested` is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingTask`] when nothing is requested and no default
    /// task is configured.
    pub fn resolve_target<'a>(&'a self, requested: Option<&'a str>) -> Result<&'a str> {
        requested
            .or(self.settings.default.as_deref())
            .ok_or(Error::MissingTask)
    }
}

/// Find the task file in `start` or its nearest ancestor.
#[must_use]
pub fn discover(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(TASK_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Write [`STARTER_TASK_FILE`] to `path`.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if `path` already exists and
/// [`Error::Io`] if it cannot be written.
pub fn write_starter(path: &Path) -> Result<()> {
    use std::io::Write;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                Error::configuration_in(
                    format!("{} already exists; refusing to overwrite it", path.display()),
                    path,
                )
            } else {
                Error::io(e, Some(path.to_path_buf()), "create task file")
            }
        })?;
    file.write_all(STARTER_TASK_FILE.as_bytes())
        .map_err(|e| Error::io(e, Some(path.to_path_buf()), "write task file"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(source: &str) -> Result<TaskFile> {
        TaskFile::parse(source, Path::new("tend.toml"))
    }

    fn registry(source: &str) -> Result<TaskRegistry> {
        parse(source)?.to_registry(Path::new("tend.toml"))
    }

    #[test]
    fn test_parse_full_file() {
        let file = parse(
            r#"
            [settings]
            default = "test"
            timeout_secs = 600
            capture_output = true

            [[task]]
            name = "clean"
            command = "cargo"
            args = ["clean"]

            [[task]]
            name = "docs"
            artifact = "target/doc/index.html"
            depends_on = ["clean"]
            command = "cargo"
            args = ["doc"]
            timeout_secs = 120
            directory = "."
            "#,
        )
        .unwrap();

        assert_eq!(file.settings.default.as_deref(), Some("test"));
        assert_eq!(file.settings.default_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(file.settings.capture_output, Some(true));
        assert_eq!(file.tasks.len(), 2);

        let registry = file.to_registry(Path::new("tend.toml")).unwrap();
        let docs = registry.get("docs").unwrap();
        assert_eq!(
            docs.kind,
            TaskKind::Artifact {
                path: PathBuf::from("target/doc/index.html")
            }
        );
        assert_eq!(docs.depends_on, vec!["clean"]);
        assert_eq!(docs.timeout, Some(Duration::from_secs(120)));
        assert_eq!(docs.command_line(), "cargo doc");
        assert!(registry.get("clean").unwrap().is_phony());
    }

    #[test]
    fn test_empty_file_is_valid() {
        let file = parse("").unwrap();
        assert_eq!(file, TaskFile::default());
    }

    #[test]
    fn test_phony_with_artifact_rejected() {
        let err = registry(
            r#"
            [[task]]
            name = "docs"
            phony = true
            artifact = "out"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("is phony but declares an artifact"));
    }

    #[test]
    fn test_non_phony_without_artifact_rejected() {
        let err = registry(
            r#"
            [[task]]
            name = "docs"
            phony = false
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("declares no artifact"));
    }

    #[test]
    fn test_explicit_flags_agreeing_with_artifact_accepted() {
        let registry = registry(
            r#"
            [[task]]
            name = "gen"
            phony = false
            artifact = "out"

            [[task]]
            name = "all"
            phony = true
            depends_on = ["gen"]
            "#,
        )
        .unwrap();
        assert!(!registry.get("gen").unwrap().is_phony());
        assert!(registry.get("all").unwrap().action.is_none());
    }

    #[test]
    fn test_args_without_command_rejected() {
        let err = registry(
            r#"
            [[task]]
            name = "test"
            args = ["test"]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("has args but no command"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = parse(
            r#"
            [[task]]
            name = "test"
            comand = "cargo"
            "#,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("tend.toml"));
        assert!(message.contains("comand"));
    }

    #[test]
    fn test_duplicate_task_rejected() {
        let err = registry(
            r#"
            [[task]]
            name = "clean"

            [[task]]
            name = "clean"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateTask { ref name } if name == "clean"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = registry(
            r#"
            [[task]]
            name = "test"
            timeout_secs = 0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("zero timeout"));
    }

    #[test]
    fn test_project_load_rejects_zero_default_timeout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(TASK_FILE_NAME);
        std::fs::write(
            &path,
            r#"
            [settings]
            timeout_secs = 0

            [[task]]
            name = "test"
            command = "cargo"
            "#,
        )
        .unwrap();

        let err = Project::load(&path).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("settings.timeout_secs"));
    }

    #[test]
    fn test_project_load_validates_registry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(TASK_FILE_NAME);
        std::fs::write(
            &path,
            r#"
            [[task]]
            name = "a"
            depends_on = ["b"]

            [[task]]
            name = "b"
            depends_on = ["a"]
            "#,
        )
        .unwrap();

        assert!(matches!(
            Project::load(&path),
            Err(Error::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_project_load_rejects_unknown_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(TASK_FILE_NAME);
        std::fs::write(&path, "[settings]\ndefault = \"deploy\"\n").unwrap();

        assert!(matches!(
            Project::load(&path),
            Err(Error::UnknownTask { ref name, .. }) if name == "deploy"
        ));
    }

    #[test]
    fn test_project_resolve_target() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(TASK_FILE_NAME);
        std::fs::write(&path, STARTER_TASK_FILE).unwrap();

        let project = Project::load(&path).unwrap();
        assert_eq!(project.root, dir.path());
        assert_eq!(project.resolve_target(None).unwrap(), "test");
        assert_eq!(project.resolve_target(Some("docs")).unwrap(), "docs");

        let bare = Project {
            settings: Settings::default(),
            ..project
        };
        assert!(matches!(bare.resolve_target(None), Err(Error::MissingTask)));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = TaskFile::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_discover_walks_up() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(TASK_FILE_NAME), "").unwrap();

        assert_eq!(
            discover(&nested),
            Some(dir.path().join(TASK_FILE_NAME))
        );
    }

    #[test]
    fn test_write_starter_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(TASK_FILE_NAME);

        write_starter(&path).unwrap();
        let file = TaskFile::load(&path).unwrap();
        let names: Vec<_> = file.tasks.iter().map(|task| task.name.as_str()).collect();
        assert_eq!(names, vec!["clean", "test", "expand", "docs"]);

        let err = write_starter(&path).unwrap_err();
        assert!(err.to_string().contains("refusing to overwrite"));
    }
}
