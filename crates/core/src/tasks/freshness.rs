//! Up-to-date checks for artifact tasks.

use super::{Task, TaskKind, TaskRegistry};
use crate::{Error, Result};
use std::collections::HashSet;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Whether a task has to execute in the current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// Phony tasks always execute.
    Phony,
    /// The artifact does not exist.
    Missing,
    /// A dependency executed earlier in this run.
    DependencyRan {
        /// The dependency that executed.
        dependency: String,
    },
    /// A dependency's artifact is newer than this task's artifact.
    OlderThan {
        /// The dependency with the newer artifact.
        dependency: String,
    },
    /// The artifact exists and nothing it depends on changed.
    UpToDate,
}

impl Freshness {
    /// Whether the task can be skipped.
    #[must_use]
    pub const fn is_up_to_date(&self) -> bool {
        matches!(self, Self::UpToDate)
    }

    /// Decide whether `task` must execute.
    ///
    /// `executed` holds the tasks that executed earlier in the same run and
    /// `root` is the directory relative artifact paths are resolved against.
    ///
    /// A command-less phony dependency is looked through: if an artifact
    /// beneath it is newer than this task's artifact, or a task beneath it
    /// executed, the task is stale and the aggregate is reported as the cause.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if an artifact exists but its modification time
    /// cannot be read.
    pub fn check(
        task: &Task,
        registry: &TaskRegistry,
        executed: &HashSet<String>,
        root: &Path,
    ) -> Result<Self> {
        let TaskKind::Artifact { path } = &task.kind else {
            return Ok(Self::Phony);
        };

        let Some(artifact_time) = modified(&resolve(root, path))? else {
            return Ok(Self::Missing);
        };

        for dependency in &task.depends_on {
            if executed.contains(dependency) {
                return Ok(Self::DependencyRan {
                    dependency: dependency.clone(),
                });
            }

            let mut seen = HashSet::new();
            if newer_than(dependency, artifact_time, registry, executed, root, &mut seen)? {
                return Ok(Self::OlderThan {
                    dependency: dependency.clone(),
                });
            }
        }

        Ok(Self::UpToDate)
    }
}

/// Whether `name` carries a change newer than `since`.
///
/// An artifact dependency compares its own timestamp. A command-less phony
/// task has no output of its own, so the artifacts and executions beneath it
/// count in its place.
fn newer_than(
    name: &str,
    since: SystemTime,
    registry: &TaskRegistry,
    executed: &HashSet<String>,
    root: &Path,
    seen: &mut HashSet<String>,
) -> Result<bool> {
    if !seen.insert(name.to_string()) {
        return Ok(false);
    }
    let Some(task) = registry.get(name) else {
        return Ok(false);
    };
    match &task.kind {
        TaskKind::Artifact { path } => {
            Ok(modified(&resolve(root, path))?.is_some_and(|time| time > since))
        }
        TaskKind::Phony if task.action.is_none() => {
            for dependency in &task.depends_on {
                if executed.contains(dependency)
                    || newer_than(dependency, since, registry, executed, root, seen)?
                {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        TaskKind::Phony => Ok(false),
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phony => f.write_str("phony"),
            Self::Missing => f.write_str("artifact missing"),
            Self::DependencyRan { dependency } => write!(f, "dependency '{dependency}' ran"),
            Self::OlderThan { dependency } => {
                write!(f, "artifact older than that of '{dependency}'")
            }
            Self::UpToDate => f.write_str("up to date"),
        }
    }
}

/// Resolve `path` against `root` unless it is absolute.
#[must_use]
pub fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn modified(path: &Path) -> Result<Option<SystemTime>> {
    match std::fs::metadata(path) {
        Ok(metadata) => metadata
            .modified()
            .map(Some)
            .map_err(|e| Error::io(e, Some(path.to_path_buf()), "read artifact timestamp")),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(
            e,
            Some(path.to_path_buf()),
            "read artifact metadata",
        )),
    }
}
