//! Shared test utilities for tend-core tests.

use crate::tasks::{Task, TaskRegistry};

/// Create a phony task that runs `sh -c script`.
pub fn shell_task(name: &str, deps: &[&str], script: &str) -> Task {
    Task::phony(name)
        .with_dependencies(deps.iter().copied())
        .with_action("sh", ["-c", script])
}

/// Build a registry of action-less phony tasks from `(name, deps)` pairs.
pub fn registry_of(tasks: &[(&str, &[&str])]) -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    for (name, deps) in tasks {
        registry
            .register(Task::phony(*name).with_dependencies(deps.iter().copied()))
            .unwrap();
    }
    registry
}

/// Build a registry from already constructed tasks.
pub fn registry_from(tasks: Vec<Task>) -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    for task in tasks {
        registry.register(task).unwrap();
    }
    registry
}
