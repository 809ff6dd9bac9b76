//! Name-to-task mapping preserving declaration order.

use super::Task;
use crate::{Error, Result};
use std::collections::HashMap;
use tend_task_graph::TaskGraph;
use tracing::debug;

/// Registered tasks, in the order they were declared.
///
/// Built once from the task file and read-only afterwards; every run borrows
/// it immutably.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl TaskRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateTask`] if a task with the same name is
    /// already registered.
    pub fn register(&mut self, task: Task) -> Result<()> {
        if self.index.contains_key(&task.name) {
            return Err(Error::DuplicateTask { name: task.name });
        }
        debug!(task = %task.name, deps = ?task.depends_on, "Registering task");
        self.index.insert(task.name.clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    /// Look up a task by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&idx| &self.tasks[idx])
    }

    /// Declaration index of a task.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Whether a task is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tasks in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Number of registered tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The tasks `name` pulls in, dependencies first, each once.
    ///
    /// Independent dependencies are ordered by declaration order. No process
    /// is started.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownTask`] if `name` or any transitive dependency is not
    ///   registered.
    /// - [`Error::CyclicDependency`] if the closure of `name` has a cycle.
    pub fn plan(&self, name: &str) -> Result<Vec<&Task>> {
        if !self.contains(name) {
            return Err(Error::unknown_task(name));
        }

        let mut graph = TaskGraph::new();
        graph.build_for_task(name, |task_name| self.get(task_name).cloned())?;

        let order = graph.execution_order_by_key(name, |node| {
            self.position(&node.name).unwrap_or(usize::MAX)
        })?;

        debug!(
            task = name,
            order = ?order.iter().map(|node| node.name.as_str()).collect::<Vec<_>>(),
            "Resolved execution order"
        );

        order
            .iter()
            .map(|node| {
                self.get(&node.name)
                    .ok_or_else(|| Error::unknown_task(node.name.clone()))
            })
            .collect()
    }

    /// Check every task for unknown dependencies and cycles.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: [`Error::UnknownTask`] naming the
    /// missing dependency and the task requiring it, or
    /// [`Error::CyclicDependency`] naming the tasks on a cycle.
    pub fn validate(&self) -> Result<()> {
        let mut graph = TaskGraph::new();
        for task in &self.tasks {
            graph.add_task(&task.name, task.clone())?;
        }
        graph.add_dependency_edges()?;

        graph.validate().into_result().map_err(Error::from)
    }
}

impl<'a> IntoIterator for &'a TaskRegistry {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}
