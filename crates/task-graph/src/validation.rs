//! Whole-graph checks, independent of any requested root.

use crate::{Error, Result, TaskGraph, TaskNodeData};

/// Problems found by [`TaskGraph::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Dangling dependencies first, then at most one cycle.
    pub errors: Vec<Error>,
}

impl ValidationResult {
    /// No problems were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The first problem as an error.
    ///
    /// # Errors
    ///
    /// Returns the first recorded error, if any.
    pub fn into_result(self) -> Result<()> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<T: TaskNodeData> TaskGraph<T> {
    /// Check every node for dependencies that are not in the graph and the
    /// graph for cycles.
    ///
    /// Cycles are only visible once [`add_dependency_edges`] has run.
    ///
    /// [`add_dependency_edges`]: TaskGraph::add_dependency_edges
    #[must_use]
    pub fn validate(&self) -> ValidationResult {
        let missing: Vec<(String, String)> = self
            .iter_nodes()
            .flat_map(|(_, node)| {
                node.task
                    .dependency_names()
                    .filter(|dep| !self.contains_task(dep))
                    .map(|dep| (node.name.clone(), dep.to_string()))
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut errors = Vec::new();
        if !missing.is_empty() {
            errors.push(Error::MissingDependencies { missing });
        }
        if let Some(cycle) = self.find_cycle() {
            errors.push(Error::CycleDetected { cycle });
        }

        ValidationResult { errors }
    }
}
