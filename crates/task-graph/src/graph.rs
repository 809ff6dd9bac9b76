//! Task graph builder using petgraph.
//!
//! This module builds directed acyclic graphs (DAGs) from task definitions
//! to handle dependencies and determine execution order.
//!
//! Edges point from a dependency to its dependent, so the dependencies of a
//! node are its incoming neighbors.

use crate::traversal::Mark;
use crate::{Error, Result, TaskNodeData, TopologicalOrder};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::IntoNodeReferences;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A node in the task graph.
#[derive(Debug, Clone)]
pub struct GraphNode<T> {
    /// Name of the task.
    pub name: String,
    /// The task data.
    pub task: T,
}

/// Task graph for dependency resolution and execution ordering.
///
/// This is a generic graph that can hold any task type implementing [`TaskNodeData`].
/// Nodes are addressed by name; internally every name maps to a petgraph
/// [`NodeIndex`] and all traversals work on indices.
pub struct TaskGraph<T: TaskNodeData> {
    /// The directed graph of tasks.
    graph: DiGraph<GraphNode<T>, ()>,
    /// Map from task names to node indices.
    name_to_node: HashMap<String, NodeIndex>,
}

impl<T: TaskNodeData> TaskGraph<T> {
    /// Create a new empty task graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            name_to_node: HashMap::new(),
        }
    }

    /// Add a single task to the graph.
    ///
    /// If a task with the same name already exists, returns the existing node index.
    /// Rejecting duplicates is the job of whoever owns the task definitions.
    ///
    /// # Errors
    ///
    /// Currently infallible, but returns `Result` for API consistency.
    pub fn add_task(&mut self, name: &str, task: T) -> Result<NodeIndex> {
        if let Some(&node) = self.name_to_node.get(name) {
            return Ok(node);
        }

        let node = GraphNode {
            name: name.to_string(),
            task,
        };

        let node_index = self.graph.add_node(node);
        self.name_to_node.insert(name.to_string(), node_index);
        debug!("Added task node '{}'", name);

        Ok(node_index)
    }

    /// Add dependency edges after all tasks have been added.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDependencies`] listing every (task, dependency)
    /// pair whose dependency is not in the graph. No edge is added in that case.
    pub fn add_dependency_edges(&mut self) -> Result<()> {
        let mut missing_deps = Vec::new();
        let mut edges_to_add = Vec::new();

        for (node_index, node) in self.graph.node_references() {
            for dep_name in node.task.dependency_names() {
                if let Some(&dep_node_index) = self.name_to_node.get(dep_name) {
                    edges_to_add.push((dep_node_index, node_index));
                } else {
                    missing_deps.push((node.name.clone(), dep_name.to_string()));
                }
            }
        }

        if !missing_deps.is_empty() {
            return Err(Error::MissingDependencies {
                missing: missing_deps,
            });
        }

        for (from, to) in edges_to_add {
            self.graph.update_edge(from, to, ());
        }

        Ok(())
    }

    /// Find one dependency cycle, if the graph has any.
    ///
    /// Roots are tried in insertion order, so the reported cycle is stable for
    /// a given graph. The returned path starts and ends with the same task.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        let mut path = Vec::new();
        let mut order = Vec::new();
        let by_index = |idx: NodeIndex, _: &GraphNode<T>| idx.index();

        for idx in self.graph.node_indices() {
            if marks[idx.index()] != Mark::Unvisited {
                continue;
            }
            if let Err(Error::CycleDetected { cycle }) =
                self.visit(idx, &by_index, &mut marks, &mut path, &mut order)
            {
                return Some(cycle);
            }
        }

        None
    }

    /// Ordering of `root` and its transitive dependencies.
    ///
    /// Depth-first: each task appears after all of its dependencies and
    /// exactly once. Sibling dependencies are visited in node insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskNotFound`] if `root` is not in the graph and
    /// [`Error::CycleDetected`] if the closure of `root` contains a cycle.
    pub fn execution_order(&self, root: &str) -> Result<TopologicalOrder<T>> {
        self.ordered_closure(root, |idx, _| idx.index())
    }

    /// Like [`execution_order`](Self::execution_order), but sibling
    /// dependencies are visited in ascending `key` order.
    ///
    /// Nodes with equal keys fall back to insertion order.
    ///
    /// # Errors
    ///
    /// Same as [`execution_order`](Self::execution_order).
    pub fn execution_order_by_key<K, F>(&self, root: &str, key: F) -> Result<TopologicalOrder<T>>
    where
        K: Ord,
        F: Fn(&GraphNode<T>) -> K,
    {
        self.ordered_closure(root, |_, node| key(node))
    }

    fn ordered_closure<K, F>(&self, root: &str, key: F) -> Result<TopologicalOrder<T>>
    where
        K: Ord,
        F: Fn(NodeIndex, &GraphNode<T>) -> K,
    {
        let start = self
            .get_node_index(root)
            .ok_or_else(|| Error::TaskNotFound {
                name: root.to_string(),
            })?;

        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        let mut path = Vec::new();
        let mut order = Vec::new();
        self.visit(start, &key, &mut marks, &mut path, &mut order)?;

        debug!(root, tasks = order.len(), "Computed execution order");

        Ok(order
            .into_iter()
            .map(|idx| self.graph[idx].clone())
            .collect())
    }

    fn visit<K, F>(
        &self,
        node: NodeIndex,
        key: &F,
        marks: &mut [Mark],
        path: &mut Vec<NodeIndex>,
        order: &mut Vec<NodeIndex>,
    ) -> Result<()>
    where
        K: Ord,
        F: Fn(NodeIndex, &GraphNode<T>) -> K,
    {
        match marks[node.index()] {
            Mark::Done => return Ok(()),
            Mark::Visiting => return Err(self.cycle_error(path, node)),
            Mark::Unvisited => {}
        }

        marks[node.index()] = Mark::Visiting;
        path.push(node);

        for dep in self.sorted_dependencies(node, key) {
            self.visit(dep, key, marks, path, order)?;
        }

        path.pop();
        marks[node.index()] = Mark::Done;
        order.push(node);
        Ok(())
    }

    fn sorted_dependencies<K, F>(&self, node: NodeIndex, key: &F) -> Vec<NodeIndex>
    where
        K: Ord,
        F: Fn(NodeIndex, &GraphNode<T>) -> K,
    {
        let mut deps: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .collect();
        deps.sort_by_cached_key(|&dep| (key(dep, &self.graph[dep]), dep));
        deps.dedup();
        deps
    }

    fn cycle_error(&self, path: &[NodeIndex], repeated: NodeIndex) -> Error {
        let start = path.iter().position(|&n| n == repeated).unwrap_or(0);
        let mut cycle: Vec<String> = path[start..]
            .iter()
            .map(|&n| self.graph[n].name.clone())
            .collect();
        cycle.push(self.graph[repeated].name.clone());
        Error::CycleDetected { cycle }
    }

    /// Get the number of tasks in the graph.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if a task exists in the graph.
    #[must_use]
    pub fn contains_task(&self, name: &str) -> bool {
        self.name_to_node.contains_key(name)
    }

    fn get_node_index(&self, name: &str) -> Option<NodeIndex> {
        self.name_to_node.get(name).copied()
    }

    /// Iterate over all nodes in the graph, in insertion order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = (NodeIndex, &GraphNode<T>)> {
        self.graph.node_references()
    }

    /// Build graph for a specific task and all its transitive dependencies.
    ///
    /// Only the subgraph reachable from `task_name` is pulled in through
    /// `get_task`, then dependency edges are wired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskNotFound`] if `task_name` itself cannot be found,
    /// and [`Error::MissingDependencies`] if any dependency in the closure
    /// cannot be found.
    pub fn build_for_task<F>(&mut self, task_name: &str, mut get_task: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<T>,
    {
        let mut to_process = vec![task_name.to_string()];
        let mut processed = HashSet::new();

        debug!("Building graph for '{}'", task_name);

        while let Some(current_name) = to_process.pop() {
            if !processed.insert(current_name.clone()) {
                continue;
            }

            if let Some(task) = get_task(&current_name) {
                let deps: Vec<String> = task.dependency_names().map(String::from).collect();

                self.add_task(&current_name, task)?;

                for dep in deps.into_iter().rev() {
                    if !processed.contains(&dep) {
                        to_process.push(dep);
                    }
                }
            } else if current_name == task_name {
                return Err(Error::TaskNotFound {
                    name: current_name,
                });
            } else {
                // Reported with its dependent by add_dependency_edges
                debug!("Task '{}' not found while building graph", current_name);
            }
        }

        self.add_dependency_edges()
    }
}

impl<T: TaskNodeData> Default for TaskGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}
