//! Dependency graph of named tasks.
//!
//! A [`TaskGraph`] holds tasks keyed by name, with an edge from every
//! dependency to the task that needs it. It does not know what a task runs;
//! it answers which tasks a request pulls in and the order they go in.
//!
//! Ordering is a depth-first walk from the requested task: each task's
//! dependencies are visited before the task itself, in the order a caller
//! supplied key puts them, and a task already placed is never placed again.
//!
//! ```ignore
//! use tend_task_graph::{TaskGraph, TaskNodeData};
//!
//! #[derive(Clone)]
//! struct Step {
//!     needs: Vec<String>,
//! }
//!
//! impl TaskNodeData for Step {
//!     fn dependency_names(&self) -> impl Iterator<Item = &str> {
//!         self.needs.iter().map(String::as_str)
//!     }
//! }
//!
//! let mut graph = TaskGraph::new();
//! graph.add_task("clean", Step { needs: vec![] })?;
//! graph.add_task("test", Step { needs: vec!["clean".into()] })?;
//! graph.add_dependency_edges()?;
//!
//! let order = graph.execution_order("test")?; // clean, test
//! ```

mod error;
mod graph;
mod traversal;
mod validation;

pub use error::{Error, Result};
pub use graph::{GraphNode, TaskGraph};
pub use traversal::TopologicalOrder;
pub use validation::ValidationResult;

/// A task that can live in a [`TaskGraph`].
pub trait TaskNodeData: Clone {
    /// Names of the tasks this one needs, in the order they were declared.
    fn dependency_names(&self) -> impl Iterator<Item = &str>;
}
