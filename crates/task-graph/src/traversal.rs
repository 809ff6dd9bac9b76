//! Traversal types for task graphs.

use crate::GraphNode;

/// A topologically sorted sequence of task nodes.
///
/// This type represents tasks in an order where all dependencies
/// come before the tasks that depend on them.
pub type TopologicalOrder<T> = Vec<GraphNode<T>>;

/// Visit state of a node during depth-first traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mark {
    Unvisited,
    /// On the current DFS path; reaching it again closes a cycle.
    Visiting,
    Done,
}
