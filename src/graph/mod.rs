//! Canon-level dependency graph.
//!
//! Nodes are canons, not packages: every package that maps to the same canon
//! contributes its package manager to that canon's node, and its dependencies
//! become edges out of it.

mod builder;
mod source;

pub use builder::{GraphBuild, UnresolvedRef, build_graph};
pub use source::StoreDependencies;

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonGraphNode {
    pub canon_id: String,
    /// Package managers of the packages that map to this canon.
    pub package_manager_ids: BTreeSet<String>,
}

impl CanonGraphNode {
    pub fn new(canon_id: impl Into<String>) -> Self {
        Self {
            canon_id: canon_id.into(),
            package_manager_ids: BTreeSet::new(),
        }
    }
}

/// Directed graph with at most one node per canon and one edge per ordered pair.
#[derive(Default)]
pub struct CanonGraph {
    inner: DiGraph<CanonGraphNode, ()>,
    canon_to_index: HashMap<String, NodeIndex>,
    edges: HashSet<(NodeIndex, NodeIndex)>,
}

impl std::fmt::Debug for CanonGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanonGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl CanonGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node for `canon_id`, creating it on first sight.
    pub fn get_or_insert(&mut self, canon_id: &str) -> NodeIndex {
        if let Some(&index) = self.canon_to_index.get(canon_id) {
            return index;
        }
        let index = self.inner.add_node(CanonGraphNode::new(canon_id));
        self.canon_to_index.insert(canon_id.to_string(), index);
        index
    }

    /// Adds `from -> to` unless that ordered pair already exists.
    /// Returns whether an edge was added.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) -> bool {
        if !self.edges.insert((from, to)) {
            return false;
        }
        self.inner.add_edge(from, to, ());
        true
    }

    pub fn index_of(&self, canon_id: &str) -> Option<NodeIndex> {
        self.canon_to_index.get(canon_id).copied()
    }

    pub fn node(&self, index: NodeIndex) -> Option<&CanonGraphNode> {
        self.inner.node_weight(index)
    }

    pub fn node_mut(&mut self, index: NodeIndex) -> Option<&mut CanonGraphNode> {
        self.inner.node_weight_mut(index)
    }

    pub fn canon_id(&self, index: NodeIndex) -> Option<&str> {
        self.node(index).map(|node| node.canon_id.as_str())
    }

    /// Outbound neighbours of `index`, i.e. the canons it depends on.
    pub fn dependencies(&self, index: NodeIndex) -> Vec<NodeIndex> {
        self.inner
            .neighbors_directed(index, Direction::Outgoing)
            .collect()
    }

    pub fn has_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.edges.contains(&(from, to))
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    /// Node indices in insertion order.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.inner.node_indices()
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &CanonGraphNode> {
        self.inner
            .node_indices()
            .filter_map(move |index| self.inner.node_weight(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_insert_is_idempotent() {
        let mut graph = CanonGraph::new();
        let a = graph.get_or_insert("canon-a");
        let b = graph.get_or_insert("canon-b");
        assert_ne!(a, b);
        assert_eq!(graph.get_or_insert("canon-a"), a);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.index_of("canon-b"), Some(b));
        assert_eq!(graph.canon_id(a), Some("canon-a"));
    }

    #[test]
    fn test_edges_collapse_per_ordered_pair() {
        let mut graph = CanonGraph::new();
        let a = graph.get_or_insert("a");
        let b = graph.get_or_insert("b");

        assert!(graph.add_edge(a, b));
        assert!(!graph.add_edge(a, b));
        assert!(graph.add_edge(b, a));
        assert!(graph.add_edge(a, a));

        assert_eq!(graph.edge_count(), 3);
        let mut deps = graph.dependencies(a);
        deps.sort();
        assert_eq!(deps, vec![a, b]);
        assert_eq!(graph.dependencies(b), vec![a]);
    }
}
