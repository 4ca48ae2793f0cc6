//! The expanded, addressed node tree.
//!
//! Nodes live in a flat arena addressed by [`NodeIndex`]; the string
//! [`NodeId`] is kept as the external identity. Parent links make walking
//! toward the root an index operation.

use super::id::NodeId;
use crate::builder::GraphSpec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Entry point every graph node must declare.
pub const START: &str = "start";

/// Entry point restoring the last active child.
pub const HISTORY: &str = "history";

/// Position of a node in the [`Graph`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) fn new(position: usize) -> Self {
        Self(position)
    }

    pub fn position(self) -> usize {
        self.0
    }
}

/// A child to enter and the entry point to enter it through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub node: NodeIndex,
    pub entry_point: String,
}

/// Arrows of a graph node, keyed by the active child and then by label.
pub type ArrowTable = HashMap<NodeIndex, BTreeMap<String, Target>>;

/// The three node shapes.
///
/// Every consumer matches this exhaustively, so adding a shape forces each
/// of them to decide how to treat it.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Terminal node whose behavior comes from bindings.
    Leaf,
    /// All children active at once. Owns no tables.
    Composite { children: Vec<NodeIndex> },
    /// Exactly one child active at a time.
    Graph {
        children: Vec<NodeIndex>,
        arrows: ArrowTable,
        entry_points: BTreeMap<String, Target>,
    },
}

/// A single addressed node.
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeIndex>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn local_name(&self) -> &str {
        self.id.local_name()
    }

    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[NodeIndex] {
        match &self.kind {
            NodeKind::Leaf => &[],
            NodeKind::Composite { children } | NodeKind::Graph { children, .. } => children,
        }
    }

    pub fn is_graph(&self) -> bool {
        matches!(self.kind, NodeKind::Graph { .. })
    }
}

/// A validated expanded graph.
///
/// Built with [`GraphBuilder`](crate::builder::GraphBuilder) or deserialized
/// from a [`GraphSpec`](crate::builder::GraphSpec); both paths run the same
/// validation, so a `Graph` always has a single root, parent-prefixed ids and
/// a `"start"` entry point on every graph node.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "GraphSpec", into = "GraphSpec")]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<NodeId, NodeIndex>,
    root: NodeIndex,
}

impl Graph {
    pub(crate) fn from_parts(nodes: Vec<Node>, root: NodeIndex) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(position, node)| (node.id.clone(), NodeIndex::new(position)))
            .collect();
        Self { nodes, index, root }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn root_id(&self) -> &NodeId {
        self.id(self.root)
    }

    /// Find a node by its absolute id.
    pub fn lookup(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    /// The node at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` was not handed out by this graph. Use
    /// [`Graph::get`] for an index of unknown origin.
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.0]
    }

    /// The node at `index`, or `None` if the arena has no such position.
    pub fn get(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index.0)
    }

    pub fn id(&self, index: NodeIndex) -> &NodeId {
        &self.node(index).id
    }

    pub fn kind(&self, index: NodeIndex) -> &NodeKind {
        &self.node(index).kind
    }

    pub fn parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.node(index).parent
    }

    pub fn children(&self, index: NodeIndex) -> &[NodeIndex] {
        self.node(index).children()
    }

    pub fn is_graph(&self, index: NodeIndex) -> bool {
        self.node(index).is_graph()
    }

    /// Resolve `child` as a declared child of `parent`.
    pub fn child_of(&self, parent: NodeIndex, child: &str) -> Option<NodeIndex> {
        self.lookup(child)
            .filter(|&index| self.parent(index) == Some(parent))
    }

    /// Iterate over all nodes in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(position, node)| (NodeIndex::new(position), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::GraphBuilder;

    #[test]
    fn lookup_and_parent_links_follow_ids() {
        let graph = GraphBuilder::new()
            .graph("main", ["main:A", "main:B"])
            .entry_point("main", "start", "main:A", "start")
            .composite("main:B", ["main:B:A", "main:B:B"])
            .build()
            .unwrap();

        let b = graph.lookup("main:B").unwrap();
        let b_a = graph.lookup("main:B:A").unwrap();

        assert_eq!(graph.root_id().as_str(), "main");
        assert_eq!(graph.parent(b_a), Some(b));
        assert_eq!(graph.parent(graph.root()), None);
        assert_eq!(graph.children(b).len(), 2);
        assert_eq!(graph.node(b_a).local_name(), "A");
        assert!(graph.is_graph(graph.root()));
        assert!(!graph.is_graph(b));
        assert_eq!(graph.len(), 5);
    }

    #[test]
    fn child_of_rejects_non_children() {
        let graph = GraphBuilder::new()
            .graph("main", ["main:A"])
            .entry_point("main", "start", "main:A", "start")
            .build()
            .unwrap();

        let root = graph.root();
        assert!(graph.child_of(root, "main:A").is_some());
        assert!(graph.child_of(root, "main").is_none());
        assert!(graph.child_of(root, "main:Z").is_none());
    }

    #[test]
    fn get_rejects_index_from_larger_graph() {
        let small = GraphBuilder::new()
            .graph("main", ["main:A"])
            .entry_point("main", "start", "main:A", "start")
            .build()
            .unwrap();
        let large = GraphBuilder::new()
            .graph("main", ["main:A", "main:B", "main:C"])
            .entry_point("main", "start", "main:A", "start")
            .build()
            .unwrap();

        let foreign = large.nodes().map(|(index, _)| index).max().unwrap();
        let own = small.lookup("main:A").unwrap();

        assert!(small.get(foreign).is_none());
        assert_eq!(small.get(own).map(|node| node.id().as_str()), Some("main:A"));
    }
}
