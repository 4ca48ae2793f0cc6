//! Fluent builder for expanded graphs.

use crate::builder::error::BuildError;
use crate::builder::spec::{EntrySpec, GraphSpec, NodeSpec};
use crate::core::{Graph, NodeId};

/// Builder for constructing a [`Graph`] with a fluent API.
///
/// Ids are absolute. Children that are referenced but never declared are
/// added as leaves.
///
/// # Example
///
/// ```rust
/// use hierarch::builder::GraphBuilder;
///
/// let graph = GraphBuilder::new()
///     .graph("main", ["main:Idle", "main:Busy"])
///     .entry_point("main", "start", "main:Idle", "start")
///     .arrow("main", "main:Idle", "work", "main:Busy", "start")
///     .arrow("main", "main:Busy", "done", "main:Idle", "start")
///     .build()
///     .unwrap();
///
/// assert_eq!(graph.len(), 3);
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: GraphSpec,
    error: Option<BuildError>,
}

impl GraphBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a leaf node.
    pub fn leaf(mut self, id: impl Into<NodeId>) -> Self {
        self.nodes.nodes.insert(id.into(), NodeSpec::Leaf);
        self
    }

    /// Declare a composite node with its regions in order.
    pub fn composite<I, C>(mut self, id: impl Into<NodeId>, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<NodeId>,
    {
        let nodes = children.into_iter().map(Into::into).collect();
        self.nodes.nodes.insert(id.into(), NodeSpec::Composite { nodes });
        self
    }

    /// Declare a graph node with its children in order and empty tables.
    pub fn graph<I, C>(mut self, id: impl Into<NodeId>, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<NodeId>,
    {
        let nodes = children.into_iter().map(Into::into).collect();
        self.nodes.nodes.insert(
            id.into(),
            NodeSpec::Graph {
                nodes,
                arrows: Default::default(),
                entry_points: Default::default(),
            },
        );
        self
    }

    /// Add an entry point to a declared graph node.
    pub fn entry_point(
        mut self,
        graph: impl Into<NodeId>,
        name: impl Into<String>,
        target: impl Into<NodeId>,
        entry_point: impl Into<String>,
    ) -> Self {
        let graph = graph.into();
        let entry = EntrySpec {
            target: target.into(),
            entry_point: entry_point.into(),
        };
        match self.nodes.nodes.get_mut(&graph) {
            Some(NodeSpec::Graph { entry_points, .. }) => {
                entry_points.insert(name.into(), entry);
            }
            _ => self.fail(BuildError::NotAGraph { node: graph }),
        }
        self
    }

    /// Add an arrow leaving `from` on `label` to a declared graph node.
    pub fn arrow(
        mut self,
        graph: impl Into<NodeId>,
        from: impl Into<NodeId>,
        label: impl Into<String>,
        target: impl Into<NodeId>,
        entry_point: impl Into<String>,
    ) -> Self {
        let graph = graph.into();
        let entry = EntrySpec {
            target: target.into(),
            entry_point: entry_point.into(),
        };
        match self.nodes.nodes.get_mut(&graph) {
            Some(NodeSpec::Graph { arrows, .. }) => {
                arrows
                    .entry(from.into())
                    .or_default()
                    .insert(label.into(), entry);
            }
            _ => self.fail(BuildError::NotAGraph { node: graph }),
        }
        self
    }

    /// Validate and build the graph.
    pub fn build(self) -> Result<Graph, BuildError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut spec = self.nodes;
        let implicit: Vec<NodeId> = spec
            .nodes
            .values()
            .flat_map(NodeSpec::children)
            .filter(|child| !spec.nodes.contains_key(*child))
            .cloned()
            .collect();
        for leaf in implicit {
            spec.nodes.insert(leaf, NodeSpec::Leaf);
        }

        Graph::try_from(spec)
    }

    fn fail(&mut self, error: BuildError) {
        self.error.get_or_insert(error);
    }
}
