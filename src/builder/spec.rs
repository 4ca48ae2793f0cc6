//! Serializable description of an expanded graph.
//!
//! This is the shape handed over by whatever expands authored templates into
//! addressed nodes: every id is absolute and every table already refers to
//! absolute child ids.

use crate::builder::error::BuildError;
use crate::core::{
    ArrowTable, Graph, Node, NodeId, NodeIndex, NodeKind, Target, HISTORY, START,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Where an arrow or entry point leads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySpec {
    pub target: NodeId,
    pub entry_point: String,
}

/// One node of the description, tagged by `type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeSpec {
    Leaf,
    Composite {
        nodes: Vec<NodeId>,
    },
    Graph {
        nodes: Vec<NodeId>,
        #[serde(default)]
        arrows: BTreeMap<NodeId, BTreeMap<String, EntrySpec>>,
        entry_points: BTreeMap<String, EntrySpec>,
    },
}

impl NodeSpec {
    pub fn children(&self) -> &[NodeId] {
        match self {
            NodeSpec::Leaf => &[],
            NodeSpec::Composite { nodes } | NodeSpec::Graph { nodes, .. } => nodes,
        }
    }
}

/// Expanded graph keyed by absolute node id.
///
/// # Example
///
/// ```rust
/// use hierarch::core::Graph;
/// use serde_json::json;
///
/// let graph: Graph = serde_json::from_value(json!({
///     "main": {
///         "type": "graph",
///         "nodes": ["main:A", "main:B"],
///         "arrows": {"main:A": {"x": {"target": "main:B", "entry_point": "start"}}},
///         "entry_points": {"start": {"target": "main:A", "entry_point": "start"}}
///     },
///     "main:A": {"type": "leaf"},
///     "main:B": {"type": "leaf"}
/// }))
/// .unwrap();
///
/// assert_eq!(graph.root_id().as_str(), "main");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphSpec {
    pub nodes: BTreeMap<NodeId, NodeSpec>,
}

impl TryFrom<GraphSpec> for Graph {
    type Error = BuildError;

    fn try_from(spec: GraphSpec) -> Result<Self, Self::Error> {
        if spec.nodes.is_empty() {
            return Err(BuildError::Empty);
        }

        let positions: HashMap<&NodeId, NodeIndex> = spec
            .nodes
            .keys()
            .enumerate()
            .map(|(position, id)| (id, NodeIndex::new(position)))
            .collect();

        let mut parents: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        for (id, node) in &spec.nodes {
            let parent = positions[id];
            for child in node.children() {
                let Some(&index) = positions.get(child) else {
                    return Err(BuildError::UndeclaredNode {
                        parent: id.clone(),
                        child: child.clone(),
                    });
                };
                if child.parent().as_ref() != Some(id) || child.local_name().is_empty() {
                    return Err(BuildError::NotPrefixed {
                        parent: id.clone(),
                        child: child.clone(),
                    });
                }
                if parents.insert(index, parent).is_some() {
                    return Err(BuildError::SharedChild {
                        child: child.clone(),
                    });
                }
            }
        }

        let roots: Vec<&NodeId> = spec
            .nodes
            .keys()
            .filter(|id| !parents.contains_key(&positions[id]))
            .collect();
        let root = match roots.as_slice() {
            [root] => positions[root],
            _ => {
                return Err(BuildError::MultipleRoots(
                    roots.into_iter().cloned().collect(),
                ))
            }
        };

        let mut nodes = Vec::with_capacity(spec.nodes.len());
        for (id, node) in &spec.nodes {
            let index = positions[id];
            let children = || -> Vec<NodeIndex> {
                node.children().iter().map(|child| positions[child]).collect()
            };
            let kind = match node {
                NodeSpec::Leaf => NodeKind::Leaf,
                NodeSpec::Composite { .. } => NodeKind::Composite {
                    children: children(),
                },
                NodeSpec::Graph {
                    nodes: declared,
                    arrows,
                    entry_points,
                } => {
                    if declared.is_empty() {
                        return Err(BuildError::EmptyGraph { node: id.clone() });
                    }
                    if !entry_points.contains_key(START) {
                        return Err(BuildError::MissingStart { node: id.clone() });
                    }
                    let target = |entry: &EntrySpec| -> Result<Target, BuildError> {
                        match positions.get(&entry.target) {
                            Some(&node) if parents.get(&node) == Some(&index) => Ok(Target {
                                node,
                                entry_point: entry.entry_point.clone(),
                            }),
                            _ => Err(BuildError::ForeignTarget {
                                node: id.clone(),
                                target: entry.target.clone(),
                            }),
                        }
                    };

                    let mut table = ArrowTable::new();
                    for (source, labels) in arrows {
                        let source_index = match positions.get(source) {
                            Some(&source) if parents.get(&source) == Some(&index) => source,
                            _ => {
                                return Err(BuildError::UnknownArrowSource {
                                    node: id.clone(),
                                    source_node: source.clone(),
                                })
                            }
                        };
                        let resolved = labels
                            .iter()
                            .map(|(label, entry)| Ok((label.clone(), target(entry)?)))
                            .collect::<Result<BTreeMap<_, _>, BuildError>>()?;
                        table.insert(source_index, resolved);
                    }

                    // "history" is resolved from the configuration, so a
                    // declared row is dropped unchecked.
                    let entry_points = entry_points
                        .iter()
                        .filter(|(name, _)| name.as_str() != HISTORY)
                        .map(|(name, entry)| Ok((name.clone(), target(entry)?)))
                        .collect::<Result<BTreeMap<_, _>, BuildError>>()?;

                    NodeKind::Graph {
                        children: children(),
                        arrows: table,
                        entry_points,
                    }
                }
            };
            nodes.push(Node {
                id: id.clone(),
                parent: parents.get(&index).copied(),
                kind,
            });
        }

        Ok(Graph::from_parts(nodes, root))
    }
}

impl From<&Graph> for GraphSpec {
    fn from(graph: &Graph) -> Self {
        let ids = |indices: &[NodeIndex]| -> Vec<NodeId> {
            indices.iter().map(|&index| graph.id(index).clone()).collect()
        };
        let entry = |target: &Target| EntrySpec {
            target: graph.id(target.node).clone(),
            entry_point: target.entry_point.clone(),
        };

        let nodes = graph
            .nodes()
            .map(|(_, node)| {
                let spec = match node.kind() {
                    NodeKind::Leaf => NodeSpec::Leaf,
                    NodeKind::Composite { children } => NodeSpec::Composite {
                        nodes: ids(children),
                    },
                    NodeKind::Graph {
                        children,
                        arrows,
                        entry_points,
                    } => NodeSpec::Graph {
                        nodes: ids(children),
                        arrows: arrows
                            .iter()
                            .map(|(source, labels)| {
                                let labels = labels
                                    .iter()
                                    .map(|(label, target)| (label.clone(), entry(target)))
                                    .collect();
                                (graph.id(*source).clone(), labels)
                            })
                            .collect(),
                        entry_points: entry_points
                            .iter()
                            .map(|(name, target)| (name.clone(), entry(target)))
                            .collect(),
                    },
                };
                (node.id().clone(), spec)
            })
            .collect();

        Self { nodes }
    }
}

impl From<Graph> for GraphSpec {
    fn from(graph: Graph) -> Self {
        Self::from(&graph)
    }
}
