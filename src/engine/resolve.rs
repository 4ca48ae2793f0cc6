//! Computing the next configuration from arrow paths.
//!
//! Each path is walked deepest-first. A requested label is looked up in the
//! arrow table of the graph node owning the step's node; composite owners are
//! transparent, and a label the owner does not know bubbles up to the next
//! step. Every followed arrow enters its target through an entry point, which
//! yields the configuration of the whole entered subtree. The assignments of
//! all paths are then unioned, and two paths disagreeing about one graph node
//! is an error.

use crate::core::{
    ArrowPath, ArrowStep, Configuration, Graph, NodeId, NodeIndex, NodeKind, HISTORY, START,
};
use crate::engine::error::EngineError;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::debug;

/// New active child per graph node.
type Assignments = BTreeMap<NodeIndex, NodeIndex>;

/// The configuration a fresh instance starts in.
///
/// Enters the root through `"start"`, recursively, without ever consulting
/// history.
pub fn initial_configuration(graph: &Graph) -> Result<Configuration, EngineError> {
    let assignments = Entering::fresh(graph).enter(graph.root(), START)?;
    Ok(Configuration::from_parts(
        ids(graph, &assignments),
        BTreeMap::new(),
    ))
}

/// Resolve `paths` against the `old` configuration.
///
/// Nodes no path touches keep their old child. Graph nodes that are no longer
/// reachable leave the active mapping and are remembered for `"history"`.
pub fn resolve(
    graph: &Graph,
    old: &Configuration,
    paths: &[ArrowPath],
) -> Result<Configuration, EngineError> {
    let entering = Entering::remembering(graph, old);
    let mut assignments = Assignments::new();

    for path in paths {
        let Some(planned) = plan(graph, &entering, path)? else {
            continue;
        };
        for (node, child) in planned {
            match assignments.entry(node) {
                Entry::Vacant(slot) => {
                    slot.insert(child);
                }
                Entry::Occupied(slot) if *slot.get() == child => {}
                Entry::Occupied(slot) => {
                    return Err(EngineError::InconsistentState {
                        node: graph.id(node).clone(),
                        first: graph.id(*slot.get()).clone(),
                        second: graph.id(child).clone(),
                    })
                }
            }
        }
    }

    let mut active = old.active().clone();
    active.extend(ids(graph, &assignments));
    settle_parts(graph, active, old.history().clone())
}

/// Bring a configuration in line with `graph`.
///
/// Reachable graph nodes without an entry are entered through `"start"`.
/// Unreachable entries move to history and ids the graph no longer has are
/// dropped. A reachable graph node whose entry names a child it does not
/// declare is a [`EngineError::MissingBinding`].
pub fn settle(graph: &Graph, configuration: &Configuration) -> Result<Configuration, EngineError> {
    settle_parts(
        graph,
        configuration.active().clone(),
        configuration.history().clone(),
    )
}

fn settle_parts(
    graph: &Graph,
    mut candidate: BTreeMap<NodeId, NodeId>,
    mut history: BTreeMap<NodeId, NodeId>,
) -> Result<Configuration, EngineError> {
    let mut active = BTreeMap::new();
    let mut pending = vec![graph.root()];

    while let Some(node) = pending.pop() {
        match graph.kind(node) {
            NodeKind::Leaf => {}
            NodeKind::Composite { children } => pending.extend(children.iter().copied()),
            NodeKind::Graph { .. } => {
                let id = graph.id(node);
                let child = match candidate.get(id.as_str()) {
                    Some(child) => graph.child_of(node, child.as_str()).ok_or_else(|| {
                        EngineError::MissingBinding {
                            node: id.clone(),
                            child: child.clone(),
                        }
                    })?,
                    None => {
                        debug!(node = %id, "entering unconfigured graph node through start");
                        let entered = Entering::fresh(graph).enter(node, START)?;
                        candidate.extend(ids(graph, &entered));
                        entered.get(&node).copied().ok_or_else(|| {
                            EngineError::MissingEntryPoint {
                                node: id.clone(),
                                entry_point: START.to_string(),
                            }
                        })?
                    }
                };
                active.insert(id.clone(), graph.id(child).clone());
                pending.push(child);
            }
        }
    }

    for (node, child) in candidate {
        if !active.contains_key(&node) {
            history.insert(node, child);
        }
    }
    history.retain(|node, child| {
        !active.contains_key(node)
            && graph
                .lookup(node.as_str())
                .is_some_and(|index| graph.is_graph(index) && graph.child_of(index, child.as_str()).is_some())
    });

    Ok(Configuration::from_parts(active, history))
}

/// Assignments made by a single path, or `None` if it requests nothing.
fn plan(
    graph: &Graph,
    entering: &Entering<'_>,
    path: &ArrowPath,
) -> Result<Option<Assignments>, EngineError> {
    let mut unmatched: Option<&ArrowStep> = None;

    for step in path.steps().iter().filter(|step| step.requests_transition()) {
        let node = graph
            .lookup(step.node.as_str())
            .ok_or_else(|| EngineError::UnknownNode(step.node.clone()))?;
        unmatched = Some(step);

        let Some(owner) = graph.parent(node) else {
            break;
        };
        match graph.kind(owner) {
            NodeKind::Leaf | NodeKind::Composite { .. } => continue,
            NodeKind::Graph { arrows, .. } => {
                let Some(target) = arrows.get(&node).and_then(|labels| labels.get(&step.label))
                else {
                    continue;
                };
                debug!(
                    graph = %graph.id(owner),
                    from = %step.node,
                    label = %step.label,
                    to = %graph.id(target.node),
                    entry_point = %target.entry_point,
                    "following arrow"
                );
                let mut planned = entering.enter(target.node, &target.entry_point)?;
                planned.insert(owner, target.node);
                return Ok(Some(planned));
            }
        }
    }

    match unmatched {
        Some(step) => Err(EngineError::InvalidTransition {
            node: step.node.clone(),
            label: step.label.clone(),
        }),
        None => Ok(None),
    }
}

/// Entry-point resolution, optionally backed by a previous configuration.
struct Entering<'a> {
    graph: &'a Graph,
    previous: Option<&'a Configuration>,
}

impl<'a> Entering<'a> {
    fn fresh(graph: &'a Graph) -> Self {
        Self {
            graph,
            previous: None,
        }
    }

    fn remembering(graph: &'a Graph, previous: &'a Configuration) -> Self {
        Self {
            graph,
            previous: Some(previous),
        }
    }

    fn enter(&self, node: NodeIndex, entry_point: &str) -> Result<Assignments, EngineError> {
        let mut assignments = Assignments::new();
        self.enter_into(node, entry_point, &mut assignments)?;
        Ok(assignments)
    }

    fn enter_into(
        &self,
        node: NodeIndex,
        entry_point: &str,
        out: &mut Assignments,
    ) -> Result<(), EngineError> {
        match self.graph.kind(node) {
            NodeKind::Leaf => Ok(()),
            NodeKind::Composite { children } => children
                .iter()
                .try_for_each(|&child| self.enter_into(child, entry_point, out)),
            NodeKind::Graph { entry_points, .. } => {
                if entry_point == HISTORY {
                    return match self.last_child(node) {
                        Some(child) => {
                            out.insert(node, child);
                            self.enter_into(child, HISTORY, out)
                        }
                        None => self.enter_into(node, START, out),
                    };
                }

                let target = match entry_points.get(entry_point) {
                    Some(target) => target,
                    None if entry_point != START => {
                        debug!(
                            node = %self.graph.id(node),
                            entry_point,
                            "entry point not declared, entering through start"
                        );
                        return self.enter_into(node, START, out);
                    }
                    None => {
                        return Err(EngineError::MissingEntryPoint {
                            node: self.graph.id(node).clone(),
                            entry_point: START.to_string(),
                        })
                    }
                };
                out.insert(node, target.node);
                self.enter_into(target.node, &target.entry_point, out)
            }
        }
    }

    fn last_child(&self, node: NodeIndex) -> Option<NodeIndex> {
        let recorded = self.previous?.recorded(self.graph.id(node).as_str())?;
        self.graph.child_of(node, recorded.as_str())
    }
}

fn ids(graph: &Graph, assignments: &Assignments) -> BTreeMap<NodeId, NodeId> {
    assignments
        .iter()
        .map(|(&node, &child)| (graph.id(node).clone(), graph.id(child).clone()))
        .collect()
}
