//! Active-state configuration.

use super::id::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which child is active under every reachable graph node.
///
/// Only graph nodes appear as keys; composite and leaf ids never do. Besides
/// the active mapping, the configuration remembers the last active child of
/// graph nodes that are no longer reachable, so that entering them again
/// through `"history"` can restore it.
///
/// # Example
///
/// ```rust
/// use hierarch::core::Configuration;
///
/// let configuration = Configuration::from_pairs([("main", "main:A"), ("main:A", "main:A:B")]);
/// assert_eq!(configuration.get("main").map(|id| id.as_str()), Some("main:A"));
/// assert!(configuration.get("main:B").is_none());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    active: BTreeMap<NodeId, NodeId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    history: BTreeMap<NodeId, NodeId>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration with the given active entries and no history.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<NodeId>,
        V: Into<NodeId>,
    {
        Self {
            active: pairs
                .into_iter()
                .map(|(node, child)| (node.into(), child.into()))
                .collect(),
            history: BTreeMap::new(),
        }
    }

    pub(crate) fn from_parts(
        active: BTreeMap<NodeId, NodeId>,
        history: BTreeMap<NodeId, NodeId>,
    ) -> Self {
        Self { active, history }
    }

    /// Replace the remembered children of unreachable graph nodes.
    pub fn with_history<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<NodeId>,
        V: Into<NodeId>,
    {
        self.history = pairs
            .into_iter()
            .map(|(node, child)| (node.into(), child.into()))
            .collect();
        self
    }

    /// Active child of a reachable graph node.
    pub fn get(&self, node: &str) -> Option<&NodeId> {
        self.active.get(node)
    }

    /// Last known child of a graph node, whether or not it is reachable.
    pub fn recorded(&self, node: &str) -> Option<&NodeId> {
        self.active.get(node).or_else(|| self.history.get(node))
    }

    pub fn active(&self) -> &BTreeMap<NodeId, NodeId> {
        &self.active
    }

    pub fn history(&self) -> &BTreeMap<NodeId, NodeId> {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> {
        self.active.iter()
    }
}
