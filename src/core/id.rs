//! Node identities.
//!
//! A node id joins the local names of all ancestors with [`SEPARATOR`], so
//! `main:B:A` is the child `A` of the child `B` of the root `main`. Inside
//! arrow paths produced by dispatch, ids are relative to the dispatched node
//! and the empty id stands for that node itself.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Separator placed between local names in a node id.
pub const SEPARATOR: char = ':';

/// Stable identity of a node in an expanded graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create an id from its textual form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The empty id, marking "this node" in relative arrow paths.
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Re-root this id under `prefix`.
    ///
    /// The empty id becomes `prefix` itself.
    ///
    /// # Example
    ///
    /// ```rust
    /// use hierarch::core::NodeId;
    ///
    /// assert_eq!(NodeId::new("B:A").prefixed("main").as_str(), "main:B:A");
    /// assert_eq!(NodeId::empty().prefixed("main").as_str(), "main");
    /// ```
    pub fn prefixed(&self, prefix: &str) -> Self {
        match (prefix.is_empty(), self.is_empty()) {
            (true, _) => self.clone(),
            (false, true) => Self(prefix.to_string()),
            (false, false) => Self(format!("{prefix}{SEPARATOR}{}", self.0)),
        }
    }

    /// Id of the child named `local` under this node.
    pub fn child(&self, local: &str) -> Self {
        Self::new(local).prefixed(&self.0)
    }

    /// The last segment of the id.
    pub fn local_name(&self) -> &str {
        self.0.rsplit(SEPARATOR).next().unwrap_or_default()
    }

    /// Id of the parent implied by the textual form, if any.
    pub fn parent(&self) -> Option<Self> {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(parent, _)| Self(parent.to_string()))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
