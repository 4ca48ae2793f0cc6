//! Validation errors for expanded graphs.

use crate::core::NodeId;
use thiserror::Error;

/// Errors that can occur when building or loading a graph.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("Graph declares no nodes")]
    Empty,

    #[error("Graph has more than one root: {0:?}")]
    MultipleRoots(Vec<NodeId>),

    #[error("Node '{parent}' lists '{child}', which is not declared")]
    UndeclaredNode { parent: NodeId, child: NodeId },

    #[error("Child '{child}' of '{parent}' must be named '{parent}:<name>'")]
    NotPrefixed { parent: NodeId, child: NodeId },

    #[error("Node '{child}' is listed more than once as a child")]
    SharedChild { child: NodeId },

    #[error("Node '{node}' is not a graph node")]
    NotAGraph { node: NodeId },

    #[error("Graph node '{node}' has no children")]
    EmptyGraph { node: NodeId },

    #[error("Graph node '{node}' has no \"start\" entry point")]
    MissingStart { node: NodeId },

    #[error("Graph node '{node}' points at '{target}', which is not one of its children")]
    ForeignTarget { node: NodeId, target: NodeId },

    #[error("Graph node '{node}' declares arrows for '{source_node}', which is not one of its children")]
    UnknownArrowSource { node: NodeId, source_node: NodeId },
}
