//! Errors raised while dispatching calls and resolving transitions.

use crate::core::NodeId;
use thiserror::Error;

/// Boxed error returned by bound behavior and external collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while executing a call against a graph.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No arrow handles the requested label, including attempts to leave the root.
    #[error("No arrow '{label}' leads away from '{node}'")]
    InvalidTransition { node: NodeId, label: String },

    /// Two arrow paths want different children active under the same graph node.
    #[error("Graph node '{node}' cannot activate both '{first}' and '{second}'")]
    InconsistentState {
        node: NodeId,
        first: NodeId,
        second: NodeId,
    },

    /// The configuration names a child the node does not declare.
    #[error("Node '{node}' does not declare child '{child}'")]
    MissingBinding { node: NodeId, child: NodeId },

    #[error("Graph node '{node}' has no active child")]
    NoActiveChild { node: NodeId },

    #[error("Graph node '{node}' has no entry point '{entry_point}'")]
    MissingEntryPoint { node: NodeId, entry_point: String },

    #[error("Unknown node '{0}'")]
    UnknownNode(NodeId),

    /// A leaf bound to composing behavior, or a composite/graph bound to leaf behavior.
    #[error("Behavior bound to '{node}' does not fit its node type")]
    BindingMismatch { node: NodeId },

    #[error("Behavior bound to '{node}' failed: {source}")]
    Behavior {
        node: NodeId,
        #[source]
        source: BoxError,
    },
}

impl EngineError {
    /// Failure raised from inside an overriding binding.
    ///
    /// The node is filled in by dispatch once the error leaves the binding.
    pub fn behavior(source: impl Into<BoxError>) -> Self {
        Self::Behavior {
            node: NodeId::empty(),
            source: source.into(),
        }
    }

    pub(crate) fn attributed_to(self, id: &NodeId) -> Self {
        match self {
            Self::Behavior { node, source } if node.is_empty() => Self::Behavior {
                node: id.clone(),
                source,
            },
            other => other,
        }
    }
}
