//! Calls, bound behavior and the values dispatch passes around.

use crate::core::{ArrowPath, NodeId};
use crate::engine::error::{BoxError, EngineError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A method invocation routed to every participating leaf.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Call {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Value::Null,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}

/// What leaf behavior hands back.
#[derive(Clone, Debug, PartialEq)]
pub struct LeafOutcome {
    pub result: Value,
    pub context: Value,
    /// Label of the requested arrow; empty to stay.
    pub arrow: String,
}

impl LeafOutcome {
    /// Stay in the current state.
    pub fn stay(context: Value) -> Self {
        Self {
            result: Value::Null,
            context,
            arrow: String::new(),
        }
    }

    /// Request the arrow labelled `label`.
    pub fn follow(label: impl Into<String>, context: Value) -> Self {
        Self {
            result: Value::Null,
            context,
            arrow: label.into(),
        }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = result;
        self
    }
}

/// Result of dispatching a call into a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Dispatched {
    pub result: Value,
    pub context: Value,
    pub arrows: Vec<ArrowPath>,
}

type Forward<'a> = dyn Fn(&Call, Value) -> Result<Dispatched, EngineError> + 'a;

/// Default composed behavior of a composite or graph node.
///
/// Handed to overriding bindings, which may invoke it any number of times
/// (or not at all) with whatever call and context they choose.
pub struct Child<'a> {
    forward: &'a Forward<'a>,
}

impl<'a> Child<'a> {
    pub(crate) fn new(forward: &'a Forward<'a>) -> Self {
        Self { forward }
    }

    /// Dispatch into the children with the given call and context.
    pub fn call(&self, call: &Call, context: Value) -> Result<Dispatched, EngineError> {
        (self.forward)(call, context)
    }
}

/// Behavior of a leaf node.
pub type LeafBehavior = dyn Fn(&Call, Value) -> Result<LeafOutcome, BoxError> + Send + Sync;

/// Behavior overriding a composite or graph node.
pub type ComposeBehavior =
    dyn Fn(&Call, Value, &Child<'_>) -> Result<Dispatched, EngineError> + Send + Sync;

/// Behavior bound to one node.
#[derive(Clone)]
pub enum Binding {
    Leaf(Arc<LeafBehavior>),
    Compose(Arc<ComposeBehavior>),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Leaf(_) => f.write_str("Binding::Leaf"),
            Binding::Compose(_) => f.write_str("Binding::Compose"),
        }
    }
}

/// Behavior keyed by absolute node id.
///
/// The empty id binds the node dispatch starts from. Nodes without a binding
/// pass calls through: leaves stay put and return `null`, composites and
/// graphs forward to their children once.
///
/// # Example
///
/// ```rust
/// use hierarch::engine::{Bindings, LeafOutcome};
///
/// let bindings = Bindings::new()
///     .leaf("main:Idle", |call, context| {
///         Ok(match call.method.as_str() {
///             "work" => LeafOutcome::follow("work", context),
///             _ => LeafOutcome::stay(context),
///         })
///     })
///     .compose("main", |call, context, child| child.call(call, context));
///
/// assert_eq!(bindings.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct Bindings {
    by_node: HashMap<NodeId, Binding>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind behavior to a leaf node.
    pub fn leaf<F>(mut self, node: impl Into<NodeId>, behavior: F) -> Self
    where
        F: Fn(&Call, Value) -> Result<LeafOutcome, BoxError> + Send + Sync + 'static,
    {
        self.by_node
            .insert(node.into(), Binding::Leaf(Arc::new(behavior)));
        self
    }

    /// Override the composed behavior of a composite or graph node.
    pub fn compose<F>(mut self, node: impl Into<NodeId>, behavior: F) -> Self
    where
        F: Fn(&Call, Value, &Child<'_>) -> Result<Dispatched, EngineError> + Send + Sync + 'static,
    {
        self.by_node
            .insert(node.into(), Binding::Compose(Arc::new(behavior)));
        self
    }

    pub fn get(&self, node: &str) -> Option<&Binding> {
        self.by_node.get(node)
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.by_node.iter()).finish()
    }
}
