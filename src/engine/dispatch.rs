//! Routing a call down the node tree.
//!
//! Dispatch invokes the behavior of every participating leaf, composes the
//! results back up the tree and collects one arrow path per leaf. It never
//! changes the configuration; that is left to [`resolve`](super::resolve).

use crate::core::context::merge;
use crate::core::{pad_to_root, prefix, ArrowPath, Configuration, Graph, NodeId, NodeIndex, NodeKind};
use crate::engine::binding::{Binding, Bindings, Call, Child, Dispatched};
use crate::engine::error::EngineError;
use serde_json::{Map, Value};
use tracing::trace;

/// Dispatch `call` into the subtree rooted at `node`.
///
/// Arrow paths in the result are relative to `node`: its own steps carry the
/// empty id and descendants are named relative to it.
///
/// # Example
///
/// ```rust
/// use hierarch::builder::GraphBuilder;
/// use hierarch::core::{ArrowPath, Configuration, NodeId};
/// use hierarch::engine::{dispatch, Bindings, Call, LeafOutcome};
/// use serde_json::json;
///
/// let graph = GraphBuilder::new()
///     .graph("main", ["main:A", "main:B"])
///     .entry_point("main", "start", "main:A", "start")
///     .arrow("main", "main:A", "x", "main:B", "start")
///     .build()
///     .unwrap();
/// let bindings = Bindings::new()
///     .leaf("main:A", |_, context| Ok(LeafOutcome::follow("x", context)));
/// let configuration = Configuration::from_pairs([("main", "main:A")]);
///
/// let dispatched = dispatch(
///     &graph,
///     &NodeId::new("main"),
///     &configuration,
///     &bindings,
///     json!({}),
///     &Call::new("go"),
/// )
/// .unwrap();
///
/// assert_eq!(dispatched.arrows, vec![ArrowPath::from_pairs([("A", "x"), ("", "x")])]);
/// ```
pub fn dispatch(
    graph: &Graph,
    node: &NodeId,
    configuration: &Configuration,
    bindings: &Bindings,
    context: Value,
    call: &Call,
) -> Result<Dispatched, EngineError> {
    let entry = graph
        .lookup(node.as_str())
        .ok_or_else(|| EngineError::UnknownNode(node.clone()))?;

    Dispatcher {
        graph,
        configuration,
        bindings,
        entry,
    }
    .run(entry, context, call)
}

struct Dispatcher<'a> {
    graph: &'a Graph,
    configuration: &'a Configuration,
    bindings: &'a Bindings,
    entry: NodeIndex,
}

impl<'a> Dispatcher<'a> {
    fn binding(&self, index: NodeIndex) -> Option<&'a Binding> {
        self.bindings
            .get(self.graph.id(index).as_str())
            .or_else(|| (index == self.entry).then(|| self.bindings.get("")).flatten())
    }

    fn run(&self, index: NodeIndex, context: Value, call: &Call) -> Result<Dispatched, EngineError> {
        let node = self.graph.node(index);
        trace!(node = %node.id(), method = %call.method, "dispatching");

        match node.kind() {
            NodeKind::Leaf => self.leaf(index, context, call),
            NodeKind::Composite { children } => {
                let forward =
                    |call: &Call, context: Value| self.all_children(children, call, context);
                self.compose(index, context, call, &Child::new(&forward))
            }
            NodeKind::Graph { .. } => {
                let active = self.active_child(index)?;
                let forward = |call: &Call, context: Value| self.active(active, call, context);
                self.compose(index, context, call, &Child::new(&forward))
            }
        }
    }

    fn leaf(&self, index: NodeIndex, context: Value, call: &Call) -> Result<Dispatched, EngineError> {
        let outcome = match self.binding(index) {
            None => return Ok(Dispatched {
                result: Value::Null,
                context,
                arrows: vec![ArrowPath::leaf("")],
            }),
            Some(Binding::Leaf(behavior)) => {
                behavior(call, context).map_err(|source| EngineError::Behavior {
                    node: self.graph.id(index).clone(),
                    source,
                })?
            }
            Some(Binding::Compose(_)) => {
                return Err(EngineError::BindingMismatch {
                    node: self.graph.id(index).clone(),
                })
            }
        };

        Ok(Dispatched {
            result: outcome.result,
            context: outcome.context,
            arrows: vec![ArrowPath::leaf(outcome.arrow)],
        })
    }

    fn compose(
        &self,
        index: NodeIndex,
        context: Value,
        call: &Call,
        child: &Child<'_>,
    ) -> Result<Dispatched, EngineError> {
        let dispatched = match self.binding(index) {
            None => child.call(call, context)?,
            Some(Binding::Compose(behavior)) => behavior(call, context, child)
                .map_err(|error| error.attributed_to(self.graph.id(index)))?,
            Some(Binding::Leaf(_)) => {
                return Err(EngineError::BindingMismatch {
                    node: self.graph.id(index).clone(),
                })
            }
        };

        Ok(Dispatched {
            arrows: pad_to_root(dispatched.arrows),
            ..dispatched
        })
    }

    /// Every region in declared order, each on its own copy of the context.
    fn all_children(
        &self,
        children: &[NodeIndex],
        call: &Call,
        context: Value,
    ) -> Result<Dispatched, EngineError> {
        let mut results = Map::new();
        let mut contexts = Vec::with_capacity(children.len());
        let mut arrows = Vec::new();

        for &child in children {
            let name = self.graph.node(child).local_name();
            let dispatched = self.run(child, context.clone(), call)?;
            arrows.extend(prefix(name, dispatched.arrows));
            contexts.push(dispatched.context);
            results.insert(name.to_string(), dispatched.result);
        }

        Ok(Dispatched {
            result: Value::Object(results),
            context: merge(&context, contexts),
            arrows,
        })
    }

    fn active(&self, child: NodeIndex, call: &Call, context: Value) -> Result<Dispatched, EngineError> {
        let dispatched = self.run(child, context, call)?;
        Ok(Dispatched {
            arrows: prefix(self.graph.node(child).local_name(), dispatched.arrows),
            ..dispatched
        })
    }

    fn active_child(&self, index: NodeIndex) -> Result<NodeIndex, EngineError> {
        let id = self.graph.id(index);
        let active = self
            .configuration
            .get(id.as_str())
            .ok_or_else(|| EngineError::NoActiveChild { node: id.clone() })?;

        self.graph
            .child_of(index, active.as_str())
            .ok_or_else(|| EngineError::MissingBinding {
                node: id.clone(),
                child: active.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::engine::binding::LeafOutcome;
    use serde_json::json;

    fn run(
        graph: &Graph,
        configuration: &Configuration,
        bindings: &Bindings,
        context: Value,
    ) -> Result<Dispatched, EngineError> {
        dispatch(
            graph,
            graph.root_id(),
            configuration,
            bindings,
            context,
            &Call::new("method").with_params(json!({"n": 1})),
        )
    }

    fn composite_graph() -> Graph {
        GraphBuilder::new()
            .composite("main", ["main:A", "main:B"])
            .graph("main:A", ["main:A:A", "main:A:B"])
            .entry_point("main:A", "start", "main:A:A", "start")
            .arrow("main:A", "main:A:A", "x", "main:A:B", "start")
            .graph("main:B", ["main:B:A", "main:B:B"])
            .entry_point("main:B", "start", "main:B:A", "start")
            .build()
            .unwrap()
    }

    #[test]
    fn unbound_leaf_is_identity() {
        let graph = GraphBuilder::new().leaf("main").build().unwrap();

        let dispatched = run(&graph, &Configuration::new(), &Bindings::new(), json!({"a": 1})).unwrap();

        assert_eq!(dispatched.result, Value::Null);
        assert_eq!(dispatched.context, json!({"a": 1}));
        assert_eq!(dispatched.arrows, vec![ArrowPath::leaf("")]);
    }

    #[test]
    fn leaf_receives_call_and_context() {
        let graph = GraphBuilder::new().leaf("main").build().unwrap();
        let bindings = Bindings::new().leaf("main", |call, context| {
            Ok(LeafOutcome::follow("x", json!({"seen": call.params["n"], "before": context}))
                .with_result(json!(call.method)))
        });

        let dispatched = run(&graph, &Configuration::new(), &bindings, json!(0)).unwrap();

        assert_eq!(dispatched.result, json!("method"));
        assert_eq!(dispatched.context, json!({"seen": 1, "before": 0}));
        assert_eq!(dispatched.arrows, vec![ArrowPath::leaf("x")]);
    }

    #[test]
    fn graph_dispatches_only_into_active_child() {
        let graph = GraphBuilder::new()
            .graph("main", ["main:A", "main:B"])
            .entry_point("main", "start", "main:A", "start")
            .build()
            .unwrap();
        let bindings = Bindings::new()
            .leaf("main:A", |_, _| Err("A must not run".into()))
            .leaf("main:B", |_, context| Ok(LeafOutcome::follow("y", context).with_result(json!("B"))));

        let dispatched = run(
            &graph,
            &Configuration::from_pairs([("main", "main:B")]),
            &bindings,
            json!({}),
        )
        .unwrap();

        assert_eq!(dispatched.result, json!("B"));
        assert_eq!(dispatched.arrows, vec![ArrowPath::from_pairs([("B", "y"), ("", "y")])]);
    }

    #[test]
    fn composite_collects_every_region() {
        let graph = composite_graph();
        let bindings = Bindings::new()
            .leaf("main:A:A", |_, context| {
                Ok(LeafOutcome::follow("x", context).with_result(json!("AA")))
            })
            .leaf("main:B:A", |_, context| Ok(LeafOutcome::stay(context).with_result(json!("BA"))));
        let configuration = Configuration::from_pairs([("main:A", "main:A:A"), ("main:B", "main:B:A")]);

        let dispatched = run(&graph, &configuration, &bindings, json!({})).unwrap();

        assert_eq!(dispatched.result, json!({"A": "AA", "B": "BA"}));
        assert_eq!(
            dispatched.arrows,
            vec![
                ArrowPath::from_pairs([("A:A", "x"), ("A", "x"), ("", "x")]),
                ArrowPath::from_pairs([("B:A", ""), ("B", ""), ("", "")]),
            ]
        );
    }

    #[test]
    fn composite_merges_region_contexts() {
        let graph = composite_graph();
        let bindings = Bindings::new()
            .leaf("main:A:A", |_, mut context| {
                context["b"] = json!(2);
                Ok(LeafOutcome::stay(context))
            })
            .leaf("main:B:A", |_, _| Ok(LeafOutcome::stay(json!({"a": 1, "c": 3}))));
        let configuration = Configuration::from_pairs([("main:A", "main:A:A"), ("main:B", "main:B:A")]);

        let dispatched = run(&graph, &configuration, &bindings, json!({"a": 1})).unwrap();

        assert_eq!(dispatched.context, json!({"a": 1, "b": 2, "c": 3}));
    }

    #[test]
    fn override_may_call_child_repeatedly_and_transform() {
        let graph = composite_graph();
        let bindings = Bindings::new()
            .leaf("main:A:A", |_, context| {
                let count = context["count"].as_i64().unwrap_or(0);
                Ok(LeafOutcome::stay(json!({"count": count + 1})))
            })
            .compose("main:A", |call, context, child| {
                let first = child.call(call, context)?;
                let second = child.call(call, first.context)?;
                Ok(Dispatched {
                    result: json!("twice"),
                    ..second
                })
            });
        let configuration = Configuration::from_pairs([("main:A", "main:A:A"), ("main:B", "main:B:A")]);

        let dispatched = run(&graph, &configuration, &bindings, json!({"count": 0})).unwrap();

        assert_eq!(dispatched.result["A"], json!("twice"));
        assert_eq!(dispatched.context, json!({"count": 2}));
    }

    #[test]
    fn override_without_child_call_pads_its_own_arrows() {
        let graph = composite_graph();
        let bindings = Bindings::new().compose("main:B", |_, context, _| {
            Ok(Dispatched {
                result: Value::Null,
                context,
                arrows: vec![ArrowPath::from_pairs([("A", "renamed")])],
            })
        });
        let configuration = Configuration::from_pairs([("main:A", "main:A:A"), ("main:B", "main:B:A")]);

        let dispatched = run(&graph, &configuration, &bindings, json!({})).unwrap();

        assert_eq!(
            dispatched.arrows[1],
            ArrowPath::from_pairs([("B:A", "renamed"), ("B", "renamed"), ("", "renamed")])
        );
    }

    #[test]
    fn empty_key_binds_the_dispatch_root() {
        let graph = composite_graph();
        let bindings = Bindings::new().compose("", |_, context, _| {
            Ok(Dispatched {
                result: json!("root"),
                context,
                arrows: vec![],
            })
        });

        let dispatched = run(&graph, &Configuration::new(), &bindings, json!({})).unwrap();

        assert_eq!(dispatched.result, json!("root"));
    }

    #[test]
    fn undeclared_active_child_is_missing_binding() {
        let graph = composite_graph();
        let configuration = Configuration::from_pairs([("main:A", "main:B:A"), ("main:B", "main:B:A")]);

        let result = run(&graph, &configuration, &Bindings::new(), json!({}));

        assert!(matches!(result, Err(EngineError::MissingBinding { .. })));
    }

    #[test]
    fn missing_configuration_entry_is_reported() {
        let graph = composite_graph();
        let configuration = Configuration::from_pairs([("main:A", "main:A:A")]);

        let result = run(&graph, &configuration, &Bindings::new(), json!({}));

        assert!(matches!(result, Err(EngineError::NoActiveChild { node }) if node.as_str() == "main:B"));
    }

    #[test]
    fn behavior_failures_name_their_node() {
        let graph = GraphBuilder::new().leaf("main").build().unwrap();
        let bindings = Bindings::new().leaf("main", |_, _| Err("boom".into()));

        let result = run(&graph, &Configuration::new(), &bindings, json!({}));

        match result {
            Err(EngineError::Behavior { node, source }) => {
                assert_eq!(node.as_str(), "main");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("expected behavior failure, got {other:?}"),
        }
    }

    #[test]
    fn override_failures_are_attributed() {
        let graph = composite_graph();
        let bindings = Bindings::new()
            .compose("main:B", |_, _, _| Err(EngineError::behavior("rejected")));
        let configuration = Configuration::from_pairs([("main:A", "main:A:A"), ("main:B", "main:B:A")]);

        let result = run(&graph, &configuration, &bindings, json!({}));

        assert!(matches!(result, Err(EngineError::Behavior { node, .. }) if node.as_str() == "main:B"));
    }

    #[test]
    fn mismatched_bindings_are_rejected() {
        let graph = composite_graph();
        let bindings = Bindings::new().leaf("main:A", |_, context| Ok(LeafOutcome::stay(context)));
        let configuration = Configuration::from_pairs([("main:A", "main:A:A"), ("main:B", "main:B:A")]);

        let result = run(&graph, &configuration, &bindings, json!({}));

        assert!(matches!(result, Err(EngineError::BindingMismatch { .. })));
    }

    #[test]
    fn unknown_dispatch_node_is_rejected() {
        let graph = composite_graph();

        let result = dispatch(
            &graph,
            &NodeId::new("elsewhere"),
            &Configuration::new(),
            &Bindings::new(),
            json!({}),
            &Call::new("m"),
        );

        assert!(matches!(result, Err(EngineError::UnknownNode(_))));
    }
}
