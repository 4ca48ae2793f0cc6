//! One full step: dispatch a call, then resolve the arrows it produced.

use crate::core::{any_requested, prefix, ArrowPath, Configuration, Graph};
use crate::engine::binding::{Bindings, Call};
use crate::engine::dispatch::dispatch;
use crate::engine::error::EngineError;
use crate::engine::resolve::{initial_configuration, resolve, settle};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// Everything that survives between two calls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub configuration: Configuration,
    pub context: Value,
}

/// Outcome of [`Machine::step`].
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    /// The snapshot to persist.
    pub snapshot: Snapshot,
    /// What the root returned for the call.
    pub result: Value,
    /// Whether any leaf requested a transition, even one that changed nothing.
    pub any_arrow_followed: bool,
    /// Arrow paths as resolved, with absolute node ids.
    pub arrows: Vec<ArrowPath>,
}

/// An expanded graph together with its bound behavior.
///
/// # Example
///
/// ```rust
/// use hierarch::builder::GraphBuilder;
/// use hierarch::engine::{Bindings, Call, LeafOutcome, Machine};
/// use serde_json::json;
///
/// let graph = GraphBuilder::new()
///     .graph("door", ["door:Closed", "door:Open"])
///     .entry_point("door", "start", "door:Closed", "start")
///     .arrow("door", "door:Closed", "opened", "door:Open", "start")
///     .arrow("door", "door:Open", "closed", "door:Closed", "start")
///     .build()
///     .unwrap();
/// let bindings = Bindings::new()
///     .leaf("door:Closed", |_, context| Ok(LeafOutcome::follow("opened", context)))
///     .leaf("door:Open", |_, context| Ok(LeafOutcome::follow("closed", context)));
/// let machine = Machine::new(graph, bindings);
///
/// let step = machine.step(None, &Call::new("toggle")).unwrap();
/// assert!(step.any_arrow_followed);
/// assert_eq!(
///     step.snapshot.configuration.get("door").map(|id| id.as_str()),
///     Some("door:Open")
/// );
/// ```
#[derive(Clone, Debug)]
pub struct Machine {
    graph: Graph,
    bindings: Bindings,
    initial_context: Value,
}

impl Machine {
    pub fn new(graph: Graph, bindings: Bindings) -> Self {
        Self {
            graph,
            bindings,
            initial_context: json!({}),
        }
    }

    /// Context a fresh instance starts with. Defaults to `{}`.
    pub fn with_initial_context(mut self, context: Value) -> Self {
        self.initial_context = context;
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Snapshot of an instance no call has touched yet.
    pub fn initial_snapshot(&self) -> Result<Snapshot, EngineError> {
        Ok(Snapshot {
            configuration: initial_configuration(&self.graph)?,
            context: self.initial_context.clone(),
        })
    }

    /// Handle `call` starting from `snapshot`, or from the initial snapshot.
    ///
    /// A loaded configuration is settled against the graph before dispatch.
    /// Missing graph nodes are entered through `"start"`, while an entry
    /// naming a child the graph does not declare fails with
    /// [`EngineError::MissingBinding`].
    pub fn step(&self, snapshot: Option<Snapshot>, call: &Call) -> Result<Step, EngineError> {
        let Snapshot {
            configuration,
            context,
        } = match snapshot {
            Some(snapshot) => Snapshot {
                configuration: settle(&self.graph, &snapshot.configuration)?,
                context: snapshot.context,
            },
            None => self.initial_snapshot()?,
        };

        let root = self.graph.root_id();
        let dispatched = dispatch(
            &self.graph,
            root,
            &configuration,
            &self.bindings,
            context,
            call,
        )?;

        let arrows = prefix(root.as_str(), dispatched.arrows);
        let any_arrow_followed = any_requested(&arrows);
        let configuration = if any_arrow_followed {
            resolve(&self.graph, &configuration, &arrows)?
        } else {
            configuration
        };

        debug!(
            method = %call.method,
            any_arrow_followed,
            active = configuration.len(),
            "call handled"
        );

        Ok(Step {
            snapshot: Snapshot {
                configuration,
                context: dispatched.context,
            },
            result: dispatched.result,
            any_arrow_followed,
            arrows,
        })
    }
}
