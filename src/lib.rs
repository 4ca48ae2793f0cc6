//! Hierarch: a hierarchical, composable state machine engine
//!
//! A machine is an expanded graph of nodes. Leaves carry behavior, composites
//! run all their children as parallel regions, and graph nodes keep exactly
//! one child active and move between children along labelled arrows.
//!
//! Handling a call is split into pure phases:
//!
//! - **Dispatch** routes the call to every active leaf and collects the
//!   arrows they request, merging contexts of parallel regions on the way up
//! - **Resolution** turns those arrows into the next configuration,
//!   bubbling unmatched labels up the tree and entering targets through
//!   entry points (including `"history"`)
//!
//! Persistence is kept out of the core and lives in a thin shell around
//! caller-provided storage and lock collaborators.
//!
//! # Example
//!
//! ```rust
//! use hierarch::builder::GraphBuilder;
//! use hierarch::engine::{Bindings, BoxError, Call, LeafOutcome, Machine};
//! use serde_json::{json, Value};
//!
//! let graph = GraphBuilder::new()
//!     .graph("light", ["light:Off", "light:On"])
//!     .entry_point("light", "start", "light:Off", "start")
//!     .arrow("light", "light:Off", "toggled", "light:On", "start")
//!     .arrow("light", "light:On", "toggled", "light:Off", "start")
//!     .build()
//!     .unwrap();
//!
//! let toggle = |_: &Call, context: Value| -> Result<LeafOutcome, BoxError> {
//!     Ok(LeafOutcome::follow("toggled", context))
//! };
//! let bindings = Bindings::new()
//!     .leaf("light:Off", toggle)
//!     .leaf("light:On", toggle);
//!
//! let machine = Machine::new(graph, bindings);
//! let step = machine.step(None, &Call::new("press")).unwrap();
//! let step = machine.step(Some(step.snapshot), &Call::new("press")).unwrap();
//!
//! assert_eq!(
//!     step.snapshot.configuration.get("light").map(|id| id.as_str()),
//!     Some("light:Off")
//! );
//! assert_eq!(step.snapshot.context, json!({}));
//! ```

pub mod builder;
pub mod core;
pub mod engine;
pub mod persistence;

// Re-export commonly used types
pub use builder::{BuildError, GraphBuilder};
pub use core::{ArrowPath, Configuration, Graph, NodeId};
pub use engine::{Bindings, Call, EngineError, LeafOutcome, Machine, Snapshot, Step};
pub use persistence::{Instance, InstanceError, StoredSnapshot};
