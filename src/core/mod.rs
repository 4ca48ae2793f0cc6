//! Core data model of the engine.
//!
//! This module holds the pure, side-effect free building blocks:
//! - Node identities and the indexed expanded graph
//! - The active-state configuration
//! - Arrow paths and their algebra
//! - Context diff and merge for parallel regions
//!
//! Nothing here invokes behavior or touches storage.

mod arrow;
pub mod context;
mod configuration;
mod graph;
mod id;

pub use arrow::{any_requested, pad_to_root, prefix, rename_trailing, ArrowPath, ArrowStep};
pub use configuration::Configuration;
pub use graph::{ArrowTable, Graph, Node, NodeIndex, NodeKind, Target, HISTORY, START};
pub use id::{NodeId, SEPARATOR};
