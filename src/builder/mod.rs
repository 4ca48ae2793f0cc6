//! Construction and validation of expanded graphs.
//!
//! A graph arrives either as a serialized [`GraphSpec`] (the output of an
//! external template expander) or through the fluent [`GraphBuilder`]. Both
//! go through the same validation before a [`Graph`](crate::core::Graph)
//! exists.

pub mod error;
mod graph;
mod spec;

pub use error::BuildError;
pub use graph::GraphBuilder;
pub use spec::{EntrySpec, GraphSpec, NodeSpec};
