//! Executing calls against an expanded graph.
//!
//! A step is two pure phases: [`dispatch`] routes the call to every
//! participating leaf and collects arrow paths, then [`resolve`] turns those
//! paths into the next configuration. [`Machine`] runs both.

mod binding;
mod dispatch;
pub mod error;
mod machine;
mod resolve;

pub use binding::{
    Binding, Bindings, Call, Child, ComposeBehavior, Dispatched, LeafBehavior, LeafOutcome,
};
pub use dispatch::dispatch;
pub use error::{BoxError, EngineError};
pub use machine::{Machine, Snapshot, Step};
pub use resolve::{initial_configuration, resolve, settle};
