#![forbid(unsafe_code)]

//! Core building blocks for the Bindweave data-binding engine.
//!
//! This crate provides:
//! - [`InstanceHandle`] / [`GroupHandle`]: generation-checked integer handles
//!   that decouple binding-graph edges from object lifetime
//! - [`HandleVec`]: the generational arena the handles index into
//! - [`PropertyDefinition`] and [`DefinitionRegistry`]: process-wide property
//!   identity with a monotonically increasing unique id
//! - [`PropertyChangeReason`] / [`PropertyChangeState`]: change bookkeeping
//!   shared by the graph crate
//!
//! Everything here is plain data with no interior mutability except the
//! definition registry's id counter; the stateful binding graph lives in
//! `bindweave-graph`.

pub mod change;
pub mod definition;
pub mod handle;
pub mod handle_vec;

pub use change::{DataSourceFlags, PropertyChangeReason, PropertyChangeState};
pub use definition::{
    DefinitionError, DefinitionRegistry, MethodsDefinition, PropertyDefinition,
    TypedMethodsDefinition,
};
pub use handle::{GroupHandle, InstanceHandle};
pub use handle_vec::HandleVec;
