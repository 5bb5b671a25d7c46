#![forbid(unsafe_code)]

//! Deferred data-binding graph for Bindweave.
//!
//! The centerpiece is the [`BindingService`]: a single-threaded registry of
//! bindable property instances connected by one-way, two-way, and
//! multi-source bindings. Nothing propagates eagerly; property setters and
//! data sources record changes, and a later
//! [`execute_changes`](BindingService::execute_changes) resolve pass moves
//! values along the graph, settles two-way groups, and fires observer
//! callbacks.
//!
//! Typical usage goes through the typed layer instead of raw handles:
//! embed [`TypedDependencyProperty`] fields in a struct alongside a
//! [`ScopedDependencyObject`], declare each property once with a
//! [`PropertyDefinition`](bindweave_core::PropertyDefinition) in a
//! `LazyLock` static, and attach [`Binding`]s between them.

pub mod binding;
pub mod error;
mod group;
pub mod methods;
pub mod property;
mod record;
pub mod scoped;
pub mod service;

pub use binding::{
    Binding, BindingMode, Converter, ConverterBinding, MAX_MULTI_BIND_SOURCES,
    MultiConverterBinding, converter, multi_converter2, multi_converter3, two_way_converter,
};
pub use error::BindingError;
pub use methods::{ObserverMethods, PropertyMethods, PropertySetResult, TypedPropertyMethods};
pub use property::{
    ObserverDependencyProperty, TypedDependencyProperty, TypedReadOnlyDependencyProperty,
};
pub use scoped::{BindableOwner, ScopedDataSourceObject, ScopedDependencyObject};
pub use service::{BindingService, MAX_EXECUTE_LOOPS};
