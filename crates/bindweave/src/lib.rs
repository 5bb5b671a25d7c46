#![forbid(unsafe_code)]

//! Bindweave: deferred dependency-property data binding.
//!
//! Properties live as typed fields inside ordinary structs. Declaring one
//! takes a [`PropertyDefinition`] (usually in a `LazyLock` static) and a
//! [`TypedDependencyProperty`] field; bindings connect properties across
//! objects and nothing moves until [`BindingService::execute_changes`] runs
//! the resolve pass.
//!
//! ```
//! use std::rc::Rc;
//! use std::sync::LazyLock;
//! use bindweave::prelude::*;
//!
//! struct Slider;
//! static VALUE: LazyLock<PropertyDefinition> =
//!     LazyLock::new(|| PropertyDefinition::create_for::<Slider, u32>("Value").unwrap());
//!
//! let service = Rc::new(BindingService::new());
//! let knob = ScopedDependencyObject::new(Rc::clone(&service));
//! let readout = ScopedDependencyObject::new(Rc::clone(&service));
//! let knob_value = TypedDependencyProperty::new(0u32);
//! let readout_value = TypedDependencyProperty::new(0u32);
//!
//! let source = knob_value.instance_handle(&knob, &VALUE).unwrap();
//! readout_value.set_binding(&readout, &VALUE, Binding::new(source)).unwrap();
//!
//! knob_value.set(&knob, &VALUE, 42).unwrap();
//! service.execute_changes().unwrap();
//! assert_eq!(readout_value.get(), 42);
//! ```

pub use bindweave_core as core;
pub use bindweave_graph as graph;
pub use bindweave_layout as layout;

pub use bindweave_core::{
    DataSourceFlags, DefinitionError, DefinitionRegistry, InstanceHandle, PropertyChangeReason,
    PropertyDefinition,
};
pub use bindweave_graph::{
    BindableOwner, Binding, BindingError, BindingMode, BindingService, ConverterBinding,
    MultiConverterBinding, ObserverDependencyProperty, ScopedDataSourceObject,
    ScopedDependencyObject, TypedDependencyProperty, TypedReadOnlyDependencyProperty, converter,
    multi_converter2, multi_converter3, two_way_converter,
};
pub use bindweave_layout::{AvailableSize, FillLayout, Measurable, Rect, Size, WindowFlags};

/// The types most programs need, in one import.
pub mod prelude {
    pub use bindweave_core::{
        DataSourceFlags, InstanceHandle, PropertyChangeReason, PropertyDefinition,
    };
    pub use bindweave_graph::{
        BindableOwner, Binding, BindingError, BindingMode, BindingService,
        ObserverDependencyProperty, ScopedDataSourceObject, ScopedDependencyObject,
        TypedDependencyProperty, TypedReadOnlyDependencyProperty,
    };
    pub use bindweave_layout::{AvailableSize, FillLayout, Measurable, Rect, Size};
}
