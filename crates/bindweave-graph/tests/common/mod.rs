#![allow(dead_code)]

//! Shared fixture: a small dependency object with one `u32` and one `f32`
//! property, mirroring how real widgets embed typed property storage.

use std::rc::Rc;
use std::sync::LazyLock;

use bindweave_core::{InstanceHandle, PropertyDefinition};
use bindweave_graph::{
    Binding, BindingError, BindingService, ScopedDependencyObject, TypedDependencyProperty,
};

pub static PROPERTY0: LazyLock<PropertyDefinition> = LazyLock::new(|| {
    PropertyDefinition::create_for::<TestDependencyObject, u32>("Property0")
        .expect("fixture definition")
});

pub static PROPERTY1: LazyLock<PropertyDefinition> = LazyLock::new(|| {
    PropertyDefinition::create_for::<TestDependencyObject, f32>("Property1")
        .expect("fixture definition")
});

pub struct TestDependencyObject {
    object: ScopedDependencyObject,
    property0: TypedDependencyProperty<u32>,
    property1: TypedDependencyProperty<f32>,
}

impl TestDependencyObject {
    pub fn new(service: Rc<BindingService>) -> Self {
        Self {
            object: ScopedDependencyObject::new(service),
            property0: TypedDependencyProperty::new(0),
            property1: TypedDependencyProperty::new(0.0),
        }
    }

    pub fn property0(&self) -> u32 {
        self.property0.get()
    }

    pub fn set_property0(&self, value: u32) -> bool {
        self.property0
            .set(&self.object, &PROPERTY0, value)
            .expect("set property0")
    }

    pub fn property0_handle(&self) -> InstanceHandle {
        self.property0
            .instance_handle(&self.object, &PROPERTY0)
            .expect("register property0")
    }

    pub fn set_binding_property0(&self, binding: Binding) -> Result<bool, BindingError> {
        self.property0.set_binding(&self.object, &PROPERTY0, binding)
    }

    pub fn clear_binding_property0(&self) -> Result<bool, BindingError> {
        self.property0.clear_binding(&self.object, &PROPERTY0)
    }

    pub fn property1(&self) -> f32 {
        self.property1.get()
    }

    pub fn set_property1(&self, value: f32) -> bool {
        self.property1
            .set(&self.object, &PROPERTY1, value)
            .expect("set property1")
    }

    pub fn property1_handle(&self) -> InstanceHandle {
        self.property1
            .instance_handle(&self.object, &PROPERTY1)
            .expect("register property1")
    }

    pub fn set_binding_property1(&self, binding: Binding) -> Result<bool, BindingError> {
        self.property1.set_binding(&self.object, &PROPERTY1, binding)
    }
}
