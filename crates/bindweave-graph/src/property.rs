//! Typed property storage embedded in user structs.
//!
//! A `TypedDependencyProperty<T>` behaves like a plain field until something
//! needs its graph identity (attaching a binding, being named as a source);
//! only then is an instance registered with the service. The value lives in
//! an `Rc<RefCell<T>>` slot shared with the registered accessors, so resolve
//! passes and local reads always agree.
//!
//! # Invariants
//!
//! 1. Local sets report to the service *before* writing, so a set rejected
//!    by the call-state machine leaves the slot untouched.
//! 2. A property whose registered instance died falls back to plain-field
//!    behavior instead of failing.

use core::cell::{Cell, RefCell};
use std::rc::Rc;

use bindweave_core::{
    InstanceHandle, PropertyChangeReason, PropertyDefinition, TypedMethodsDefinition,
};

use crate::binding::Binding;
use crate::error::BindingError;
use crate::methods::{ObserverMethods, TypedPropertyMethods};
use crate::scoped::BindableOwner;

fn verify_definition<T: 'static>(definition: &PropertyDefinition) -> Result<(), BindingError> {
    definition
        .methods()
        .as_any()
        .downcast_ref::<TypedMethodsDefinition<T>>()
        .map(|_| ())
        .ok_or(BindingError::DefinitionMismatch)
}

/// A read/write bindable property value.
pub struct TypedDependencyProperty<T: Clone + PartialEq + 'static> {
    slot: Rc<RefCell<T>>,
    handle: Cell<InstanceHandle>,
}

impl<T: Clone + PartialEq + Default + 'static> Default for TypedDependencyProperty<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> TypedDependencyProperty<T> {
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(initial)),
            handle: Cell::new(InstanceHandle::INVALID),
        }
    }

    /// The current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.slot.borrow().clone()
    }

    /// The registered instance handle, or `INVALID` before registration.
    #[must_use]
    pub fn try_handle(&self) -> InstanceHandle {
        self.handle.get()
    }

    /// Set the value, scheduling change propagation if the property is
    /// registered. Reports whether the value actually changed.
    pub fn set(
        &self,
        owner: &dyn BindableOwner,
        definition: &PropertyDefinition,
        value: T,
    ) -> Result<bool, BindingError> {
        verify_definition::<T>(definition)?;
        if *self.slot.borrow() == value {
            return Ok(false);
        }
        let handle = self.handle.get();
        if handle.is_valid() {
            match owner
                .service()
                .changed(handle, PropertyChangeReason::Modified)
            {
                Ok(()) => {}
                // The registered instance is gone; back to plain field.
                Err(BindingError::UnknownInstance | BindingError::DeadInstance(_)) => {
                    self.handle.set(InstanceHandle::INVALID);
                }
                Err(err) => return Err(err),
            }
        }
        self.slot.replace(value);
        Ok(true)
    }

    /// The instance handle, registering the property on first use.
    pub fn instance_handle(
        &self,
        owner: &dyn BindableOwner,
        definition: &PropertyDefinition,
    ) -> Result<InstanceHandle, BindingError> {
        verify_definition::<T>(definition)?;
        let cached = self.handle.get();
        if cached.is_valid() && owner.service().is_alive(cached) {
            return Ok(cached);
        }
        let owner_handle = owner.owner_handle()?;
        let methods = Rc::new(TypedPropertyMethods::new(Rc::clone(&self.slot), false));
        let handle = owner
            .service()
            .create_property(owner_handle, definition, methods)?;
        self.handle.set(handle);
        Ok(handle)
    }

    /// Attach a binding with this property as the target.
    pub fn set_binding(
        &self,
        owner: &dyn BindableOwner,
        definition: &PropertyDefinition,
        binding: Binding,
    ) -> Result<bool, BindingError> {
        let handle = self.instance_handle(owner, definition)?;
        owner.service().set_binding(handle, binding)
    }

    /// Remove this property's binding, if any.
    pub fn clear_binding(
        &self,
        owner: &dyn BindableOwner,
        definition: &PropertyDefinition,
    ) -> Result<bool, BindingError> {
        let handle = self.handle.get();
        if !handle.is_valid() {
            return Ok(false);
        }
        verify_definition::<T>(definition)?;
        owner.service().clear_binding(handle)
    }
}

/// A bindable property only its owner may set; usable as a binding source
/// but never as a target.
pub struct TypedReadOnlyDependencyProperty<T: Clone + PartialEq + 'static> {
    slot: Rc<RefCell<T>>,
    handle: Cell<InstanceHandle>,
}

impl<T: Clone + PartialEq + Default + 'static> Default for TypedReadOnlyDependencyProperty<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> TypedReadOnlyDependencyProperty<T> {
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(initial)),
            handle: Cell::new(InstanceHandle::INVALID),
        }
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.slot.borrow().clone()
    }

    #[must_use]
    pub fn try_handle(&self) -> InstanceHandle {
        self.handle.get()
    }

    /// Owner-side set. External code never sees this struct mutably bound
    /// into a binding, so "read-only" is enforced at the graph level.
    pub fn set(
        &self,
        owner: &dyn BindableOwner,
        definition: &PropertyDefinition,
        value: T,
    ) -> Result<bool, BindingError> {
        verify_definition::<T>(definition)?;
        if *self.slot.borrow() == value {
            return Ok(false);
        }
        let handle = self.handle.get();
        if handle.is_valid() {
            match owner
                .service()
                .changed(handle, PropertyChangeReason::Modified)
            {
                Ok(()) => {}
                Err(BindingError::UnknownInstance | BindingError::DeadInstance(_)) => {
                    self.handle.set(InstanceHandle::INVALID);
                }
                Err(err) => return Err(err),
            }
        }
        self.slot.replace(value);
        Ok(true)
    }

    pub fn instance_handle(
        &self,
        owner: &dyn BindableOwner,
        definition: &PropertyDefinition,
    ) -> Result<InstanceHandle, BindingError> {
        verify_definition::<T>(definition)?;
        let cached = self.handle.get();
        if cached.is_valid() && owner.service().is_alive(cached) {
            return Ok(cached);
        }
        let owner_handle = owner.owner_handle()?;
        let methods = Rc::new(TypedPropertyMethods::new(Rc::clone(&self.slot), true));
        let handle = owner
            .service()
            .create_read_only_property(owner_handle, definition, methods)?;
        self.handle.set(handle);
        Ok(handle)
    }
}

/// A callback-only pseudo property that observes a data source.
pub struct ObserverDependencyProperty {
    callback: Rc<dyn Fn(InstanceHandle)>,
    handle: Cell<InstanceHandle>,
}

impl ObserverDependencyProperty {
    pub fn new(callback: impl Fn(InstanceHandle) + 'static) -> Self {
        Self {
            callback: Rc::new(callback),
            handle: Cell::new(InstanceHandle::INVALID),
        }
    }

    #[must_use]
    pub fn try_handle(&self) -> InstanceHandle {
        self.handle.get()
    }

    pub fn instance_handle(
        &self,
        owner: &dyn BindableOwner,
        definition: &PropertyDefinition,
    ) -> Result<InstanceHandle, BindingError> {
        verify_definition::<()>(definition)?;
        let cached = self.handle.get();
        if cached.is_valid() && owner.service().is_alive(cached) {
            return Ok(cached);
        }
        let owner_handle = owner.owner_handle()?;
        let methods = Rc::new(ObserverMethods::new(Rc::clone(&self.callback)));
        let handle = owner
            .service()
            .create_observer_property(owner_handle, definition, methods)?;
        self.handle.set(handle);
        Ok(handle)
    }

    /// Start observing `source` (an observable data source); the callback
    /// fires during the observer phase of each resolve pass in which the
    /// source reported a change.
    pub fn observe(
        &self,
        owner: &dyn BindableOwner,
        definition: &PropertyDefinition,
        source: InstanceHandle,
    ) -> Result<bool, BindingError> {
        let handle = self.instance_handle(owner, definition)?;
        owner.service().set_binding(handle, Binding::new(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoped::ScopedDependencyObject;
    use crate::service::BindingService;

    struct Widget;

    #[test]
    fn unregistered_property_behaves_like_a_field() {
        let service = Rc::new(BindingService::new());
        let owner = ScopedDependencyObject::new(Rc::clone(&service));
        let definition = PropertyDefinition::create_for::<Widget, u32>("Value").unwrap();
        let property = TypedDependencyProperty::new(1u32);

        assert!(property.set(&owner, &definition, 2).unwrap());
        assert!(!property.set(&owner, &definition, 2).unwrap());
        assert_eq!(property.get(), 2);
        assert_eq!(service.instance_count(), 0, "no registration happened");
    }

    #[test]
    fn definition_for_wrong_type_is_rejected() {
        let service = Rc::new(BindingService::new());
        let owner = ScopedDependencyObject::new(Rc::clone(&service));
        let definition = PropertyDefinition::create_for::<Widget, f32>("Value").unwrap();
        let property = TypedDependencyProperty::new(1u32);

        assert_eq!(
            property.set(&owner, &definition, 2).unwrap_err(),
            BindingError::DefinitionMismatch
        );
        assert_eq!(
            property.instance_handle(&owner, &definition).unwrap_err(),
            BindingError::DefinitionMismatch
        );
    }

    #[test]
    fn registration_happens_once() {
        let service = Rc::new(BindingService::new());
        let owner = ScopedDependencyObject::new(Rc::clone(&service));
        let definition = PropertyDefinition::create_for::<Widget, u32>("Value").unwrap();
        let property = TypedDependencyProperty::new(0u32);

        let a = property.instance_handle(&owner, &definition).unwrap();
        let b = property.instance_handle(&owner, &definition).unwrap();
        assert_eq!(a, b);
        assert_eq!(service.instance_count(), 2, "owner plus property");
    }

    #[test]
    fn set_after_registration_schedules_a_change() {
        let service = Rc::new(BindingService::new());
        let owner = ScopedDependencyObject::new(Rc::clone(&service));
        let definition = PropertyDefinition::create_for::<Widget, u32>("Value").unwrap();
        let property = TypedDependencyProperty::new(0u32);

        property.instance_handle(&owner, &definition).unwrap();
        assert!(property.set(&owner, &definition, 5).unwrap());
        assert_eq!(service.pending_changes(), 1);
        service.execute_changes().unwrap();
        assert_eq!(service.pending_changes(), 0);
        assert_eq!(property.get(), 5);
    }

    #[test]
    fn read_only_property_registers_as_read_only() {
        let service = Rc::new(BindingService::new());
        let owner = ScopedDependencyObject::new(Rc::clone(&service));
        let definition = PropertyDefinition::create_for::<Widget, u32>("Count").unwrap();
        let property = TypedReadOnlyDependencyProperty::new(0u32);

        let handle = property.instance_handle(&owner, &definition).unwrap();
        assert!(service.is_property_read_only(handle).unwrap());
        assert!(property.set(&owner, &definition, 3).unwrap());
        assert_eq!(property.get(), 3);
    }
}
