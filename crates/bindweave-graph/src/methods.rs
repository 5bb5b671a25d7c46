//! Type-erased runtime accessors for registered property slots.
//!
//! Each registered property instance carries a [`PropertyMethods`] object
//! that the service uses to move values across binding edges without knowing
//! the concrete type. The standard implementation,
//! [`TypedPropertyMethods`], is backed by the same shared `Rc<RefCell<T>>`
//! slot the declaring object's typed storage owns, so a set performed by the
//! resolve pass is immediately visible through the owner's getter.
//!
//! # Invariants
//!
//! 1. `try_set_value` is equality-gated: writing the current value reports
//!    `Unchanged` and performs no mutation.
//! 2. Implementations must not call back into the owning service; the
//!    resolve pass invokes them while the graph is locked.

use core::any::{Any, TypeId, type_name};
use core::cell::RefCell;
use std::rc::Rc;

use bindweave_core::InstanceHandle;

/// Outcome of a type-erased property set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertySetResult {
    /// The value equalled the stored one; nothing happened.
    Unchanged,
    /// The stored value was replaced.
    Changed,
    /// The supplied value's type did not match the slot type.
    UnsupportedType,
    /// This accessor does not support sets at all (observers).
    Unsupported,
}

/// Runtime get/set accessor bundle for one registered property instance.
pub trait PropertyMethods {
    /// The slot's value type.
    fn value_type(&self) -> TypeId;

    /// Human-readable slot type name for diagnostics.
    fn value_type_name(&self) -> &'static str;

    /// Whether the slot belongs to a read-only property.
    fn is_read_only(&self) -> bool {
        false
    }

    /// Clone the current value out of the slot.
    fn get_value(&self) -> Box<dyn Any>;

    /// Replace the slot value if the type matches and the value differs.
    fn try_set_value(&self, value: &dyn Any) -> PropertySetResult;

    /// Observer hook: invoked with the handle of the source that changed.
    /// Non-observer accessors report `false`.
    fn try_invoke(&self, _source: InstanceHandle) -> bool {
        false
    }
}

/// Accessors for a `T`-valued slot shared with the owner's typed storage.
pub struct TypedPropertyMethods<T: Clone + PartialEq + 'static> {
    slot: Rc<RefCell<T>>,
    read_only: bool,
}

impl<T: Clone + PartialEq + 'static> TypedPropertyMethods<T> {
    #[must_use]
    pub fn new(slot: Rc<RefCell<T>>, read_only: bool) -> Self {
        Self { slot, read_only }
    }
}

impl<T: Clone + PartialEq + 'static> PropertyMethods for TypedPropertyMethods<T> {
    fn value_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn value_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn get_value(&self) -> Box<dyn Any> {
        Box::new(self.slot.borrow().clone())
    }

    fn try_set_value(&self, value: &dyn Any) -> PropertySetResult {
        let Some(value) = value.downcast_ref::<T>() else {
            return PropertySetResult::UnsupportedType;
        };
        let mut slot = self.slot.borrow_mut();
        if *slot == *value {
            PropertySetResult::Unchanged
        } else {
            *slot = value.clone();
            PropertySetResult::Changed
        }
    }
}

/// Accessor bundle for observer properties: no value slot, just a callback
/// fired with the changed source's handle during the observer phase.
pub struct ObserverMethods {
    callback: Rc<dyn Fn(InstanceHandle)>,
}

impl ObserverMethods {
    #[must_use]
    pub fn new(callback: Rc<dyn Fn(InstanceHandle)>) -> Self {
        Self { callback }
    }
}

impl PropertyMethods for ObserverMethods {
    fn value_type(&self) -> TypeId {
        TypeId::of::<()>()
    }

    fn value_type_name(&self) -> &'static str {
        "()"
    }

    fn get_value(&self) -> Box<dyn Any> {
        Box::new(())
    }

    fn try_set_value(&self, _value: &dyn Any) -> PropertySetResult {
        PropertySetResult::Unsupported
    }

    fn try_invoke(&self, source: InstanceHandle) -> bool {
        (self.callback)(source);
        true
    }
}
