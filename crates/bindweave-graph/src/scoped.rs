//! RAII wrappers that tie a registered owner instance to a Rust value's
//! lifetime.
//!
//! Registration is lazy: the service is only touched once a property
//! actually needs the owner handle (typically when a binding is attached).
//! Dropping the wrapper schedules destruction of the owner and every
//! property registered under it; the slots are reclaimed by the next
//! resolve pass.

use core::cell::Cell;
use std::rc::Rc;

use bindweave_core::{DataSourceFlags, InstanceHandle};

use crate::error::BindingError;
use crate::service::BindingService;

/// Something that owns bindable property instances.
pub trait BindableOwner {
    fn service(&self) -> &Rc<BindingService>;

    /// The owner's registered handle, registering on first use.
    fn owner_handle(&self) -> Result<InstanceHandle, BindingError>;
}

/// A UI-side property owner, destroyed with the wrapper.
pub struct ScopedDependencyObject {
    service: Rc<BindingService>,
    handle: Cell<InstanceHandle>,
}

impl ScopedDependencyObject {
    #[must_use]
    pub fn new(service: Rc<BindingService>) -> Self {
        Self {
            service,
            handle: Cell::new(InstanceHandle::INVALID),
        }
    }

    /// The registered handle, or `INVALID` if registration never happened.
    #[must_use]
    pub fn try_handle(&self) -> InstanceHandle {
        self.handle.get()
    }
}

impl BindableOwner for ScopedDependencyObject {
    fn service(&self) -> &Rc<BindingService> {
        &self.service
    }

    fn owner_handle(&self) -> Result<InstanceHandle, BindingError> {
        let handle = self.handle.get();
        if handle.is_valid() && self.service.is_alive(handle) {
            return Ok(handle);
        }
        let handle = self.service.create_dependency_object()?;
        self.handle.set(handle);
        Ok(handle)
    }
}

impl Drop for ScopedDependencyObject {
    fn drop(&mut self) {
        let handle = self.handle.get();
        if handle.is_valid() {
            // The instance may already be gone if the service outlived it.
            let _ = self.service.destroy_instance(handle);
        }
    }
}

/// An application-side data source, destroyed with the wrapper.
pub struct ScopedDataSourceObject {
    service: Rc<BindingService>,
    flags: DataSourceFlags,
    handle: Cell<InstanceHandle>,
}

impl ScopedDataSourceObject {
    #[must_use]
    pub fn new(service: Rc<BindingService>, flags: DataSourceFlags) -> Self {
        Self {
            service,
            flags,
            handle: Cell::new(InstanceHandle::INVALID),
        }
    }

    #[must_use]
    pub fn flags(&self) -> DataSourceFlags {
        self.flags
    }

    #[must_use]
    pub fn try_handle(&self) -> InstanceHandle {
        self.handle.get()
    }
}

impl BindableOwner for ScopedDataSourceObject {
    fn service(&self) -> &Rc<BindingService> {
        &self.service
    }

    fn owner_handle(&self) -> Result<InstanceHandle, BindingError> {
        let handle = self.handle.get();
        if handle.is_valid() && self.service.is_alive(handle) {
            return Ok(handle);
        }
        let handle = self.service.create_data_source(self.flags)?;
        self.handle.set(handle);
        Ok(handle)
    }
}

impl Drop for ScopedDataSourceObject {
    fn drop(&mut self) {
        let handle = self.handle.get();
        if handle.is_valid() {
            let _ = self.service.destroy_instance(handle);
        }
    }
}
