//! Per-instance records inside the binding service's registry.
//!
//! Every registered thing (dependency object, data source, or one of their
//! property instances) occupies one [`ServiceRecord`] slot. The record keeps
//! the forward binding (which sources feed this instance) and the reverse
//! edges (which instances list this one as a source) so that destruction and
//! change propagation can walk both directions.

use std::rc::Rc;

use bindweave_core::{DataSourceFlags, InstanceHandle, PropertyChangeState};
use smallvec::SmallVec;

use crate::binding::Binding;
use crate::methods::PropertyMethods;

/// What kind of thing a registry slot holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstanceKind {
    /// A UI-side object owning dependency properties.
    DependencyObject,
    /// An application-side observable object owning properties.
    DataSource,
    /// A normal read/write property instance.
    Property,
    /// A property whose value only its owner may set.
    ReadOnlyProperty,
    /// A callback-only pseudo property observing a data source.
    ObserverProperty,
}

impl InstanceKind {
    /// Whether this kind is a property instance (as opposed to an owner).
    #[must_use]
    pub fn is_property(self) -> bool {
        matches!(
            self,
            Self::Property | Self::ReadOnlyProperty | Self::ObserverProperty
        )
    }

    /// Whether instances of this kind may be the target of a binding.
    #[must_use]
    pub fn can_be_bind_target(self) -> bool {
        matches!(self, Self::Property | Self::ObserverProperty)
    }

    /// Whether instances of this kind may serve as a binding source.
    #[must_use]
    pub fn can_be_bind_source(self) -> bool {
        matches!(self, Self::Property | Self::ReadOnlyProperty | Self::DataSource)
    }
}

/// Lifecycle of a registry slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InstanceState {
    #[default]
    Alive,
    /// Destruction was requested; the slot is reaped at the start of the
    /// next resolve pass.
    DestroyScheduled,
}

/// One registry slot.
pub(crate) struct ServiceRecord {
    pub kind: InstanceKind,
    pub state: InstanceState,
    /// Owning object for property instances; `INVALID` for owners.
    pub owner: InstanceHandle,
    /// The definition's unique id for property instances; `0` for owners.
    /// Used to reject registering the same definition twice on one owner.
    pub definition_id: u64,
    /// Runtime accessors; present on every property instance.
    pub methods: Option<Rc<dyn PropertyMethods>>,
    /// The binding this instance is the target of. Empty means unbound.
    pub binding: Binding,
    /// Instances whose bindings list this instance as a source.
    pub targets: SmallVec<[InstanceHandle; 4]>,
    /// Property instances registered under this owner.
    pub properties: SmallVec<[InstanceHandle; 4]>,
    /// Deferred change marker consumed by the resolve pass.
    pub pending_state: PropertyChangeState,
    /// Capabilities; only meaningful for data sources.
    pub flags: DataSourceFlags,
}

impl ServiceRecord {
    pub fn dependency_object() -> Self {
        Self::owner_record(InstanceKind::DependencyObject, DataSourceFlags::empty())
    }

    pub fn data_source(flags: DataSourceFlags) -> Self {
        Self::owner_record(InstanceKind::DataSource, flags)
    }

    fn owner_record(kind: InstanceKind, flags: DataSourceFlags) -> Self {
        Self {
            kind,
            state: InstanceState::Alive,
            owner: InstanceHandle::INVALID,
            definition_id: 0,
            methods: None,
            binding: Binding::empty(),
            targets: SmallVec::new(),
            properties: SmallVec::new(),
            pending_state: PropertyChangeState::Unchanged,
            flags,
        }
    }

    pub fn property(
        kind: InstanceKind,
        owner: InstanceHandle,
        definition_id: u64,
        methods: Rc<dyn PropertyMethods>,
    ) -> Self {
        debug_assert!(kind.is_property());
        Self {
            kind,
            state: InstanceState::Alive,
            owner,
            definition_id,
            methods: Some(methods),
            binding: Binding::empty(),
            targets: SmallVec::new(),
            properties: SmallVec::new(),
            pending_state: PropertyChangeState::Unchanged,
            flags: DataSourceFlags::empty(),
        }
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state == InstanceState::Alive
    }

    #[must_use]
    pub fn has_binding(&self) -> bool {
        !self.binding.sources().is_empty()
    }

    /// Whether binding to this instance as a source is allowed. Data
    /// sources additionally require the observable capability.
    #[must_use]
    pub fn can_serve_as_source(&self) -> bool {
        match self.kind {
            InstanceKind::DataSource => self.flags.contains(DataSourceFlags::OBSERVABLE),
            kind => kind.can_be_bind_source(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_classification() {
        assert!(InstanceKind::Property.is_property());
        assert!(InstanceKind::ObserverProperty.is_property());
        assert!(!InstanceKind::DataSource.is_property());

        assert!(InstanceKind::Property.can_be_bind_target());
        assert!(!InstanceKind::ReadOnlyProperty.can_be_bind_target());
        assert!(InstanceKind::ReadOnlyProperty.can_be_bind_source());
        assert!(!InstanceKind::ObserverProperty.can_be_bind_source());
        assert!(!InstanceKind::DependencyObject.can_be_bind_source());
    }

    #[test]
    fn data_source_needs_observable_flag_to_be_a_source() {
        let silent = ServiceRecord::data_source(DataSourceFlags::empty());
        assert!(!silent.can_serve_as_source());

        let observable = ServiceRecord::data_source(DataSourceFlags::OBSERVABLE);
        assert!(observable.can_serve_as_source());
    }

    #[test]
    fn fresh_record_is_alive_and_unbound() {
        let record = ServiceRecord::dependency_object();
        assert!(record.is_alive());
        assert!(!record.has_binding());
        assert_eq!(record.pending_state, PropertyChangeState::Unchanged);
    }
}
