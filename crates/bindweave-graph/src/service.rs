//! The binding service: registry, deferred change queue, and resolve pass.
//!
//! All mutation is deferred. Property setters report changes via
//! [`BindingService::changed`], bindings are attached with
//! [`BindingService::set_binding`], and destruction is scheduled with
//! [`BindingService::destroy_instance`]; nothing propagates until
//! [`BindingService::execute_changes`] runs the resolve pass.
//!
//! The service is single-threaded and uses interior mutability so that it
//! can be shared behind `Rc` by every typed property storage. Reentrancy is
//! policed by an explicit call-state machine, not a lock: any public method
//! invoked while a resolve pass holds the graph reports
//! [`BindingError::UsageError`] instead of deadlocking or panicking.
//!
//! # Invariants
//!
//! 1. Forward and reverse edges always agree: `t` lists `s` among its
//!    binding sources exactly when `s` lists `t` among its targets.
//! 2. A destroyed source tears down every binding it participates in,
//!    including multi-source bindings (the whole binding is cleared).
//! 3. Observer callbacks run with the graph unlocked; everything a callback
//!    schedules is picked up by the same resolve pass.
//! 4. The resolve pass settles within [`MAX_EXECUTE_LOOPS`] iterations or
//!    reports an error instead of spinning.

use core::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use bindweave_core::{
    DataSourceFlags, GroupHandle, HandleVec, InstanceHandle, PropertyChangeReason,
    PropertyChangeState, PropertyDefinition,
};
use smallvec::SmallVec;
use tracing::{debug, error, trace, warn};

use crate::binding::{Binding, BindingMode, Converter, MAX_MULTI_BIND_SOURCES};
use crate::error::BindingError;
use crate::group::TwoWayGroupManager;
use crate::methods::{PropertyMethods, PropertySetResult};
use crate::record::{InstanceKind, InstanceState, ServiceRecord};

/// Upper bound on resolve-pass iterations before the pass is declared
/// non-converging.
pub const MAX_EXECUTE_LOOPS: u32 = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CallState {
    Idle,
    ExecutingChanges,
    ExecutingObserverCallbacks,
}

type HandleList = SmallVec<[InstanceHandle; 4]>;

/// Typed view over the raw generational arena: all lookups go through
/// [`InstanceHandle`] so raw `u32`s never leak into the graph code.
#[derive(Default)]
struct InstanceArena {
    slots: HandleVec<ServiceRecord>,
}

impl InstanceArena {
    fn insert(&mut self, record: ServiceRecord) -> InstanceHandle {
        InstanceHandle::from_raw(self.slots.insert(record))
    }

    fn try_get(&self, handle: InstanceHandle) -> Option<&ServiceRecord> {
        self.slots.try_get(handle.raw())
    }

    fn try_get_mut(&mut self, handle: InstanceHandle) -> Option<&mut ServiceRecord> {
        self.slots.try_get_mut(handle.raw())
    }

    fn remove(&mut self, handle: InstanceHandle) -> Option<ServiceRecord> {
        self.slots.remove(handle.raw())
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn handles(&self) -> Vec<InstanceHandle> {
        self.slots
            .handles()
            .into_iter()
            .map(InstanceHandle::from_raw)
            .collect()
    }
}

#[derive(Default)]
struct ServiceState {
    instances: InstanceArena,
    /// Instances with a pending change, in schedule order (move-to-back).
    pending_changes: Vec<InstanceHandle>,
    changes_one_way: VecDeque<(InstanceHandle, PropertyChangeReason)>,
    changes_two_way: VecDeque<GroupHandle>,
    /// Observer callbacks collected during a resolve step, fired after the
    /// graph borrow is released: (observer accessors, changed source).
    observer_queue: VecDeque<(Rc<dyn PropertyMethods>, InstanceHandle)>,
    scheduled_for_destroy: Vec<InstanceHandle>,
    groups: TwoWayGroupManager,
}

/// The deferred data-binding service.
pub struct BindingService {
    state: RefCell<ServiceState>,
    call_state: Cell<CallState>,
}

impl Default for BindingService {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingService {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RefCell::new(ServiceState::default()),
            call_state: Cell::new(CallState::Idle),
        }
    }

    /// Register a dependency object (a property owner on the UI side).
    pub fn create_dependency_object(&self) -> Result<InstanceHandle, BindingError> {
        self.guard_not_resolving("create_dependency_object")?;
        let handle = self
            .state
            .borrow_mut()
            .instances
            .insert(ServiceRecord::dependency_object());
        trace!(handle = handle.raw(), "created dependency object");
        Ok(handle)
    }

    /// Register a data source with the given capabilities.
    pub fn create_data_source(
        &self,
        flags: DataSourceFlags,
    ) -> Result<InstanceHandle, BindingError> {
        self.guard_not_resolving("create_data_source")?;
        let handle = self
            .state
            .borrow_mut()
            .instances
            .insert(ServiceRecord::data_source(flags));
        trace!(handle = handle.raw(), ?flags, "created data source");
        Ok(handle)
    }

    /// Register a read/write property instance under `owner`.
    pub fn create_property(
        &self,
        owner: InstanceHandle,
        definition: &PropertyDefinition,
        methods: Rc<dyn PropertyMethods>,
    ) -> Result<InstanceHandle, BindingError> {
        self.create_property_record(InstanceKind::Property, owner, definition, methods)
    }

    /// Register a read-only property instance under `owner`.
    pub fn create_read_only_property(
        &self,
        owner: InstanceHandle,
        definition: &PropertyDefinition,
        methods: Rc<dyn PropertyMethods>,
    ) -> Result<InstanceHandle, BindingError> {
        self.create_property_record(InstanceKind::ReadOnlyProperty, owner, definition, methods)
    }

    /// Register an observer property (callback-only) under `owner`.
    pub fn create_observer_property(
        &self,
        owner: InstanceHandle,
        definition: &PropertyDefinition,
        methods: Rc<dyn PropertyMethods>,
    ) -> Result<InstanceHandle, BindingError> {
        self.create_property_record(InstanceKind::ObserverProperty, owner, definition, methods)
    }

    fn create_property_record(
        &self,
        kind: InstanceKind,
        owner: InstanceHandle,
        definition: &PropertyDefinition,
        methods: Rc<dyn PropertyMethods>,
    ) -> Result<InstanceHandle, BindingError> {
        self.guard_not_resolving("create property")?;
        if kind == InstanceKind::ReadOnlyProperty && !methods.is_read_only() {
            return Err(BindingError::UsageError(
                "read-only property registration requires read-only accessors",
            ));
        }
        let mut state = self.state.borrow_mut();
        {
            let owner_record = state
                .instances
                .try_get(owner)
                .ok_or(BindingError::UnknownInstance)?;
            if !owner_record.is_alive() {
                return Err(BindingError::DeadInstance("property owner"));
            }
            if owner_record.kind.is_property() {
                return Err(BindingError::IncompatibleProperties(
                    "a property can not own another property",
                ));
            }
            let duplicate = owner_record.properties.iter().any(|&child| {
                state
                    .instances
                    .try_get(child)
                    .is_some_and(|r| r.definition_id == definition.id())
            });
            if duplicate {
                return Err(BindingError::UsageError(
                    "the property definition is already registered on this owner",
                ));
            }
        }
        let handle = state.instances.insert(ServiceRecord::property(
            kind,
            owner,
            definition.id(),
            methods,
        ));
        if let Some(owner_record) = state.instances.try_get_mut(owner) {
            owner_record.properties.push(handle);
        }
        trace!(
            handle = handle.raw(),
            owner = owner.raw(),
            property = definition.name(),
            ?kind,
            "created property instance"
        );
        Ok(handle)
    }

    /// Schedule `handle` and everything it owns for destruction.
    ///
    /// Destruction is deferred to the next resolve pass; until then the
    /// instance reports as dead and all operations on it fail.
    pub fn destroy_instance(&self, handle: InstanceHandle) -> Result<(), BindingError> {
        self.guard_not_resolving("destroy_instance")?;
        let mut state = self.state.borrow_mut();
        let record = state
            .instances
            .try_get_mut(handle)
            .ok_or(BindingError::UnknownInstance)?;
        if record.state == InstanceState::DestroyScheduled {
            return Ok(());
        }
        record.state = InstanceState::DestroyScheduled;
        let children = record.properties.clone();
        state.scheduled_for_destroy.push(handle);
        for child in children {
            if let Some(child_record) = state.instances.try_get_mut(child)
                && child_record.state == InstanceState::Alive
            {
                child_record.state = InstanceState::DestroyScheduled;
                state.scheduled_for_destroy.push(child);
            }
        }
        debug!(handle = handle.raw(), "scheduled instance destruction");
        Ok(())
    }

    /// Record that the value behind `handle` changed (or should be
    /// re-pushed, for [`PropertyChangeReason::Refresh`]).
    ///
    /// Callers write the new value to their slot first and then report here;
    /// the resolve pass reads the slot when it propagates.
    pub fn changed(
        &self,
        handle: InstanceHandle,
        reason: PropertyChangeReason,
    ) -> Result<(), BindingError> {
        if self.call_state.get() == CallState::ExecutingChanges {
            return Err(BindingError::UsageError(
                "a property can not be changed while pending changes are being resolved",
            ));
        }
        let mut state = self.state.borrow_mut();
        let record = state
            .instances
            .try_get(handle)
            .ok_or(BindingError::UnknownInstance)?;
        if !record.is_alive() {
            return Err(BindingError::DeadInstance("changed instance"));
        }
        state.schedule_changed(handle, reason);
        Ok(())
    }

    /// Attach `binding` to `target`, replacing any existing binding.
    ///
    /// An empty binding clears. Reports whether the stored binding actually
    /// changed. On any validation error the target is left **unbound**.
    pub fn set_binding(
        &self,
        target: InstanceHandle,
        binding: Binding,
    ) -> Result<bool, BindingError> {
        self.guard_not_resolving("set_binding")?;
        let mut state = self.state.borrow_mut();
        state.set_binding(target, binding)
    }

    /// Remove the binding on `target`, if any.
    pub fn clear_binding(&self, target: InstanceHandle) -> Result<bool, BindingError> {
        self.set_binding(target, Binding::empty())
    }

    /// Run the resolve pass: reap scheduled destructions, propagate pending
    /// changes along bindings, and fire observer callbacks, repeating until
    /// nothing new is scheduled.
    pub fn execute_changes(&self) -> Result<(), BindingError> {
        if self.call_state.get() != CallState::Idle {
            return Err(BindingError::UsageError(
                "execute_changes can not be invoked recursively",
            ));
        }
        let guard = CallStateGuard::new(&self.call_state);
        let mut loops: u32 = 0;
        loop {
            guard.set(CallState::ExecutingChanges);
            let callbacks = {
                let mut state = self.state.borrow_mut();
                state.destroy_scheduled_now();
                state.determine_pending_changes();
                let result = state
                    .execute_pending_two_way_changes()
                    .and_then(|()| state.execute_pending_one_way_changes());
                state.groups.clear();
                result?;
                core::mem::take(&mut state.observer_queue)
            };
            guard.set(CallState::ExecutingObserverCallbacks);
            for (methods, source) in callbacks {
                methods.try_invoke(source);
            }
            let settled = {
                let state = self.state.borrow();
                state.pending_changes.is_empty() && state.scheduled_for_destroy.is_empty()
            };
            if settled {
                return Ok(());
            }
            loops += 1;
            if loops >= MAX_EXECUTE_LOOPS {
                warn!(loops, "change resolution did not settle, giving up");
                return Err(BindingError::UsageError(
                    "change resolution did not settle; a callback keeps scheduling new changes",
                ));
            }
        }
    }

    /// Whether `handle` designates a live instance.
    #[must_use]
    pub fn is_alive(&self, handle: InstanceHandle) -> bool {
        if self.call_state.get() == CallState::ExecutingChanges {
            return false;
        }
        self.state
            .borrow()
            .instances
            .try_get(handle)
            .is_some_and(ServiceRecord::is_alive)
    }

    /// Whether the property behind `handle` is read-only.
    pub fn is_property_read_only(&self, handle: InstanceHandle) -> Result<bool, BindingError> {
        self.guard_not_resolving("is_property_read_only")?;
        let state = self.state.borrow();
        let record = state
            .instances
            .try_get(handle)
            .ok_or(BindingError::UnknownInstance)?;
        if !record.kind.is_property() {
            return Err(BindingError::IncompatibleProperties(
                "the instance is not a property",
            ));
        }
        Ok(record.kind == InstanceKind::ReadOnlyProperty)
    }

    /// Number of pending (not yet resolved) changes. Mainly for tests and
    /// diagnostics.
    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.state.borrow().pending_changes.len()
    }

    /// Number of live registered instances.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.state.borrow().instances.len()
    }

    /// Signal that the application is shutting down.
    ///
    /// Every instance should have been destroyed by now; anything still
    /// registered is a leaked handle whose owner forgot to release it.
    /// Returns the number of leaked instances.
    pub fn mark_shutdown_intent(&self) -> usize {
        let state = self.state.borrow();
        let leaked = state.instances.len();
        if leaked > 0 {
            error!(count = leaked, "instances still registered at shutdown");
            for handle in state.instances.handles() {
                if let Some(record) = state.instances.try_get(handle) {
                    debug!(handle = handle.raw(), kind = ?record.kind, "leaked instance");
                }
            }
        }
        leaked
    }

    fn guard_not_resolving(&self, what: &'static str) -> Result<(), BindingError> {
        if self.call_state.get() == CallState::ExecutingChanges {
            trace!(operation = what, "rejected call during resolve pass");
            return Err(BindingError::UsageError(
                "the operation is not allowed while pending changes are being resolved",
            ));
        }
        Ok(())
    }

    /// Verify forward/reverse edge agreement. Intended for tests and
    /// debugging; panics on an inconsistent graph.
    pub fn sanity_check(&self) {
        let state = self.state.borrow();
        for handle in state.instances.handles() {
            let record = state.instances.try_get(handle).unwrap();
            for &source in record.binding.sources() {
                let source_record = state
                    .instances
                    .try_get(source)
                    .expect("binding source must exist");
                assert!(
                    source_record.targets.contains(&handle),
                    "reverse edge missing for {handle:?} -> {source:?}"
                );
            }
            for &target in &record.targets {
                let target_record = state
                    .instances
                    .try_get(target)
                    .expect("binding target must exist");
                assert!(
                    target_record.binding.contains_source(handle),
                    "forward edge missing for {target:?} <- {handle:?}"
                );
            }
        }
    }
}

struct CallStateGuard<'a> {
    cell: &'a Cell<CallState>,
}

impl<'a> CallStateGuard<'a> {
    fn new(cell: &'a Cell<CallState>) -> Self {
        Self { cell }
    }

    fn set(&self, state: CallState) {
        self.cell.set(state);
    }
}

impl Drop for CallStateGuard<'_> {
    fn drop(&mut self) {
        self.cell.set(CallState::Idle);
    }
}

impl ServiceState {
    /// Record a pending change with move-to-back queue semantics and the
    /// one-directional `Refresh` -> `Modified` escalation.
    fn schedule_changed(&mut self, handle: InstanceHandle, reason: PropertyChangeReason) {
        let Some(record) = self.instances.try_get_mut(handle) else {
            return;
        };
        record.pending_state = match (record.pending_state, reason) {
            (PropertyChangeState::Modified, _) | (_, PropertyChangeReason::Modified) => {
                PropertyChangeState::Modified
            }
            _ => PropertyChangeState::Refresh,
        };
        self.pending_changes.retain(|&h| h != handle);
        self.pending_changes.push(handle);
        trace!(handle = handle.raw(), ?reason, "scheduled change");
    }

    /// Reap everything scheduled for destruction, unlinking both edge
    /// directions. A destroyed source clears the whole binding on each of
    /// its targets, including multi-source bindings.
    fn destroy_scheduled_now(&mut self) {
        if self.scheduled_for_destroy.is_empty() {
            return;
        }
        let scheduled = core::mem::take(&mut self.scheduled_for_destroy);
        for handle in scheduled {
            let Some(record) = self.instances.try_get(handle) else {
                continue;
            };
            let targets = record.targets.clone();
            let own_sources: HandleList = SmallVec::from_slice(record.binding.sources());
            let owner = record.owner;

            for target in targets {
                let Some(target_record) = self.instances.try_get_mut(target) else {
                    continue;
                };
                let old_binding =
                    core::mem::replace(&mut target_record.binding, Binding::empty());
                for &source in old_binding.sources() {
                    if source != handle
                        && let Some(source_record) = self.instances.try_get_mut(source)
                    {
                        source_record.targets.retain(|&mut t| t != target);
                    }
                }
            }
            for source in own_sources {
                if let Some(source_record) = self.instances.try_get_mut(source) {
                    source_record.targets.retain(|&mut t| t != handle);
                }
            }
            if owner.is_valid()
                && let Some(owner_record) = self.instances.try_get_mut(owner)
            {
                owner_record.properties.retain(|&mut p| p != handle);
            }
            self.pending_changes.retain(|&p| p != handle);
            self.instances.remove(handle);
            debug!(handle = handle.raw(), "destroyed instance");
        }
    }

    /// Drain the pending-change queue, routing each change either into the
    /// one-way queue or into a freshly built two-way group.
    fn determine_pending_changes(&mut self) {
        let pending = core::mem::take(&mut self.pending_changes);
        for handle in pending {
            let Some(record) = self.instances.try_get_mut(handle) else {
                continue;
            };
            if !record.is_alive() {
                record.pending_state = PropertyChangeState::Unchanged;
                continue;
            }
            let reason = record.pending_state.to_reason();
            record.pending_state = PropertyChangeState::Unchanged;

            if self.has_two_way_connection(handle) {
                if let Some(group) = self.groups.try_get_group(handle) {
                    // A later change to an already-grouped member wins.
                    self.groups.set_group_info(group, handle, reason);
                } else {
                    let group = self.groups.create_group(handle, reason);
                    self.collect_two_way_members(group, handle);
                    self.changes_two_way.push_back(group);
                }
            } else {
                self.changes_one_way.push_back((handle, reason));
            }
        }
    }

    fn has_two_way_connection(&self, handle: InstanceHandle) -> bool {
        let Some(record) = self.instances.try_get(handle) else {
            return false;
        };
        if record.binding.mode() == BindingMode::TwoWay && record.has_binding() {
            return true;
        }
        record.targets.iter().any(|&target| {
            self.instances
                .try_get(target)
                .is_some_and(|t| t.binding.mode() == BindingMode::TwoWay)
        })
    }

    /// Recursively pull every instance reachable over two-way edges into
    /// `group`. Membership doubles as the visited set.
    fn collect_two_way_members(&mut self, group: GroupHandle, handle: InstanceHandle) {
        let Some(record) = self.instances.try_get(handle) else {
            return;
        };
        let targets = record.targets.clone();
        let sources: HandleList = if record.binding.mode() == BindingMode::TwoWay {
            SmallVec::from_slice(record.binding.sources())
        } else {
            SmallVec::new()
        };
        for target in targets {
            let two_way = self
                .instances
                .try_get(target)
                .is_some_and(|t| t.binding.mode() == BindingMode::TwoWay);
            if two_way && self.groups.try_add_to_group(group, target) {
                self.collect_two_way_members(group, target);
            }
        }
        for source in sources {
            if self.groups.try_add_to_group(group, source) {
                self.collect_two_way_members(group, source);
            }
        }
    }

    fn execute_pending_two_way_changes(&mut self) -> Result<(), BindingError> {
        while let Some(group) = self.changes_two_way.pop_front() {
            let Some((winner, _reason)) = self.groups.group_info(group) else {
                continue;
            };
            trace!(
                group = group.raw(),
                winner = winner.raw(),
                "executing two way group"
            );
            self.propagate_from(winner, InstanceHandle::INVALID)?;
        }
        Ok(())
    }

    fn execute_pending_one_way_changes(&mut self) -> Result<(), BindingError> {
        while let Some((handle, _reason)) = self.changes_one_way.pop_front() {
            self.propagate_from(handle, InstanceHandle::INVALID)?;
        }
        Ok(())
    }

    /// Push the value at `from` outward: forward to every target, and
    /// backward to two-way sources. `skip` is the neighbor the value just
    /// arrived from; together with equality gating it prevents bounce.
    fn propagate_from(
        &mut self,
        from: InstanceHandle,
        skip: InstanceHandle,
    ) -> Result<(), BindingError> {
        let Some(record) = self.instances.try_get(from) else {
            return Ok(());
        };
        if !record.is_alive() {
            return Ok(());
        }
        let from_methods = record.methods.clone();
        let targets = record.targets.clone();
        let back_binding = if record.binding.mode() == BindingMode::TwoWay {
            Some(record.binding.clone())
        } else {
            None
        };
        let from_value = from_methods.as_ref().map(|m| m.get_value());

        for target in targets {
            if target == skip {
                continue;
            }
            let Some(target_record) = self.instances.try_get(target) else {
                continue;
            };
            if !target_record.is_alive() {
                continue;
            }
            if target_record.kind == InstanceKind::ObserverProperty {
                if let Some(methods) = target_record.methods.clone() {
                    self.observer_queue.push_back((methods, from));
                }
                continue;
            }
            let Some(target_methods) = target_record.methods.clone() else {
                continue;
            };
            let binding = target_record.binding.clone();
            let Some(source_value) = from_value.as_deref() else {
                return Err(BindingError::Internal(
                    "a valueless instance feeds a value property",
                ));
            };
            let changed = match binding.converter() {
                None => target_methods.try_set_value(source_value),
                Some(Converter::Single(conv)) => {
                    let converted = conv.convert(source_value).ok_or(BindingError::Internal(
                        "converter rejected a validated source value",
                    ))?;
                    target_methods.try_set_value(&*converted)
                }
                Some(Converter::Multi(conv)) => {
                    let mut values: Vec<Box<dyn core::any::Any>> =
                        Vec::with_capacity(binding.sources().len());
                    for &source in binding.sources() {
                        let methods = self
                            .instances
                            .try_get(source)
                            .and_then(|r| r.methods.clone())
                            .ok_or(BindingError::Internal(
                                "multi binding source disappeared mid-pass",
                            ))?;
                        values.push(methods.get_value());
                    }
                    let converted = conv.convert(&values).ok_or(BindingError::Internal(
                        "multi converter rejected validated source values",
                    ))?;
                    target_methods.try_set_value(&*converted)
                }
            };
            match changed {
                PropertySetResult::Changed => self.propagate_from(target, from)?,
                PropertySetResult::Unchanged => {}
                PropertySetResult::UnsupportedType | PropertySetResult::Unsupported => {
                    return Err(BindingError::Internal(
                        "propagation hit an incompatible slot",
                    ));
                }
            }
        }

        if let Some(binding) = back_binding {
            let Some(source_value) = from_value.as_deref() else {
                return Ok(());
            };
            for &source in binding.sources() {
                if source == skip {
                    continue;
                }
                let Some(source_methods) = self
                    .instances
                    .try_get(source)
                    .filter(|r| r.is_alive())
                    .and_then(|r| r.methods.clone())
                else {
                    continue;
                };
                let changed = match binding.converter() {
                    None => source_methods.try_set_value(source_value),
                    Some(Converter::Single(conv)) => {
                        let converted =
                            conv.convert_back(source_value)
                                .ok_or(BindingError::Internal(
                                    "two way converter rejected a validated value",
                                ))?;
                        source_methods.try_set_value(&*converted)
                    }
                    Some(Converter::Multi(_)) => {
                        return Err(BindingError::Internal(
                            "a multi converter binding can not be two way",
                        ));
                    }
                };
                match changed {
                    PropertySetResult::Changed => self.propagate_from(source, from)?,
                    PropertySetResult::Unchanged => {}
                    PropertySetResult::UnsupportedType | PropertySetResult::Unsupported => {
                        return Err(BindingError::Internal(
                            "propagation hit an incompatible slot",
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn set_binding(
        &mut self,
        target: InstanceHandle,
        binding: Binding,
    ) -> Result<bool, BindingError> {
        {
            let target_record = self
                .instances
                .try_get(target)
                .ok_or(BindingError::UnknownInstance)?;
            if !target_record.is_alive() {
                return Err(BindingError::DeadInstance("binding target"));
            }
            if binding.sources() == target_record.binding.sources()
                && binding.mode() == target_record.binding.mode()
                && same_converter(binding.converter(), target_record.binding.converter())
            {
                return Ok(false);
            }
        }
        let had_binding = self.unlink_binding(target);
        if binding.sources().is_empty() {
            return Ok(had_binding);
        }

        // Validate against the unbound graph; on failure the target simply
        // stays unbound.
        self.validate_binding(target, &binding)?;

        let sources: HandleList = SmallVec::from_slice(binding.sources());
        if let Some(target_record) = self.instances.try_get_mut(target) {
            target_record.binding = binding;
        }
        for &source in &sources {
            if let Some(source_record) = self.instances.try_get_mut(source) {
                source_record.targets.push(target);
            }
            // The next resolve pass pushes the current source value across
            // the new edge.
            self.schedule_changed(source, PropertyChangeReason::Refresh);
        }
        debug!(handle = target.raw(), sources = sources.len(), "set binding");
        Ok(true)
    }

    /// Detach the target's current binding, fixing reverse edges. Reports
    /// whether a binding was present.
    fn unlink_binding(&mut self, target: InstanceHandle) -> bool {
        let Some(target_record) = self.instances.try_get_mut(target) else {
            return false;
        };
        let old_binding = core::mem::replace(&mut target_record.binding, Binding::empty());
        if old_binding.sources().is_empty() {
            return false;
        }
        for &source in old_binding.sources() {
            if let Some(source_record) = self.instances.try_get_mut(source) {
                source_record.targets.retain(|&mut t| t != target);
            }
        }
        true
    }

    fn validate_binding(
        &self,
        target: InstanceHandle,
        binding: &Binding,
    ) -> Result<(), BindingError> {
        if !binding.has_valid_source_handles() {
            return Err(BindingError::UsageError(
                "the binding contains invalid source handles",
            ));
        }
        if binding.sources().len() > MAX_MULTI_BIND_SOURCES {
            return Err(BindingError::Unsupported(
                "the binding exceeds the supported source count",
            ));
        }
        if binding.contains_source(target) {
            return Err(BindingError::CyclicBinding);
        }

        let target_record = self
            .instances
            .try_get(target)
            .ok_or(BindingError::UnknownInstance)?;
        if !target_record.kind.can_be_bind_target() {
            return Err(BindingError::IncompatibleProperties(
                "the instance can not be the target of a binding",
            ));
        }

        match binding.converter() {
            None | Some(Converter::Single(_)) => {
                if binding.sources().len() != 1 {
                    return Err(BindingError::Unsupported(
                        "multiple sources require a multi converter binding",
                    ));
                }
            }
            Some(Converter::Multi(conv)) => {
                if binding.mode() == BindingMode::TwoWay {
                    return Err(BindingError::Unsupported(
                        "a multi converter binding can not be two way",
                    ));
                }
                if conv.source_types().len() != binding.sources().len() {
                    return Err(BindingError::Unsupported(
                        "the source count does not match the multi converter arity",
                    ));
                }
            }
        }

        for &source in binding.sources() {
            self.validate_source(target, target_record, binding, source)?;
            if self.reaches_through_sources(source, target) {
                return Err(BindingError::CyclicBinding);
            }
        }

        if binding.mode() == BindingMode::TwoWay {
            self.validate_two_way(target, target_record, binding)?;
        } else if self.is_two_way_source(target) {
            return Err(BindingError::TwoWaySourceRule(
                "the target of a one way binding can not be the source of a two way binding",
            ));
        }
        Ok(())
    }

    fn validate_source(
        &self,
        _target: InstanceHandle,
        target_record: &ServiceRecord,
        binding: &Binding,
        source: InstanceHandle,
    ) -> Result<(), BindingError> {
        let source_record = self
            .instances
            .try_get(source)
            .ok_or(BindingError::UnknownInstance)?;
        if !source_record.is_alive() {
            return Err(BindingError::DeadInstance("binding source"));
        }
        if !source_record.can_serve_as_source() {
            return Err(BindingError::IncompatibleProperties(
                "the instance can not serve as a binding source",
            ));
        }

        if target_record.kind == InstanceKind::ObserverProperty {
            if binding.mode() != BindingMode::OneWay || binding.converter().is_some() {
                return Err(BindingError::Unsupported(
                    "observer properties only support plain one way bindings",
                ));
            }
            if source_record.kind != InstanceKind::DataSource {
                return Err(BindingError::IncompatibleProperties(
                    "observer properties can only observe observable data sources",
                ));
            }
            return Ok(());
        }

        // Value-property target: the source must provide a value.
        let Some(source_methods) = source_record.methods.as_ref() else {
            return Err(BindingError::IncompatibleProperties(
                "a data source provides no value; bind an observer property instead",
            ));
        };
        let target_methods = target_record
            .methods
            .as_ref()
            .ok_or(BindingError::Internal("value property without accessors"))?;

        match binding.converter() {
            None => {
                if source_methods.value_type() != target_methods.value_type() {
                    return Err(BindingError::IncompatibleTypes {
                        expected: target_methods.value_type_name(),
                        found: source_methods.value_type_name(),
                    });
                }
            }
            Some(Converter::Single(conv)) => {
                if conv.source_type() != source_methods.value_type() {
                    return Err(BindingError::IncompatibleTypes {
                        expected: conv.source_type_name(),
                        found: source_methods.value_type_name(),
                    });
                }
                if conv.target_type() != target_methods.value_type() {
                    return Err(BindingError::IncompatibleTypes {
                        expected: target_methods.value_type_name(),
                        found: conv.target_type_name(),
                    });
                }
            }
            Some(Converter::Multi(conv)) => {
                let position = binding
                    .sources()
                    .iter()
                    .position(|&s| s == source)
                    .ok_or(BindingError::Internal("source not part of its binding"))?;
                if conv.source_types()[position] != source_methods.value_type() {
                    return Err(BindingError::IncompatibleTypes {
                        expected: target_methods.value_type_name(),
                        found: source_methods.value_type_name(),
                    });
                }
                if conv.target_type() != target_methods.value_type() {
                    return Err(BindingError::IncompatibleTypes {
                        expected: target_methods.value_type_name(),
                        found: conv.target_type_name(),
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_two_way(
        &self,
        _target: InstanceHandle,
        target_record: &ServiceRecord,
        binding: &Binding,
    ) -> Result<(), BindingError> {
        if target_record.kind != InstanceKind::Property {
            return Err(BindingError::IncompatibleProperties(
                "only read/write properties can be the target of a two way binding",
            ));
        }
        if let Some(Converter::Single(conv)) = binding.converter()
            && !conv.supports_two_way()
        {
            return Err(BindingError::Unsupported(
                "the converter does not support two way binding",
            ));
        }
        let source = binding.sources()[0];
        let source_record = self
            .instances
            .try_get(source)
            .ok_or(BindingError::UnknownInstance)?;
        if source_record.kind == InstanceKind::ReadOnlyProperty
            || source_record
                .methods
                .as_ref()
                .is_some_and(|m| m.is_read_only())
        {
            return Err(BindingError::TwoWayReadOnlySource);
        }
        if source_record.kind != InstanceKind::Property {
            return Err(BindingError::IncompatibleProperties(
                "only read/write properties can be the source of a two way binding",
            ));
        }
        if source_record.has_binding() && source_record.binding.mode() == BindingMode::OneWay {
            return Err(BindingError::TwoWaySourceRule(
                "the source of a two way binding can not be the target of a one way binding",
            ));
        }
        Ok(())
    }

    /// Whether `handle` currently serves as the source of a two-way binding.
    fn is_two_way_source(&self, handle: InstanceHandle) -> bool {
        let Some(record) = self.instances.try_get(handle) else {
            return false;
        };
        record.targets.iter().any(|&target| {
            self.instances
                .try_get(target)
                .is_some_and(|t| t.binding.mode() == BindingMode::TwoWay)
        })
    }

    /// Whether `needle` is reachable from `handle` by walking binding
    /// sources transitively.
    fn reaches_through_sources(&self, handle: InstanceHandle, needle: InstanceHandle) -> bool {
        if handle == needle {
            return true;
        }
        let Some(record) = self.instances.try_get(handle) else {
            return false;
        };
        record
            .binding
            .sources()
            .iter()
            .any(|&source| self.reaches_through_sources(source, needle))
    }
}

fn same_converter(a: Option<&Converter>, b: Option<&Converter>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(Converter::Single(a)), Some(Converter::Single(b))) => Rc::ptr_eq(a, b),
        (Some(Converter::Multi(a)), Some(Converter::Multi(b))) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::TypedPropertyMethods;
    use bindweave_core::PropertyDefinition;
    use core::cell::RefCell;

    struct Widget;

    fn new_property(
        service: &BindingService,
        owner: InstanceHandle,
        name: &str,
        initial: u32,
    ) -> (InstanceHandle, Rc<RefCell<u32>>) {
        let definition = PropertyDefinition::create_for::<Widget, u32>(name).unwrap();
        let slot = Rc::new(RefCell::new(initial));
        let methods = Rc::new(TypedPropertyMethods::new(Rc::clone(&slot), false));
        let handle = service.create_property(owner, &definition, methods).unwrap();
        (handle, slot)
    }

    #[test]
    fn one_way_binding_pushes_value_on_execute() {
        let service = BindingService::new();
        let owner = service.create_dependency_object().unwrap();
        let (source, source_slot) = new_property(&service, owner, "Source", 0x42);
        let (target, target_slot) = new_property(&service, owner, "Target", 0);

        assert!(service.set_binding(target, Binding::new(source)).unwrap());
        assert_eq!(*target_slot.borrow(), 0, "nothing moves before execute");

        service.execute_changes().unwrap();
        assert_eq!(*target_slot.borrow(), 0x42);

        *source_slot.borrow_mut() = 7;
        service
            .changed(source, PropertyChangeReason::Modified)
            .unwrap();
        service.execute_changes().unwrap();
        assert_eq!(*target_slot.borrow(), 7);
        service.sanity_check();
    }

    #[test]
    fn duplicate_definition_on_one_owner_is_rejected() {
        let service = BindingService::new();
        let owner = service.create_dependency_object().unwrap();
        let definition = PropertyDefinition::create_for::<Widget, u32>("Value").unwrap();
        let slot = Rc::new(RefCell::new(0u32));
        let methods: Rc<dyn PropertyMethods> =
            Rc::new(TypedPropertyMethods::new(Rc::clone(&slot), false));
        service
            .create_property(owner, &definition, Rc::clone(&methods))
            .unwrap();
        let err = service
            .create_property(owner, &definition, methods)
            .unwrap_err();
        assert!(matches!(err, BindingError::UsageError(_)));
    }

    #[test]
    fn self_binding_is_cyclic() {
        let service = BindingService::new();
        let owner = service.create_dependency_object().unwrap();
        let (p, _) = new_property(&service, owner, "P", 0);
        let err = service.set_binding(p, Binding::new(p)).unwrap_err();
        assert_eq!(err, BindingError::CyclicBinding);
    }

    #[test]
    fn transitive_cycle_is_rejected_and_target_left_unbound() {
        let service = BindingService::new();
        let owner = service.create_dependency_object().unwrap();
        let (a, _) = new_property(&service, owner, "A", 0);
        let (b, _) = new_property(&service, owner, "B", 0);
        let (c, _) = new_property(&service, owner, "C", 0);

        service.set_binding(b, Binding::new(a)).unwrap();
        service.set_binding(c, Binding::new(b)).unwrap();
        let err = service.set_binding(a, Binding::new(c)).unwrap_err();
        assert_eq!(err, BindingError::CyclicBinding);

        // The failed set cleared any previous binding on the target.
        service.execute_changes().unwrap();
        service.sanity_check();
    }

    #[test]
    fn destroying_a_source_clears_the_whole_multi_binding() {
        let service = BindingService::new();
        let owner = service.create_dependency_object().unwrap();
        let (a, _) = new_property(&service, owner, "A", 1);
        let (b, _) = new_property(&service, owner, "B", 2);
        let (sum, sum_slot) = new_property(&service, owner, "Sum", 0);

        let binding = Binding::multi(&[a, b], crate::binding::multi_converter2(|x: &u32, y: &u32| x + y));
        service.set_binding(sum, binding).unwrap();
        service.execute_changes().unwrap();
        assert_eq!(*sum_slot.borrow(), 3);

        service.destroy_instance(a).unwrap();
        service.execute_changes().unwrap();
        service.sanity_check();

        // The surviving source no longer feeds the target.
        service.changed(b, PropertyChangeReason::Modified).unwrap();
        service.execute_changes().unwrap();
        assert_eq!(*sum_slot.borrow(), 3);
    }

    #[test]
    fn operations_on_unknown_handles_fail_cleanly() {
        let service = BindingService::new();
        let bogus = InstanceHandle::from_raw(0xDEAD);
        assert_eq!(
            service.changed(bogus, PropertyChangeReason::Modified),
            Err(BindingError::UnknownInstance)
        );
        assert_eq!(
            service.destroy_instance(bogus),
            Err(BindingError::UnknownInstance)
        );
        assert!(!service.is_alive(bogus));
        assert!(service.execute_changes().is_ok(), "empty pass settles");
    }
}
