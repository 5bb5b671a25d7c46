//! Clustering of mutually two-way-bound instances into groups.
//!
//! During each resolve pass, every instance reachable through two-way edges
//! from a changed instance is assigned to one group. Each group remembers a
//! single "changed instance": the member whose pending value wins and gets
//! written to every other member. Groups live only for the duration of one
//! resolve pass and are rebuilt from scratch on the next.

use ahash::AHashMap;
use bindweave_core::{GroupHandle, InstanceHandle, PropertyChangeReason};

struct GroupRecord {
    changed_instance: InstanceHandle,
    reason: PropertyChangeReason,
}

/// Assigns two-way-bound instances to groups for one resolve pass.
#[derive(Default)]
pub(crate) struct TwoWayGroupManager {
    groups: Vec<GroupRecord>,
    membership: AHashMap<u32, GroupHandle>,
}

impl TwoWayGroupManager {
    /// The group `instance` belongs to, if any.
    pub fn try_get_group(&self, instance: InstanceHandle) -> Option<GroupHandle> {
        self.membership.get(&instance.raw()).copied()
    }

    /// Create a new group seeded with its winning changed instance.
    pub fn create_group(
        &mut self,
        changed_instance: InstanceHandle,
        reason: PropertyChangeReason,
    ) -> GroupHandle {
        self.groups.push(GroupRecord {
            changed_instance,
            reason,
        });
        let handle = GroupHandle::from_raw(self.groups.len() as u32);
        self.membership.insert(changed_instance.raw(), handle);
        handle
    }

    /// Add `instance` to `group` unless it already belongs to a group.
    /// Reports whether a membership was recorded.
    pub fn try_add_to_group(&mut self, group: GroupHandle, instance: InstanceHandle) -> bool {
        debug_assert!(self.is_live(group));
        if self.membership.contains_key(&instance.raw()) {
            return false;
        }
        self.membership.insert(instance.raw(), group);
        true
    }

    /// Overwrite a group's winning instance and reason.
    ///
    /// Used when a later change arrives for a member of an already-built
    /// group and should win over the original seed.
    pub fn set_group_info(
        &mut self,
        group: GroupHandle,
        changed_instance: InstanceHandle,
        reason: PropertyChangeReason,
    ) {
        debug_assert!(self.is_live(group));
        let record = &mut self.groups[(group.raw() - 1) as usize];
        record.changed_instance = changed_instance;
        record.reason = reason;
    }

    /// The winning changed instance and reason for `group`.
    pub fn group_info(&self, group: GroupHandle) -> Option<(InstanceHandle, PropertyChangeReason)> {
        if !self.is_live(group) {
            return None;
        }
        let record = &self.groups[(group.raw() - 1) as usize];
        Some((record.changed_instance, record.reason))
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Drop all groups and memberships at the end of a resolve pass.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.membership.clear();
    }

    fn is_live(&self, group: GroupHandle) -> bool {
        group.is_valid() && (group.raw() as usize) <= self.groups.len()
    }
}
