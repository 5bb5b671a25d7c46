//! Opaque handles into the binding service's internal tables.
//!
//! Handles are weak, non-owning references: holding one never keeps the
//! underlying slot alive, and a stale handle simply fails lookup instead of
//! dangling. The raw value `0` is reserved as the invalid/default handle and
//! means "no source" wherever a handle is optional.

use core::fmt;

/// Handle designating a registered bindable property instance inside the
/// binding service.
///
/// The raw value packs a slot index and a generation (see
/// [`HandleVec`](crate::HandleVec)); equality is raw-value equality, so a
/// handle from a destroyed-and-reused slot never compares equal to the old
/// one.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct InstanceHandle(u32);

impl InstanceHandle {
    /// The invalid/default handle ("no source").
    pub const INVALID: InstanceHandle = InstanceHandle(0);

    /// Wrap a raw handle value. Only values produced by a
    /// [`HandleVec`](crate::HandleVec) are meaningful.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw packed value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Whether this handle is something other than [`Self::INVALID`].
    ///
    /// A valid-looking handle may still be stale; only a registry lookup can
    /// tell.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "InstanceHandle({})", self.0)
        } else {
            write!(f, "InstanceHandle(invalid)")
        }
    }
}

/// Handle identifying a two-way binding group inside the group manager.
///
/// Group handles are plain indices offset by one (so `0` stays invalid);
/// they are only meaningful until the next `clear_groups` call.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GroupHandle(u32);

impl GroupHandle {
    /// The invalid/default group handle ("not grouped").
    pub const INVALID: GroupHandle = GroupHandle(0);

    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for GroupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "GroupHandle({})", self.0)
        } else {
            write!(f, "GroupHandle(invalid)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_invalid() {
        assert!(!InstanceHandle::default().is_valid());
        assert!(!GroupHandle::default().is_valid());
        assert_eq!(InstanceHandle::default(), InstanceHandle::INVALID);
    }

    #[test]
    fn raw_round_trip() {
        let h = InstanceHandle::from_raw(0x42);
        assert!(h.is_valid());
        assert_eq!(h.raw(), 0x42);
    }

    #[test]
    fn debug_marks_invalid() {
        let s = format!("{:?}", InstanceHandle::INVALID);
        assert!(s.contains("invalid"));
    }
}
